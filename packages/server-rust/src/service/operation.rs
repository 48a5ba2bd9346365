//! Typed remote-library calls, replies and errors.
//!
//! A decoded [`MethodCall`] is classified into a [`RemoteCall`] before
//! dispatch, so parameter count and type checks happen once at the edge and
//! the service only sees well-formed calls.

use robot_remote_core::xmlrpc::fault_codes;
use robot_remote_core::{KeywordResult, MethodCall, Value};

/// XML-RPC method names of the Robot Framework remote library API.
pub mod method_names {
    pub const GET_KEYWORD_NAMES: &str = "get_keyword_names";
    pub const GET_KEYWORD_ARGUMENTS: &str = "get_keyword_arguments";
    pub const GET_KEYWORD_DOCUMENTATION: &str = "get_keyword_documentation";
    pub const RUN_KEYWORD: &str = "run_keyword";
}

// ---------------------------------------------------------------------------
// RemoteCall
// ---------------------------------------------------------------------------

/// A classified remote-library request.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    GetKeywordNames,
    GetKeywordArguments { name: String },
    GetKeywordDocumentation { name: String },
    RunKeyword { name: String, args: Vec<Value> },
}

impl RemoteCall {
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            RemoteCall::GetKeywordNames => method_names::GET_KEYWORD_NAMES,
            RemoteCall::GetKeywordArguments { .. } => method_names::GET_KEYWORD_ARGUMENTS,
            RemoteCall::GetKeywordDocumentation { .. } => method_names::GET_KEYWORD_DOCUMENTATION,
            RemoteCall::RunKeyword { .. } => method_names::RUN_KEYWORD,
        }
    }
}

impl TryFrom<MethodCall> for RemoteCall {
    type Error = RpcError;

    fn try_from(call: MethodCall) -> Result<Self, Self::Error> {
        let MethodCall {
            method_name,
            params,
        } = call;
        match method_name.as_str() {
            method_names::GET_KEYWORD_NAMES => {
                expect_count(method_names::GET_KEYWORD_NAMES, &params, 0..=0)?;
                Ok(RemoteCall::GetKeywordNames)
            }
            method_names::GET_KEYWORD_ARGUMENTS => {
                expect_count(method_names::GET_KEYWORD_ARGUMENTS, &params, 1..=1)?;
                let name = keyword_name(method_names::GET_KEYWORD_ARGUMENTS, &params[0])?;
                Ok(RemoteCall::GetKeywordArguments { name })
            }
            method_names::GET_KEYWORD_DOCUMENTATION => {
                expect_count(method_names::GET_KEYWORD_DOCUMENTATION, &params, 1..=1)?;
                let name = keyword_name(method_names::GET_KEYWORD_DOCUMENTATION, &params[0])?;
                Ok(RemoteCall::GetKeywordDocumentation { name })
            }
            method_names::RUN_KEYWORD => classify_run_keyword(params),
            _ => Err(RpcError::UnknownMethod(method_name)),
        }
    }
}

/// `run_keyword(name, args[, kwargs])`. A `kwargs` struct is accepted only
/// when it is empty.
fn classify_run_keyword(params: Vec<Value>) -> Result<RemoteCall, RpcError> {
    const METHOD: &str = method_names::RUN_KEYWORD;
    expect_count(METHOD, &params, 2..=3)?;

    let mut params = params.into_iter();
    let name = match params.next() {
        Some(value) => keyword_name(METHOD, &value)?,
        None => return Err(invalid(METHOD, "missing keyword name")),
    };
    let args = match params.next() {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(invalid(
                METHOD,
                format!("arguments must be an array, got {}", other.type_name()),
            ))
        }
        None => return Err(invalid(METHOD, "missing argument list")),
    };
    match params.next() {
        None => {}
        Some(Value::Struct(kwargs)) if kwargs.is_empty() => {}
        Some(Value::Struct(_)) => {
            return Err(invalid(METHOD, "keyword arguments (kwargs) are not supported"))
        }
        Some(other) => {
            return Err(invalid(
                METHOD,
                format!("kwargs must be a struct, got {}", other.type_name()),
            ))
        }
    }
    Ok(RemoteCall::RunKeyword { name, args })
}

fn expect_count(
    method: &'static str,
    params: &[Value],
    range: std::ops::RangeInclusive<usize>,
) -> Result<(), RpcError> {
    if range.contains(&params.len()) {
        return Ok(());
    }
    let expected = if range.start() == range.end() {
        range.start().to_string()
    } else {
        format!("{} to {}", range.start(), range.end())
    };
    Err(invalid(
        method,
        format!("expected {expected} parameter(s), got {}", params.len()),
    ))
}

fn keyword_name(method: &'static str, value: &Value) -> Result<String, RpcError> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        invalid(
            method,
            format!("keyword name must be a string, got {}", value.type_name()),
        )
    })
}

fn invalid(method: &'static str, reason: impl Into<String>) -> RpcError {
    RpcError::InvalidParams {
        method,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// RemoteReply
// ---------------------------------------------------------------------------

/// Successful reply to a [`RemoteCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply {
    KeywordNames(Vec<String>),
    KeywordArguments(Vec<String>),
    Documentation(String),
    KeywordResult(KeywordResult),
}

impl RemoteReply {
    /// Converts the reply into the XML-RPC response value.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            RemoteReply::KeywordNames(names) | RemoteReply::KeywordArguments(names) => {
                Value::from(names)
            }
            RemoteReply::Documentation(text) => Value::String(text),
            RemoteReply::KeywordResult(result) => result.into_value(),
        }
    }
}

// ---------------------------------------------------------------------------
// RpcError
// ---------------------------------------------------------------------------

/// Errors answered with an XML-RPC `<fault>` instead of a result.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
    #[error("invalid parameters for {method}: {reason}")]
    InvalidParams {
        method: &'static str,
        reason: String,
    },
    #[error("No keyword with name '{0}' found.")]
    KeywordNotFound(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl RpcError {
    /// `faultCode` reported for this error.
    #[must_use]
    pub fn fault_code(&self) -> i64 {
        match self {
            RpcError::UnknownMethod(_) => fault_codes::UNKNOWN_METHOD,
            RpcError::InvalidParams { .. } => fault_codes::INVALID_PARAMS,
            RpcError::KeywordNotFound(_) => fault_codes::KEYWORD_NOT_FOUND,
            RpcError::Internal(_) => fault_codes::INTERNAL_ERROR,
        }
    }
}
