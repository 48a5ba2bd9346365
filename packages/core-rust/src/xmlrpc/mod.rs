//! XML-RPC wire codec.
//!
//! Robot Framework talks to remote libraries over XML-RPC: the client POSTs a
//! `<methodCall>` document and the server answers with a `<methodResponse>`
//! holding either a single result value or a `<fault>`.
//!
//! - `decode`: request and response parsing into [`Value`] trees
//! - `encode`: response, fault and request serialization

mod decode;
mod encode;

pub use decode::{decode_method_call, decode_method_response};
pub use encode::{encode_fault, encode_method_call, encode_response};

use crate::value::Value;
use crate::xml::XmlError;

/// Fault codes placed in `faultCode` of a `<fault>` response.
pub mod fault_codes {
    /// The named keyword does not exist in the loaded library.
    pub const KEYWORD_NOT_FOUND: i64 = 1;
    /// The request body could not be parsed.
    pub const MALFORMED_REQUEST: i64 = -32_700;
    /// The requested XML-RPC method is not served.
    pub const UNKNOWN_METHOD: i64 = -32_601;
    /// The method exists but its parameters have the wrong count or type.
    pub const INVALID_PARAMS: i64 = -32_602;
    /// The server failed while handling a well-formed request.
    pub const INTERNAL_ERROR: i64 = -32_603;
}

/// A decoded `<methodCall>`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
        }
    }
}

/// A decoded `<methodResponse>`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Success(Value),
    Fault { code: i64, message: String },
}

/// Errors produced while decoding XML-RPC documents.
#[derive(Debug, thiserror::Error)]
pub enum XmlRpcError {
    #[error("request body is not valid UTF-8")]
    NotUtf8,
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error("expected <{expected}> but found <{found}>")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },
    #[error("missing <{0}> element")]
    Missing(&'static str),
    #[error("invalid {kind} value '{text}'")]
    InvalidScalar { kind: &'static str, text: String },
    #[error("unsupported value type <{0}>")]
    UnsupportedType(String),
    #[error("<value> must hold at most one typed element")]
    AmbiguousValue,
}
