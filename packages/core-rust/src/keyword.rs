//! Keyword results and the `run_keyword` result envelope.
//!
//! Every keyword execution produces exactly one [`KeywordResult`] with five
//! string fields (`status`, `output`, `error`, `traceback`, `return`). Return
//! values are flattened to strings:
//!
//! | Return shape             | `return`            | status             |
//! |--------------------------|---------------------|--------------------|
//! | none / other             | `""`                | PASS               |
//! | int, string              | string form         | PASS               |
//! | bool                     | `"True"`/`"False"`  | PASS / FAIL        |
//! | array of int/string/bool | `"{v1,v2,...,vN,}"` | PASS               |
//!
//! Arrays keep a trailing comma before the closing brace (`{1,2,3,}`, and
//! `{}` when empty). Callers parse this format positionally.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::value::{CoercionError, Value};

/// Name of the reserved pseudo-keyword that stops the remote server.
pub const STOP_REMOTE_SERVER: &str = "stop_remote_server";

// ---------------------------------------------------------------------------
// Return shapes
// ---------------------------------------------------------------------------

/// Declared return classification of a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    None,
    Int,
    String,
    Bool,
    IntArray,
    StringArray,
    BoolArray,
    Other,
}

/// Value produced by a successful keyword call.
#[derive(Debug, Clone, PartialEq)]
pub enum KeywordReturn {
    None,
    Int(i64),
    String(String),
    Bool(bool),
    IntArray(Vec<i64>),
    StringArray(Vec<String>),
    BoolArray(Vec<bool>),
    /// A value of a shape the protocol does not flatten; reported as no value.
    Other(Value),
}

impl KeywordReturn {
    #[must_use]
    pub fn shape(&self) -> ReturnShape {
        match self {
            KeywordReturn::None => ReturnShape::None,
            KeywordReturn::Int(_) => ReturnShape::Int,
            KeywordReturn::String(_) => ReturnShape::String,
            KeywordReturn::Bool(_) => ReturnShape::Bool,
            KeywordReturn::IntArray(_) => ReturnShape::IntArray,
            KeywordReturn::StringArray(_) => ReturnShape::StringArray,
            KeywordReturn::BoolArray(_) => ReturnShape::BoolArray,
            KeywordReturn::Other(_) => ReturnShape::Other,
        }
    }

    /// Flattens the value into the envelope's `return` string.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            KeywordReturn::None | KeywordReturn::Other(_) => String::new(),
            KeywordReturn::Int(n) => n.to_string(),
            KeywordReturn::String(s) => s.clone(),
            KeywordReturn::Bool(b) => bool_literal(*b).to_string(),
            KeywordReturn::IntArray(items) => brace_list(items.iter().map(ToString::to_string)),
            KeywordReturn::StringArray(items) => brace_list(items.iter().cloned()),
            KeywordReturn::BoolArray(items) => {
                brace_list(items.iter().map(|b| bool_literal(*b).to_string()))
            }
        }
    }

    /// A `false` boolean is reported as FAIL even though nothing faulted.
    #[must_use]
    pub fn status(&self) -> KeywordStatus {
        match self {
            KeywordReturn::Bool(false) => KeywordStatus::Fail,
            _ => KeywordStatus::Pass,
        }
    }
}

fn bool_literal(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

fn brace_list(items: impl Iterator<Item = String>) -> String {
    let mut out = String::from("{");
    for item in items {
        let _ = write!(out, "{item},");
    }
    out.push('}');
    out
}

/// Conversion from a keyword body's Rust return type into a [`KeywordReturn`].
///
/// The associated `SHAPE` lets a library declare each keyword's return shape
/// at registration time from the closure's signature alone.
pub trait KeywordOutput {
    const SHAPE: ReturnShape;

    fn into_return(self) -> KeywordReturn;
}

impl KeywordOutput for () {
    const SHAPE: ReturnShape = ReturnShape::None;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::None
    }
}

impl KeywordOutput for i64 {
    const SHAPE: ReturnShape = ReturnShape::Int;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::Int(self)
    }
}

impl KeywordOutput for i32 {
    const SHAPE: ReturnShape = ReturnShape::Int;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::Int(i64::from(self))
    }
}

impl KeywordOutput for String {
    const SHAPE: ReturnShape = ReturnShape::String;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::String(self)
    }
}

impl KeywordOutput for bool {
    const SHAPE: ReturnShape = ReturnShape::Bool;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::Bool(self)
    }
}

impl KeywordOutput for Vec<i64> {
    const SHAPE: ReturnShape = ReturnShape::IntArray;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::IntArray(self)
    }
}

impl KeywordOutput for Vec<String> {
    const SHAPE: ReturnShape = ReturnShape::StringArray;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::StringArray(self)
    }
}

impl KeywordOutput for Vec<bool> {
    const SHAPE: ReturnShape = ReturnShape::BoolArray;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::BoolArray(self)
    }
}

impl KeywordOutput for Value {
    const SHAPE: ReturnShape = ReturnShape::Other;

    fn into_return(self) -> KeywordReturn {
        KeywordReturn::Other(self)
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// A failure raised while executing a keyword.
///
/// Carries the message reported in `error`/`output` and an optional
/// diagnostic trail reported in `traceback`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct KeywordFault {
    message: String,
    traceback: String,
}

impl KeywordFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            traceback: String::new(),
        }
    }

    #[must_use]
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = traceback.into();
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Diagnostic trail, empty when none was recorded.
    #[must_use]
    pub fn traceback(&self) -> &str {
        &self.traceback
    }
}

/// The outermost context becomes the message; the remaining cause chain
/// becomes the traceback, one `Caused by:` line per cause.
impl From<anyhow::Error> for KeywordFault {
    fn from(err: anyhow::Error) -> Self {
        let traceback = err
            .chain()
            .skip(1)
            .map(|cause| format!("Caused by: {cause}"))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            message: err.to_string(),
            traceback,
        }
    }
}

impl From<CoercionError> for KeywordFault {
    fn from(err: CoercionError) -> Self {
        Self::new(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Execution status reported to Robot Framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordStatus {
    Pass,
    Fail,
}

impl KeywordStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            KeywordStatus::Pass => "PASS",
            KeywordStatus::Fail => "FAIL",
        }
    }
}

/// The five-field `run_keyword` result envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordResult {
    pub status: KeywordStatus,
    /// Log output. Never captured from keyword bodies; only set for notes
    /// and faults.
    pub output: String,
    pub error: String,
    pub traceback: String,
    /// Wire name is `return`.
    pub return_value: String,
}

impl KeywordResult {
    /// Envelope for a keyword that completed without faulting.
    #[must_use]
    pub fn from_return(ret: &KeywordReturn) -> Self {
        Self {
            status: ret.status(),
            output: String::new(),
            error: String::new(),
            traceback: String::new(),
            return_value: ret.encode(),
        }
    }

    /// Envelope for a keyword that faulted. The message is reported in both
    /// `output` and `error`.
    #[must_use]
    pub fn from_fault(fault: &KeywordFault) -> Self {
        Self {
            status: KeywordStatus::Fail,
            output: fault.message().to_string(),
            error: fault.message().to_string(),
            traceback: fault.traceback().to_string(),
            return_value: String::new(),
        }
    }

    /// PASS envelope with return value `1` and an informational note in
    /// `output`. Used by server-side pseudo-keywords.
    pub fn note(output: impl Into<String>) -> Self {
        Self {
            status: KeywordStatus::Pass,
            output: output.into(),
            error: String::new(),
            traceback: String::new(),
            return_value: "1".to_string(),
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.status == KeywordStatus::Pass
    }

    /// Converts the envelope to the XML-RPC struct sent to the caller.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut members = BTreeMap::new();
        members.insert(
            "status".to_string(),
            Value::String(self.status.as_str().to_string()),
        );
        members.insert("output".to_string(), Value::String(self.output));
        members.insert("error".to_string(), Value::String(self.error));
        members.insert("traceback".to_string(), Value::String(self.traceback));
        members.insert("return".to_string(), Value::String(self.return_value));
        Value::Struct(members)
    }
}
