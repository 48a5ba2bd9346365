use std::collections::BTreeMap;
use std::fmt;

/// Runtime value carried by XML-RPC requests and responses.
///
/// Covers every XML-RPC scalar and aggregate type. Keyword arguments arrive
/// as `Value`s and are narrowed to the parameter types a keyword declares via
/// the `coerce_*` helpers.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `<nil/>` extension type.
    Nil,
    /// `<boolean>` (wire form `0`/`1`).
    Bool(bool),
    /// `<int>`, `<i4>` or `<i8>`.
    Int(i64),
    /// `<double>`.
    Double(f64),
    /// `<string>` or untyped `<value>` text.
    String(String),
    /// `<dateTime.iso8601>`, kept in its wire representation.
    DateTime(String),
    /// `<base64>` payload, already decoded.
    Base64(Vec<u8>),
    /// `<array>`.
    Array(Vec<Value>),
    /// `<struct>`. Uses `BTreeMap` for deterministic member order on the wire.
    Struct(BTreeMap<String, Value>),
}

impl Value {
    /// XML-RPC type name of this value, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "dateTime.iso8601",
            Value::Base64(_) => "base64",
            Value::Array(_) => "array",
            Value::Struct(_) => "struct",
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Narrows the value to a string parameter. Only strings are accepted;
    /// other scalars are not silently stringified.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::TypeMismatch`] for any non-string value.
    pub fn coerce_string(&self) -> Result<String, CoercionError> {
        match self {
            Value::String(s) => Ok(s.clone()),
            other => Err(CoercionError::TypeMismatch {
                expected: "string",
                found: other.type_name(),
            }),
        }
    }

    /// Narrows the value to an integer parameter. Accepts an int or a string
    /// holding a base-10 integer (Robot Framework sends most arguments as
    /// strings).
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Unparseable`] for a non-numeric string and
    /// [`CoercionError::TypeMismatch`] for any other value type.
    pub fn coerce_int(&self) -> Result<i64, CoercionError> {
        match self {
            Value::Int(n) => Ok(*n),
            Value::String(s) => s.trim().parse().map_err(|_| CoercionError::Unparseable {
                value: s.clone(),
                expected: "int",
            }),
            other => Err(CoercionError::TypeMismatch {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    /// Narrows the value to a boolean parameter. Accepts a boolean or the
    /// strings `true`/`false` in any letter case.
    ///
    /// # Errors
    ///
    /// Returns [`CoercionError::Unparseable`] for any other string and
    /// [`CoercionError::TypeMismatch`] for any other value type.
    pub fn coerce_bool(&self) -> Result<bool, CoercionError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
            Value::String(s) => Err(CoercionError::Unparseable {
                value: s.clone(),
                expected: "boolean",
            }),
            other => Err(CoercionError::TypeMismatch {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) | Value::DateTime(s) => f.write_str(s),
            Value::Base64(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Struct(members) => {
                f.write_str("{")?;
                for (i, (name, value)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

/// Failure to narrow a [`Value`] to a keyword parameter type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("expected {expected} but got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("cannot convert '{value}' to {expected}")]
    Unparseable {
        value: String,
        expected: &'static str,
    },
}
