use std::collections::BTreeMap;

use base64::Engine as _;

use super::{MethodCall, MethodResponse, XmlRpcError};
use crate::value::Value;
use crate::xml::{parse_document, XmlElement};

/// Decodes a `<methodCall>` request body.
///
/// A missing `<params>` element is treated as an empty parameter list.
///
/// # Errors
///
/// Returns [`XmlRpcError`] when the body is not UTF-8, not well-formed XML,
/// or does not follow the XML-RPC request grammar.
pub fn decode_method_call(body: &[u8]) -> Result<MethodCall, XmlRpcError> {
    let text = std::str::from_utf8(body).map_err(|_| XmlRpcError::NotUtf8)?;
    let root = parse_document(text)?;
    expect_name(&root, "methodCall")?;

    let method_name = root
        .child("methodName")
        .ok_or(XmlRpcError::Missing("methodName"))?
        .text()
        .trim()
        .to_string();
    if method_name.is_empty() {
        return Err(XmlRpcError::Missing("methodName"));
    }

    let params = match root.child("params") {
        Some(params) => decode_params(params)?,
        None => Vec::new(),
    };

    Ok(MethodCall {
        method_name,
        params,
    })
}

/// Decodes a `<methodResponse>` body into a result value or a fault.
///
/// # Errors
///
/// Returns [`XmlRpcError`] when the body does not follow the XML-RPC
/// response grammar.
pub fn decode_method_response(body: &[u8]) -> Result<MethodResponse, XmlRpcError> {
    let text = std::str::from_utf8(body).map_err(|_| XmlRpcError::NotUtf8)?;
    let root = parse_document(text)?;
    expect_name(&root, "methodResponse")?;

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.child("value").ok_or(XmlRpcError::Missing("value"))?)?;
        let members = value.as_struct().ok_or(XmlRpcError::Missing("struct"))?;
        let code = match members.get("faultCode") {
            Some(Value::Int(code)) => *code,
            _ => return Err(XmlRpcError::Missing("faultCode")),
        };
        let message = members
            .get("faultString")
            .and_then(Value::as_str)
            .ok_or(XmlRpcError::Missing("faultString"))?
            .to_string();
        return Ok(MethodResponse::Fault { code, message });
    }

    let params = decode_params(root.child("params").ok_or(XmlRpcError::Missing("params"))?)?;
    let value = params
        .into_iter()
        .next()
        .ok_or(XmlRpcError::Missing("param"))?;
    Ok(MethodResponse::Success(value))
}

fn decode_params(params: &XmlElement) -> Result<Vec<Value>, XmlRpcError> {
    params
        .children_named("param")
        .map(|param| {
            let value = param.child("value").ok_or(XmlRpcError::Missing("value"))?;
            decode_value(value)
        })
        .collect()
}

/// Decodes a `<value>` element. Text without a type element is a string.
fn decode_value(value: &XmlElement) -> Result<Value, XmlRpcError> {
    let mut typed = value.elements();
    let Some(inner) = typed.next() else {
        return Ok(Value::String(value.text()));
    };
    if typed.next().is_some() {
        return Err(XmlRpcError::AmbiguousValue);
    }

    match inner.name.as_str() {
        "int" | "i4" | "i8" => {
            let text = inner.text();
            text.trim()
                .parse()
                .map(Value::Int)
                .map_err(|_| XmlRpcError::InvalidScalar { kind: "int", text })
        }
        "boolean" => match inner.text().trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(XmlRpcError::InvalidScalar {
                kind: "boolean",
                text: other.to_string(),
            }),
        },
        "string" => Ok(Value::String(inner.text())),
        "double" => {
            let text = inner.text();
            text.trim()
                .parse()
                .map(Value::Double)
                .map_err(|_| XmlRpcError::InvalidScalar { kind: "double", text })
        }
        "dateTime.iso8601" => Ok(Value::DateTime(inner.text().trim().to_string())),
        "base64" => {
            let text: String = inner.text().split_whitespace().collect();
            base64::engine::general_purpose::STANDARD
                .decode(text.as_bytes())
                .map(Value::Base64)
                .map_err(|_| XmlRpcError::InvalidScalar { kind: "base64", text })
        }
        "nil" | "ex:nil" => Ok(Value::Nil),
        "array" => {
            let data = inner.child("data").ok_or(XmlRpcError::Missing("data"))?;
            data.children_named("value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = BTreeMap::new();
            for member in inner.children_named("member") {
                let name = member
                    .child("name")
                    .ok_or(XmlRpcError::Missing("name"))?
                    .text();
                let value = member.child("value").ok_or(XmlRpcError::Missing("value"))?;
                members.insert(name, decode_value(value)?);
            }
            Ok(Value::Struct(members))
        }
        other => Err(XmlRpcError::UnsupportedType(other.to_string())),
    }
}

fn expect_name(element: &XmlElement, expected: &'static str) -> Result<(), XmlRpcError> {
    if element.name == expected {
        Ok(())
    } else {
        Err(XmlRpcError::UnexpectedElement {
            expected,
            found: element.name.clone(),
        })
    }
}
