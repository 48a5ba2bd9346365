use std::borrow::Cow;
use std::fmt::Write as _;

use base64::Engine as _;
use quick_xml::escape::escape;

use crate::value::Value;

const XML_DECL: &str = "<?xml version=\"1.0\"?>\n";

/// Serializes a successful `<methodResponse>` carrying `value`.
#[must_use]
pub fn encode_response(value: &Value) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str("<methodResponse><params><param>");
    write_value(&mut out, value);
    out.push_str("</param></params></methodResponse>");
    out
}

/// Serializes a `<fault>` response.
#[must_use]
pub fn encode_fault(code: i64, message: &str) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str("<methodResponse><fault><value><struct>");
    out.push_str("<member><name>faultCode</name>");
    write_value(&mut out, &Value::Int(code));
    out.push_str("</member><member><name>faultString</name>");
    write_value(&mut out, &Value::String(message.to_string()));
    out.push_str("</member></struct></value></fault></methodResponse>");
    out
}

/// Serializes a `<methodCall>` request.
#[must_use]
pub fn encode_method_call(method_name: &str, params: &[Value]) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str("<methodCall><methodName>");
    out.push_str(&xml_text(method_name));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

/// Escapes `text` for element content. Characters XML 1.0 cannot carry
/// become U+FFFD.
fn xml_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        return escape(text);
    }
    let cleaned: String = text
        .chars()
        .map(|c| if is_xml_char(c) { c } else { char::REPLACEMENT_CHARACTER })
        .collect();
    Cow::Owned(escape(cleaned.as_str()).into_owned())
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..
    )
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Nil => out.push_str("<nil/>"),
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Int(n) => {
            if i32::try_from(*n).is_ok() {
                let _ = write!(out, "<int>{n}</int>");
            } else {
                let _ = write!(out, "<i8>{n}</i8>");
            }
        }
        Value::Double(d) => {
            let _ = write!(out, "<double>{d}</double>");
        }
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", xml_text(s));
        }
        Value::DateTime(s) => {
            let _ = write!(out, "<dateTime.iso8601>{}</dateTime.iso8601>", xml_text(s));
        }
        Value::Base64(bytes) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            let _ = write!(out, "<base64>{encoded}</base64>");
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                write_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", xml_text(name));
                write_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::xmlrpc::{decode_method_call, decode_method_response, MethodResponse};

    #[test]
    fn response_wraps_single_param() {
        assert_eq!(
            encode_response(&Value::from("ok")),
            "<?xml version=\"1.0\"?>\n<methodResponse><params><param><value><string>ok</string>\
             </value></param></params></methodResponse>"
        );
    }

    #[test]
    fn strings_are_escaped() {
        let xml = encode_response(&Value::from("<a & 'b'>"));
        assert!(xml.contains("<string>&lt;a &amp; &apos;b&apos;&gt;</string>"));
        assert_eq!(
            decode_method_response(xml.as_bytes()).unwrap(),
            MethodResponse::Success(Value::from("<a & 'b'>"))
        );
    }

    #[test]
    fn control_characters_are_replaced() {
        let xml = encode_fault(1, "No keyword with name 'a\u{1}b\u{FFFE}' found.");
        assert!(!xml.contains('\u{1}'));
        assert_eq!(
            decode_method_response(xml.as_bytes()).unwrap(),
            MethodResponse::Fault {
                code: 1,
                message: "No keyword with name 'a\u{FFFD}b\u{FFFD}' found.".to_string()
            }
        );
        let call = encode_method_call("run\u{0}", &[Value::from("tab\tkept")]);
        let decoded = decode_method_call(call.as_bytes()).unwrap();
        assert_eq!(decoded.method_name, "run\u{FFFD}");
        assert_eq!(decoded.params, vec![Value::from("tab\tkept")]);
    }

    #[test]
    fn large_ints_use_i8() {
        let xml = encode_response(&Value::Int(i64::from(i32::MAX) + 1));
        assert!(xml.contains("<i8>2147483648</i8>"));
        assert!(encode_response(&Value::Int(-5)).contains("<int>-5</int>"));
    }

    #[test]
    fn booleans_use_numeric_form() {
        assert!(encode_response(&Value::Bool(true)).contains("<boolean>1</boolean>"));
        assert!(encode_response(&Value::Bool(false)).contains("<boolean>0</boolean>"));
    }

    #[test]
    fn fault_carries_code_and_message() {
        let xml = encode_fault(-32_601, "unknown method 'x'");
        assert_eq!(
            decode_method_response(xml.as_bytes()).unwrap(),
            MethodResponse::Fault {
                code: -32_601,
                message: "unknown method 'x'".to_string()
            }
        );
    }

    #[test]
    fn method_call_preserves_nested_params() {
        let mut members = BTreeMap::new();
        members.insert("name".to_string(), Value::from("vm"));
        members.insert("blob".to_string(), Value::Base64(vec![0, 1, 2]));
        let params = vec![
            Value::from("kw"),
            Value::Array(vec![Value::Int(1), Value::Nil, Value::Double(0.5)]),
            Value::Struct(members),
        ];
        let xml = encode_method_call("run_keyword", &params);
        let decoded = decode_method_call(xml.as_bytes()).unwrap();
        assert_eq!(decoded.method_name, "run_keyword");
        assert_eq!(decoded.params, params);
    }

    proptest::proptest! {
        #[test]
        fn printable_strings_survive_escaping(text in "[ -~]{0,64}") {
            let xml = encode_response(&Value::String(text.clone()));
            proptest::prop_assert_eq!(
                decode_method_response(xml.as_bytes()).unwrap(),
                MethodResponse::Success(Value::String(text))
            );
        }
    }
}
