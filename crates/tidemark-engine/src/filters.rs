//! Kubernetes-oriented template filters

use base64::Engine as _;
use minijinja::value::ValueKind;
use minijinja::{Error, ErrorKind, Value};
use sha2::{Digest, Sha256};

/// Convert a value to YAML format
///
/// Usage: {{ values.config | toyaml }}
pub fn toyaml(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    let yaml = serde_yaml::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    // Remove trailing newline and leading "---\n" if present
    let yaml = yaml.trim_start_matches("---\n").trim_end();

    Ok(yaml.to_string())
}

/// Convert a value to JSON format
///
/// Usage: {{ values.config | tojson }}
pub fn tojson(value: Value) -> Result<String, Error> {
    let json_value: serde_json::Value = serde_json::to_value(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;

    serde_json::to_string(&json_value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
}

#[must_use]
pub fn b64encode(value: String) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

pub fn b64decode(value: String) -> Result<String, Error> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(value.as_bytes())
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("base64 decode error: {}", e)))?;

    String::from_utf8(decoded)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("UTF-8 decode error: {}", e)))
}

/// Quote a string with double quotes
///
/// Usage: {{ name | quote }}
#[must_use]
pub fn quote(value: Value) -> String {
    let s = match value.as_str() {
        Some(str_val) => str_val.to_string(),
        None => value.to_string(),
    };
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Indent text with a newline prefix
///
/// Usage: {{ content | nindent(4) }}
#[must_use]
pub fn nindent(value: String, spaces: usize) -> String {
    format!("\n{}", indent(value, spaces))
}

/// Indent every non-empty line
///
/// Usage: {{ content | indent(4) }}
#[must_use]
pub fn indent(value: String, spaces: usize) -> String {
    let prefix = " ".repeat(spaces);
    value
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Require a value, fail if undefined, none or an empty string
///
/// Usage: {{ values.image | required("image is required") }}
pub fn required(value: Value, message: Option<String>) -> Result<Value, Error> {
    // zero and false pass
    let missing = value.is_undefined() || value.is_none() || value.as_str() == Some("");
    if missing {
        let msg = message.unwrap_or_else(|| "required value is missing".to_string());
        Err(Error::new(ErrorKind::InvalidOperation, msg))
    } else {
        Ok(value)
    }
}

/// Check if a value is empty
///
/// Usage: {% if values.hosts | empty %}
pub fn empty(value: Value) -> bool {
    is_empty_value(&value)
}

/// Hex-encoded SHA-256 digest
///
/// Usage: {{ values.config | tojson | sha256 }}
#[must_use]
pub fn sha256sum(value: String) -> String {
    Sha256::digest(value.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Undefined, none, `false`, zero, empty strings and empty containers are empty
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value.kind() {
        ValueKind::Undefined | ValueKind::None => true,
        ValueKind::Bool | ValueKind::Number => !value.is_true(),
        ValueKind::String => value.as_str().is_some_and(str::is_empty),
        _ => value.len() == Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toyaml() {
        let value = Value::from_serialize(serde_json::json!({"a": 1, "b": ["x"]}));
        assert_eq!(toyaml(value).unwrap(), "a: 1\nb:\n- x");
    }

    #[test]
    fn test_tojson() {
        let value = Value::from_serialize(serde_json::json!({"a": true}));
        assert_eq!(tojson(value).unwrap(), r#"{"a":true}"#);
    }

    #[test]
    fn test_b64_roundtrip() {
        assert_eq!(b64encode("hello".to_string()), "aGVsbG8=");
        assert_eq!(b64decode("aGVsbG8=".to_string()).unwrap(), "hello");
        assert!(b64decode("%%%".to_string()).is_err());
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(Value::from("a\"b")), r#""a\"b""#);
        assert_eq!(quote(Value::from(42)), "\"42\"");
    }

    #[test]
    fn test_indent() {
        assert_eq!(indent("a\n\nb".to_string(), 2), "  a\n\n  b");
        assert_eq!(nindent("a".to_string(), 4), "\n    a");
    }

    #[test]
    fn test_required() {
        assert!(required(Value::UNDEFINED, None).is_err());
        assert!(required(Value::from(""), Some("need it".to_string())).is_err());
        assert_eq!(required(Value::from("x"), None).unwrap(), Value::from("x"));
        assert_eq!(required(Value::from(0), None).unwrap(), Value::from(0));
    }

    #[test]
    fn test_empty() {
        assert!(empty(Value::UNDEFINED));
        assert!(empty(Value::from(Vec::<Value>::new())));
        assert!(empty(Value::from("")));
        assert!(empty(Value::from(0)));
        assert!(empty(Value::from(0.0)));
        assert!(empty(Value::from(false)));
        assert!(!empty(Value::from(1)));
        assert!(!empty(Value::from(true)));
        assert!(!empty(Value::from("x")));
    }

    #[test]
    fn test_sha256sum() {
        assert_eq!(
            sha256sum("abc".to_string()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
