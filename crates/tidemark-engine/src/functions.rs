//! Template functions (global functions available in templates)

use minijinja::{Error, ErrorKind, Value};

use crate::filters::is_empty_value;

/// Fail with a custom error message
///
/// Usage: {{ fail("Something went wrong") }}
pub fn fail(message: String) -> Result<Value, Error> {
    Err(Error::new(ErrorKind::InvalidOperation, message))
}

/// Return `given` unless it is empty, otherwise `default`
///
/// Usage: {{ optional("latest", values.image.tag) }}
pub fn optional(default: Value, given: Value) -> Value {
    if is_empty_value(&given) { default } else { given }
}

/// Look up property `name` of `holder`, none when absent
///
/// Usage: {{ default("replicas", values) }}
pub fn default(name: String, holder: Value) -> Result<Value, Error> {
    if holder.is_undefined() || holder.is_none() {
        return Ok(Value::from(()));
    }

    match holder.kind() {
        minijinja::value::ValueKind::Map => match holder.get_attr(&name) {
            Ok(v) if !v.is_undefined() => Ok(v),
            _ => Ok(Value::from(())),
        },
        other => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("cannot get value for '{}' from a value of kind {}", name, other),
        )),
    }
}

/// Substring test on strings
///
/// Usage: {% if contains("-prod", context) %}
pub fn contains(search: Value, input: Value) -> Result<bool, Error> {
    let needle = match search.as_str() {
        Some(s) => s.to_string(),
        None => search.to_string(),
    };

    match input.as_str() {
        Some(s) => Ok(s.contains(&needle)),
        None => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("contains only supports strings but got {}", input.kind()),
        )),
    }
}

/// Usage: {% if empty(values.replicas) %}
pub fn empty(value: Value) -> bool {
    is_empty_value(&value)
}

/// Usage: {% if isNotEmpty(values.hosts) %}
pub fn is_not_empty(value: Value) -> bool {
    !is_empty_value(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail() {
        assert!(fail("nope".to_string()).is_err());
    }

    #[test]
    fn test_optional() {
        assert_eq!(optional(Value::from("d"), Value::UNDEFINED), Value::from("d"));
        assert_eq!(optional(Value::from("d"), Value::from("")), Value::from("d"));
        assert_eq!(optional(Value::from("d"), Value::from("g")), Value::from("g"));
        assert_eq!(optional(Value::from("d"), Value::from(0)), Value::from("d"));
        assert_eq!(optional(Value::from("d"), Value::from(false)), Value::from("d"));
        assert_eq!(optional(Value::from("d"), Value::from(2)), Value::from(2));
    }

    #[test]
    fn test_default_lookup() {
        let holder = Value::from_serialize(serde_json::json!({"replicas": 3}));
        assert_eq!(default("replicas".to_string(), holder.clone()).unwrap(), Value::from(3));
        assert!(default("missing".to_string(), holder).unwrap().is_none());
        assert!(default("x".to_string(), Value::UNDEFINED).unwrap().is_none());
        assert!(default("x".to_string(), Value::from(1)).is_err());
    }

    #[test]
    fn test_contains() {
        assert!(contains(Value::from("prod"), Value::from("eu-prod-1")).unwrap());
        assert!(!contains(Value::from("dev"), Value::from("eu-prod-1")).unwrap());
        assert!(contains(Value::from("x"), Value::from(5)).is_err());
    }

    #[test]
    fn test_is_not_empty() {
        assert!(is_not_empty(Value::from("x")));
        assert!(!is_not_empty(Value::UNDEFINED));
        assert!(!is_not_empty(Value::from(false)));
        assert!(!is_not_empty(Value::from(0)));
        assert!(is_not_empty(Value::from(true)));
    }

    #[test]
    fn test_empty_function() {
        assert!(empty(Value::from("")));
        assert!(empty(Value::from(0.0)));
        assert!(!empty(Value::from(vec![1])));
    }
}
