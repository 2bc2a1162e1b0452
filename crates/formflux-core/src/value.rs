#![forbid(unsafe_code)]

//! Value-level predicates and serialization shared across the engine.

use serde_json::Value;

/// Truthiness as conditions use it.
///
/// `null` is false, booleans are themselves, numbers are true when non-zero,
/// and strings/arrays/objects are true when non-empty.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// "Filled" as validation rules use it: the user has entered something.
///
/// Differs from truthiness for `false` and `0`, both of which are
/// deliberate entries and therefore filled.
#[must_use]
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Stable string form of a value for interpolation and request parameters.
///
/// Strings render without quotes; everything composite renders as compact
/// JSON so the same tree always produces the same text.
#[must_use]
pub fn stable_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_table() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!(true)));
        assert!(!is_truthy(&json!(0)));
        assert!(is_truthy(&json!(0.5)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("x")));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!([1])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!({"a": 1})));
    }

    #[test]
    fn filled_differs_from_truthy_on_deliberate_entries() {
        assert!(is_filled(&json!(false)));
        assert!(is_filled(&json!(0)));
        assert!(!is_filled(&Value::Null));
        assert!(!is_filled(&json!("")));
        assert!(!is_filled(&json!([])));
    }

    #[test]
    fn stable_string_scalars_unquoted() {
        assert_eq!(stable_string(&json!("abc")), "abc");
        assert_eq!(stable_string(&json!(42)), "42");
        assert_eq!(stable_string(&json!(true)), "true");
        assert_eq!(stable_string(&Value::Null), "");
    }

    #[test]
    fn stable_string_composites_as_json() {
        assert_eq!(stable_string(&json!([1, 2])), "[1,2]");
        assert_eq!(stable_string(&json!({"a": 1})), r#"{"a":1}"#);
    }
}
