use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

use crate::ir::ScalarKind;

/// Optionally signed run of ASCII digits.
static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer literal pattern is valid"));

pub fn is_integer_literal(s: &str) -> bool {
    INTEGER_LITERAL.is_match(s)
}

/// `"42"` → `42`, `"42.5"` → `42.5`, anything else → `None`.
/// Integer literals too wide for 64 bits are read as floats.
pub fn parse_number_literal(s: &str) -> Option<Value> {
    if is_integer_literal(s) {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Value::from(i));
        }
        if let Ok(u) = s.parse::<u64>() {
            return Some(Value::from(u));
        }
    }
    // NaN and infinities parse but have no JSON form
    s.trim().parse::<f64>().ok().and_then(Number::from_f64).map(Value::Number)
}

/// Case-insensitive `true` / `false`.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// String normalization for a scalar declaration:
/// - numeric declarations parse numeric strings
/// - boolean declarations parse `true`/`false`
/// - string declarations stringify numbers and booleans
///
/// Unparseable input is returned unchanged for the type check to reject.
pub fn normalize_string(declared: ScalarKind, value: Value) -> Value {
    match (declared, value) {
        (ScalarKind::Integer | ScalarKind::Float, Value::String(s)) => {
            parse_number_literal(&s).unwrap_or(Value::String(s))
        }
        (ScalarKind::Boolean, Value::String(s)) => {
            parse_bool_literal(&s).map(Value::Bool).unwrap_or(Value::String(s))
        }
        (ScalarKind::String, Value::Number(n)) => Value::String(n.to_string()),
        (ScalarKind::String, Value::Bool(b)) => Value::String(b.to_string()),
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_literals() {
        assert!(is_integer_literal("42"));
        assert!(is_integer_literal("-7"));
        assert!(is_integer_literal("+0012"));
        assert!(!is_integer_literal("--5"));
        assert!(!is_integer_literal("4.0"));
        assert!(!is_integer_literal(""));
    }

    #[test]
    fn number_literals() {
        assert_eq!(parse_number_literal("42"), Some(json!(42)));
        assert_eq!(parse_number_literal("+42"), Some(json!(42)));
        assert_eq!(parse_number_literal("42.5"), Some(json!(42.5)));
        assert_eq!(parse_number_literal("1e3"), Some(json!(1000.0)));
        assert_eq!(parse_number_literal("18446744073709551615"), Some(json!(u64::MAX)));
        assert_eq!(parse_number_literal("abc"), None);
        assert_eq!(parse_number_literal("NaN"), None);
    }

    #[test]
    fn bool_literals() {
        assert_eq!(parse_bool_literal("True"), Some(true));
        assert_eq!(parse_bool_literal("FALSE"), Some(false));
        assert_eq!(parse_bool_literal("yes"), None);
    }

    #[test]
    fn normalization_by_declared_kind() {
        assert_eq!(normalize_string(ScalarKind::Integer, json!("42")), json!(42));
        assert_eq!(normalize_string(ScalarKind::Integer, json!("42.5")), json!(42.5));
        assert_eq!(normalize_string(ScalarKind::Integer, json!("abc")), json!("abc"));
        assert_eq!(normalize_string(ScalarKind::Boolean, json!("false")), json!(false));
        assert_eq!(normalize_string(ScalarKind::Boolean, json!("yes")), json!("yes"));
        assert_eq!(normalize_string(ScalarKind::String, json!(12)), json!("12"));
        assert_eq!(normalize_string(ScalarKind::String, json!(true)), json!("true"));
        assert_eq!(normalize_string(ScalarKind::String, json!("007")), json!("007"));
        assert_eq!(normalize_string(ScalarKind::String, json!(null)), json!(null));
    }
}
