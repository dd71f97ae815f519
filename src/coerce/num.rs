use serde_json::{Number, Value};

use crate::ir::ScalarKind;

/// Integer → float when a float is declared.
pub fn widen_integer(declared: ScalarKind, value: Value) -> Value {
    match value {
        Value::Number(n) if declared == ScalarKind::Float && !n.is_f64() => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Number(n)),
        other => other,
    }
}

/// Float → integer (truncating) when an integer is declared. Floats outside
/// the `i64` range are left alone.
pub fn truncate_float(declared: ScalarKind, value: Value) -> Value {
    match value {
        Value::Number(n) if declared == ScalarKind::Integer && n.is_f64() => {
            match n.as_f64().map(f64::trunc) {
                Some(t) if t >= i64::MIN as f64 && t < i64::MAX as f64 => Value::from(t as i64),
                _ => Value::Number(n),
            }
        }
        other => other,
    }
}

/// Numeric normalization applied before any string parsing.
pub fn normalize_number(declared: ScalarKind, value: Value) -> Value {
    truncate_float(declared, widen_integer(declared, value))
}
