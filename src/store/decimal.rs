// =============================================================================
// Float → fixed-decimal coercion at the store boundary (§4.1, §9)
// =============================================================================
//
// All in-memory math stays `f64` (indicators, validation, exit engine). Only
// at the moment a record crosses into the store does it get coerced to
// `rust_decimal::Decimal`, so the store never silently accumulates binary
// floating-point drift across writes.
// =============================================================================

use rust_decimal::prelude::*;
use serde_json::Value;

/// Coerce every JSON number in `value` to a string-encoded decimal,
/// recursively, leaving strings/bools/null/objects/arrays structurally
/// unchanged. Mirrors the Store Gateway's "every float is written as a
/// fixed-point decimal string" requirement.
pub fn coerce_floats_to_decimal(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                match Decimal::from_f64(f) {
                    Some(d) => Value::String(d.normalize().to_string()),
                    None => Value::Number(n),
                }
            } else {
                Value::Number(n)
            }
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(coerce_floats_to_decimal).collect())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, coerce_floats_to_decimal(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Parse a store-encoded decimal string back into `f64` for in-memory use.
/// Falls back to `0.0` on malformed input rather than erroring — the store
/// never holds a non-numeric string in a numeric field.
pub fn decimal_str_to_f64(s: &str) -> f64 {
    Decimal::from_str(s)
        .ok()
        .and_then(|d| d.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_nested_floats() {
        let input = json!({
            "entry_price": 12.345,
            "tags": ["momentum", 1.5],
            "count": 3,
        });
        let out = coerce_floats_to_decimal(input);
        assert_eq!(out["entry_price"], json!("12.345"));
        assert_eq!(out["tags"][1], json!("1.5"));
        assert_eq!(out["count"], json!("3"));
    }

    #[test]
    fn round_trips_through_string() {
        let f = 123.456;
        let d = Decimal::from_f64(f).unwrap();
        let back = decimal_str_to_f64(&d.to_string());
        assert!((back - f).abs() < 1e-9);
    }

    #[test]
    fn malformed_decimal_defaults_to_zero() {
        assert_eq!(decimal_str_to_f64("not-a-number"), 0.0);
    }
}
