//! Raw JSON coercion
//!
//! Non-numeric, NaN and infinite inputs become zero. Used only by the
//! product normalization boundary and the stock map decoder.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Any JSON value as a finite number (garbage → 0)
pub fn number(value: Option<&Value>) -> f64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if n.is_finite() { n } else { 0.0 }
}

/// Stock quantity: floored, never negative
pub fn quantity(value: Option<&Value>) -> u32 {
    let n = number(value);
    if n <= 0.0 {
        0
    } else if n >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        n.floor() as u32
    }
}

/// Monetary amount (garbage → 0)
pub fn decimal(value: Option<&Value>) -> Decimal {
    let text = match value {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        _ => return Decimal::ZERO,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .unwrap_or(Decimal::ZERO)
}

/// Text field; numbers are stringified, everything else is empty
pub fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Optional text: empty becomes `None`
pub fn non_empty(value: Option<&Value>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// First of `keys` present with a non-null value
pub fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|key| raw.get(*key)).find(|v| !v.is_null())
}

pub fn boolean(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_skips_missing_and_null() {
        let raw = json!({"a": null, "b": 2, "c": 3});
        assert_eq!(field(&raw, &["a", "b", "c"]), Some(&json!(2)));
        assert_eq!(field(&raw, &["x", "c"]), Some(&json!(3)));
        assert_eq!(field(&raw, &["a", "x"]), None);
    }

    #[test]
    fn test_number_garbage_is_zero() {
        assert_eq!(number(Some(&json!("abc"))), 0.0);
        assert_eq!(number(Some(&json!(null))), 0.0);
        assert_eq!(number(None), 0.0);
        assert_eq!(number(Some(&json!({"a": 1}))), 0.0);
        assert_eq!(number(Some(&json!("NaN"))), 0.0);
        assert_eq!(number(Some(&json!(" 12.5 "))), 12.5);
    }

    #[test]
    fn test_quantity_never_negative() {
        assert_eq!(quantity(Some(&json!(-4))), 0);
        assert_eq!(quantity(Some(&json!(3.9))), 3);
        assert_eq!(quantity(Some(&json!("7"))), 7);
        assert_eq!(quantity(Some(&json!(1e12))), u32::MAX);
    }

    #[test]
    fn test_decimal() {
        assert_eq!(decimal(Some(&json!(4.5))), Decimal::new(45, 1));
        assert_eq!(decimal(Some(&json!("12.30"))), Decimal::new(1230, 2));
        assert_eq!(decimal(Some(&json!("free"))), Decimal::ZERO);
        assert_eq!(decimal(None), Decimal::ZERO);
    }

    #[test]
    fn test_text_and_boolean() {
        assert_eq!(text(Some(&json!(42))), "42");
        assert_eq!(text(Some(&json!(true))), "");
        assert_eq!(non_empty(Some(&json!("  "))), None);
        assert!(boolean(Some(&json!("TRUE"))));
        assert!(!boolean(Some(&json!(0))));
    }
}
