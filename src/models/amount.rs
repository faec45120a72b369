/// Serde adapter for arbitrary-precision minor-unit amounts.
///
/// Amounts are written as decimal strings so no consumer ever rounds them
/// through a float. Both strings and JSON integers are accepted on input.
pub mod serde_amount {
    use std::str::FromStr;

    use num_bigint::BigInt;
    use serde::{de, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let text = super::decimal_text(deserializer)?;
        BigInt::from_str(&text).map_err(|e| de::Error::custom(format!("invalid amount {text:?}: {e}")))
    }
}

/// Vendor decimal amounts, as JSON numbers or strings, kept as their exact
/// source text.
///
/// Relies on `serde_json`'s `arbitrary_precision`, so a number is never
/// rounded through `f64` on the way in.
pub fn decimal_text<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::{de, Deserialize};

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::String(s) => Ok(s),
        other => Err(de::Error::custom(format!("expected a decimal amount, got {other}"))),
    }
}
