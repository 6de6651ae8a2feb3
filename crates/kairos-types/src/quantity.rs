//! Serde encoding for 256-bit quantities.
//!
//! Quantities are always written as `0x`-prefixed hex strings so values
//! wider than 53 bits survive any JSON consumer. On input a hex string, a
//! decimal string, a JSON integer or a `{"__type": "bigint", "value": "..."}`
//! object are accepted.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Fees {
//!     #[serde(with = "kairos_types::quantity")]
//!     max_fee_per_gas: U256,
//! }
//! ```

use std::fmt;

use kairos_primitives::U256;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serializer};

/// Format a quantity as a minimal `0x` hex string
pub fn to_hex(value: &U256) -> String {
    format!("{value:#x}")
}

/// Parse a quantity from a hex (`0x`-prefixed) or decimal string
pub fn parse(s: &str) -> Result<U256, String> {
    let s = s.trim();
    if let Some(digits) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if digits.is_empty() {
            return Err("empty hex quantity".to_string());
        }
        U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity {s}: {e:?}"))
    } else {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("invalid decimal quantity: {s:?}"));
        }
        U256::from_dec_str(s).map_err(|e| format!("invalid decimal quantity {s}: {e:?}"))
    }
}

/// Serialize a quantity as a hex string
pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(value))
}

/// Deserialize a quantity from any accepted representation
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    deserializer.deserialize_any(QuantityVisitor)
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex string, decimal string, unsigned integer or bigint object")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
        Ok(U256::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
        u64::try_from(v)
            .map(U256::from)
            .map_err(|_| E::custom(format!("negative quantity: {v}")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<U256, E> {
        Err(E::custom(format!(
            "quantity {v} is not an exact integer; send it as a string"
        )))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
        parse(v).map_err(E::custom)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<U256, A::Error> {
        let mut tag: Option<String> = None;
        let mut value: Option<String> = None;
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "__type" => tag = Some(map.next_value()?),
                "value" => value = Some(map.next_value()?),
                other => return Err(de::Error::unknown_field(other, &["__type", "value"])),
            }
        }
        match (tag.as_deref(), value) {
            (Some("bigint"), Some(value)) => parse(&value).map_err(de::Error::custom),
            _ => Err(de::Error::custom(
                "expected {\"__type\": \"bigint\", \"value\": ...}",
            )),
        }
    }
}

/// Same encoding for optional quantities
pub mod option {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapped(#[serde(with = "super")] U256);

    /// Serialize `Some` as a hex string and `None` as null
    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => super::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize an optional quantity
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|Wrapped(v)| v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "crate::quantity")]
        value: U256,
        #[serde(default, with = "crate::quantity::option")]
        extra: Option<U256>,
    }

    #[test]
    fn test_parse_hex_and_decimal() {
        assert_eq!(parse("0x10").unwrap(), U256::from(16));
        assert_eq!(parse("16").unwrap(), U256::from(16));
        assert!(parse("0x").is_err());
        assert!(parse("").is_err());
        assert!(parse("-1").is_err());
        assert!(parse("0xzz").is_err());
    }

    #[test]
    fn test_serialize_as_hex() {
        let holder = Holder {
            value: U256::from(255),
            extra: None,
        };
        let json = serde_json::to_string(&holder).unwrap();
        assert_eq!(json, r#"{"value":"0xff","extra":null}"#);
        assert_eq!(to_hex(&U256::zero()), "0x0");
    }

    #[test]
    fn test_accepts_all_representations() {
        let from_number: Holder = serde_json::from_str(r#"{"value": 21000}"#).unwrap();
        let from_hex: Holder = serde_json::from_str(r#"{"value": "0x5208"}"#).unwrap();
        let from_dec: Holder = serde_json::from_str(r#"{"value": "21000"}"#).unwrap();
        let from_tagged: Holder =
            serde_json::from_str(r#"{"value": {"__type": "bigint", "value": "21000"}}"#).unwrap();
        for holder in [from_number, from_hex, from_dec, from_tagged] {
            assert_eq!(holder.value, U256::from(21000));
            assert_eq!(holder.extra, None);
        }
    }

    #[test]
    fn test_wide_values_round_trip_exactly() {
        // 2^200 + 1 is far beyond what a double can hold
        let wide = (U256::one() << 200) + U256::one();
        let holder = Holder {
            value: wide,
            extra: Some(U256::MAX),
        };
        let json = serde_json::to_string(&holder).unwrap();
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back, holder);
    }

    #[test]
    fn test_rejects_floats_and_negatives() {
        assert!(serde_json::from_str::<Holder>(r#"{"value": 1.5}"#).is_err());
        assert!(serde_json::from_str::<Holder>(r#"{"value": -3}"#).is_err());
    }
}
