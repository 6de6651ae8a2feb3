//! Serde encoding for byte strings as `0x`-prefixed hex

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serializer};

/// Encode bytes as a `0x` hex string
pub fn to_hex(data: &[u8]) -> String {
    format!("0x{}", hex::encode(data))
}

/// Decode a `0x`-prefixed hex string
pub fn parse(s: &str) -> Result<Bytes, String> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("invalid hex string {s:?}: missing 0x prefix"))?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| format!("invalid hex string {s:?}: {e}"))
}

/// Serialize bytes as hex
pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_hex(data))
}

/// Deserialize bytes from hex
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
}

/// Same encoding for optional byte strings
pub mod option {
    use super::*;

    /// Serialize `Some` as hex and `None` as null
    pub fn serialize<S: Serializer>(data: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match data {
            Some(d) => super::serialize(d, serializer),
            None => serializer.serialize_none(),
        }
    }

    /// Deserialize optional hex bytes
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| parse(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
