//! Hex wire encoding for big integers.

use crate::errors::ZkpError;
use num_bigint::BigUint;

/// Parse a hex string (optional `0x` prefix) into a `BigUint`.
pub fn biguint_from_hex(s: &str) -> Result<BigUint, ZkpError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ZkpError::InvalidEncoding("empty hex integer".into()));
    }
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| ZkpError::InvalidEncoding(format!("not a hex integer: {digits}")))
}

/// Lower-case hex without prefix.
pub fn biguint_to_hex(value: &BigUint) -> String {
    value.to_str_radix(16)
}

/// `#[serde(with = "...")]` adapter writing a `BigUint` as a hex string.
pub mod hex_biguint {
    use num_bigint::BigUint;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    #[allow(missing_docs)]
    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::biguint_to_hex(value))
    }

    #[allow(missing_docs)]
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::biguint_from_hex(&s).map_err(D::Error::custom)
    }
}
