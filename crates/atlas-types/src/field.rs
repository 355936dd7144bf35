use crate::error::{AtlasError, AtlasResult};
use crate::FIELD_BYTES_SIZE;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// BN254 scalar field modulus, big-endian.
pub const BN254_SCALAR_MODULUS_BE: [u8; FIELD_BYTES_SIZE] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

/// A field element on the wire: 32 bytes, big-endian.
///
/// Holding a `FieldBytes` says nothing about range. Use [`FieldBytes::is_canonical`]
/// or the strict conversion in `atlas-crypto` before trusting the value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FieldBytes(pub [u8; FIELD_BYTES_SIZE]);

impl FieldBytes {
    /// Wrap raw big-endian bytes.
    pub fn from_bytes(bytes: [u8; FIELD_BYTES_SIZE]) -> Self {
        Self(bytes)
    }

    /// Raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; FIELD_BYTES_SIZE] {
        &self.0
    }

    /// All-zero value.
    pub fn zero() -> Self {
        Self([0u8; FIELD_BYTES_SIZE])
    }

    /// Whether the value is strictly below the BN254 scalar modulus.
    pub fn is_canonical(&self) -> bool {
        self.0 < BN254_SCALAR_MODULUS_BE
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse 64 hex digits, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> AtlasResult<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != FIELD_BYTES_SIZE * 2 {
            return Err(AtlasError::Validation(format!(
                "field element must be {} hex digits, got {}",
                FIELD_BYTES_SIZE * 2,
                digits.len()
            )));
        }
        let bytes = hex::decode(digits).map_err(|e| AtlasError::Validation(e.to_string()))?;
        let mut arr = [0u8; FIELD_BYTES_SIZE];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// First bytes as hex, for logs.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Debug for FieldBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldBytes({}...)", self.short_hex())
    }
}

impl fmt::Display for FieldBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for FieldBytes {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for FieldBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldVisitor;

        impl<'de> Visitor<'de> for FieldVisitor {
            type Value = FieldBytes;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 0x-prefixed 32-byte hex string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldBytes, E> {
                FieldBytes::from_hex(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FieldVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_with_and_without_prefix() {
        let mut raw = [0u8; 32];
        raw[31] = 7;
        let value = FieldBytes::from_bytes(raw);

        let hex = value.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(FieldBytes::from_hex(&hex).unwrap(), value);
        assert_eq!(FieldBytes::from_hex(&hex[2..]).unwrap(), value);
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!(FieldBytes::from_hex("0x1234").is_err());
        assert!(FieldBytes::from_hex(&"ab".repeat(33)).is_err());
        assert!(FieldBytes::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn test_canonical_boundary() {
        let modulus = FieldBytes::from_bytes(BN254_SCALAR_MODULUS_BE);
        assert!(!modulus.is_canonical());

        let mut below = BN254_SCALAR_MODULUS_BE;
        below[31] -= 1;
        assert!(FieldBytes::from_bytes(below).is_canonical());

        assert!(!FieldBytes::from_bytes([0xff; 32]).is_canonical());
        assert!(FieldBytes::zero().is_canonical());
    }

    #[test]
    fn test_json_is_hex_string() {
        let value = FieldBytes::from_bytes([0x11; 32]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "11".repeat(32)));

        let back: FieldBytes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_debug_does_not_print_full_value() {
        let value = FieldBytes::from_bytes([0xab; 32]);
        let debug = format!("{:?}", value);
        assert!(debug.len() < 40);
    }
}
