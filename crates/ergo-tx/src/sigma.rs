//! Sigma register encoding/decoding utilities
//!
//! Registers and context extensions carry a type tag followed by a payload:
//!
//! ```text
//! 01 <1 byte>           -- Boolean (01 = true, 00 = false)
//! 04 <4 bytes BE>       -- Int, two's complement
//! 05 <8 bytes BE>       -- Long, two's complement
//! 0c <len:1> <bytes>    -- byte array / UTF-8 string / JSON text
//! ```
//!
//! Numbers are fixed-width big-endian, not VLQ/zigzag, so every encoding is
//! trivially invertible. Byte payloads carry a single length byte and are
//! therefore limited to 255 bytes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sigmakit_core::constants::MAX_REGISTER_PAYLOAD;

pub const TAG_BOOLEAN: u8 = 0x01;
pub const TAG_INT: u8 = 0x04;
pub const TAG_LONG: u8 = 0x05;
pub const TAG_COLL_BYTE: u8 = 0x0c;

// =============================================================================
// Error type
// =============================================================================

/// Errors that can occur while encoding or decoding register values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterCodecError {
    #[error("Unknown type tag: 0x{0:02x}")]
    UnknownTag(u8),

    #[error("Truncated input: need {needed} bytes, have {available}")]
    TruncatedInput { needed: usize, available: usize },

    #[error("{kind} value {value} is out of range")]
    ValueOutOfRange { kind: &'static str, value: String },

    #[error("Payload of {len} bytes exceeds maximum of {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Invalid register ID: {0} (expected R4..R9)")]
    InvalidRegisterId(String),

    #[error("Invalid hex string")]
    InvalidHex,

    #[error("Invalid boolean payload: 0x{0:02x}")]
    InvalidBoolean(u8),

    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: String },

    #[error("Register {0} assigned more than once")]
    DuplicateRegister(RegisterId),

    #[error("Extension key {0} assigned more than once")]
    DuplicateExtensionKey(u8),

    #[error("Register {present} is set but {missing} is empty (registers must be contiguous from R4)")]
    RegisterGap {
        missing: RegisterId,
        present: RegisterId,
    },
}

type Result<T> = std::result::Result<T, RegisterCodecError>;

// =============================================================================
// Register IDs
// =============================================================================

/// Non-mandatory box register (R4..R9)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegisterId {
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
}

impl RegisterId {
    pub const ALL: [RegisterId; 6] = [
        RegisterId::R4,
        RegisterId::R5,
        RegisterId::R6,
        RegisterId::R7,
        RegisterId::R8,
        RegisterId::R9,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::R6 => "R6",
            Self::R7 => "R7",
            Self::R8 => "R8",
            Self::R9 => "R9",
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegisterId {
    type Err = RegisterCodecError;

    fn from_str(s: &str) -> Result<Self> {
        RegisterId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| RegisterCodecError::InvalidRegisterId(s.to_string()))
    }
}

// =============================================================================
// Typed values
// =============================================================================

/// A value that can be stored in a register or context extension.
///
/// `Json` shares the `0c` wire form with `ByteArray`; equality is defined on
/// the wire form, so `Json(b) == ByteArray(b)` and a decoded JSON register
/// compares equal to the value it was encoded from.
#[derive(Debug, Clone)]
pub enum TypedValue {
    Boolean(bool),
    Int(i32),
    Long(i64),
    ByteArray(Vec<u8>),
    Json(Vec<u8>),
}

impl TypedValue {
    /// Int from a wider integer, rejecting values outside i32
    pub fn try_int(value: i64) -> Result<Self> {
        i32::try_from(value)
            .map(Self::Int)
            .map_err(|_| RegisterCodecError::ValueOutOfRange {
                kind: "Int",
                value: value.to_string(),
            })
    }

    /// Long from a wider integer, rejecting values outside i64
    pub fn try_long(value: i128) -> Result<Self> {
        i64::try_from(value)
            .map(Self::Long)
            .map_err(|_| RegisterCodecError::ValueOutOfRange {
                kind: "Long",
                value: value.to_string(),
            })
    }

    /// UTF-8 string stored as a byte array
    pub fn string(s: &str) -> Self {
        Self::ByteArray(s.as_bytes().to_vec())
    }

    /// Compact JSON text of `value`, keys in insertion order
    pub fn json(value: &Value) -> Self {
        Self::Json(value.to_string().into_bytes())
    }

    /// Byte array from a hex string, with or without a `0x` prefix
    pub fn from_hex_bytes(hex_str: &str) -> Result<Self> {
        let digits = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        hex::decode(digits)
            .map(Self::ByteArray)
            .map_err(|_| RegisterCodecError::InvalidHex)
    }

    pub fn tag(&self) -> u8 {
        match self {
            Self::Boolean(_) => TAG_BOOLEAN,
            Self::Int(_) => TAG_INT,
            Self::Long(_) => TAG_LONG,
            Self::ByteArray(_) | Self::Json(_) => TAG_COLL_BYTE,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "Boolean",
            Self::Int(_) => "Int",
            Self::Long(_) => "Long",
            Self::ByteArray(_) => "ByteArray",
            Self::Json(_) => "Json",
        }
    }

    /// Raw bytes of a byte-array or JSON value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::ByteArray(b) | Self::Json(b) => Some(b),
            _ => None,
        }
    }

    /// Parse a byte-array or JSON value as JSON text
    pub fn parse_json(&self) -> Option<Value> {
        self.as_bytes()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::ByteArray(a) | Self::Json(a), Self::ByteArray(b) | Self::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for TypedValue {}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value as tag byte + payload
pub fn encode(value: &TypedValue) -> Result<Vec<u8>> {
    match value {
        TypedValue::Boolean(b) => Ok(vec![TAG_BOOLEAN, u8::from(*b)]),
        TypedValue::Int(v) => {
            let mut bytes = Vec::with_capacity(5);
            bytes.push(TAG_INT);
            bytes.extend_from_slice(&v.to_be_bytes());
            Ok(bytes)
        }
        TypedValue::Long(v) => {
            let mut bytes = Vec::with_capacity(9);
            bytes.push(TAG_LONG);
            bytes.extend_from_slice(&v.to_be_bytes());
            Ok(bytes)
        }
        TypedValue::ByteArray(data) | TypedValue::Json(data) => encode_coll_byte(data),
    }
}

/// Encode a value as a lowercase hex string
pub fn encode_hex(value: &TypedValue) -> Result<String> {
    encode(value).map(hex::encode)
}

/// Encode a value destined for `register_id`.
///
/// The register name is only validated; it is not part of the output.
pub fn encode_for_register(register_id: &str, value: &TypedValue) -> Result<Vec<u8>> {
    register_id.parse::<RegisterId>()?;
    encode(value)
}

/// Serialize a JSON structure as compact text inside a byte array register
pub fn serialize_json(value: &Value) -> Result<Vec<u8>> {
    encode(&TypedValue::json(value))
}

fn encode_coll_byte(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() > MAX_REGISTER_PAYLOAD {
        return Err(RegisterCodecError::PayloadTooLarge {
            len: data.len(),
            max: MAX_REGISTER_PAYLOAD,
        });
    }
    let mut bytes = Vec::with_capacity(2 + data.len());
    bytes.push(TAG_COLL_BYTE);
    bytes.push(data.len() as u8);
    bytes.extend_from_slice(data);
    Ok(bytes)
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a value from tag byte + payload. The input must hold exactly one value.
pub fn decode(bytes: &[u8]) -> Result<TypedValue> {
    let (&tag, payload) = bytes
        .split_first()
        .ok_or(RegisterCodecError::TruncatedInput {
            needed: 1,
            available: 0,
        })?;

    let (value, consumed) = match tag {
        TAG_BOOLEAN => {
            let [b] = read_array::<1>(payload)?;
            let value = match b {
                0x00 => false,
                0x01 => true,
                other => return Err(RegisterCodecError::InvalidBoolean(other)),
            };
            (TypedValue::Boolean(value), 1)
        }
        TAG_INT => (TypedValue::Int(i32::from_be_bytes(read_array(payload)?)), 4),
        TAG_LONG => (TypedValue::Long(i64::from_be_bytes(read_array(payload)?)), 8),
        TAG_COLL_BYTE => {
            let [len] = read_array::<1>(payload)?;
            let len = len as usize;
            let data = payload[1..]
                .get(..len)
                .ok_or(RegisterCodecError::TruncatedInput {
                    needed: len,
                    available: payload.len() - 1,
                })?;
            (TypedValue::ByteArray(data.to_vec()), 1 + len)
        }
        other => return Err(RegisterCodecError::UnknownTag(other)),
    };

    if payload.len() > consumed {
        return Err(RegisterCodecError::TrailingBytes(payload.len() - consumed));
    }

    Ok(value)
}

/// Decode a value from a hex string
pub fn decode_hex(hex_str: &str) -> Result<TypedValue> {
    let bytes = hex::decode(hex_str).map_err(|_| RegisterCodecError::InvalidHex)?;
    decode(&bytes)
}

/// Whether `hex_str` holds exactly one well-formed register value
pub fn is_well_formed(hex_str: &str) -> bool {
    decode_hex(hex_str).is_ok()
}

fn read_array<const N: usize>(payload: &[u8]) -> Result<[u8; N]> {
    payload
        .get(..N)
        .and_then(|s| s.try_into().ok())
        .ok_or(RegisterCodecError::TruncatedInput {
            needed: N,
            available: payload.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_boolean() {
        assert_eq!(encode_hex(&TypedValue::Boolean(true)).unwrap(), "0101");
        assert_eq!(encode_hex(&TypedValue::Boolean(false)).unwrap(), "0100");
    }

    #[test]
    fn test_encode_int() {
        assert_eq!(encode_hex(&TypedValue::Int(12345)).unwrap(), "0400003039");
        assert_eq!(encode_hex(&TypedValue::Int(-1)).unwrap(), "04ffffffff");
        assert_eq!(encode_hex(&TypedValue::Int(0)).unwrap(), "0400000000");
    }

    #[test]
    fn test_encode_long() {
        assert_eq!(
            encode_hex(&TypedValue::Long(1_000_000_000)).unwrap(),
            "05000000003b9aca00"
        );
        assert_eq!(
            encode_hex(&TypedValue::Long(i64::MIN)).unwrap(),
            "058000000000000000"
        );
    }

    #[test]
    fn test_encode_string() {
        assert_eq!(
            encode_hex(&TypedValue::string("Hello")).unwrap(),
            "0c0548656c6c6f"
        );
        assert_eq!(encode_hex(&TypedValue::ByteArray(vec![])).unwrap(), "0c00");
    }

    #[test]
    fn test_from_hex_bytes() {
        let value = TypedValue::from_hex_bytes("0xdeadbeef").unwrap();
        assert_eq!(encode_hex(&value).unwrap(), "0c04deadbeef");
        assert_eq!(
            TypedValue::from_hex_bytes("zz"),
            Err(RegisterCodecError::InvalidHex)
        );
    }

    #[test]
    fn test_int_bounds() {
        assert_eq!(
            TypedValue::try_int(i32::MAX as i64).unwrap(),
            TypedValue::Int(2_147_483_647)
        );
        assert!(encode(&TypedValue::try_int(2_147_483_647).unwrap()).is_ok());
        assert!(matches!(
            TypedValue::try_int(1 << 31),
            Err(RegisterCodecError::ValueOutOfRange { kind: "Int", .. })
        ));
        assert!(TypedValue::try_int(-(1 << 31)).is_ok());
        assert!(TypedValue::try_int(-(1 << 31) - 1).is_err());
    }

    #[test]
    fn test_long_bounds() {
        assert!(TypedValue::try_long(i64::MAX as i128).is_ok());
        assert!(matches!(
            TypedValue::try_long(i64::MAX as i128 + 1),
            Err(RegisterCodecError::ValueOutOfRange { kind: "Long", .. })
        ));
    }

    #[test]
    fn test_payload_size_limit() {
        let max = TypedValue::ByteArray(vec![0xAB; 255]);
        let encoded = encode(&max).unwrap();
        assert_eq!(encoded.len(), 257);
        assert_eq!(encoded[1], 0xff);

        let too_big = TypedValue::ByteArray(vec![0xAB; 256]);
        assert_eq!(
            encode(&too_big),
            Err(RegisterCodecError::PayloadTooLarge { len: 256, max: 255 })
        );
    }

    #[test]
    fn test_roundtrip() {
        let values = [
            TypedValue::Boolean(true),
            TypedValue::Boolean(false),
            TypedValue::Int(0),
            TypedValue::Int(i32::MIN),
            TypedValue::Int(i32::MAX),
            TypedValue::Long(-1),
            TypedValue::Long(i64::MAX),
            TypedValue::ByteArray(vec![]),
            TypedValue::ByteArray(vec![0x00, 0xff, 0x10]),
            TypedValue::string("Hello, Ergo!"),
            TypedValue::json(&json!({"name": "Alice", "age": 30})),
        ];

        for value in values {
            let encoded = encode(&value).unwrap();
            let decoded = decode(&encoded).unwrap();
            assert_eq!(decoded, value, "Failed roundtrip for {:?}", value);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let value = TypedValue::json(&json!({"b": 1, "a": [true, null]}));
        assert_eq!(encode(&value).unwrap(), encode(&value).unwrap());
    }

    #[test]
    fn test_serialize_json_preserves_key_order() {
        let value = json!({"name": "Alice", "age": 30, "active": true});
        let encoded = serialize_json(&value).unwrap();
        let text = r#"{"name":"Alice","age":30,"active":true}"#;
        assert_eq!(encoded[0], TAG_COLL_BYTE);
        assert_eq!(encoded[1] as usize, text.len());
        assert_eq!(&encoded[2..], text.as_bytes());

        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.parse_json().unwrap(), value);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode(&[]),
            Err(RegisterCodecError::TruncatedInput {
                needed: 1,
                available: 0
            })
        );
        assert_eq!(decode(&[0x02, 0x00]), Err(RegisterCodecError::UnknownTag(0x02)));
        assert_eq!(
            decode(&[TAG_INT, 0x00, 0x01]),
            Err(RegisterCodecError::TruncatedInput {
                needed: 4,
                available: 2
            })
        );
        assert_eq!(
            decode(&[TAG_COLL_BYTE, 0x05, b'a', b'b']),
            Err(RegisterCodecError::TruncatedInput {
                needed: 5,
                available: 2
            })
        );
        assert!(matches!(
            decode(&[TAG_COLL_BYTE]),
            Err(RegisterCodecError::TruncatedInput { .. })
        ));
        assert_eq!(
            decode(&[TAG_BOOLEAN, 0x02]),
            Err(RegisterCodecError::InvalidBoolean(0x02))
        );
        assert_eq!(
            decode(&[TAG_BOOLEAN, 0x01, 0x00]),
            Err(RegisterCodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("0400003039").unwrap(), TypedValue::Int(12345));
        assert_eq!(decode_hex("xyz"), Err(RegisterCodecError::InvalidHex));
        assert!(is_well_formed("0c0548656c6c6f"));
        assert!(!is_well_formed("01"));
        assert!(!is_well_formed("invalid"));
    }

    #[test]
    fn test_encode_for_register() {
        let value = TypedValue::Int(1);
        assert_eq!(
            encode_for_register("R4", &value).unwrap(),
            vec![TAG_INT, 0, 0, 0, 1]
        );
        assert_eq!(
            encode_for_register("R10", &value),
            Err(RegisterCodecError::InvalidRegisterId("R10".to_string()))
        );
        assert!(encode_for_register("R3", &value).is_err());
        assert!(encode_for_register("r4", &value).is_err());
        assert!(encode_for_register("R9", &value).is_ok());
    }

    #[test]
    fn test_register_id_parse_display() {
        for id in RegisterId::ALL {
            assert_eq!(id.as_str().parse::<RegisterId>().unwrap(), id);
            assert_eq!(id.to_string(), id.as_str());
        }
    }

    #[test]
    fn test_json_equals_byte_array_on_wire() {
        let json_value = TypedValue::json(&json!([1, 2]));
        assert_eq!(json_value, TypedValue::string("[1,2]"));
        assert_ne!(TypedValue::Int(1), TypedValue::Long(1));
    }
}
