//! Register and context extension maps
//!
//! Turns explicitly typed entries (usually read from a JSON job description)
//! into the hex strings that go into `additionalRegisters` and `extension`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sigma::{encode_hex, RegisterCodecError, RegisterId, TypedValue};

/// Declared type of a register entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Int,
    Long,
    /// UTF-8 text
    String,
    /// Hex-encoded raw bytes
    Bytes,
    #[serde(rename = "JSON")]
    Json,
}

/// One register assignment, e.g. `{"register": "R4", "type": "Int", "value": 12345}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterEntry {
    pub register: String,
    #[serde(rename = "type")]
    pub kind: ValueKind,
    pub value: Value,
}

impl RegisterEntry {
    pub fn new(register: impl Into<String>, kind: ValueKind, value: Value) -> Self {
        Self {
            register: register.into(),
            kind,
            value,
        }
    }
}

impl TypedValue {
    /// Build a typed value from a JSON value and its declared kind.
    ///
    /// Int and Long accept JSON numbers or decimal strings (for values beyond
    /// what JSON numbers carry reliably).
    pub fn from_json(kind: ValueKind, value: &Value) -> Result<Self, RegisterCodecError> {
        match kind {
            ValueKind::Boolean => value
                .as_bool()
                .map(TypedValue::Boolean)
                .ok_or_else(|| mismatch("boolean", value)),
            ValueKind::Int => TypedValue::try_int(json_integer(value, "Int")?.try_into().map_err(
                |_| RegisterCodecError::ValueOutOfRange {
                    kind: "Int",
                    value: value.to_string(),
                },
            )?),
            ValueKind::Long => TypedValue::try_long(json_integer(value, "Long")?),
            ValueKind::String => value
                .as_str()
                .map(TypedValue::string)
                .ok_or_else(|| mismatch("string", value)),
            ValueKind::Bytes => match value.as_str() {
                Some(s) => TypedValue::from_hex_bytes(s),
                None => Err(mismatch("hex string", value)),
            },
            // A string is taken as JSON text already
            ValueKind::Json => Ok(match value {
                Value::String(s) => TypedValue::Json(s.as_bytes().to_vec()),
                other => TypedValue::json(other),
            }),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> RegisterCodecError {
    RegisterCodecError::TypeMismatch {
        expected,
        found: found.to_string(),
    }
}

fn json_integer(value: &Value, kind: &'static str) -> Result<i128, RegisterCodecError> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i as i128)
            } else if let Some(u) = n.as_u64() {
                Ok(u as i128)
            } else {
                Err(RegisterCodecError::ValueOutOfRange {
                    kind,
                    value: n.to_string(),
                })
            }
        }
        Value::String(s) => s.trim().parse::<i128>().map_err(|_| mismatch("integer", value)),
        other => Err(mismatch("integer", other)),
    }
}

// =============================================================================
// Register maps
// =============================================================================

/// A register entry that could not be encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFailure {
    pub register: String,
    pub error: RegisterCodecError,
}

/// Outcome of encoding a list of register entries
#[derive(Debug, Clone, Default)]
pub struct RegisterMapReport {
    pub registers: BTreeMap<RegisterId, String>,
    pub failed: Vec<RegisterFailure>,
}

impl RegisterMapReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Check the encoded registers leave no gap above R4
    pub fn ensure_dense(&self) -> Result<(), RegisterCodecError> {
        ensure_dense(self.registers.keys().copied())
    }

    /// Registers keyed by name, or the first failure
    pub fn into_result(self) -> Result<HashMap<String, String>, RegisterCodecError> {
        if let Some(failure) = self.failed.into_iter().next() {
            return Err(failure.error);
        }
        Ok(self
            .registers
            .into_iter()
            .map(|(id, hex)| (id.to_string(), hex))
            .collect())
    }
}

/// Encode every entry, recording failures per register instead of stopping
/// at the first one.
pub fn build_register_map(entries: &[RegisterEntry]) -> RegisterMapReport {
    let mut report = RegisterMapReport::default();

    for entry in entries {
        let encoded = entry
            .register
            .parse::<RegisterId>()
            .and_then(|id| {
                if report.registers.contains_key(&id) {
                    return Err(RegisterCodecError::DuplicateRegister(id));
                }
                let value = TypedValue::from_json(entry.kind, &entry.value)?;
                Ok((id, encode_hex(&value)?))
            });

        match encoded {
            Ok((id, hex)) => {
                report.registers.insert(id, hex);
            }
            Err(error) => {
                tracing::warn!("Register {} could not be encoded: {}", entry.register, error);
                report.failed.push(RegisterFailure {
                    register: entry.register.clone(),
                    error,
                });
            }
        }
    }

    report
}

/// Registers must be filled contiguously starting at R4
pub fn ensure_dense(ids: impl IntoIterator<Item = RegisterId>) -> Result<(), RegisterCodecError> {
    let mut present = [false; 6];
    for id in ids {
        present[id as usize] = true;
    }
    let mut first_missing = None;
    for (idx, id) in RegisterId::ALL.into_iter().enumerate() {
        match (present[idx], first_missing) {
            (false, None) => first_missing = Some(id),
            (true, Some(missing)) => {
                return Err(RegisterCodecError::RegisterGap {
                    missing,
                    present: id,
                })
            }
            _ => {}
        }
    }
    Ok(())
}

// =============================================================================
// Context extensions
// =============================================================================

/// Build a context extension map (variable id -> hex value)
pub fn build_extension_map(
    entries: &[(u8, TypedValue)],
) -> Result<HashMap<String, String>, RegisterCodecError> {
    let mut map = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        let hex = encode_hex(value)?;
        if map.insert(key.to_string(), hex).is_some() {
            return Err(RegisterCodecError::DuplicateExtensionKey(*key));
        }
    }
    Ok(map)
}
