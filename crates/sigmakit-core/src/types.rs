//! Core type definitions for sigmakit

use serde::{Deserialize, Serialize};
use std::fmt;

/// Box ID (32 bytes, hex-encoded)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(pub String);

impl BoxId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BoxId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Token ID (32 bytes, hex-encoded)
///
/// A freshly minted token takes the id of the first input box of the minting
/// transaction, hence the conversion from [`BoxId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(pub String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 characters, for log lines and error messages
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TokenId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&BoxId> for TokenId {
    fn from(id: &BoxId) -> Self {
        Self(id.0.clone())
    }
}

/// Block height
pub type BlockHeight = i32;

/// NanoERG amount (1 ERG = 1_000_000_000 nanoERG)
pub type NanoErg = u64;

/// Constants
pub mod constants {
    use super::NanoErg;

    /// 1 ERG in nanoERG
    pub const NANOERG_PER_ERG: NanoErg = 1_000_000_000;

    /// Standard transaction fee (0.0011 ERG)
    pub const TX_FEE_NANO: NanoErg = 1_100_000;

    /// Minimum box value (0.001 ERG)
    pub const MIN_BOX_VALUE_NANO: NanoErg = 1_000_000;

    /// Maximum length of a single-byte length-prefixed register payload
    pub const MAX_REGISTER_PAYLOAD: usize = 255;

    /// Miner fee ErgoTree (standard P2PK to miner)
    pub const MINER_FEE_ERGO_TREE: &str = "1005040004000e36100204a00b08cd0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798ea02d192a39a8cc7a701730073011001020402d19683030193a38cc7b2a57300000193c2b2a57301007473027303830108cdeeac93b1a57304";
}
