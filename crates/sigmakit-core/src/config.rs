//! Configuration types for sigmakit
//!
//! Built once at startup (defaults or a JSON file) and passed by reference to
//! the planners. Nothing here reads the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_BOX_VALUE_NANO, TX_FEE_NANO};
use crate::errors::{Error, Result};
use crate::NanoErg;

/// What to do with change that is positive but not above the minimum box value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangePolicy {
    /// Refuse to build the transaction
    #[default]
    Reject,
    /// Add the leftover to the miner fee
    AbsorbIntoFee,
}

/// Transaction building parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxConfig {
    /// Miner fee per transaction (nanoERG)
    #[serde(default = "default_fee")]
    pub fee_nano: NanoErg,

    /// Recipients per distribution transaction
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// ERG attached to every recipient output (nanoERG)
    #[serde(default = "default_erg_per_recipient")]
    pub erg_per_recipient: NanoErg,

    /// Handling of sub-minimum change
    #[serde(default)]
    pub change_policy: ChangePolicy,
}

fn default_fee() -> NanoErg {
    TX_FEE_NANO
}

fn default_batch_size() -> usize {
    50
}

fn default_erg_per_recipient() -> NanoErg {
    MIN_BOX_VALUE_NANO
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            fee_nano: default_fee(),
            batch_size: default_batch_size(),
            erg_per_recipient: default_erg_per_recipient(),
            change_policy: ChangePolicy::default(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Transaction building settings
    #[serde(default)]
    pub tx: TxConfig,
}

impl AppConfig {
    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tx.batch_size == 0 {
            return Err(Error::Config("tx.batch_size must be at least 1".into()));
        }
        if self.tx.fee_nano == 0 {
            return Err(Error::Config("tx.fee_nano must be positive".into()));
        }
        if self.tx.erg_per_recipient < MIN_BOX_VALUE_NANO {
            return Err(Error::Config(format!(
                "tx.erg_per_recipient {} is below minimum box value {}",
                self.tx.erg_per_recipient, MIN_BOX_VALUE_NANO
            )));
        }
        Ok(())
    }
}
