//! sigmakit-core: Shared types, errors, amounts and configuration
//!
//! This crate provides the foundational types used across the sigmakit workspace.

pub mod amount;
pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
