//! EIP-24 royalties
//!
//! Royalty shares are held in basis points (1/100 of a percent) so that
//! splitting a sale price stays in integer nanoERG.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use sigmakit_core::NanoErg;

/// Basis points in 100%
pub const MAX_BASIS_POINTS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoyaltyError {
    #[error("Royalty recipient {index} has no address")]
    EmptyAddress { index: usize },

    #[error("Royalty recipient {index} has a share of {basis_points} bp, above 100%")]
    ShareTooLarge { index: usize, basis_points: u32 },

    #[error("Total royalty of {total} bp exceeds 100%")]
    TotalExceeds { total: u32 },
}

/// One royalty recipient and its share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoyaltyRecipient {
    pub address: String,
    pub basis_points: u32,
}

impl RoyaltyRecipient {
    pub fn new(address: impl Into<String>, basis_points: u32) -> Self {
        Self {
            address: address.into(),
            basis_points,
        }
    }
}

/// Validated royalty recipients. May be empty (no royalties).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoyaltyStructure {
    recipients: Vec<RoyaltyRecipient>,
}

impl RoyaltyStructure {
    pub fn new(recipients: Vec<RoyaltyRecipient>) -> Result<Self, RoyaltyError> {
        let mut total: u32 = 0;
        for (index, r) in recipients.iter().enumerate() {
            if r.address.trim().is_empty() {
                return Err(RoyaltyError::EmptyAddress { index });
            }
            if r.basis_points > MAX_BASIS_POINTS {
                return Err(RoyaltyError::ShareTooLarge {
                    index,
                    basis_points: r.basis_points,
                });
            }
            total = total.saturating_add(r.basis_points);
        }
        if total > MAX_BASIS_POINTS {
            return Err(RoyaltyError::TotalExceeds { total });
        }

        let mut seen = std::collections::HashSet::new();
        if recipients.iter().any(|r| !seen.insert(r.address.as_str())) {
            tracing::warn!("Duplicate addresses in royalty recipients");
        }

        Ok(Self { recipients })
    }

    pub fn recipients(&self) -> &[RoyaltyRecipient] {
        &self.recipients
    }

    pub fn total_basis_points(&self) -> u32 {
        self.recipients.iter().map(|r| r.basis_points).sum()
    }

    /// R5 content: `{"recipients":[{"address","percentage"}],"total_percentage"}`
    pub fn to_register_json(&self) -> Value {
        let recipients: Vec<Value> = self
            .recipients
            .iter()
            .map(|r| json!({"address": r.address, "percentage": percent(r.basis_points)}))
            .collect();
        json!({
            "recipients": recipients,
            "total_percentage": percent(self.total_basis_points()),
        })
    }

    /// Split `sale_amount` between the recipients and the seller.
    ///
    /// Each share is rounded down; the seller keeps the remainder.
    pub fn distribute(&self, sale_amount: NanoErg) -> RoyaltyDistribution {
        let shares: Vec<RoyaltyShare> = self
            .recipients
            .iter()
            .map(|r| RoyaltyShare {
                address: r.address.clone(),
                basis_points: r.basis_points,
                amount: share_of(sale_amount, r.basis_points),
            })
            .collect();
        let total_royalties: NanoErg = shares.iter().map(|s| s.amount).sum();

        RoyaltyDistribution {
            sale_amount,
            seller_amount: sale_amount - total_royalties,
            total_royalties,
            shares,
        }
    }
}

/// Whole percentages as integers, fractional ones as decimals
fn percent(basis_points: u32) -> Value {
    if basis_points % 100 == 0 {
        json!(basis_points / 100)
    } else {
        json!(f64::from(basis_points) / 100.0)
    }
}

fn share_of(amount: NanoErg, basis_points: u32) -> NanoErg {
    // basis_points <= 10_000, so the share never exceeds amount
    (u128::from(amount) * u128::from(basis_points) / u128::from(MAX_BASIS_POINTS)) as NanoErg
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoyaltyShare {
    pub address: String,
    pub basis_points: u32,
    pub amount: NanoErg,
}

/// Result of splitting a sale price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoyaltyDistribution {
    pub sale_amount: NanoErg,
    pub shares: Vec<RoyaltyShare>,
    pub total_royalties: NanoErg,
    pub seller_amount: NanoErg,
}
