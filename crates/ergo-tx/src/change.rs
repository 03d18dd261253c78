//! Change computation
//!
//! A change output is created when leftover ERG exceeds the minimum box value
//! or when tokens have to go back to the sender. Leftover ERG that is positive
//! but not above the minimum cannot form a box of its own and is handled by
//! the configured [`ChangePolicy`].

use sigmakit_core::constants::MIN_BOX_VALUE_NANO as MIN_BOX_VALUE;
use sigmakit_core::{ChangePolicy, NanoErg};

use crate::box_selector::{collect_change_tokens, SelectionResult};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChangeError {
    #[error("Change amount {change} nanoERG is not above minimum box value of {min} nanoERG (not enough to create change output)")]
    BelowMinBoxValue { change: NanoErg, min: NanoErg },

    #[error("Token change needs a change box but only {change_erg} nanoERG is left (minimum box value is {min})")]
    TokenChangeWithoutErg { change_erg: NanoErg, min: NanoErg },
}

/// What happens to the leftover of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeDecision {
    /// Inputs are spent exactly
    NoChange,
    /// Build one change output with this ERG (and the token change)
    Output { erg: NanoErg, token: u64 },
    /// Leftover ERG is added to the miner fee
    AbsorbedIntoFee { erg: NanoErg },
}

impl ChangeDecision {
    /// ERG to add on top of the configured miner fee
    pub fn extra_fee(&self) -> NanoErg {
        match self {
            Self::AbsorbedIntoFee { erg } => *erg,
            _ => 0,
        }
    }
}

/// Leftover amounts after covering the targets of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeComputation {
    pub change_erg: NanoErg,
    /// Leftover of the token the selection targeted
    pub change_token: u64,
    /// Number of other token ids riding along in the selected boxes
    pub other_tokens: usize,
}

impl ChangeComputation {
    pub fn new(
        total_erg: NanoErg,
        target_erg: NanoErg,
        total_token: u64,
        target_token: u64,
    ) -> Self {
        Self {
            change_erg: total_erg.saturating_sub(target_erg),
            change_token: total_token.saturating_sub(target_token),
            other_tokens: 0,
        }
    }

    /// Change for a selection; the selection should have been checked first.
    pub fn from_selection(selection: &SelectionResult) -> Self {
        let (total_token, target_token) = match &selection.token_target {
            Some(target) => (selection.total_token_amount.unwrap_or(0), target.amount),
            None => (0, 0),
        };
        let mut change = Self::new(
            selection.total_erg,
            selection.target_erg,
            total_token,
            target_token,
        );
        change.other_tokens = collect_change_tokens(&selection.selected_boxes, None)
            .keys()
            .filter(|id| {
                selection
                    .token_target
                    .as_ref()
                    .map_or(true, |target| &target.token_id != *id)
            })
            .count();
        change
    }

    pub fn has_token_change(&self) -> bool {
        self.change_token > 0 || self.other_tokens > 0
    }

    pub fn needs_change_output(&self) -> bool {
        self.change_erg > MIN_BOX_VALUE || self.has_token_change()
    }

    /// Decide what to do with the leftover.
    pub fn resolve(&self, policy: ChangePolicy) -> Result<ChangeDecision, ChangeError> {
        if self.change_erg > MIN_BOX_VALUE {
            return Ok(ChangeDecision::Output {
                erg: self.change_erg,
                token: self.change_token,
            });
        }
        if self.has_token_change() {
            return Err(ChangeError::TokenChangeWithoutErg {
                change_erg: self.change_erg,
                min: MIN_BOX_VALUE,
            });
        }
        if self.change_erg == 0 {
            return Ok(ChangeDecision::NoChange);
        }
        match policy {
            ChangePolicy::Reject => Err(ChangeError::BelowMinBoxValue {
                change: self.change_erg,
                min: MIN_BOX_VALUE,
            }),
            ChangePolicy::AbsorbIntoFee => Ok(ChangeDecision::AbsorbedIntoFee {
                erg: self.change_erg,
            }),
        }
    }
}

/// Resolve the change of a checked selection, widening it when needed.
///
/// When the leftover of `selection` cannot form a change box, `reselect` is
/// asked for a selection covering the original ERG target plus more than
/// [`MIN_BOX_VALUE`]. The wider selection is used only if it covers that
/// target; otherwise the original change error is returned.
pub fn fund_change(
    selection: SelectionResult,
    policy: ChangePolicy,
    reselect: impl FnOnce(NanoErg) -> SelectionResult,
) -> Result<(SelectionResult, ChangeDecision), ChangeError> {
    let err = match ChangeComputation::from_selection(&selection).resolve(policy) {
        Ok(decision) => return Ok((selection, decision)),
        Err(err) => err,
    };

    let target_erg = selection.target_erg;
    let widened_target = target_erg.saturating_add(MIN_BOX_VALUE + 1);
    let mut widened = reselect(widened_target);
    if widened.ensure_sufficient().is_err() {
        return Err(err);
    }

    // Change is measured against what the transaction actually spends
    widened.target_erg = target_erg;
    let decision = ChangeComputation::from_selection(&widened).resolve(policy)?;
    tracing::debug!(
        "Selection widened to {} boxes to fund a change output",
        widened.selected_boxes.len()
    );
    Ok((widened, decision))
}
