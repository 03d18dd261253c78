//! Batched token distribution
//!
//! Splits a recipient list into batches and builds one transaction per batch.
//! Each batch selects from the boxes not yet spent by an earlier batch. A batch
//! that cannot be built is recorded and the next batch is attempted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use sigmakit_core::{BlockHeight, BoxId, NanoErg, TokenId, TxConfig};

use crate::box_selector::{
    collect_change_tokens, select_token_and_erg, BoxParseError, BoxSelectorError, UnspentBox,
};
use crate::change::{fund_change, ChangeDecision, ChangeError};
use crate::eip12::{
    inputs_for_selection, to_unspent_boxes, Eip12Asset, Eip12InputBox, Eip12Output,
    Eip12UnsignedTx,
};

/// A distribution target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub ergo_tree: String,
    pub amount: u64,
}

/// Errors that stop the whole distribution before any batch is built
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    #[error("No recipients to distribute to")]
    NoRecipients,

    #[error("Recipient {index} has a zero amount")]
    ZeroAmount { index: usize },

    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("Invalid input box: {0}")]
    Inputs(#[from] BoxParseError),
}

/// Why a single batch could not be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Selection(#[from] BoxSelectorError),

    #[error(transparent)]
    Change(#[from] ChangeError),

    #[error("Batch token total overflows u64")]
    AmountOverflow,
}

/// Summary of a built batch
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub token_amount: u64,
    pub input_count: usize,
    pub miner_fee: NanoErg,
    /// ERG in the change output, 0 when there is none
    pub change_erg: NanoErg,
}

/// Result of one batch
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Built {
        batch: usize,
        recipients: usize,
        unsigned_tx: Eip12UnsignedTx,
        summary: BatchSummary,
    },
    Failed {
        batch: usize,
        recipients: usize,
        error: BatchError,
    },
}

impl BatchOutcome {
    pub fn batch(&self) -> usize {
        match self {
            Self::Built { batch, .. } | Self::Failed { batch, .. } => *batch,
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, Self::Built { .. })
    }
}

/// Outcomes of every batch, in batch order
#[derive(Debug, Clone, Default)]
pub struct DistributionReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl DistributionReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_built()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Tokens sent by the batches that were built
    pub fn total_distributed(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                BatchOutcome::Built { summary, .. } => Some(summary.token_amount),
                BatchOutcome::Failed { .. } => None,
            })
            .sum()
    }

    pub fn transactions(&self) -> Vec<&Eip12UnsignedTx> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                BatchOutcome::Built { unsigned_tx, .. } => Some(unsigned_tx),
                BatchOutcome::Failed { .. } => None,
            })
            .collect()
    }
}

/// Plan the distribution of `token_id` to `recipients`.
///
/// Inputs come from `user_inputs` in order. Change of each batch goes to
/// `change_ergo_tree` and is not reused by later batches.
pub fn plan_distribution(
    user_inputs: &[Eip12InputBox],
    token_id: &TokenId,
    recipients: &[Recipient],
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<DistributionReport, DistributionError> {
    if recipients.is_empty() {
        return Err(DistributionError::NoRecipients);
    }
    if config.batch_size == 0 {
        return Err(DistributionError::InvalidBatchSize);
    }
    if let Some(index) = recipients.iter().position(|r| r.amount == 0) {
        return Err(DistributionError::ZeroAmount { index });
    }

    let mut pool = to_unspent_boxes(user_inputs)?;
    let batch_count = recipients.len().div_ceil(config.batch_size);
    tracing::info!(
        "Distributing {} to {} recipients in {} batches from {} boxes",
        token_id.short(),
        recipients.len(),
        batch_count,
        pool.len()
    );

    let mut report = DistributionReport::default();
    for (batch, chunk) in recipients.chunks(config.batch_size).enumerate() {
        let outcome = match build_batch(
            &pool,
            user_inputs,
            token_id,
            chunk,
            change_ergo_tree,
            current_height,
            config,
        ) {
            Ok((unsigned_tx, summary, spent)) => {
                pool.retain(|b| !spent.contains(&b.box_id));
                tracing::debug!(
                    "Batch {}: {} recipients, {} inputs, fee {}",
                    batch,
                    chunk.len(),
                    summary.input_count,
                    summary.miner_fee
                );
                BatchOutcome::Built {
                    batch,
                    recipients: chunk.len(),
                    unsigned_tx,
                    summary,
                }
            }
            Err(error) => {
                tracing::warn!("Batch {} failed: {}", batch, error);
                BatchOutcome::Failed {
                    batch,
                    recipients: chunk.len(),
                    error,
                }
            }
        };
        report.outcomes.push(outcome);
    }

    tracing::info!(
        "Distribution planned: {} batches built, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(report)
}

fn build_batch(
    pool: &[UnspentBox],
    user_inputs: &[Eip12InputBox],
    token_id: &TokenId,
    recipients: &[Recipient],
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<(Eip12UnsignedTx, BatchSummary, HashSet<BoxId>), BatchError> {
    let token_amount = recipients
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.amount))
        .ok_or(BatchError::AmountOverflow)?;
    let erg_target = config
        .erg_per_recipient
        .saturating_mul(recipients.len() as u64)
        .saturating_add(config.fee_nano);

    let selection =
        select_token_and_erg(pool, token_id, token_amount, erg_target).into_checked()?;
    let (selection, decision) = fund_change(selection, config.change_policy, |target| {
        select_token_and_erg(pool, token_id, token_amount, target)
    })?;
    let miner_fee = config.fee_nano + decision.extra_fee();

    let mut outputs: Vec<Eip12Output> = recipients
        .iter()
        .map(|r| {
            Eip12Output::simple(config.erg_per_recipient, r.ergo_tree.as_str(), current_height)
                .with_asset(token_id.as_str(), r.amount)
        })
        .collect();

    let mut change_erg = 0;
    if let ChangeDecision::Output { erg, .. } = decision {
        let change_tokens =
            collect_change_tokens(&selection.selected_boxes, Some((token_id, token_amount)));
        outputs.push(Eip12Output::change(
            erg,
            change_ergo_tree,
            Eip12Asset::from_map(&change_tokens),
            current_height,
        ));
        change_erg = erg;
    }
    outputs.push(Eip12Output::fee(miner_fee, current_height));

    let spent = selection
        .selected_boxes
        .iter()
        .map(|b| b.box_id.clone())
        .collect();
    let unsigned_tx = Eip12UnsignedTx {
        inputs: inputs_for_selection(user_inputs, &selection),
        data_inputs: vec![],
        outputs,
    };

    Ok((
        unsigned_tx,
        BatchSummary {
            token_amount,
            input_count: selection.selected_boxes.len(),
            miner_fee,
            change_erg,
        },
        spent,
    ))
}

/// Up-front cost of a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DistributionCost {
    pub batches: usize,
    pub total_fees: NanoErg,
    /// ERG locked in recipient outputs
    pub recipient_erg: NanoErg,
    pub total_erg: NanoErg,
}

/// ERG needed to reach `recipient_count` recipients with `config`
pub fn estimate_distribution_cost(
    recipient_count: usize,
    config: &TxConfig,
) -> Result<DistributionCost, DistributionError> {
    if config.batch_size == 0 {
        return Err(DistributionError::InvalidBatchSize);
    }
    let batches = recipient_count.div_ceil(config.batch_size);
    let total_fees = config.fee_nano.saturating_mul(batches as u64);
    let recipient_erg = config
        .erg_per_recipient
        .saturating_mul(recipient_count as u64);

    Ok(DistributionCost {
        batches,
        total_fees,
        recipient_erg,
        total_erg: total_fees.saturating_add(recipient_erg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eip12::tests::mock_input;
    use sigmakit_core::ChangePolicy;

    fn recipient(tree: &str, amount: u64) -> Recipient {
        Recipient {
            ergo_tree: tree.to_string(),
            amount,
        }
    }

    fn config(batch_size: usize) -> TxConfig {
        TxConfig {
            batch_size,
            ..TxConfig::default()
        }
    }

    // =========================================================================
    // plan_distribution tests
    // =========================================================================

    #[test]
    fn test_single_batch() {
        let token = TokenId::new("T");
        let inputs = vec![
            mock_input("box1", 1_000_000_000, vec![("T", 100), ("other", 3)]),
            mock_input("box2", 1_000_000_000, vec![]),
        ];
        let recipients = vec![recipient("r1", 40), recipient("r2", 40)];

        let report =
            plan_distribution(&inputs, &token, &recipients, "change", 100, &config(10)).unwrap();
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.total_distributed(), 80);

        let tx = report.transactions()[0];
        assert_eq!(tx.inputs.len(), 1);
        assert_eq!(tx.outputs.len(), 4);
        assert_eq!(tx.outputs[0].assets, vec![Eip12Asset::new("T", 40)]);

        // Change keeps the unspent target token and the unrelated token
        let change = &tx.outputs[2];
        assert_eq!(change.value, "996900000");
        assert_eq!(
            change.assets,
            vec![Eip12Asset::new("T", 20), Eip12Asset::new("other", 3)]
        );
        assert_eq!(tx.total_output_value(), Some(1_000_000_000));
    }

    #[test]
    fn test_failed_batch_does_not_stop_later_batches() {
        let token = TokenId::new("T");
        let inputs = vec![
            mock_input("box1", 1_000_000_000, vec![("T", 50)]),
            mock_input("box2", 1_000_000_000, vec![("T", 50)]),
        ];
        let recipients = vec![
            recipient("r1", 40),
            recipient("r2", 200),
            recipient("r3", 30),
        ];

        let report =
            plan_distribution(&inputs, &token, &recipients, "change", 100, &config(1)).unwrap();
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.total_distributed(), 70);

        match &report.outcomes[1] {
            BatchOutcome::Failed {
                batch,
                recipients,
                error,
            } => {
                assert_eq!(*batch, 1);
                assert_eq!(*recipients, 1);
                assert!(matches!(
                    error,
                    BatchError::Selection(BoxSelectorError::InsufficientToken {
                        required: 200,
                        available: 50,
                        ..
                    })
                ));
            }
            other => panic!("expected failed batch, got {:?}", other),
        }

        // Box 1 was spent by batch 0, so batch 2 uses box 2
        let txs = report.transactions();
        assert_eq!(txs[0].inputs[0].box_id, "box1");
        assert_eq!(txs[1].inputs[0].box_id, "box2");
    }

    #[test]
    fn test_batch_change_policy() {
        let token = TokenId::new("T");
        // 2_500_000 - (1_000_000 + 1_100_000) leaves 400_000
        let inputs = vec![mock_input("box1", 2_500_000, vec![("T", 10)])];
        let recipients = vec![recipient("r1", 10)];

        let report =
            plan_distribution(&inputs, &token, &recipients, "change", 100, &config(5)).unwrap();
        assert!(matches!(
            report.outcomes[0],
            BatchOutcome::Failed {
                error: BatchError::Change(ChangeError::BelowMinBoxValue { change: 400_000, .. }),
                ..
            }
        ));

        let absorb = TxConfig {
            change_policy: ChangePolicy::AbsorbIntoFee,
            ..config(5)
        };
        let report =
            plan_distribution(&inputs, &token, &recipients, "change", 100, &absorb).unwrap();
        let tx = report.transactions()[0];
        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[1].value, "1500000");
    }

    #[test]
    fn test_batch_takes_extra_box_for_token_change() {
        let token = TokenId::new("T");
        // The token box alone covers the target but not a change box for 50 T
        let inputs = vec![
            mock_input("box1", 2_500_000, vec![("T", 100)]),
            mock_input("box2", 5_000_000_000, vec![]),
        ];
        let recipients = vec![recipient("r1", 50)];

        let report =
            plan_distribution(&inputs, &token, &recipients, "change", 100, &config(5)).unwrap();
        assert_eq!(report.succeeded(), 1);

        let tx = report.transactions()[0];
        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs.len(), 3);
        let change = &tx.outputs[1];
        assert_eq!(change.value, "5000400000");
        assert_eq!(change.assets, vec![Eip12Asset::new("T", 50)]);
        assert_eq!(tx.total_output_value(), Some(5_002_500_000));

        match &report.outcomes[0] {
            BatchOutcome::Built { summary, .. } => {
                assert_eq!(summary.input_count, 2);
                assert_eq!(summary.change_erg, 5_000_400_000);
            }
            other => panic!("expected built batch, got {:?}", other),
        }
    }

    #[test]
    fn test_setup_errors() {
        let token = TokenId::new("T");
        let inputs = vec![mock_input("box1", 1_000_000_000, vec![("T", 10)])];

        assert!(matches!(
            plan_distribution(&inputs, &token, &[], "c", 1, &config(5)),
            Err(DistributionError::NoRecipients)
        ));
        assert!(matches!(
            plan_distribution(&inputs, &token, &[recipient("r", 1)], "c", 1, &config(0)),
            Err(DistributionError::InvalidBatchSize)
        ));
        assert!(matches!(
            plan_distribution(
                &inputs,
                &token,
                &[recipient("r", 1), recipient("r", 0)],
                "c",
                1,
                &config(5)
            ),
            Err(DistributionError::ZeroAmount { index: 1 })
        ));

        let mut bad = inputs.clone();
        bad[0].value = "abc".to_string();
        assert!(matches!(
            plan_distribution(&bad, &token, &[recipient("r", 1)], "c", 1, &config(5)),
            Err(DistributionError::Inputs(_))
        ));
    }

    // =========================================================================
    // estimate_distribution_cost tests
    // =========================================================================

    #[test]
    fn test_estimate_distribution_cost() {
        let cost = estimate_distribution_cost(120, &config(50)).unwrap();
        assert_eq!(cost.batches, 3);
        assert_eq!(cost.total_fees, 3_300_000);
        assert_eq!(cost.recipient_erg, 120_000_000);
        assert_eq!(cost.total_erg, 123_300_000);

        assert_eq!(estimate_distribution_cost(0, &config(50)).unwrap().batches, 0);
        assert!(estimate_distribution_cost(1, &config(0)).is_err());
    }
}
