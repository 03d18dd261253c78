//! sigmakit runner library
//!
//! Reads a distribution plan (and optionally a config file), plans the
//! batches and prints the resulting unsigned transactions as JSON.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use ergo_tx::distribution::{estimate_distribution_cost, plan_distribution, BatchOutcome, Recipient};
use ergo_tx::Eip12InputBox;
use sigmakit_core::amount::format_nanoerg;
use sigmakit_core::{AppConfig, BlockHeight, TokenId};

/// Distribution job read from the plan file
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionPlan {
    /// Wallet boxes available as inputs, in preference order
    pub boxes: Vec<Eip12InputBox>,
    pub token_id: TokenId,
    pub recipients: Vec<Recipient>,
    pub change_ergo_tree: String,
    pub height: BlockHeight,
}

impl DistributionPlan {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Invalid plan {}", path.display()))
    }
}

/// One batch in the printed output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch: usize,
    pub recipients: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsigned_tx: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Printed result of a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResponse {
    pub batches: Vec<BatchResponse>,
    pub succeeded: usize,
    pub failed: usize,
    pub total_distributed: u64,
}

/// Initialize the tracing subscriber (stderr, `RUST_LOG` aware)
pub fn init_tracing() {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["sigmakit=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the config, or defaults when no path is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

/// Plan the distribution described by `plan` under `config`
pub fn plan(plan: &DistributionPlan, config: &AppConfig) -> anyhow::Result<DistributionResponse> {
    let cost = estimate_distribution_cost(plan.recipients.len(), &config.tx)?;
    tracing::info!(
        "Estimated cost: {} batches, {} in fees, {} total",
        cost.batches,
        format_nanoerg(cost.total_fees),
        format_nanoerg(cost.total_erg)
    );

    let report = plan_distribution(
        &plan.boxes,
        &plan.token_id,
        &plan.recipients,
        &plan.change_ergo_tree,
        plan.height,
        &config.tx,
    )?;

    let mut batches = Vec::with_capacity(report.outcomes.len());
    for outcome in &report.outcomes {
        batches.push(match outcome {
            BatchOutcome::Built {
                batch,
                recipients,
                unsigned_tx,
                ..
            } => BatchResponse {
                batch: *batch,
                recipients: *recipients,
                unsigned_tx: Some(
                    serde_json::to_value(unsigned_tx).context("Failed to serialize tx")?,
                ),
                error: None,
            },
            BatchOutcome::Failed {
                batch,
                recipients,
                error,
            } => BatchResponse {
                batch: *batch,
                recipients: *recipients,
                unsigned_tx: None,
                error: Some(error.to_string()),
            },
        });
    }

    Ok(DistributionResponse {
        batches,
        succeeded: report.succeeded(),
        failed: report.failed(),
        total_distributed: report.total_distributed(),
    })
}

/// Run the planner and print the result to stdout
pub fn run(plan_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let job = DistributionPlan::from_file(plan_path)?;
    tracing::info!(
        "Loaded plan: {} boxes, {} recipients",
        job.boxes.len(),
        job.recipients.len()
    );

    let response = plan(&job, &config)?;
    if response.failed > 0 {
        tracing::warn!("{} of {} batches failed", response.failed, response.batches.len());
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
