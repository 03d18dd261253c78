//! Token mint transaction builder
//!
//! Mints a new token whose id is the box id of the first input. The token box
//! carries EIP-4 metadata: R4 name, R5 description and R6 decimals, all as
//! UTF-8 byte arrays. Further registers (R7..R9) can be supplied as typed
//! entries.

use std::collections::BTreeMap;

use sigmakit_core::{BlockHeight, NanoErg, TokenId, TxConfig};

use crate::box_selector::{collect_change_tokens, select_erg, BoxParseError, BoxSelectorError};
use crate::change::{fund_change, ChangeDecision, ChangeError};
use crate::eip12::{
    inputs_for_selection, to_unspent_boxes, Eip12Asset, Eip12InputBox, Eip12Output,
    Eip12UnsignedTx,
};
use crate::registers::{build_register_map, ensure_dense, RegisterEntry};
use crate::royalty::RoyaltyError;
use crate::sigma::{encode_hex, RegisterCodecError, RegisterId, TypedValue};

/// What to mint and where the new tokens go
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub name: String,
    pub description: String,
    pub decimals: u8,
    pub amount: u64,
    pub recipient_ergo_tree: String,
    /// Additional registers, R7 and up
    pub extra_registers: Vec<RegisterEntry>,
}

/// Errors from mint tx building
#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("Token name must not be empty")]
    EmptyName,

    #[error("Mint amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid input box: {0}")]
    Inputs(#[from] BoxParseError),

    #[error(transparent)]
    Selection(#[from] BoxSelectorError),

    #[error(transparent)]
    Change(#[from] ChangeError),

    #[error("Register encoding failed: {0}")]
    Register(#[from] RegisterCodecError),

    #[error("{0} is reserved for EIP-4 metadata")]
    ReservedRegister(RegisterId),

    #[error("Invalid royalties: {0}")]
    Royalty(#[from] RoyaltyError),
}

/// Summary of what the mint transaction does
#[derive(Debug, Clone)]
pub struct MintSummary {
    pub token_id: TokenId,
    pub name: String,
    pub amount: u64,
    pub decimals: u8,
    pub miner_fee: NanoErg,
    /// ERG in the change output, 0 when there is none
    pub change_erg: NanoErg,
}

/// Result of building a mint transaction
#[derive(Debug)]
pub struct MintBuildResult {
    pub unsigned_tx: Eip12UnsignedTx,
    pub summary: MintSummary,
}

/// Build an EIP-12 unsigned transaction minting a new token.
///
/// ERG for the token box and the miner fee is selected from `user_inputs` in
/// order. Leftovers go to `change_ergo_tree` under the configured change policy.
pub fn build_mint_tx(
    user_inputs: &[Eip12InputBox],
    request: &MintRequest,
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<MintBuildResult, MintError> {
    if request.name.trim().is_empty() {
        return Err(MintError::EmptyName);
    }

    let mut registers = encode_registers(&[
        (RegisterId::R4, TypedValue::string(&request.name)),
        (RegisterId::R5, TypedValue::string(&request.description)),
        (RegisterId::R6, TypedValue::string(&request.decimals.to_string())),
    ])?;

    let extras = build_register_map(&request.extra_registers);
    if let Some(failure) = extras.failed.first() {
        return Err(failure.error.clone().into());
    }
    if let Some(id) = extras.registers.keys().find(|id| **id < RegisterId::R7) {
        return Err(MintError::ReservedRegister(*id));
    }
    registers.extend(extras.registers);

    let minted = build_token_box_tx(
        user_inputs,
        &request.recipient_ergo_tree,
        request.amount,
        registers,
        change_ergo_tree,
        current_height,
        config,
    )?;

    tracing::info!(
        "Mint tx: {} x {} ({}), {} inputs, fee {}",
        request.amount,
        request.name,
        minted.token_id.short(),
        minted.unsigned_tx.inputs.len(),
        minted.miner_fee
    );

    Ok(MintBuildResult {
        unsigned_tx: minted.unsigned_tx,
        summary: MintSummary {
            token_id: minted.token_id,
            name: request.name.clone(),
            amount: request.amount,
            decimals: request.decimals,
            miner_fee: minted.miner_fee,
            change_erg: minted.change_erg,
        },
    })
}

/// Encode register values to hex, keyed by register
pub(crate) fn encode_registers(
    values: &[(RegisterId, TypedValue)],
) -> Result<BTreeMap<RegisterId, String>, RegisterCodecError> {
    let mut registers = BTreeMap::new();
    for (id, value) in values {
        if registers.insert(*id, encode_hex(value)?).is_some() {
            return Err(RegisterCodecError::DuplicateRegister(*id));
        }
    }
    Ok(registers)
}

/// A funded transaction creating one new-token box
pub(crate) struct TokenBoxTx {
    pub unsigned_tx: Eip12UnsignedTx,
    pub token_id: TokenId,
    pub miner_fee: NanoErg,
    pub change_erg: NanoErg,
}

/// Select ERG for a token box plus fee, then lay out token box, change and fee.
///
/// The selection is widened when its leftover cannot fund a change box.
pub(crate) fn build_token_box_tx(
    user_inputs: &[Eip12InputBox],
    recipient_ergo_tree: &str,
    amount: u64,
    registers: BTreeMap<RegisterId, String>,
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<TokenBoxTx, MintError> {
    if amount == 0 {
        return Err(MintError::ZeroAmount);
    }
    ensure_dense(registers.keys().copied())?;

    let boxes = to_unspent_boxes(user_inputs)?;
    let target_erg = config.erg_per_recipient.saturating_add(config.fee_nano);
    let selection = select_erg(&boxes, target_erg).into_checked()?;
    let (selection, decision) = fund_change(selection, config.change_policy, |target| {
        select_erg(&boxes, target)
    })?;

    // The new token takes the id of the first input
    let token_id = selection
        .selected_boxes
        .first()
        .map(|b| TokenId::from(&b.box_id))
        .ok_or(BoxSelectorError::InsufficientErg {
            required: target_erg,
            available: 0,
        })?;

    let mut token_output =
        Eip12Output::simple(config.erg_per_recipient, recipient_ergo_tree, current_height)
            .with_asset(token_id.as_str(), amount);
    token_output.additional_registers.extend(
        registers
            .into_iter()
            .map(|(id, hex)| (id.to_string(), hex)),
    );

    let miner_fee = config.fee_nano + decision.extra_fee();
    let mut outputs = vec![token_output];
    let mut change_erg = 0;
    if let ChangeDecision::Output { erg, .. } = decision {
        let change_tokens = collect_change_tokens(&selection.selected_boxes, None);
        outputs.push(Eip12Output::change(
            erg,
            change_ergo_tree,
            Eip12Asset::from_map(&change_tokens),
            current_height,
        ));
        change_erg = erg;
    }
    outputs.push(Eip12Output::fee(miner_fee, current_height));

    Ok(TokenBoxTx {
        unsigned_tx: Eip12UnsignedTx {
            inputs: inputs_for_selection(user_inputs, &selection),
            data_inputs: vec![],
            outputs,
        },
        token_id,
        miner_fee,
        change_erg,
    })
}
