//! EIP-24 NFT and collection token minting
//!
//! Register layout of the minted box:
//!
//! ```text
//! R4  name                          UTF-8
//! R5  royalties                     JSON {recipients, total_percentage}
//! R6  traits / collection info      JSON
//! R7  collection token id           raw bytes (empty when standalone)
//! R8  additional info               JSON, only when there is any
//! ```

use serde_json::{json, Map, Value};

use sigmakit_core::{BlockHeight, NanoErg, TokenId, TxConfig};

use crate::eip12::{Eip12InputBox, Eip12UnsignedTx};
use crate::mint::{build_token_box_tx, encode_registers, MintError};
use crate::royalty::{RoyaltyRecipient, RoyaltyStructure};
use crate::sigma::{RegisterId, TypedValue};

/// Metadata of a single NFT
#[derive(Debug, Clone, Default)]
pub struct NftMetadata {
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub royalties: Vec<RoyaltyRecipient>,
    /// Trait object; `{"properties":{},"levels":{},"stats":{}}` when absent
    pub traits: Option<Value>,
    pub collection_token_id: Option<TokenId>,
    pub additional_metadata: Map<String, Value>,
}

/// Metadata of a collection token
#[derive(Debug, Clone, Default)]
pub struct CollectionMetadata {
    pub name: String,
    pub description: String,
    pub supply: u64,
    pub royalties: Vec<RoyaltyRecipient>,
    pub additional_metadata: Map<String, Value>,
}

/// Summary of an EIP-24 mint
#[derive(Debug, Clone)]
pub struct NftMintSummary {
    pub token_id: TokenId,
    pub name: String,
    pub amount: u64,
    pub royalty_basis_points: u32,
    pub miner_fee: NanoErg,
    pub change_erg: NanoErg,
}

#[derive(Debug)]
pub struct NftMintBuildResult {
    pub unsigned_tx: Eip12UnsignedTx,
    pub summary: NftMintSummary,
}

/// Build a transaction minting one NFT (amount 1, no decimals).
pub fn build_nft_mint_tx(
    user_inputs: &[Eip12InputBox],
    metadata: &NftMetadata,
    recipient_ergo_tree: &str,
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<NftMintBuildResult, MintError> {
    if metadata.name.trim().is_empty() {
        return Err(MintError::EmptyName);
    }
    let royalties = RoyaltyStructure::new(metadata.royalties.clone())?;

    let traits = metadata
        .traits
        .clone()
        .unwrap_or_else(|| json!({"properties": {}, "levels": {}, "stats": {}}));

    let mut additional = Map::new();
    if let Some(url) = &metadata.image_url {
        additional.insert("image_url".into(), Value::String(url.clone()));
    }
    if let Some(description) = &metadata.description {
        additional.insert("description".into(), Value::String(description.clone()));
    }
    additional.extend(metadata.additional_metadata.clone());

    let collection = match &metadata.collection_token_id {
        Some(id) => TypedValue::from_hex_bytes(id.as_str())?,
        None => TypedValue::ByteArray(vec![]),
    };

    let mut values = vec![
        (RegisterId::R4, TypedValue::string(&metadata.name)),
        (RegisterId::R5, TypedValue::json(&royalties.to_register_json())),
        (RegisterId::R6, TypedValue::json(&traits)),
    ];
    // R7 is written whenever R8 is, to keep registers contiguous
    if metadata.collection_token_id.is_some() || !additional.is_empty() {
        values.push((RegisterId::R7, collection));
    }
    if !additional.is_empty() {
        values.push((RegisterId::R8, TypedValue::json(&Value::Object(additional))));
    }

    mint_eip24(
        user_inputs,
        &metadata.name,
        1,
        &royalties,
        &values,
        recipient_ergo_tree,
        change_ergo_tree,
        current_height,
        config,
    )
}

/// Build a transaction minting a collection token with `supply` units.
pub fn build_collection_mint_tx(
    user_inputs: &[Eip12InputBox],
    metadata: &CollectionMetadata,
    recipient_ergo_tree: &str,
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<NftMintBuildResult, MintError> {
    if metadata.name.trim().is_empty() {
        return Err(MintError::EmptyName);
    }
    let royalties = RoyaltyStructure::new(metadata.royalties.clone())?;

    let info = json!({
        "type": "collection",
        "supply": metadata.supply,
        "standard": "EIP-24",
    });
    let mut additional = Map::new();
    if !metadata.description.is_empty() {
        additional.insert(
            "description".into(),
            Value::String(metadata.description.clone()),
        );
    }
    additional.extend(metadata.additional_metadata.clone());

    let mut values = vec![
        (RegisterId::R4, TypedValue::string(&metadata.name)),
        (RegisterId::R5, TypedValue::json(&royalties.to_register_json())),
        (RegisterId::R6, TypedValue::json(&info)),
    ];
    if !additional.is_empty() {
        values.push((RegisterId::R7, TypedValue::ByteArray(vec![])));
        values.push((RegisterId::R8, TypedValue::json(&Value::Object(additional))));
    }

    mint_eip24(
        user_inputs,
        &metadata.name,
        metadata.supply,
        &royalties,
        &values,
        recipient_ergo_tree,
        change_ergo_tree,
        current_height,
        config,
    )
}

#[allow(clippy::too_many_arguments)]
fn mint_eip24(
    user_inputs: &[Eip12InputBox],
    name: &str,
    amount: u64,
    royalties: &RoyaltyStructure,
    values: &[(RegisterId, TypedValue)],
    recipient_ergo_tree: &str,
    change_ergo_tree: &str,
    current_height: BlockHeight,
    config: &TxConfig,
) -> Result<NftMintBuildResult, MintError> {
    let registers = encode_registers(values)?;
    let minted = build_token_box_tx(
        user_inputs,
        recipient_ergo_tree,
        amount,
        registers,
        change_ergo_tree,
        current_height,
        config,
    )?;

    tracing::info!(
        "EIP-24 mint: {} x {} ({}), royalties {} bp, fee {}",
        amount,
        name,
        minted.token_id.short(),
        royalties.total_basis_points(),
        minted.miner_fee
    );

    Ok(NftMintBuildResult {
        unsigned_tx: minted.unsigned_tx,
        summary: NftMintSummary {
            token_id: minted.token_id,
            name: name.to_string(),
            amount,
            royalty_basis_points: royalties.total_basis_points(),
            miner_fee: minted.miner_fee,
            change_erg: minted.change_erg,
        },
    })
}
