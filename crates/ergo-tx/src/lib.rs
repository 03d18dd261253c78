//! ergo-tx: Transaction building utilities for Ergo
//!
//! Provides the typed register codec, UTXO selection, change handling,
//! EIP-12 transaction structures, royalties and the mint, NFT and
//! distribution planners.

pub mod box_selector;
pub mod change;
pub mod distribution;
pub mod eip12;
pub mod mint;
pub mod nft;
pub mod registers;
pub mod royalty;
pub mod sigma;

pub use box_selector::{
    collect_change_tokens, select_erg, select_token, select_token_and_erg, BoxParseError,
    BoxSelectorError, SelectionResult, TokenTarget, UnspentBox,
};
pub use change::{fund_change, ChangeComputation, ChangeDecision, ChangeError};
pub use distribution::{
    estimate_distribution_cost, plan_distribution, BatchError, BatchOutcome, DistributionCost,
    DistributionError, DistributionReport, Recipient,
};
pub use eip12::*;
pub use mint::{build_mint_tx, MintBuildResult, MintError, MintRequest, MintSummary};
pub use nft::{
    build_collection_mint_tx, build_nft_mint_tx, CollectionMetadata, NftMetadata,
    NftMintBuildResult, NftMintSummary,
};
pub use registers::{
    build_extension_map, build_register_map, ensure_dense, RegisterEntry, RegisterFailure,
    RegisterMapReport, ValueKind,
};
pub use royalty::{
    RoyaltyDistribution, RoyaltyError, RoyaltyRecipient, RoyaltyShare, RoyaltyStructure,
    MAX_BASIS_POINTS,
};
pub use sigma::*;
