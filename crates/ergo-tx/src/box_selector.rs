//! UTXO selection utilities
//!
//! Greedy linear scan over the candidates in the order the caller gives them.
//! Boxes are taken whole and never reordered; the box that pushes a total over
//! its target is included. Running out of candidates is not an error here:
//! the partial [`SelectionResult`] is returned and the caller decides via
//! [`SelectionResult::ensure_sufficient`].

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use sigmakit_core::{BoxId, NanoErg, TokenId};

// =============================================================================
// Error types
// =============================================================================

/// Error returned when a selection cannot satisfy its targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoxSelectorError {
    InsufficientErg {
        required: NanoErg,
        available: NanoErg,
    },
    InsufficientToken {
        token_id: TokenId,
        required: u64,
        available: u64,
    },
}

impl fmt::Display for BoxSelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoxSelectorError::InsufficientErg {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient ERG: need {} nanoERG, have {}",
                    required, available
                )
            }
            BoxSelectorError::InsufficientToken {
                token_id,
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient token balance: need {} of {}, have {}",
                    required,
                    token_id.short(),
                    available
                )
            }
        }
    }
}

impl std::error::Error for BoxSelectorError {}

/// Malformed box data coming from the node or wallet
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoxParseError {
    #[error("Box {box_id}: invalid {field} '{value}'")]
    InvalidAmount {
        box_id: String,
        field: &'static str,
        value: String,
    },

    #[error("Box {box_id}: total of token {token_id} overflows u64")]
    TokenOverflow { box_id: String, token_id: String },
}

// =============================================================================
// Unspent boxes
// =============================================================================

/// Candidate input: a box id, its ERG value and its token balances.
///
/// Deserializes from the node's box JSON (`boxId`, `value`, `assets`), where
/// amounts may be numbers or decimal strings. Other fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "NodeBox", into = "NodeBox")]
pub struct UnspentBox {
    pub box_id: BoxId,
    pub erg_value: NanoErg,
    pub tokens: BTreeMap<TokenId, u64>,
}

impl UnspentBox {
    pub fn new(box_id: impl Into<String>, erg_value: NanoErg) -> Self {
        Self {
            box_id: BoxId::new(box_id),
            erg_value,
            tokens: BTreeMap::new(),
        }
    }

    /// Add a token balance (summed with any existing balance of the same id)
    pub fn with_token(mut self, token_id: impl Into<String>, amount: u64) -> Self {
        *self.tokens.entry(TokenId::new(token_id)).or_insert(0) += amount;
        self
    }

    pub fn token_amount(&self, token_id: &TokenId) -> u64 {
        self.tokens.get(token_id).copied().unwrap_or(0)
    }

    /// Build from raw parts, summing duplicate token entries
    pub fn from_parts<'a>(
        box_id: &str,
        erg_value: NanoErg,
        assets: impl IntoIterator<Item = (&'a str, u64)>,
    ) -> Result<Self, BoxParseError> {
        let mut tokens: BTreeMap<TokenId, u64> = BTreeMap::new();
        for (token_id, amount) in assets {
            let entry = tokens.entry(TokenId::new(token_id)).or_insert(0);
            *entry = entry
                .checked_add(amount)
                .ok_or_else(|| BoxParseError::TokenOverflow {
                    box_id: box_id.to_string(),
                    token_id: token_id.to_string(),
                })?;
        }
        Ok(Self {
            box_id: BoxId::new(box_id),
            erg_value,
            tokens,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum JsonAmount {
    Number(u64),
    Text(String),
}

impl JsonAmount {
    fn parse(&self, box_id: &str, field: &'static str) -> Result<u64, BoxParseError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s.parse().map_err(|_| BoxParseError::InvalidAmount {
                box_id: box_id.to_string(),
                field,
                value: s.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeAsset {
    token_id: String,
    amount: JsonAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeBox {
    box_id: String,
    value: JsonAmount,
    #[serde(default)]
    assets: Vec<NodeAsset>,
}

impl TryFrom<NodeBox> for UnspentBox {
    type Error = BoxParseError;

    fn try_from(raw: NodeBox) -> Result<Self, Self::Error> {
        let value = raw.value.parse(&raw.box_id, "value")?;
        let amounts = raw
            .assets
            .iter()
            .map(|a| Ok((a.token_id.as_str(), a.amount.parse(&raw.box_id, "amount")?)))
            .collect::<Result<Vec<_>, BoxParseError>>()?;
        UnspentBox::from_parts(&raw.box_id, value, amounts)
    }
}

impl From<UnspentBox> for NodeBox {
    fn from(b: UnspentBox) -> Self {
        NodeBox {
            box_id: b.box_id.0,
            value: JsonAmount::Number(b.erg_value),
            assets: b
                .tokens
                .into_iter()
                .map(|(token_id, amount)| NodeAsset {
                    token_id: token_id.0,
                    amount: JsonAmount::Number(amount),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Selection result
// =============================================================================

/// Token amount a selection has to cover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTarget {
    pub token_id: TokenId,
    pub amount: u64,
}

/// Boxes picked by a selection pass, in selection order, with their totals
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub selected_boxes: Vec<UnspentBox>,
    pub total_erg: NanoErg,
    /// Only present when a token target was requested
    pub total_token_amount: Option<u64>,
    pub target_erg: NanoErg,
    pub token_target: Option<TokenTarget>,
}

impl SelectionResult {
    fn empty(target_erg: NanoErg, token_target: Option<TokenTarget>) -> Self {
        let total_token_amount = token_target.as_ref().map(|_| 0);
        Self {
            selected_boxes: Vec::new(),
            total_erg: 0,
            total_token_amount,
            target_erg,
            token_target,
        }
    }

    fn push(&mut self, b: &UnspentBox) {
        self.total_erg = self.total_erg.saturating_add(b.erg_value);
        if let (Some(target), Some(total)) = (&self.token_target, self.total_token_amount.as_mut())
        {
            *total = total.saturating_add(b.token_amount(&target.token_id));
        }
        self.selected_boxes.push(b.clone());
    }

    /// Whether both targets are met
    pub fn is_sufficient(&self) -> bool {
        self.ensure_sufficient().is_ok()
    }

    /// Report an unmet target. A token shortfall is reported before an ERG one.
    pub fn ensure_sufficient(&self) -> Result<(), BoxSelectorError> {
        if let Some(target) = &self.token_target {
            let available = self.total_token_amount.unwrap_or(0);
            if available < target.amount {
                return Err(BoxSelectorError::InsufficientToken {
                    token_id: target.token_id.clone(),
                    required: target.amount,
                    available,
                });
            }
        }
        if self.total_erg < self.target_erg {
            return Err(BoxSelectorError::InsufficientErg {
                required: self.target_erg,
                available: self.total_erg,
            });
        }
        Ok(())
    }

    /// `ensure_sufficient`, keeping the result on success
    pub fn into_checked(self) -> Result<Self, BoxSelectorError> {
        self.ensure_sufficient()?;
        Ok(self)
    }

    pub fn box_ids(&self) -> Vec<&BoxId> {
        self.selected_boxes.iter().map(|b| &b.box_id).collect()
    }
}

// =============================================================================
// Selection functions
// =============================================================================

/// Take boxes in order until `target_erg` is covered.
///
/// Each box is appended before the total is checked, so a non-empty pool
/// always yields at least one box, even for a zero target.
pub fn select_erg(boxes: &[UnspentBox], target_erg: NanoErg) -> SelectionResult {
    let mut result = SelectionResult::empty(target_erg, None);
    for b in boxes {
        result.push(b);
        if result.total_erg >= target_erg {
            break;
        }
    }
    result
}

/// Take boxes holding `token_id`, in order, until `target_amount` is covered.
///
/// Boxes without the token are skipped. `total_erg` is the ERG carried by the
/// token boxes; no ERG target is set.
pub fn select_token(boxes: &[UnspentBox], token_id: &TokenId, target_amount: u64) -> SelectionResult {
    let mut result = SelectionResult::empty(
        0,
        Some(TokenTarget {
            token_id: token_id.clone(),
            amount: target_amount,
        }),
    );
    for b in boxes.iter().filter(|b| b.token_amount(token_id) > 0) {
        result.push(b);
        if result.total_token_amount.unwrap_or(0) >= target_amount {
            break;
        }
    }
    result
}

/// Cover a token amount first, then top up ERG from the remaining boxes.
///
/// The ERG pass runs only when the token boxes leave an ERG shortfall. It
/// scans boxes not already taken by the token pass and stops once the ERG
/// carried by all selected boxes reaches `erg_target`.
pub fn select_token_and_erg(
    boxes: &[UnspentBox],
    token_id: &TokenId,
    token_target: u64,
    erg_target: NanoErg,
) -> SelectionResult {
    let mut result = select_token(boxes, token_id, token_target);
    result.target_erg = erg_target;

    if result.total_erg >= erg_target {
        return result;
    }

    let taken: HashSet<BoxId> = result
        .selected_boxes
        .iter()
        .map(|b| b.box_id.clone())
        .collect();

    for b in boxes.iter().filter(|b| !taken.contains(&b.box_id)) {
        result.push(b);
        if result.total_erg >= erg_target {
            break;
        }
    }
    result
}

/// All tokens held by `selected`, minus an optional spent amount of one token.
///
/// Zero balances are dropped. Anything returned has to go to a change output.
pub fn collect_change_tokens(
    selected: &[UnspentBox],
    spent_token: Option<(&TokenId, u64)>,
) -> BTreeMap<TokenId, u64> {
    let mut token_totals: BTreeMap<TokenId, u64> = BTreeMap::new();
    for b in selected {
        for (token_id, amount) in &b.tokens {
            let total = token_totals.entry(token_id.clone()).or_insert(0);
            *total = total.saturating_add(*amount);
        }
    }

    if let Some((token_id, amount)) = spent_token {
        if let Some(total) = token_totals.get_mut(token_id) {
            *total = total.saturating_sub(amount);
        }
    }

    token_totals.retain(|_, amount| *amount > 0);
    token_totals
}
