//! EIP-12 Transaction Structures
//!
//! Defines the JSON structure dApp-connector wallets expect for signing, plus
//! the conversions between wallet input boxes and selector candidates.
//! Reference: EIP-12 dApp Connector specification

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use sigmakit_core::{BlockHeight, NanoErg, TokenId};

use crate::box_selector::{BoxParseError, SelectionResult, UnspentBox};
use crate::registers::build_extension_map;
use crate::sigma::{encode_for_register, RegisterCodecError, TypedValue};

/// EIP-12 token/asset in a box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip12Asset {
    pub token_id: String,
    pub amount: String,
}

impl Eip12Asset {
    pub fn new(token_id: impl Into<String>, amount: u64) -> Self {
        Self {
            token_id: token_id.into(),
            amount: amount.to_string(),
        }
    }

    /// Assets from a token balance map, in token id order
    pub fn from_map(tokens: &BTreeMap<TokenId, u64>) -> Vec<Self> {
        tokens
            .iter()
            .map(|(id, amount)| Self::new(id.as_str(), *amount))
            .collect()
    }
}

/// EIP-12 input box - FULL box data required for wallet to sign
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip12InputBox {
    pub box_id: String,
    /// Transaction ID where this box was created
    pub transaction_id: String,
    /// Output index in that transaction
    pub index: u16,
    pub value: String,
    pub ergo_tree: String,
    #[serde(default)]
    pub assets: Vec<Eip12Asset>,
    pub creation_height: BlockHeight,
    #[serde(default)]
    pub additional_registers: HashMap<String, String>,
    /// Context extension - always present for signing, can be empty
    #[serde(default)]
    pub extension: HashMap<String, String>,
}

impl Eip12InputBox {
    /// Attach context extension variables, replacing any already present
    pub fn with_extension(
        mut self,
        variables: &[(u8, TypedValue)],
    ) -> Result<Self, RegisterCodecError> {
        self.extension = build_extension_map(variables)?;
        Ok(self)
    }
}

impl TryFrom<&Eip12InputBox> for UnspentBox {
    type Error = BoxParseError;

    fn try_from(input: &Eip12InputBox) -> Result<Self, Self::Error> {
        let parse = |field: &'static str, value: &str| {
            value.parse::<u64>().map_err(|_| BoxParseError::InvalidAmount {
                box_id: input.box_id.clone(),
                field,
                value: value.to_string(),
            })
        };
        let erg_value = parse("value", &input.value)?;
        let assets = input
            .assets
            .iter()
            .map(|a| Ok((a.token_id.as_str(), parse("amount", &a.amount)?)))
            .collect::<Result<Vec<_>, BoxParseError>>()?;
        UnspentBox::from_parts(&input.box_id, erg_value, assets)
    }
}

/// Convert wallet boxes into selector candidates, keeping their order
pub fn to_unspent_boxes(inputs: &[Eip12InputBox]) -> Result<Vec<UnspentBox>, BoxParseError> {
    inputs.iter().map(UnspentBox::try_from).collect()
}

/// The wallet boxes matching a selection, in selection order
pub fn inputs_for_selection(
    inputs: &[Eip12InputBox],
    selection: &SelectionResult,
) -> Vec<Eip12InputBox> {
    let by_id: HashMap<&str, &Eip12InputBox> =
        inputs.iter().map(|b| (b.box_id.as_str(), b)).collect();
    selection
        .selected_boxes
        .iter()
        .filter_map(|b| by_id.get(b.box_id.as_str()).map(|input| (*input).clone()))
        .collect()
}

/// EIP-12 data input box - read but not spent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip12DataInputBox {
    pub box_id: String,
    pub transaction_id: String,
    pub index: u16,
    pub value: String,
    pub ergo_tree: String,
    pub assets: Vec<Eip12Asset>,
    pub creation_height: BlockHeight,
    pub additional_registers: HashMap<String, String>,
}

/// EIP-12 output box candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip12Output {
    pub value: String,
    pub ergo_tree: String,
    pub assets: Vec<Eip12Asset>,
    pub creation_height: BlockHeight,
    pub additional_registers: HashMap<String, String>,
}

impl Eip12Output {
    /// Create a simple output with no tokens or registers
    pub fn simple(value: NanoErg, ergo_tree: impl Into<String>, height: BlockHeight) -> Self {
        Self {
            value: value.to_string(),
            ergo_tree: ergo_tree.into(),
            assets: vec![],
            creation_height: height,
            additional_registers: HashMap::new(),
        }
    }

    /// Create a fee output to the miner
    pub fn fee(value: NanoErg, height: BlockHeight) -> Self {
        Self::simple(value, sigmakit_core::constants::MINER_FEE_ERGO_TREE, height)
    }

    /// Create a change output returning remaining ERG and tokens to the user.
    pub fn change(
        value: NanoErg,
        ergo_tree: impl Into<String>,
        assets: Vec<Eip12Asset>,
        height: BlockHeight,
    ) -> Self {
        Self {
            value: value.to_string(),
            ergo_tree: ergo_tree.into(),
            assets,
            creation_height: height,
            additional_registers: HashMap::new(),
        }
    }

    pub fn with_asset(mut self, token_id: impl Into<String>, amount: u64) -> Self {
        self.assets.push(Eip12Asset::new(token_id, amount));
        self
    }

    /// Encode `value` into `register_id` (R4..R9)
    pub fn with_register(
        mut self,
        register_id: &str,
        value: &TypedValue,
    ) -> Result<Self, RegisterCodecError> {
        let bytes = encode_for_register(register_id, value)?;
        self.additional_registers
            .insert(register_id.to_string(), hex::encode(bytes));
        Ok(self)
    }
}

/// Complete EIP-12 unsigned transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip12UnsignedTx {
    pub inputs: Vec<Eip12InputBox>,
    pub data_inputs: Vec<Eip12DataInputBox>,
    pub outputs: Vec<Eip12Output>,
}

impl Eip12UnsignedTx {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Sum of output values, fee included.
    ///
    /// `None` if a value is not a nanoERG integer or the sum overflows.
    pub fn total_output_value(&self) -> Option<NanoErg> {
        self.outputs.iter().try_fold(0 as NanoErg, |acc, o| {
            acc.checked_add(o.value.parse::<NanoErg>().ok()?)
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::box_selector::select_erg;

    pub(crate) fn mock_input(box_id: &str, value: u64, assets: Vec<(&str, u64)>) -> Eip12InputBox {
        Eip12InputBox {
            box_id: box_id.to_string(),
            transaction_id: "tx123".to_string(),
            index: 0,
            value: value.to_string(),
            ergo_tree: "0008cd...".to_string(),
            assets: assets
                .into_iter()
                .map(|(id, amt)| Eip12Asset::new(id, amt))
                .collect(),
            creation_height: 1000,
            additional_registers: HashMap::new(),
            extension: HashMap::new(),
        }
    }

    #[test]
    fn test_eip12_serialization() {
        let input = mock_input("abc123", 1_000_000, vec![]);

        let json = serde_json::to_string(&input).unwrap();

        // Check camelCase serialization
        assert!(json.contains("boxId"));
        assert!(json.contains("transactionId"));
        assert!(json.contains("ergoTree"));
        assert!(json.contains("creationHeight"));
        assert!(json.contains("additionalRegisters"));

        let parsed: Eip12InputBox = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.box_id, input.box_id);
        assert_eq!(parsed.transaction_id, input.transaction_id);
    }

    #[test]
    fn test_input_to_unspent_box() {
        let input = mock_input("box1", 2_000_000, vec![("tokenA", 10), ("tokenA", 5)]);
        let b = UnspentBox::try_from(&input).unwrap();
        assert_eq!(b.erg_value, 2_000_000);
        assert_eq!(b.token_amount(&TokenId::new("tokenA")), 15);

        let mut bad = input.clone();
        bad.value = "1.5".to_string();
        assert!(matches!(
            UnspentBox::try_from(&bad),
            Err(BoxParseError::InvalidAmount { field: "value", .. })
        ));
    }

    #[test]
    fn test_inputs_for_selection_keeps_selection_order() {
        let inputs = vec![
            mock_input("box1", 1_000_000, vec![]),
            mock_input("box2", 2_000_000, vec![]),
        ];
        let boxes = to_unspent_boxes(&inputs).unwrap();
        let selection = select_erg(&boxes, 2_500_000);

        let chosen = inputs_for_selection(&inputs, &selection);
        let ids: Vec<&str> = chosen.iter().map(|b| b.box_id.as_str()).collect();
        assert_eq!(ids, vec!["box1", "box2"]);
    }

    #[test]
    fn test_output_with_register() {
        let output = Eip12Output::simple(1_000_000, "0008cd...", 100)
            .with_register("R4", &TypedValue::Int(12345))
            .unwrap();
        assert_eq!(output.additional_registers["R4"], "0400003039");

        let err = Eip12Output::simple(1_000_000, "0008cd...", 100)
            .with_register("R10", &TypedValue::Int(1))
            .unwrap_err();
        assert_eq!(err, RegisterCodecError::InvalidRegisterId("R10".into()));
    }

    #[test]
    fn test_unsigned_tx_structure() {
        let tx = Eip12UnsignedTx {
            inputs: vec![],
            data_inputs: vec![],
            outputs: vec![
                Eip12Output::simple(2_000_000, "0008cd...", 12345).with_asset("tokenA", 5),
                Eip12Output::fee(1_100_000, 12345),
            ],
        };

        let json = tx.to_json().unwrap();
        assert!(json.contains("inputs"));
        assert!(json.contains("dataInputs"));
        assert!(json.contains("outputs"));
        assert_eq!(tx.total_output_value(), Some(3_100_000));
    }

    #[test]
    fn test_total_output_value_rejects_bad_values() {
        let mut tx = Eip12UnsignedTx {
            inputs: vec![],
            data_inputs: vec![],
            outputs: vec![
                Eip12Output::simple(u64::MAX, "0008cd...", 1),
                Eip12Output::fee(1, 1),
            ],
        };
        assert_eq!(tx.total_output_value(), None);

        tx.outputs[0].value = "12abc".to_string();
        assert_eq!(tx.total_output_value(), None);

        tx.outputs[0].value = "5".to_string();
        assert_eq!(tx.total_output_value(), Some(6));
    }

    // =========================================================================
    // Extension and data input tests
    // =========================================================================

    #[test]
    fn test_input_with_extension() {
        let input = mock_input("box1", 1_000_000, vec![])
            .with_extension(&[(0, TypedValue::Int(12345)), (1, TypedValue::Boolean(true))])
            .unwrap();
        assert_eq!(input.extension["0"], "0400003039");
        assert_eq!(input.extension["1"], "0101");

        // The extension travels with the box into a built transaction
        let inputs = vec![input];
        let boxes = to_unspent_boxes(&inputs).unwrap();
        let chosen = inputs_for_selection(&inputs, &select_erg(&boxes, 1));
        assert_eq!(chosen[0].extension.len(), 2);

        let err = mock_input("box1", 1_000_000, vec![])
            .with_extension(&[(7, TypedValue::Int(1)), (7, TypedValue::Int(2))])
            .unwrap_err();
        assert_eq!(err, RegisterCodecError::DuplicateExtensionKey(7));
    }

    #[test]
    fn test_unsigned_tx_with_data_input() {
        let json = r#"{
            "inputs": [],
            "dataInputs": [{
                "boxId": "oracle1",
                "transactionId": "tx9",
                "index": 1,
                "value": "1000000",
                "ergoTree": "100204a00b",
                "assets": [{"tokenId": "nft", "amount": "1"}],
                "creationHeight": 500,
                "additionalRegisters": {"R4": "05a09c01"}
            }],
            "outputs": []
        }"#;
        let tx: Eip12UnsignedTx = serde_json::from_str(json).unwrap();
        let data_input = &tx.data_inputs[0];
        assert_eq!(data_input.box_id, "oracle1");
        assert_eq!(data_input.assets, vec![Eip12Asset::new("nft", 1)]);
        assert_eq!(data_input.additional_registers["R4"], "05a09c01");

        let round_trip = tx.to_json().unwrap();
        assert!(round_trip.contains(r#""dataInputs":[{"boxId":"oracle1""#));
    }
}
