use std::collections::BTreeMap;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use crate::protocol::Network;

use super::certificate::Certificate;
use super::mint::MintItem;
use super::output::{Datum, Output};
use super::script::RefTxIn;
use super::txin::{TxIn, TxInParameter};
use super::utxo::Utxo;
use super::vote::Vote;
use super::withdrawal::Withdrawal;

/// How additional inputs are chosen to cover an outstanding deficit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoSelectionStrategy {
    LargestFirst,
    LargestFirstMultiAsset,
    KeepRelevant,
    #[default]
    CoverageFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub strategy: UtxoSelectionStrategy,
    /// Lovelace reserved on top of the deficit for fees and minimum-ada
    /// headroom.
    pub threshold: u64,
    /// Whether the threshold is meant to cover fees as well.
    pub include_tx_fees: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: UtxoSelectionStrategy::default(),
            threshold: 5_000_000,
            include_tx_fees: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityRange {
    pub invalid_before: Option<u64>,
    pub invalid_hereafter: Option<u64>,
}

/// The root aggregate a build session mutates: every declared intent plus
/// the session configuration. Fields marked `serde(skip)` are session
/// state handed to the selector or evaluator, not transaction content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxBuilderBody {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<Output>,
    pub collaterals: Vec<TxInParameter>,
    pub reference_inputs: Vec<RefTxIn>,
    pub mints: Vec<MintItem>,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<Withdrawal>,
    pub votes: Vec<Vote>,
    pub validity_range: ValidityRange,
    pub metadata: BTreeMap<u64, serde_json::Value>,
    pub required_signatures: Vec<String>,
    pub signing_keys: Vec<String>,
    pub network: Network,
    pub fee: Option<BigInt>,
    pub change_address: Option<String>,
    pub change_datum: Option<Datum>,
    /// Number of key witnesses the mock-signature serialization should
    /// assume when sizing the witness set.
    #[serde(skip)]
    pub expected_number_key_witnesses: usize,
    /// Spare UTxOs the selector may draw from.
    #[serde(skip)]
    pub extra_inputs: Vec<Utxo>,
    #[serde(skip)]
    pub selection_config: SelectionConfig,
    /// Resolved inputs handed to the evaluator alongside the serialized
    /// transaction, keyed `txhash#index`.
    #[serde(skip)]
    pub inputs_for_evaluation: BTreeMap<String, Utxo>,
}
