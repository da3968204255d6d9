use serde::{Deserialize, Serialize};

use crate::value::Asset;

/// Reference to a prior transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UtxoInput {
    pub tx_hash: String,
    pub output_index: u32,
}

/// The content sitting at an unspent output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub address: String,
    pub amount: Vec<Asset>,
    pub data_hash: Option<String>,
    pub plutus_data: Option<String>,
    /// CBOR hex of a reference script published at this output.
    pub script_ref: Option<String>,
    pub script_hash: Option<String>,
}

/// An unspent transaction output: the unit the coin selector consumes and
/// produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utxo {
    pub input: UtxoInput,
    pub output: UtxoOutput,
}

impl Utxo {
    pub fn new(tx_hash: impl Into<String>, output_index: u32, address: impl Into<String>, amount: Vec<Asset>) -> Self {
        Self {
            input: UtxoInput {
                tx_hash: tx_hash.into(),
                output_index,
            },
            output: UtxoOutput {
                address: address.into(),
                amount,
                data_hash: None,
                plutus_data: None,
                script_ref: None,
                script_hash: None,
            },
        }
    }

    /// Byte size of the reference script at this output, zero when there
    /// is none.
    pub fn script_ref_size(&self) -> usize {
        self.output
            .script_ref
            .as_ref()
            .map(|script| script.len() / 2)
            .unwrap_or(0)
    }
}
