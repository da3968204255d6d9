use serde::{Deserialize, Serialize};

use crate::value::Asset;

use super::data::{DatumSource, Redeemer};
use super::script::{ScriptSource, SimpleScriptSource};

/// The reference plus the locally known facts about a declared spend.
/// `amount`, `address` and `script_size` stay `None` until resolution
/// back-fills them from a UTxO lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxInParameter {
    pub tx_hash: String,
    pub tx_index: u32,
    pub amount: Option<Vec<Asset>>,
    pub address: Option<String>,
    /// Byte size of the reference script at the spent output, if any.
    pub script_size: Option<usize>,
}

impl TxInParameter {
    /// `txhash#index`, the conventional rendering of an input reference.
    pub fn reference(&self) -> String {
        format!("{}#{}", self.tx_hash, self.tx_index)
    }
}

/// The witnessing pieces a Plutus-locked spend needs on top of the input
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptTxInParameter {
    pub script_source: Option<ScriptSource>,
    pub datum_source: Option<DatumSource>,
    pub redeemer: Option<Redeemer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleScriptTxInParameter {
    pub script_source: Option<SimpleScriptSource>,
}

/// A declared spend, polymorphic over the witness kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TxIn {
    PubKey {
        tx_in: TxInParameter,
    },
    Script {
        tx_in: TxInParameter,
        script_tx_in: ScriptTxInParameter,
    },
    SimpleScript {
        tx_in: TxInParameter,
        simple_script_tx_in: SimpleScriptTxInParameter,
    },
}

impl TxIn {
    pub fn tx_in_parameter(&self) -> &TxInParameter {
        match self {
            TxIn::PubKey { tx_in }
            | TxIn::Script { tx_in, .. }
            | TxIn::SimpleScript { tx_in, .. } => tx_in,
        }
    }

    pub fn tx_in_parameter_mut(&mut self) -> &mut TxInParameter {
        match self {
            TxIn::PubKey { tx_in }
            | TxIn::Script { tx_in, .. }
            | TxIn::SimpleScript { tx_in, .. } => tx_in,
        }
    }
}
