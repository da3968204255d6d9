use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageVersion {
    V1,
    V2,
    V3,
}

/// A Plutus script provided as CBOR hex together with its language
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlutusScript {
    pub code: String,
    pub version: LanguageVersion,
}

/// A read-only reference to a previously published output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTxIn {
    pub tx_hash: String,
    pub tx_index: u32,
    /// Byte size of the reference script living at the referenced output,
    /// once known. Counted by the fee formula.
    pub script_size: Option<usize>,
}

/// Where the witnessing Plutus script comes from: embedded bytes, or a
/// reference to an output that already carries it on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptSource {
    Provided {
        script: PlutusScript,
    },
    Inline {
        tx_hash: String,
        tx_index: u32,
        script_hash: Option<String>,
        script_size: Option<usize>,
        version: LanguageVersion,
    },
}

/// Same split for native (phase-1) scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimpleScriptSource {
    Provided {
        script_code: String,
    },
    Inline {
        tx_hash: String,
        tx_index: u32,
        simple_script_hash: Option<String>,
        script_size: Option<usize>,
    },
}
