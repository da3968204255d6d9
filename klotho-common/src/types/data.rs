use serde::{Deserialize, Serialize};

/// An opaque datum/redeemer payload. The serializing side interprets it;
/// the engine only carries it around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuilderData {
    /// CBOR hex of already-encoded plutus data.
    Cbor(String),
    /// Raw-constructor style JSON, encoded by the serializer.
    Json(serde_json::Value),
}

/// Execution budget of one script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub mem: u64,
    pub steps: u64,
}

/// Budget assumed for a redeemer until an evaluator reports the real
/// cost.
pub const DEFAULT_REDEEMER_BUDGET: Budget = Budget {
    mem: 7_000_000,
    steps: 3_000_000_000,
};

/// Script input data plus the execution budget it is granted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redeemer {
    pub data: BuilderData,
    pub ex_units: Budget,
}

/// Where a spending datum comes from: provided alongside the input, or
/// inlined in the spent output itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatumSource {
    Provided { data: BuilderData },
    Inline { tx_hash: String, tx_index: u32 },
}
