//! An incremental transaction builder with pluggable coin selection.
//!
//! Intents accumulate one call at a time (spend this input, pay this
//! output, mint this asset, register this certificate, cast this vote,
//! withdraw these rewards), and [`TxBuilder::complete`] turns them into a
//! fee-balanced, serialized transaction: missing on-chain information is
//! resolved through a configured fetcher, additional inputs are chosen
//! under the configured selection strategy, change is constructed and
//! split where needed, and redeemer budgets are refined from script
//! evaluation before the final serialization.

mod balance;
mod builder;
mod core;
mod eval;
mod resolver;
mod selection;

pub mod prelude;

pub use builder::{BuildStatus, TxBuilder, TxBuilderOptions};
pub use selection::{CoinSelectionError, SelectionPhase};

use num_bigint::BigInt;
use thiserror::Error;

use klotho_common::interfaces::CollaboratorError;

#[derive(Debug, Error)]
pub enum TxBuilderError {
    /// Structural incompleteness, caught when an open item is flushed or
    /// the body is finalized.
    #[error("script input {0} does not contain datum information")]
    MissingDatum(String),
    #[error("script input {0} does not contain redeemer information")]
    MissingRedeemer(String),
    #[error("script input {0} does not contain script information")]
    MissingScriptSource(String),
    #[error("mint of {policy_id}.{asset_name} is missing script information")]
    MissingMintScript {
        policy_id: String,
        asset_name: String,
    },
    #[error("mint of {policy_id}.{asset_name} is missing redeemer information")]
    MissingMintRedeemer {
        policy_id: String,
        asset_name: String,
    },
    #[error("withdrawal {0} is missing script information")]
    MissingWithdrawalScript(String),
    #[error("withdrawal {0} is missing redeemer information")]
    MissingWithdrawalRedeemer(String),
    #[error("vote is missing script information")]
    MissingVoteScript,
    #[error("vote is missing redeemer information")]
    MissingVoteRedeemer,
    #[error("certificate is missing script information")]
    MissingCertificateScript,
    #[error("certificate is missing redeemer information")]
    MissingCertificateRedeemer,

    /// Accumulator misuse.
    #[error("no open {0} to attach to")]
    NoOpenItem(&'static str),
    #[error("datum attempted on a non plutus script input")]
    DatumOnNonScriptInput,
    #[error("redeemer attempted on an item that takes none")]
    RedeemerOnNonScriptItem,
    #[error("simple script reference attempted on a plutus script input")]
    SimpleScriptRefOnPlutusInput,
    #[error("a script is already attached to this input")]
    ScriptAlreadyAttached,
    #[error("no certificate to attach to")]
    NoCertificate,
    #[error("{0} is not a valid policy id")]
    InvalidPolicyId(String),
    #[error("{0} is not valid hex")]
    InvalidHex(String),
    #[error("no change address was set")]
    NoChangeAddress,

    /// Dependency resolution.
    #[error("transaction information is incomplete while no fetcher was provided")]
    NoFetcher,
    #[error("couldn't find utxo {tx_hash}#{index} in fetched outputs")]
    MissingUtxo { tx_hash: String, index: u32 },
    #[error("couldn't find value information for {tx_hash}#{index}")]
    MissingValueInfo { tx_hash: String, index: u32 },
    #[error("couldn't find address information for {tx_hash}#{index}")]
    MissingAddressInfo { tx_hash: String, index: u32 },
    #[error("couldn't find reference script at {tx_hash}#{index}")]
    MissingScriptRef { tx_hash: String, index: u32 },
    #[error("fetching utxos for {tx_hash} failed: {cause}")]
    FetchFailure {
        tx_hash: String,
        cause: CollaboratorError,
    },

    #[error(transparent)]
    CoinSelection(#[from] CoinSelectionError),

    /// Balancing.
    #[error("transaction size {size} exceeds the protocol maximum {max}")]
    MaxTxSizeExceeded { size: usize, max: u32 },
    #[error("value not conserved for {unit}: consumed {consumed}, produced {produced}")]
    ValueNotConserved {
        unit: String,
        consumed: BigInt,
        produced: BigInt,
    },

    /// Collaborator failures.
    #[error("tx evaluation failed: {cause}; for tx: {tx_hex}")]
    Evaluation {
        tx_hex: String,
        cause: CollaboratorError,
    },
    #[error("serialization failed: {0}")]
    Serialization(CollaboratorError),
    #[error("tx submission failed: {0}")]
    Submission(CollaboratorError),
    #[error("no submitter was provided")]
    NoSubmitter,

    #[error("build session already final; reset before reuse")]
    SessionFinalized,
}
