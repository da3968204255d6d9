//! Capability contracts the engine consumes. Each trait is an abstract
//! collaborator — a remote provider, an encoder — not bound to any
//! transport; hosts hand implementations to the builder behind `Arc`s.

use serde::{Deserialize, Serialize};

pub use async_trait::async_trait;

use crate::protocol::Protocol;
use crate::types::{Budget, Output, TxBuilderBody, Utxo};
use crate::value::Asset;

/// Errors surfaced by a collaborator, carried through the engine opaquely.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Which redeemer an evaluation result refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RedeemerTag {
    Spend,
    Mint,
    Cert,
    Reward,
    Vote,
}

/// One per-redeemer execution cost reported by an evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub tag: RedeemerTag,
    pub index: u32,
    pub budget: Budget,
}

/// Looks up on-chain data the builder is missing. Must be idempotent per
/// hash within a session; the resolver memoizes repeated lookups.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_utxos(&self, tx_hash: &str) -> CollaboratorResult<Vec<Utxo>>;

    async fn fetch_address_utxos(
        &self,
        address: &str,
        asset: Option<&str>,
    ) -> CollaboratorResult<Vec<Utxo>>;
}

/// Runs the scripts of an unsigned transaction and reports per-redeemer
/// execution costs.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate_tx(
        &self,
        tx_hex: &str,
        additional_utxos: &[Utxo],
    ) -> CollaboratorResult<Vec<Action>>;
}

/// Encodes the logical body into the ledger's native format. Pure
/// encoding, so the interface stays synchronous. All return values are
/// hex-encoded bytes; the engine only ever inspects their length.
pub trait Serializer: Send + Sync {
    fn serialize_tx_body(
        &self,
        body: &TxBuilderBody,
        params: &Protocol,
    ) -> CollaboratorResult<String>;

    /// Like [`Serializer::serialize_tx_body`] but pads the witness set
    /// with `body.expected_number_key_witnesses` mock signatures, used to
    /// size the transaction before real witnesses exist.
    fn serialize_tx_body_with_mock_signatures(
        &self,
        body: &TxBuilderBody,
        params: &Protocol,
    ) -> CollaboratorResult<String>;

    fn add_signing_keys(
        &self,
        tx_hex: &str,
        signing_keys: &[String],
    ) -> CollaboratorResult<String>;

    fn serialize_output(&self, output: &Output) -> CollaboratorResult<String>;

    fn serialize_value(&self, assets: &[Asset]) -> CollaboratorResult<String>;
}

/// Hands a signed transaction to the network.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit_tx(&self, tx_hex: &str) -> CollaboratorResult<String>;
}
