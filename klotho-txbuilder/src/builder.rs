use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use num_bigint::BigInt;
use tracing::debug;

use klotho_common::interfaces::{Evaluator, Fetcher, Serializer, Submitter};
use klotho_common::types::{
    LanguageVersion, MintItem, Output, TxBuilderBody, TxIn, TxInParameter, Utxo, Vote, Withdrawal,
};
use klotho_common::{Protocol, RationalNumber};

use crate::TxBuilderError;

/// Stages of one build session. Every arrow is one-directional; `reset`
/// is the only way back to `Empty`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BuildStatus {
    #[default]
    Empty,
    Accumulating,
    Flushed,
    Resolved,
    Selected,
    Serialized,
    Evaluated,
    Reserialized,
    Final,
}

/// Collaborators and parameters a builder is constructed with. Only the
/// serializer is mandatory: without it nothing can be sized or encoded.
pub struct TxBuilderOptions {
    pub serializer: Arc<dyn Serializer>,
    pub fetcher: Option<Arc<dyn Fetcher>>,
    pub evaluator: Option<Arc<dyn Evaluator>>,
    pub submitter: Option<Arc<dyn Submitter>>,
    pub params: Option<Protocol>,
}

/// The transaction builder: one instance is one build session over one
/// mutable body. Nothing here is process-global; hosts wanting parallel
/// builds use independent instances.
pub struct TxBuilder {
    pub tx_builder_body: TxBuilderBody,
    pub(crate) protocol_params: Protocol,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) fetcher: Option<Arc<dyn Fetcher>>,
    pub(crate) evaluator: Option<Arc<dyn Evaluator>>,
    pub(crate) submitter: Option<Arc<dyn Submitter>>,
    pub(crate) status: BuildStatus,
    pub(crate) tx_hex: String,
    /// Safety margin applied to evaluator-reported budgets.
    pub(crate) tx_evaluation_multiplier: RationalNumber,
    pub(crate) manual_fee: Option<BigInt>,

    // one open slot per item kind
    pub(crate) tx_in_item: Option<TxIn>,
    pub(crate) tx_out_item: Option<Output>,
    pub(crate) collateral_item: Option<TxInParameter>,
    pub(crate) mint_item: Option<MintItem>,
    pub(crate) withdrawal_item: Option<Withdrawal>,
    pub(crate) vote_item: Option<Vote>,

    pub(crate) adding_plutus_input: bool,
    pub(crate) plutus_spending_script_version: Option<LanguageVersion>,
    pub(crate) adding_plutus_mint: bool,
    pub(crate) plutus_minting_script_version: Option<LanguageVersion>,
    pub(crate) adding_plutus_withdrawal: bool,
    pub(crate) plutus_withdrawal_script_version: Option<LanguageVersion>,
    pub(crate) adding_plutus_vote: bool,
    pub(crate) plutus_vote_script_version: Option<LanguageVersion>,

    // per-session lookup memo
    pub(crate) queried_tx_hashes: HashSet<String>,
    pub(crate) queried_utxos: HashMap<String, Vec<Utxo>>,
}

impl std::fmt::Debug for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxBuilder")
            .field("tx_builder_body", &self.tx_builder_body)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl TxBuilder {
    pub fn new(options: TxBuilderOptions) -> Self {
        Self {
            tx_builder_body: TxBuilderBody::default(),
            protocol_params: options.params.unwrap_or_default(),
            serializer: options.serializer,
            fetcher: options.fetcher,
            evaluator: options.evaluator,
            submitter: options.submitter,
            status: BuildStatus::default(),
            tx_hex: String::new(),
            tx_evaluation_multiplier: RationalNumber::new(11, 10),
            manual_fee: None,
            tx_in_item: None,
            tx_out_item: None,
            collateral_item: None,
            mint_item: None,
            withdrawal_item: None,
            vote_item: None,
            adding_plutus_input: false,
            plutus_spending_script_version: None,
            adding_plutus_mint: false,
            plutus_minting_script_version: None,
            adding_plutus_withdrawal: false,
            plutus_withdrawal_script_version: None,
            adding_plutus_vote: false,
            plutus_vote_script_version: None,
            queried_tx_hashes: HashSet::new(),
            queried_utxos: HashMap::new(),
        }
    }

    pub fn status(&self) -> BuildStatus {
        self.status
    }

    /// The serialized transaction produced by the last completion call.
    pub fn tx_hex(&self) -> &str {
        &self.tx_hex
    }

    /// Build the transaction, querying the blockchain for missing
    /// information, selecting inputs to cover the deficit and balancing
    /// fees and change. Returns the unsigned transaction in hex.
    pub async fn complete(&mut self) -> Result<String, TxBuilderError> {
        if self.status == BuildStatus::Final {
            return Err(TxBuilderError::SessionFinalized);
        }
        self.queue_all_last_item()?;
        self.status = BuildStatus::Flushed;
        self.remove_duplicate_inputs();
        self.remove_duplicate_ref_inputs();

        // the ledger ignores collateral script sizes for fee purposes
        for collateral in &mut self.tx_builder_body.collaterals {
            collateral.script_size = Some(0);
        }

        self.complete_tx_parts().await?;
        self.status = BuildStatus::Resolved;

        self.sanitize_outputs()?;
        self.sort_tx_parts();

        self.select_and_balance().await?;

        let tx_hex = self.serialize_body()?;
        let size = tx_hex.len() / 2;
        if size > self.protocol_params.max_tx_size as usize {
            return Err(TxBuilderError::MaxTxSizeExceeded {
                size,
                max: self.protocol_params.max_tx_size,
            });
        }
        debug!(size, "transaction body serialized");

        self.tx_hex = tx_hex.clone();
        self.status = BuildStatus::Final;
        Ok(tx_hex)
    }

    /// Build without touching the network: flush, dedup, run the
    /// configured selection strategy over the supplied candidate pool and
    /// serialize. Fees are not computed; set one with `set_fee` if the
    /// body needs it.
    pub fn complete_sync(&mut self) -> Result<String, TxBuilderError> {
        if self.status == BuildStatus::Final {
            return Err(TxBuilderError::SessionFinalized);
        }
        self.queue_all_last_item()?;
        self.remove_duplicate_inputs();
        self.remove_duplicate_ref_inputs();
        self.add_utxos_from_selection()?;
        let tx_hex = self.serialize_body()?;
        self.tx_hex = tx_hex.clone();
        Ok(tx_hex)
    }

    /// Serialize exactly what was declared: flush and dedup, nothing
    /// else. The result is unbalanced.
    pub fn complete_unbalanced(&mut self) -> Result<String, TxBuilderError> {
        if self.status == BuildStatus::Final {
            return Err(TxBuilderError::SessionFinalized);
        }
        self.queue_all_last_item()?;
        self.remove_duplicate_inputs();
        self.remove_duplicate_ref_inputs();
        let tx_hex = self.serialize_body()?;
        self.tx_hex = tx_hex.clone();
        Ok(tx_hex)
    }

    /// Apply the staged signing keys to the built transaction.
    pub fn complete_signing(&mut self) -> Result<String, TxBuilderError> {
        let signed = self
            .serializer
            .add_signing_keys(&self.tx_hex, &self.tx_builder_body.signing_keys)
            .map_err(TxBuilderError::Serialization)?;
        self.tx_hex = signed.clone();
        Ok(signed)
    }

    /// Hand a signed transaction to the configured submitter.
    pub async fn submit_tx(&self, tx_hex: &str) -> Result<String, TxBuilderError> {
        let submitter = self
            .submitter
            .as_ref()
            .ok_or(TxBuilderError::NoSubmitter)?;
        submitter
            .submit_tx(tx_hex)
            .await
            .map_err(TxBuilderError::Submission)
    }

    pub(crate) fn serialize_body(&self) -> Result<String, TxBuilderError> {
        self.serializer
            .serialize_tx_body(&self.tx_builder_body, &self.protocol_params)
            .map_err(TxBuilderError::Serialization)
    }
}
