//! Mock collaborators shared by the integration tests. The serializer
//! does not produce real ledger CBOR; it returns zero-filled hex whose
//! length follows the native encoding's size rules (inputs as 36-byte
//! references, assets grouped by policy, witnesses ~100 bytes each), so
//! every size-driven computation in the engine behaves realistically.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use num_bigint::BigInt;

use klotho_txbuilder::prelude::*;

pub const PAYER: &str = "addr_test1payer000000000000000000000000000000000000000000";
pub const RECIPIENT: &str = "addr_test1recipient0000000000000000000000000000000000000";
pub const CHANGE: &str = "addr_test1change000000000000000000000000000000000000000000";

pub const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const HASH_C: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";
pub const HASH_D: &str = "dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd";

pub const POLICY_A: &str = "11111111111111111111111111111111111111111111111111111111";
pub const POLICY_B: &str = "22222222222222222222222222222222222222222222222222222222";
pub const POLICY_C: &str = "33333333333333333333333333333333333333333333333333333333";

const INPUT_REF_BYTES: usize = 37;
const WITNESS_BYTES: usize = 100;

fn quantity_bytes(quantity: &BigInt) -> usize {
    quantity.bits() as usize / 8 + 1
}

fn value_size(assets: &[Asset]) -> usize {
    let mut policies = HashSet::new();
    let mut size = 4;
    for asset in assets {
        if asset.is_lovelace() {
            size += 9;
            continue;
        }
        let policy_len = POLICY_ID_LENGTH.min(asset.unit.len());
        let (policy, name) = asset.unit.split_at(policy_len);
        if policies.insert(policy.to_string()) {
            size += 30;
        }
        size += name.len() / 2 + 2 + quantity_bytes(&asset.quantity);
    }
    size
}

fn data_size(data: &BuilderData) -> usize {
    match data {
        BuilderData::Cbor(cbor_hex) => cbor_hex.len() / 2,
        BuilderData::Json(json) => json.to_string().len(),
    }
}

fn datum_size(datum: &Datum) -> usize {
    match datum {
        // hashes on the output, payloads in the witness set
        Datum::Hash { .. } | Datum::Embedded { .. } => 36,
        Datum::Inline { data } => data_size(data) + 4,
    }
}

fn output_size(output: &Output) -> usize {
    output.address.len() / 2
        + 4
        + value_size(&output.amount)
        + output.datum.as_ref().map(datum_size).unwrap_or(0)
        + output
            .reference_script
            .as_ref()
            .map(|script| script.code.len() / 2 + 4)
            .unwrap_or(0)
}

fn script_source_size(source: &ScriptSource) -> usize {
    match source {
        ScriptSource::Provided { script } => script.code.len() / 2 + 4,
        // referenced scripts cost no body bytes
        ScriptSource::Inline { .. } => 0,
    }
}

fn simple_script_source_size(source: &SimpleScriptSource) -> usize {
    match source {
        SimpleScriptSource::Provided { script_code } => script_code.len() / 2 + 4,
        SimpleScriptSource::Inline { .. } => 0,
    }
}

fn redeemer_size(redeemer: &Redeemer) -> usize {
    data_size(&redeemer.data) + 16
}

fn body_size(body: &TxBuilderBody) -> usize {
    let mut size = 16;
    size += body.inputs.len() * INPUT_REF_BYTES;
    for input in &body.inputs {
        match input {
            TxIn::Script { script_tx_in, .. } => {
                if let Some(source) = &script_tx_in.script_source {
                    size += script_source_size(source);
                }
                if let Some(DatumSource::Provided { data }) = &script_tx_in.datum_source {
                    size += data_size(data);
                }
                if let Some(redeemer) = &script_tx_in.redeemer {
                    size += redeemer_size(redeemer);
                }
            }
            TxIn::SimpleScript {
                simple_script_tx_in,
                ..
            } => {
                if let Some(source) = &simple_script_tx_in.script_source {
                    size += simple_script_source_size(source);
                }
            }
            TxIn::PubKey { .. } => {}
        }
    }
    for output in &body.outputs {
        size += output_size(output);
    }
    size += body.reference_inputs.len() * INPUT_REF_BYTES;
    size += body.collaterals.len() * INPUT_REF_BYTES;
    for mint in &body.mints {
        size += 32 + quantity_bytes(mint.amount());
        match mint {
            MintItem::Plutus {
                script_source,
                redeemer,
                ..
            } => {
                if let Some(source) = script_source {
                    size += script_source_size(source);
                }
                if let Some(redeemer) = redeemer {
                    size += redeemer_size(redeemer);
                }
            }
            MintItem::Native { script_source, .. } => {
                if let Some(source) = script_source {
                    size += simple_script_source_size(source);
                }
            }
        }
    }
    for cert in &body.certificates {
        size += 40;
        match cert {
            Certificate::Script {
                script_source,
                redeemer,
                ..
            } => {
                if let Some(source) = script_source {
                    size += script_source_size(source);
                }
                if let Some(redeemer) = redeemer {
                    size += redeemer_size(redeemer);
                }
            }
            Certificate::SimpleScript { script_source, .. } => {
                if let Some(source) = script_source {
                    size += simple_script_source_size(source);
                }
            }
            Certificate::Basic { .. } => {}
        }
    }
    for withdrawal in &body.withdrawals {
        size += withdrawal.address().len() / 2 + 9;
        match withdrawal {
            Withdrawal::Script {
                script_source,
                redeemer,
                ..
            } => {
                if let Some(source) = script_source {
                    size += script_source_size(source);
                }
                if let Some(redeemer) = redeemer {
                    size += redeemer_size(redeemer);
                }
            }
            Withdrawal::SimpleScript { script_source, .. } => {
                if let Some(source) = script_source {
                    size += simple_script_source_size(source);
                }
            }
            Withdrawal::PubKey { .. } => {}
        }
    }
    for vote in &body.votes {
        size += 48;
        match vote {
            Vote::Script {
                script_source,
                redeemer,
                ..
            } => {
                if let Some(source) = script_source {
                    size += script_source_size(source);
                }
                if let Some(redeemer) = redeemer {
                    size += redeemer_size(redeemer);
                }
            }
            Vote::SimpleScript {
                simple_script_source,
                ..
            } => {
                if let Some(source) = simple_script_source {
                    size += simple_script_source_size(source);
                }
            }
            Vote::Basic { .. } => {}
        }
    }
    if body.validity_range.invalid_before.is_some() {
        size += 5;
    }
    if body.validity_range.invalid_hereafter.is_some() {
        size += 5;
    }
    for (_, value) in &body.metadata {
        size += 4 + value.to_string().len();
    }
    size += body.required_signatures.len() * 29;
    size
}

fn zeroed_hex(size: usize) -> String {
    hex::encode(vec![0u8; size])
}

pub struct MockSerializer;

impl Serializer for MockSerializer {
    fn serialize_tx_body(
        &self,
        body: &TxBuilderBody,
        _params: &Protocol,
    ) -> CollaboratorResult<String> {
        Ok(zeroed_hex(body_size(body)))
    }

    fn serialize_tx_body_with_mock_signatures(
        &self,
        body: &TxBuilderBody,
        _params: &Protocol,
    ) -> CollaboratorResult<String> {
        Ok(zeroed_hex(
            body_size(body) + WITNESS_BYTES * body.expected_number_key_witnesses,
        ))
    }

    fn add_signing_keys(
        &self,
        tx_hex: &str,
        signing_keys: &[String],
    ) -> CollaboratorResult<String> {
        let mut bytes = hex::decode(tx_hex)?;
        bytes.extend(std::iter::repeat(0u8).take(WITNESS_BYTES * signing_keys.len()));
        Ok(hex::encode(bytes))
    }

    fn serialize_output(&self, output: &Output) -> CollaboratorResult<String> {
        Ok(zeroed_hex(output_size(output)))
    }

    fn serialize_value(&self, assets: &[Asset]) -> CollaboratorResult<String> {
        Ok(zeroed_hex(value_size(assets)))
    }
}

#[derive(Default)]
pub struct MockFetcher {
    pub utxos: HashMap<String, Vec<Utxo>>,
    pub calls: AtomicUsize,
}

impl MockFetcher {
    pub fn with(utxos: Vec<Utxo>) -> Self {
        let mut map: HashMap<String, Vec<Utxo>> = HashMap::new();
        for utxo in utxos {
            map.entry(utxo.input.tx_hash.clone()).or_default().push(utxo);
        }
        Self {
            utxos: map,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_utxos(&self, tx_hash: &str) -> CollaboratorResult<Vec<Utxo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.utxos.get(tx_hash).cloned().unwrap_or_default())
    }

    async fn fetch_address_utxos(
        &self,
        address: &str,
        _asset: Option<&str>,
    ) -> CollaboratorResult<Vec<Utxo>> {
        Ok(self
            .utxos
            .values()
            .flatten()
            .filter(|utxo| utxo.output.address == address)
            .cloned()
            .collect())
    }
}

pub struct MockEvaluator {
    pub actions: Vec<Action>,
}

#[async_trait]
impl Evaluator for MockEvaluator {
    async fn evaluate_tx(
        &self,
        _tx_hex: &str,
        _additional_utxos: &[Utxo],
    ) -> CollaboratorResult<Vec<Action>> {
        Ok(self.actions.clone())
    }
}

pub struct FailingEvaluator;

#[async_trait]
impl Evaluator for FailingEvaluator {
    async fn evaluate_tx(
        &self,
        _tx_hex: &str,
        _additional_utxos: &[Utxo],
    ) -> CollaboratorResult<Vec<Action>> {
        Err("script execution failed".into())
    }
}

pub struct MockSubmitter;

#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit_tx(&self, _tx_hex: &str) -> CollaboratorResult<String> {
        Ok(HASH_D.to_string())
    }
}

pub fn builder() -> TxBuilder {
    TxBuilder::new(TxBuilderOptions {
        serializer: Arc::new(MockSerializer),
        fetcher: None,
        evaluator: None,
        submitter: None,
        params: None,
    })
}

pub fn builder_with(
    fetcher: Option<Arc<dyn Fetcher>>,
    evaluator: Option<Arc<dyn Evaluator>>,
    submitter: Option<Arc<dyn Submitter>>,
) -> TxBuilder {
    TxBuilder::new(TxBuilderOptions {
        serializer: Arc::new(MockSerializer),
        fetcher,
        evaluator,
        submitter,
        params: None,
    })
}

pub fn ada_utxo(tx_hash: &str, index: u32, lovelace: u64) -> Utxo {
    Utxo::new(tx_hash, index, PAYER, vec![Asset::lovelace(lovelace)])
}

pub fn token_utxo(tx_hash: &str, index: u32, lovelace: u64, unit: &str, quantity: u64) -> Utxo {
    Utxo::new(
        tx_hash,
        index,
        PAYER,
        vec![Asset::lovelace(lovelace), Asset::new(unit, quantity)],
    )
}

/// Sum of the native coin over a slice of assets.
pub fn coin_of(assets: &[Asset]) -> BigInt {
    Value::from_assets(assets).coin()
}
