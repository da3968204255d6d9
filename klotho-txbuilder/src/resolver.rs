//! Dependency resolution: partition declared items into complete and
//! incomplete, fetch the missing on-chain information (at most one lookup
//! per distinct transaction hash per session, lookups for distinct hashes
//! running concurrently), and back-fill values, addresses and
//! reference-script facts before anything downstream runs.

use std::collections::{BTreeSet, HashMap};

use futures::future::try_join_all;
use tracing::debug;

use klotho_common::types::{
    Certificate, MintItem, RefTxIn, ScriptSource, SimpleScriptSource, TxIn, TxInParameter, Utxo,
    UtxoInput, UtxoOutput, Vote, Voter, Withdrawal,
};

use crate::builder::TxBuilder;
use crate::TxBuilderError;

fn input_info_complete(parameter: &TxInParameter) -> bool {
    parameter.amount.is_some() && parameter.address.is_some()
}

fn inline_script_incomplete(source: &ScriptSource) -> Option<&str> {
    match source {
        ScriptSource::Inline {
            tx_hash,
            script_hash,
            script_size,
            ..
        } if script_hash.is_none() || script_size.is_none() => Some(tx_hash.as_str()),
        _ => None,
    }
}

fn inline_simple_script_incomplete(source: &SimpleScriptSource) -> Option<&str> {
    match source {
        SimpleScriptSource::Inline {
            tx_hash,
            simple_script_hash,
            script_size,
            ..
        } if simple_script_hash.is_none() || script_size.is_none() => Some(tx_hash.as_str()),
        _ => None,
    }
}

fn fill_input(
    parameter: &mut TxInParameter,
    queried: &HashMap<String, Vec<Utxo>>,
) -> Result<(), TxBuilderError> {
    let utxo = queried
        .get(&parameter.tx_hash)
        .and_then(|utxos| {
            utxos
                .iter()
                .find(|utxo| utxo.input.output_index == parameter.tx_index)
        })
        .ok_or_else(|| TxBuilderError::MissingUtxo {
            tx_hash: parameter.tx_hash.clone(),
            index: parameter.tx_index,
        })?;
    if parameter.amount.is_none() {
        if utxo.output.amount.is_empty() {
            return Err(TxBuilderError::MissingValueInfo {
                tx_hash: parameter.tx_hash.clone(),
                index: parameter.tx_index,
            });
        }
        parameter.amount = Some(utxo.output.amount.clone());
    }
    if parameter.address.is_none() {
        if utxo.output.address.is_empty() {
            return Err(TxBuilderError::MissingAddressInfo {
                tx_hash: parameter.tx_hash.clone(),
                index: parameter.tx_index,
            });
        }
        parameter.address = Some(utxo.output.address.clone());
    }
    if parameter.script_size.is_none() {
        parameter.script_size = Some(utxo.script_ref_size());
    }
    Ok(())
}

fn fill_script_source(
    source: &mut ScriptSource,
    queried: &HashMap<String, Vec<Utxo>>,
) -> Result<(), TxBuilderError> {
    let ScriptSource::Inline {
        tx_hash,
        tx_index,
        script_hash,
        script_size,
        ..
    } = source
    else {
        return Ok(());
    };
    if script_hash.is_some() && script_size.is_some() {
        return Ok(());
    }
    let utxo = queried
        .get(tx_hash.as_str())
        .and_then(|utxos| utxos.iter().find(|utxo| utxo.input.output_index == *tx_index))
        .ok_or_else(|| TxBuilderError::MissingUtxo {
            tx_hash: tx_hash.clone(),
            index: *tx_index,
        })?;
    let reference = utxo
        .output
        .script_ref
        .as_ref()
        .ok_or_else(|| TxBuilderError::MissingScriptRef {
            tx_hash: tx_hash.clone(),
            index: *tx_index,
        })?;
    if script_hash.is_none() {
        *script_hash = utxo.output.script_hash.clone();
    }
    *script_size = Some(reference.len() / 2);
    Ok(())
}

fn fill_simple_script_source(
    source: &mut SimpleScriptSource,
    queried: &HashMap<String, Vec<Utxo>>,
) -> Result<(), TxBuilderError> {
    let SimpleScriptSource::Inline {
        tx_hash,
        tx_index,
        simple_script_hash,
        script_size,
    } = source
    else {
        return Ok(());
    };
    if simple_script_hash.is_some() && script_size.is_some() {
        return Ok(());
    }
    let utxo = queried
        .get(tx_hash.as_str())
        .and_then(|utxos| utxos.iter().find(|utxo| utxo.input.output_index == *tx_index))
        .ok_or_else(|| TxBuilderError::MissingUtxo {
            tx_hash: tx_hash.clone(),
            index: *tx_index,
        })?;
    let reference = utxo
        .output
        .script_ref
        .as_ref()
        .ok_or_else(|| TxBuilderError::MissingScriptRef {
            tx_hash: tx_hash.clone(),
            index: *tx_index,
        })?;
    if simple_script_hash.is_none() {
        *simple_script_hash = utxo.output.script_hash.clone();
    }
    *script_size = Some(reference.len() / 2);
    Ok(())
}

impl TxBuilder {
    /// Hashes that still need a lookup for this body, in deterministic
    /// order.
    fn unresolved_tx_hashes(&self) -> BTreeSet<String> {
        let body = &self.tx_builder_body;
        let mut hashes = BTreeSet::new();

        for input in &body.inputs {
            if !input_info_complete(input.tx_in_parameter()) {
                hashes.insert(input.tx_in_parameter().tx_hash.clone());
            }
            match input {
                TxIn::Script { script_tx_in, .. } => {
                    if let Some(source) = &script_tx_in.script_source {
                        if let Some(hash) = inline_script_incomplete(source) {
                            hashes.insert(hash.to_string());
                        }
                    }
                }
                TxIn::SimpleScript {
                    simple_script_tx_in,
                    ..
                } => {
                    if let Some(source) = &simple_script_tx_in.script_source {
                        if let Some(hash) = inline_simple_script_incomplete(source) {
                            hashes.insert(hash.to_string());
                        }
                    }
                }
                TxIn::PubKey { .. } => {}
            }
        }
        for collateral in &body.collaterals {
            if !input_info_complete(collateral) {
                hashes.insert(collateral.tx_hash.clone());
            }
        }
        for mint in &body.mints {
            match mint {
                MintItem::Plutus {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                MintItem::Native {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_simple_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                _ => {}
            }
        }
        for withdrawal in &body.withdrawals {
            match withdrawal {
                Withdrawal::Script {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                Withdrawal::SimpleScript {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_simple_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                _ => {}
            }
        }
        for vote in &body.votes {
            match vote {
                Vote::Script {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                Vote::SimpleScript {
                    simple_script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_simple_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                _ => {}
            }
        }
        for cert in &body.certificates {
            match cert {
                Certificate::Script {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                Certificate::SimpleScript {
                    script_source: Some(source),
                    ..
                } => {
                    if let Some(hash) = inline_simple_script_incomplete(source) {
                        hashes.insert(hash.to_string());
                    }
                }
                _ => {}
            }
        }
        hashes
    }

    /// Resolve everything the body is missing, then canonicalize part
    /// order. Fails when lookups are needed but no fetcher is configured,
    /// or when a fetched response omits a referenced output.
    pub(crate) async fn complete_tx_parts(&mut self) -> Result<(), TxBuilderError> {
        let unresolved = self.unresolved_tx_hashes();
        if !unresolved.is_empty() && self.fetcher.is_none() {
            return Err(TxBuilderError::NoFetcher);
        }

        let to_fetch: Vec<String> = unresolved
            .into_iter()
            .filter(|hash| !self.queried_tx_hashes.contains(hash))
            .collect();
        if !to_fetch.is_empty() {
            let fetcher = self.fetcher.clone().ok_or(TxBuilderError::NoFetcher)?;
            debug!(lookups = to_fetch.len(), "resolving missing utxo information");
            let results = try_join_all(to_fetch.into_iter().map(|hash| {
                let fetcher = fetcher.clone();
                async move {
                    match fetcher.fetch_utxos(&hash).await {
                        Ok(utxos) => Ok((hash, utxos)),
                        Err(cause) => Err(TxBuilderError::FetchFailure { tx_hash: hash, cause }),
                    }
                }
            }))
            .await?;
            for (hash, utxos) in results {
                self.queried_tx_hashes.insert(hash.clone());
                self.queried_utxos.insert(hash, utxos);
            }
        }

        let queried = &self.queried_utxos;
        let body = &mut self.tx_builder_body;

        for input in body.inputs.iter_mut() {
            if !input_info_complete(input.tx_in_parameter()) {
                fill_input(input.tx_in_parameter_mut(), queried)?;
            }
            match input {
                TxIn::Script { script_tx_in, .. } => {
                    if let Some(source) = script_tx_in.script_source.as_mut() {
                        fill_script_source(source, queried)?;
                    }
                }
                TxIn::SimpleScript {
                    simple_script_tx_in,
                    ..
                } => {
                    if let Some(source) = simple_script_tx_in.script_source.as_mut() {
                        fill_simple_script_source(source, queried)?;
                    }
                }
                TxIn::PubKey { .. } => {}
            }
        }
        for collateral in body.collaterals.iter_mut() {
            if !input_info_complete(collateral) {
                fill_input(collateral, queried)?;
            }
        }
        for mint in body.mints.iter_mut() {
            match mint {
                MintItem::Plutus {
                    script_source: Some(source),
                    ..
                } => fill_script_source(source, queried)?,
                MintItem::Native {
                    script_source: Some(source),
                    ..
                } => fill_simple_script_source(source, queried)?,
                _ => {}
            }
        }
        for withdrawal in body.withdrawals.iter_mut() {
            match withdrawal {
                Withdrawal::Script {
                    script_source: Some(source),
                    ..
                } => fill_script_source(source, queried)?,
                Withdrawal::SimpleScript {
                    script_source: Some(source),
                    ..
                } => fill_simple_script_source(source, queried)?,
                _ => {}
            }
        }
        for vote in body.votes.iter_mut() {
            match vote {
                Vote::Script {
                    script_source: Some(source),
                    ..
                } => fill_script_source(source, queried)?,
                Vote::SimpleScript {
                    simple_script_source: Some(source),
                    ..
                } => fill_simple_script_source(source, queried)?,
                _ => {}
            }
        }
        for cert in body.certificates.iter_mut() {
            match cert {
                Certificate::Script {
                    script_source: Some(source),
                    ..
                } => fill_script_source(source, queried)?,
                Certificate::SimpleScript {
                    script_source: Some(source),
                    ..
                } => fill_simple_script_source(source, queried)?,
                _ => {}
            }
        }

        self.register_reference_inputs();
        self.record_inputs_for_evaluation();
        self.sort_tx_parts();
        Ok(())
    }

    /// Every item witnessed through an on-chain script, and every spent
    /// input that itself carries a reference script, contributes a
    /// read-only reference input; shared references collapse to one.
    pub(crate) fn register_reference_inputs(&mut self) {
        let body = &mut self.tx_builder_body;
        let mut references: Vec<RefTxIn> = Vec::new();

        for input in &body.inputs {
            let parameter = input.tx_in_parameter();
            if parameter.script_size.map_or(false, |size| size > 0) {
                references.push(RefTxIn {
                    tx_hash: parameter.tx_hash.clone(),
                    tx_index: parameter.tx_index,
                    script_size: parameter.script_size,
                });
            }
            match input {
                TxIn::Script { script_tx_in, .. } => {
                    if let Some(ScriptSource::Inline {
                        tx_hash,
                        tx_index,
                        script_size,
                        ..
                    }) = &script_tx_in.script_source
                    {
                        references.push(RefTxIn {
                            tx_hash: tx_hash.clone(),
                            tx_index: *tx_index,
                            script_size: *script_size,
                        });
                    }
                }
                TxIn::SimpleScript {
                    simple_script_tx_in,
                    ..
                } => {
                    if let Some(SimpleScriptSource::Inline {
                        tx_hash,
                        tx_index,
                        script_size,
                        ..
                    }) = &simple_script_tx_in.script_source
                    {
                        references.push(RefTxIn {
                            tx_hash: tx_hash.clone(),
                            tx_index: *tx_index,
                            script_size: *script_size,
                        });
                    }
                }
                TxIn::PubKey { .. } => {}
            }
        }

        let push_inline = |source: &ScriptSource, references: &mut Vec<RefTxIn>| {
            if let ScriptSource::Inline {
                tx_hash,
                tx_index,
                script_size,
                ..
            } = source
            {
                references.push(RefTxIn {
                    tx_hash: tx_hash.clone(),
                    tx_index: *tx_index,
                    script_size: *script_size,
                });
            }
        };
        let push_inline_simple = |source: &SimpleScriptSource, references: &mut Vec<RefTxIn>| {
            if let SimpleScriptSource::Inline {
                tx_hash,
                tx_index,
                script_size,
                ..
            } = source
            {
                references.push(RefTxIn {
                    tx_hash: tx_hash.clone(),
                    tx_index: *tx_index,
                    script_size: *script_size,
                });
            }
        };

        for mint in &body.mints {
            match mint {
                MintItem::Plutus {
                    script_source: Some(source),
                    ..
                } => push_inline(source, &mut references),
                MintItem::Native {
                    script_source: Some(source),
                    ..
                } => push_inline_simple(source, &mut references),
                _ => {}
            }
        }
        for withdrawal in &body.withdrawals {
            match withdrawal {
                Withdrawal::Script {
                    script_source: Some(source),
                    ..
                } => push_inline(source, &mut references),
                Withdrawal::SimpleScript {
                    script_source: Some(source),
                    ..
                } => push_inline_simple(source, &mut references),
                _ => {}
            }
        }
        for vote in &body.votes {
            match vote {
                Vote::Script {
                    script_source: Some(source),
                    ..
                } => push_inline(source, &mut references),
                Vote::SimpleScript {
                    simple_script_source: Some(source),
                    ..
                } => push_inline_simple(source, &mut references),
                _ => {}
            }
        }
        for cert in &body.certificates {
            match cert {
                Certificate::Script {
                    script_source: Some(source),
                    ..
                } => push_inline(source, &mut references),
                Certificate::SimpleScript {
                    script_source: Some(source),
                    ..
                } => push_inline_simple(source, &mut references),
                _ => {}
            }
        }

        for reference in references {
            if !body
                .reference_inputs
                .iter()
                .any(|existing| {
                    existing.tx_hash == reference.tx_hash && existing.tx_index == reference.tx_index
                })
            {
                body.reference_inputs.push(reference);
            }
        }
    }

    /// Snapshot every resolved input for the evaluator's benefit.
    pub(crate) fn record_inputs_for_evaluation(&mut self) {
        let queried = &self.queried_utxos;
        let body = &mut self.tx_builder_body;
        for input in &body.inputs {
            let parameter = input.tx_in_parameter();
            let (Some(amount), Some(address)) = (&parameter.amount, &parameter.address) else {
                continue;
            };
            let key = parameter.reference();
            let utxo = queried
                .get(&parameter.tx_hash)
                .and_then(|utxos| {
                    utxos
                        .iter()
                        .find(|utxo| utxo.input.output_index == parameter.tx_index)
                })
                .cloned()
                .unwrap_or_else(|| Utxo {
                    input: UtxoInput {
                        tx_hash: parameter.tx_hash.clone(),
                        output_index: parameter.tx_index,
                    },
                    output: UtxoOutput {
                        address: address.clone(),
                        amount: amount.clone(),
                        data_hash: None,
                        plutus_data: None,
                        script_ref: None,
                        script_hash: None,
                    },
                });
            body.inputs_for_evaluation.insert(key, utxo);
        }
    }

    /// Canonical ordering: inputs by reference, mints by policy id,
    /// withdrawals by reward address, votes by voter kind then
    /// credential.
    pub(crate) fn sort_tx_parts(&mut self) {
        let body = &mut self.tx_builder_body;
        body.inputs.sort_by(|a, b| {
            let (a, b) = (a.tx_in_parameter(), b.tx_in_parameter());
            a.tx_hash
                .cmp(&b.tx_hash)
                .then_with(|| a.tx_index.cmp(&b.tx_index))
        });
        body.mints
            .sort_by(|a, b| a.policy_id().cmp(b.policy_id()));
        body.withdrawals
            .sort_by(|a, b| a.address().cmp(b.address()));
        body.votes
            .sort_by(|a, b| voter_sort_key(&a.vote_type().voter).cmp(&voter_sort_key(&b.vote_type().voter)));
    }
}

fn voter_sort_key(voter: &Voter) -> (u8, u8, String) {
    match voter {
        Voter::ConstitutionalCommittee { hot_cred } => {
            let rank = match hot_cred {
                klotho_common::types::Credential::ScriptHash(_) => 0,
                klotho_common::types::Credential::KeyHash(_) => 1,
            };
            (0, rank, hot_cred.hash().to_string())
        }
        Voter::DRep { drep_id } => (1, 0, drep_id.clone()),
        Voter::StakingPool { key_hash } => (2, 0, key_hash.clone()),
    }
}
