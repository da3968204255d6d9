//! Fee computation and change balancing. The fee has three components:
//! the linear size fee, the tiered reference-script fee and the
//! execution-unit fee priced from the redeemer budgets. Because the
//! serialized size depends on the fee's own encoding and on the final
//! redeemer budgets, fee, change and selection expand together in a loop
//! until the fee is stable.

use std::collections::BTreeSet;

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use tracing::debug;

use klotho_common::types::{
    Certificate, CertificateType, MintItem, Output, RefTxIn, TxIn, TxInParameter, Utxo, Vote,
    Voter, Withdrawal,
};
use klotho_common::value::{Asset, Value, LOVELACE};
use klotho_common::Protocol;

use crate::builder::{BuildStatus, TxBuilder};
use crate::selection::{self, CoinSelectionError, SelectionPhase};
use crate::TxBuilderError;

/// Tier width of the reference-script fee schedule, in bytes.
pub(crate) const REF_SCRIPT_TIER_SIZE: u64 = 25600;

/// Constant byte overhead assumed on top of the serialized output when
/// computing its minimum coin quantity.
const MIN_UTXO_OVERHEAD_BYTES: u64 = 160;

fn big_pow(base: u32, exponent: u64) -> BigInt {
    let base = BigInt::from(base);
    let mut result = BigInt::one();
    for _ in 0..exponent {
        result *= &base;
    }
    result
}

fn ceil_div(numerator: BigInt, denominator: &BigInt) -> BigInt {
    (numerator + denominator - BigInt::one()) / denominator
}

pub(crate) fn linear_fee(params: &Protocol, tx_size: usize) -> BigInt {
    BigInt::from(params.min_fee_a) * BigInt::from(tx_size as u64) + BigInt::from(params.min_fee_b)
}

/// Reference-script fee: the per-byte price starts at the protocol base
/// and grows by 6/5 for every full 25600-byte tier, floored once at the
/// end. Exact rational arithmetic over the common denominator
/// 5^full_tiers.
pub(crate) fn tiered_ref_script_fee(base_fee_per_byte: u64, total_size: u64) -> BigInt {
    if total_size == 0 || base_fee_per_byte == 0 {
        return BigInt::zero();
    }
    let full_tiers = total_size / REF_SCRIPT_TIER_SIZE;
    let partial_tier_size = total_size % REF_SCRIPT_TIER_SIZE;
    let base = BigInt::from(base_fee_per_byte);
    let denominator = big_pow(5, full_tiers);

    let mut numerator = BigInt::zero();
    for tier in 0..full_tiers {
        numerator += &base
            * big_pow(6, tier)
            * big_pow(5, full_tiers - tier)
            * BigInt::from(REF_SCRIPT_TIER_SIZE);
    }
    if partial_tier_size > 0 {
        numerator += &base * big_pow(6, full_tiers) * BigInt::from(partial_tier_size);
    }
    numerator / denominator
}

/// Execution fee: `ceil(mem * price_mem + steps * price_step)` with the
/// prices kept as exact rationals.
pub(crate) fn execution_fee(params: &Protocol, mem: u64, steps: u64) -> BigInt {
    if mem == 0 && steps == 0 {
        return BigInt::zero();
    }
    let price_mem = params.price_mem;
    let price_step = params.price_step;
    let numerator = BigInt::from(mem)
        * BigInt::from(price_mem.numerator)
        * BigInt::from(price_step.denominator)
        + BigInt::from(steps)
            * BigInt::from(price_step.numerator)
            * BigInt::from(price_mem.denominator);
    let denominator = BigInt::from(price_mem.denominator) * BigInt::from(price_step.denominator);
    ceil_div(numerator, &denominator)
}

fn output_coin(output: &Output) -> BigInt {
    output
        .amount
        .iter()
        .filter(|asset| asset.is_lovelace())
        .map(|asset| asset.quantity.clone())
        .sum()
}

fn set_output_coin(output: &mut Output, coin: &BigInt) {
    for asset in &mut output.amount {
        if asset.is_lovelace() {
            asset.quantity = coin.clone();
            return;
        }
    }
    output.amount.push(Asset::new(LOVELACE, coin.clone()));
}

impl TxBuilder {
    pub(crate) fn total_execution_units(&self) -> (u64, u64) {
        let body = &self.tx_builder_body;
        let mut mem = 0u64;
        let mut steps = 0u64;
        let mut count = |budget: &klotho_common::types::Budget| {
            mem += budget.mem;
            steps += budget.steps;
        };
        for input in &body.inputs {
            if let TxIn::Script { script_tx_in, .. } = input {
                if let Some(redeemer) = &script_tx_in.redeemer {
                    count(&redeemer.ex_units);
                }
            }
        }
        for mint in &body.mints {
            if let MintItem::Plutus {
                redeemer: Some(redeemer),
                ..
            } = mint
            {
                count(&redeemer.ex_units);
            }
        }
        for cert in &body.certificates {
            if let Certificate::Script {
                redeemer: Some(redeemer),
                ..
            } = cert
            {
                count(&redeemer.ex_units);
            }
        }
        for withdrawal in &body.withdrawals {
            if let Withdrawal::Script {
                redeemer: Some(redeemer),
                ..
            } = withdrawal
            {
                count(&redeemer.ex_units);
            }
        }
        for vote in &body.votes {
            if let Vote::Script {
                redeemer: Some(redeemer),
                ..
            } = vote
            {
                count(&redeemer.ex_units);
            }
        }
        (mem, steps)
    }

    pub(crate) fn has_redeemers(&self) -> bool {
        let (mem, steps) = self.total_execution_units();
        mem > 0 || steps > 0
    }

    /// Total bytes of reference scripts the transaction relies on. The
    /// resolver and the selector have already collapsed every reference
    /// into `reference_inputs`, one entry per referenced output.
    pub(crate) fn total_ref_script_size(&self) -> u64 {
        self.tx_builder_body
            .reference_inputs
            .iter()
            .map(|reference| reference.script_size.unwrap_or(0) as u64)
            .sum()
    }

    pub(crate) fn calculate_fee_for_size(&self, tx_size: usize) -> BigInt {
        let (mem, steps) = self.total_execution_units();
        linear_fee(&self.protocol_params, tx_size)
            + tiered_ref_script_fee(
                self.protocol_params.min_fee_ref_script_cost_per_byte,
                self.total_ref_script_size(),
            )
            + execution_fee(&self.protocol_params, mem, steps)
    }

    /// Serialized size with mock signatures standing in for the witnesses
    /// the finished transaction will carry.
    pub(crate) fn mock_tx_size(&mut self) -> Result<usize, TxBuilderError> {
        self.tx_builder_body.expected_number_key_witnesses =
            self.collect_required_signatures().len().max(1);
        let tx_hex = self
            .serializer
            .serialize_tx_body_with_mock_signatures(&self.tx_builder_body, &self.protocol_params)
            .map_err(TxBuilderError::Serialization)?;
        Ok(tx_hex.len() / 2)
    }

    /// Distinct signer credentials, counted syntactically; extracting
    /// payment credentials from addresses belongs to the serializing
    /// side, and address granularity is equivalent for witness sizing.
    pub(crate) fn collect_required_signatures(&self) -> BTreeSet<String> {
        let body = &self.tx_builder_body;
        let mut signers = BTreeSet::new();
        for input in &body.inputs {
            if let TxIn::PubKey { tx_in } = input {
                if let Some(address) = &tx_in.address {
                    signers.insert(address.clone());
                }
            }
        }
        for collateral in &body.collaterals {
            if let Some(address) = &collateral.address {
                signers.insert(address.clone());
            }
        }
        for withdrawal in &body.withdrawals {
            if let Withdrawal::PubKey { address, .. } = withdrawal {
                signers.insert(address.clone());
            }
        }
        for cert in &body.certificates {
            if let Certificate::Basic { cert } = cert {
                match cert {
                    CertificateType::RegisterStake { stake_key_address }
                    | CertificateType::DeregisterStake { stake_key_address }
                    | CertificateType::DelegateStake {
                        stake_key_address, ..
                    }
                    | CertificateType::VoteDelegation {
                        stake_key_address, ..
                    }
                    | CertificateType::StakeAndVoteDelegation {
                        stake_key_address, ..
                    }
                    | CertificateType::StakeRegistrationAndDelegation {
                        stake_key_address, ..
                    }
                    | CertificateType::VoteRegistrationAndDelegation {
                        stake_key_address, ..
                    }
                    | CertificateType::StakeVoteRegistrationAndDelegation {
                        stake_key_address, ..
                    } => {
                        signers.insert(stake_key_address.clone());
                    }
                    CertificateType::RegisterPool { pool_params } => {
                        signers.insert(pool_params.operator.clone());
                        for owner in &pool_params.owners {
                            signers.insert(owner.clone());
                        }
                    }
                    CertificateType::RetirePool { pool_id, .. } => {
                        signers.insert(pool_id.clone());
                    }
                    CertificateType::DRepRegistration { drep_id, .. }
                    | CertificateType::DRepDeregistration { drep_id, .. }
                    | CertificateType::DRepUpdate { drep_id, .. } => {
                        signers.insert(drep_id.clone());
                    }
                    CertificateType::CommitteeHotAuth {
                        committee_cold_key_address,
                        ..
                    }
                    | CertificateType::CommitteeColdResign {
                        committee_cold_key_address,
                        ..
                    } => {
                        signers.insert(committee_cold_key_address.clone());
                    }
                }
            }
        }
        for vote in &body.votes {
            if let Vote::Basic { vote } = vote {
                match &vote.voter {
                    Voter::ConstitutionalCommittee { hot_cred } => {
                        signers.insert(hot_cred.hash().to_string());
                    }
                    Voter::DRep { drep_id } => {
                        signers.insert(drep_id.clone());
                    }
                    Voter::StakingPool { key_hash } => {
                        signers.insert(key_hash.clone());
                    }
                }
            }
        }
        for required in &body.required_signatures {
            signers.insert(required.clone());
        }
        signers
    }

    /// Minimum coin an output must carry for its serialized size.
    /// Iterated because raising the coin can widen the encoding.
    pub(crate) fn min_lovelace_for_output(
        &self,
        output: &Output,
    ) -> Result<BigInt, TxBuilderError> {
        let mut current = output.clone();
        let mut lovelace = output_coin(&current);
        let mut minimum = BigInt::zero();
        for _ in 0..3 {
            let serialized = self
                .serializer
                .serialize_output(&current)
                .map_err(TxBuilderError::Serialization)?;
            let size = serialized.len() / 2;
            let total = (BigInt::from(MIN_UTXO_OVERHEAD_BYTES) + BigInt::from(size as u64))
                * BigInt::from(self.protocol_params.coins_per_utxo_size);
            minimum = total.clone();
            if lovelace < total {
                lovelace = total;
            } else {
                break;
            }
            set_output_coin(&mut current, &lovelace);
        }
        Ok(minimum)
    }

    /// Outputs declared without any coin get their computed minimum.
    pub(crate) fn sanitize_outputs(&mut self) -> Result<(), TxBuilderError> {
        for index in 0..self.tx_builder_body.outputs.len() {
            let has_coin = self.tx_builder_body.outputs[index]
                .amount
                .iter()
                .any(|asset| asset.is_lovelace());
            if !has_coin {
                let minimum = self.min_lovelace_for_output(&self.tx_builder_body.outputs[index])?;
                self.tx_builder_body.outputs[index]
                    .amount
                    .push(Asset::new(LOVELACE, minimum));
            }
        }
        Ok(())
    }

    fn declared_output_value(&self, count: usize) -> Value {
        let mut total = Value::new();
        for output in self.tx_builder_body.outputs.iter().take(count) {
            total.merge(&Value::from_assets(&output.amount));
        }
        total
    }

    fn input_total_value(&self) -> Result<Value, TxBuilderError> {
        let mut total = Value::new();
        for input in &self.tx_builder_body.inputs {
            let parameter = input.tx_in_parameter();
            let amount =
                parameter
                    .amount
                    .as_ref()
                    .ok_or_else(|| TxBuilderError::MissingValueInfo {
                        tx_hash: parameter.tx_hash.clone(),
                        index: parameter.tx_index,
                    })?;
            total.merge(&Value::from_assets(amount));
        }
        Ok(total)
    }

    fn mint_value(&self) -> Value {
        let mut total = Value::new();
        for mint in &self.tx_builder_body.mints {
            total.add(&mint.unit(), mint.amount());
        }
        total
    }

    fn total_deposit(&self) -> u64 {
        let params = &self.protocol_params;
        self.tx_builder_body
            .certificates
            .iter()
            .map(|cert| match cert.cert_type() {
                CertificateType::RegisterStake { .. } => params.key_deposit,
                CertificateType::RegisterPool { .. } => params.pool_deposit,
                CertificateType::DRepRegistration { coin, .. }
                | CertificateType::StakeRegistrationAndDelegation { coin, .. }
                | CertificateType::VoteRegistrationAndDelegation { coin, .. }
                | CertificateType::StakeVoteRegistrationAndDelegation { coin, .. } => *coin,
                _ => 0,
            })
            .sum()
    }

    fn total_refund(&self) -> u64 {
        let params = &self.protocol_params;
        self.tx_builder_body
            .certificates
            .iter()
            .map(|cert| match cert.cert_type() {
                CertificateType::DeregisterStake { .. } => params.key_deposit,
                CertificateType::DRepDeregistration { coin, .. } => *coin,
                _ => 0,
            })
            .sum()
    }

    fn total_withdrawal(&self) -> u64 {
        self.tx_builder_body
            .withdrawals
            .iter()
            .map(Withdrawal::coin)
            .sum()
    }

    /// Value flowing in or out without touching a UTxO: withdrawals,
    /// deposit refunds and mint deltas credit the transaction, deposits
    /// debit it (negative entries).
    fn implicit_value(&self) -> Value {
        let mut value = Value::new();
        value.add(LOVELACE, &BigInt::from(self.total_withdrawal()));
        value.add(LOVELACE, &BigInt::from(self.total_refund()));
        value.add(LOVELACE, &(-BigInt::from(self.total_deposit())));
        value.merge(&self.mint_value());
        value
    }

    /// outputs + implicit debits − declared inputs − implicit credits;
    /// positive entries are what selection must still cover.
    fn required_value(&self) -> Result<Value, TxBuilderError> {
        let mut required = self.declared_output_value(self.tx_builder_body.outputs.len());
        required.subtract(&self.input_total_value()?);
        required.subtract(&self.implicit_value());
        Ok(required)
    }

    fn candidates_for_selection(&self) -> Vec<Utxo> {
        let used: BTreeSet<(String, u32)> = self
            .tx_builder_body
            .inputs
            .iter()
            .map(|input| {
                let parameter = input.tx_in_parameter();
                (parameter.tx_hash.clone(), parameter.tx_index)
            })
            .collect();
        self.tx_builder_body
            .extra_inputs
            .iter()
            .filter(|utxo| !used.contains(&(utxo.input.tx_hash.clone(), utxo.input.output_index)))
            .cloned()
            .collect()
    }

    /// Append a selected UTxO as a plain input; one carrying a reference
    /// script also registers a read-only reference input so its bytes are
    /// priced in.
    pub(crate) fn add_selected_utxo(&mut self, utxo: &Utxo) {
        let script_size = utxo.script_ref_size();
        self.tx_builder_body.inputs.push(TxIn::PubKey {
            tx_in: TxInParameter {
                tx_hash: utxo.input.tx_hash.clone(),
                tx_index: utxo.input.output_index,
                amount: Some(utxo.output.amount.clone()),
                address: Some(utxo.output.address.clone()),
                script_size: Some(script_size),
            },
        });
        if script_size > 0
            && !self.tx_builder_body.reference_inputs.iter().any(|reference| {
                reference.tx_hash == utxo.input.tx_hash
                    && reference.tx_index == utxo.input.output_index
            })
        {
            self.tx_builder_body.reference_inputs.push(RefTxIn {
                tx_hash: utxo.input.tx_hash.clone(),
                tx_index: utxo.input.output_index,
                script_size: Some(script_size),
            });
        }
        self.tx_builder_body.inputs_for_evaluation.insert(
            format!("{}#{}", utxo.input.tx_hash, utxo.input.output_index),
            utxo.clone(),
        );
    }

    /// The synchronous, network-free selection pass: cover the declared
    /// deficit plus threshold under the configured strategy and append
    /// the picks. No balancing happens here.
    pub(crate) fn add_utxos_from_selection(&mut self) -> Result<(), TxBuilderError> {
        let mut required = self.declared_output_value(self.tx_builder_body.outputs.len());
        for input in &self.tx_builder_body.inputs {
            if let Some(amount) = &input.tx_in_parameter().amount {
                required.subtract(&Value::from_assets(amount));
            }
        }
        required.subtract(&self.implicit_value());

        let config = self.tx_builder_body.selection_config.clone();
        let candidates = self.candidates_for_selection();
        let outcome = selection::select_utxos(
            config.strategy,
            &required,
            config.threshold,
            config.include_tx_fees,
            candidates,
        )?;
        for utxo in &outcome.selected {
            self.add_selected_utxo(utxo);
        }
        self.remove_duplicate_inputs();
        Ok(())
    }

    /// Build the change output(s) for the given leftover. Returns false
    /// as second element when the leftover cannot fund the change floor
    /// (or the fee), signalling the caller to draw another candidate.
    fn compute_change_outputs(
        &self,
        leftover: &Value,
        change_address: &str,
    ) -> Result<(Vec<Output>, bool), TxBuilderError> {
        if leftover.is_empty() {
            return Ok((Vec::new(), true));
        }

        let mut lovelace_available = leftover.coin();
        let positives = leftover.positives();
        let value_assets = positives.to_assets();
        let token_assets: Vec<Asset> = value_assets
            .iter()
            .filter(|asset| !asset.is_lovelace())
            .cloned()
            .collect();

        let bundle_exceeds = |assets: &[Asset]| -> Result<bool, TxBuilderError> {
            let serialized = self
                .serializer
                .serialize_value(assets)
                .map_err(TxBuilderError::Serialization)?;
            Ok(serialized.len() / 2 > self.protocol_params.max_val_size as usize)
        };

        let mut change_outputs = Vec::new();
        // any negative entry means the declared inputs cannot fund the
        // change as-is; the caller must draw further candidates
        let mut fulfilled = leftover.all_non_negative();

        if bundle_exceeds(&value_assets)? {
            // greedy bundle packing: fill until the ceiling, floor each
            // split output, start the next bundle with the overflowing
            // token. The coin entry is measured at its widest encoding so
            // the later floor/remainder adjustment cannot push a bundle
            // past the ceiling.
            let coin_placeholder = Asset::new(LOVELACE, u64::MAX);
            let mut bundle: Vec<Asset> = vec![coin_placeholder.clone()];
            for token in token_assets {
                bundle.push(token);
                if bundle_exceeds(&bundle)? {
                    let overflow = bundle.pop();
                    let mut output = Output::new(change_address, bundle);
                    output.datum = self.tx_builder_body.change_datum.clone();
                    let minimum = self.min_lovelace_for_output(&output)?;
                    output.amount[0].quantity = minimum.clone();
                    lovelace_available -= &minimum;
                    change_outputs.push(output);
                    bundle = vec![coin_placeholder.clone()];
                    if let Some(overflow) = overflow {
                        bundle.push(overflow);
                    }
                }
            }
            let mut output = Output::new(change_address, bundle);
            output.datum = self.tx_builder_body.change_datum.clone();
            let minimum = self.min_lovelace_for_output(&output)?;
            output.amount[0].quantity = minimum.clone();
            lovelace_available -= &minimum;
            change_outputs.push(output);

            if lovelace_available.is_positive() {
                if let Some(last) = change_outputs.last_mut() {
                    last.amount[0].quantity += &lovelace_available;
                }
            } else {
                fulfilled = false;
            }
        } else {
            let mut output = Output::new(change_address, value_assets);
            output.datum = self.tx_builder_body.change_datum.clone();
            if lovelace_available.is_negative() {
                fulfilled = false;
            } else {
                let minimum = self.min_lovelace_for_output(&output)?;
                if lovelace_available < minimum {
                    fulfilled = false;
                }
            }
            change_outputs.push(output);
        }

        Ok((change_outputs, fulfilled))
    }

    /// Selection, change and fee together: pick inputs for the deficit,
    /// then loop serializing with mock signatures, recomputing the fee
    /// and rebuilding change, drawing further candidates whenever the
    /// leftover cannot fund the fee or the change floor.
    pub(crate) async fn select_and_balance(&mut self) -> Result<(), TxBuilderError> {
        let change_address = self
            .tx_builder_body
            .change_address
            .clone()
            .ok_or(TxBuilderError::NoChangeAddress)?;

        let required = self.required_value()?;
        let config = self.tx_builder_body.selection_config.clone();
        let candidates = self.candidates_for_selection();
        let outcome = selection::select_utxos(
            config.strategy,
            &required,
            config.threshold,
            config.include_tx_fees,
            candidates,
        )?;
        debug!(
            selected = outcome.selected.len(),
            strategy = ?config.strategy,
            "coin selection complete"
        );
        for utxo in &outcome.selected {
            self.add_selected_utxo(utxo);
        }
        self.remove_duplicate_inputs();
        self.sort_tx_parts();
        self.status = BuildStatus::Selected;

        // candidates left for fee expansion, native coin descending
        let mut remaining = outcome.remaining;
        remaining.sort_by(|a, b| {
            selection::utxo_value(b)
                .coin()
                .cmp(&selection::utxo_value(a).coin())
                .then_with(|| a.input.tx_hash.cmp(&b.input.tx_hash))
                .then_with(|| a.input.output_index.cmp(&b.input.output_index))
        });

        let declared_outputs = self.tx_builder_body.outputs.len();
        let mut fee = self.manual_fee.clone().unwrap_or_else(BigInt::zero);
        let mut evaluated = false;
        let mut iteration = 0usize;
        let mut iteration_budget = 3 + remaining.len() + 8;

        loop {
            self.tx_builder_body.fee = Some(fee.clone());

            let mut leftover = self.input_total_value()?;
            leftover.merge(&self.implicit_value());
            leftover.subtract(&self.declared_output_value(declared_outputs));
            let negated_fee = -fee.clone();
            leftover.add(LOVELACE, &negated_fee);

            let (change_outputs, fulfilled) =
                self.compute_change_outputs(&leftover, &change_address)?;
            self.tx_builder_body.outputs.truncate(declared_outputs);
            self.tx_builder_body.outputs.extend(change_outputs);

            if !fulfilled {
                if remaining.is_empty() {
                    let mut shortfall = Value::new();
                    shortfall.subtract(&leftover);
                    return Err(CoinSelectionError {
                        phase: SelectionPhase::Final,
                        deficit: shortfall.positives(),
                    }
                    .into());
                }
                let utxo = remaining.remove(0);
                debug!(
                    utxo = %format!("{}#{}", utxo.input.tx_hash, utxo.input.output_index),
                    "drawing extra input for fee headroom"
                );
                self.add_selected_utxo(&utxo);
                self.sort_tx_parts();
                iteration_budget += 1;
                continue;
            }

            if self.evaluator.is_some() && self.has_redeemers() {
                self.evaluate_redeemers().await?;
                evaluated = true;
                self.status = BuildStatus::Evaluated;
            }

            let size = self.mock_tx_size()?;
            if self.status == BuildStatus::Selected {
                self.status = BuildStatus::Serialized;
            }
            let new_fee = match &self.manual_fee {
                Some(manual) => manual.clone(),
                None => self.calculate_fee_for_size(size),
            };

            if new_fee == fee {
                break;
            }
            fee = new_fee;
            iteration += 1;
            if iteration >= iteration_budget {
                // the size model stopped converging; keep the books
                // balanced with the staged fee
                break;
            }
        }

        self.tx_builder_body.fee = Some(fee.clone());
        if evaluated {
            self.status = BuildStatus::Reserialized;
        }
        self.verify_value_conservation(&fee)?;
        Ok(())
    }

    /// Per-unit conservation: inputs plus implicit credits must equal
    /// outputs plus fee plus implicit debits, exactly.
    pub(crate) fn verify_value_conservation(&self, fee: &BigInt) -> Result<(), TxBuilderError> {
        let mut consumed = self.input_total_value()?;
        consumed.merge(&self.implicit_value());
        let mut produced = self.declared_output_value(self.tx_builder_body.outputs.len());
        produced.add(LOVELACE, fee);

        let mut difference = consumed.clone();
        difference.subtract(&produced);
        if let Some((unit, _)) = difference.iter().next() {
            return Err(TxBuilderError::ValueNotConserved {
                unit: unit.clone(),
                consumed: consumed.get(unit),
                produced: produced.get(unit),
            });
        }
        Ok(())
    }
}
