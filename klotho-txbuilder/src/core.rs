//! The incremental accumulator: one call per intent, one open slot per
//! item kind. Starting a new item of a kind flushes the previous one into
//! the body, validating it is structurally complete first. Finalization
//! flushes all still-open items in a fixed order.

use std::collections::HashSet;

use num_bigint::BigInt;

use klotho_common::types::{
    Anchor, BuilderData, Certificate, CertificateType, Datum, DatumSource, DRep, LanguageVersion,
    MintItem, Output, PlutusScript, PoolParams, Redeemer, RefTxIn, ScriptSource,
    ScriptTxInParameter, SimpleScriptSource, SimpleScriptTxInParameter, TxBuilderBody, TxIn,
    TxInParameter, Utxo, UtxoSelectionStrategy, Vote, Voter, VoteType, VotingProcedure,
    Withdrawal, DEFAULT_REDEEMER_BUDGET,
};
use klotho_common::value::{Asset, POLICY_ID_LENGTH};
use klotho_common::{Network, Protocol};

use crate::builder::{BuildStatus, TxBuilder};
use crate::TxBuilderError;

type BuilderResult<'a> = Result<&'a mut TxBuilder, TxBuilderError>;

impl TxBuilder {
    fn touch(&mut self) {
        if self.status == BuildStatus::Empty {
            self.status = BuildStatus::Accumulating;
        }
    }

    /// Declare an input. Value and address may be left out and resolved
    /// later through the configured fetcher.
    pub fn tx_in(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        amount: Option<Vec<Asset>>,
        address: Option<&str>,
    ) -> BuilderResult<'_> {
        if self.tx_in_item.is_some() {
            self.queue_input()?;
        }
        self.touch();
        let tx_in = TxInParameter {
            tx_hash: tx_hash.to_string(),
            tx_index,
            amount,
            address: address.map(str::to_string),
            script_size: None,
        };
        self.tx_in_item = Some(if self.adding_plutus_input {
            TxIn::Script {
                tx_in,
                script_tx_in: ScriptTxInParameter::default(),
            }
        } else {
            TxIn::PubKey { tx_in }
        });
        self.adding_plutus_input = false;
        Ok(self)
    }

    /// Attach a script to the most recently declared input. On a plain
    /// input this turns it into a native-script spend; on a plutus input
    /// it provides the spending script.
    pub fn tx_in_script(&mut self, script_cbor: &str) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .take()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        let item = match item {
            TxIn::PubKey { tx_in } => TxIn::SimpleScript {
                tx_in,
                simple_script_tx_in: SimpleScriptTxInParameter {
                    script_source: Some(SimpleScriptSource::Provided {
                        script_code: script_cbor.to_string(),
                    }),
                },
            },
            TxIn::Script {
                tx_in,
                mut script_tx_in,
            } => {
                script_tx_in.script_source = Some(ScriptSource::Provided {
                    script: PlutusScript {
                        code: script_cbor.to_string(),
                        version: self
                            .plutus_spending_script_version
                            .unwrap_or(LanguageVersion::V2),
                    },
                });
                TxIn::Script { tx_in, script_tx_in }
            }
            TxIn::SimpleScript {
                tx_in,
                mut simple_script_tx_in,
            } => {
                simple_script_tx_in.script_source = Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                });
                TxIn::SimpleScript {
                    tx_in,
                    simple_script_tx_in,
                }
            }
        };
        self.tx_in_item = Some(item);
        Ok(self)
    }

    /// Provide the datum for the most recently declared plutus input.
    pub fn tx_in_datum_value(&mut self, data: BuilderData) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        match item {
            TxIn::Script { script_tx_in, .. } => {
                script_tx_in.datum_source = Some(DatumSource::Provided { data });
                Ok(self)
            }
            _ => Err(TxBuilderError::DatumOnNonScriptInput),
        }
    }

    /// Tell the builder the spent output carries an inline datum.
    pub fn tx_in_inline_datum_present(&mut self) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        match item {
            TxIn::Script { tx_in, script_tx_in } => {
                script_tx_in.datum_source = Some(DatumSource::Inline {
                    tx_hash: tx_in.tx_hash.clone(),
                    tx_index: tx_in.tx_index,
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::DatumOnNonScriptInput),
        }
    }

    /// Provide the redeemer for the most recently declared plutus input.
    pub fn tx_in_redeemer_value(
        &mut self,
        data: BuilderData,
        ex_units: Option<klotho_common::types::Budget>,
    ) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        match item {
            TxIn::Script { script_tx_in, .. } => {
                script_tx_in.redeemer = Some(Redeemer {
                    data,
                    ex_units: ex_units.unwrap_or(DEFAULT_REDEEMER_BUDGET),
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Signal that the next input is locked by a plutus script of the
    /// given version.
    pub fn spending_plutus_script(&mut self, version: LanguageVersion) -> &mut Self {
        self.adding_plutus_input = true;
        self.plutus_spending_script_version = Some(version);
        self
    }

    /// Reference the on-chain copy of the spending script instead of
    /// embedding it.
    pub fn spending_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
    ) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        match item {
            TxIn::Script { script_tx_in, .. } => {
                script_tx_in.script_source = Some(ScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    script_hash: script_hash.map(str::to_string),
                    script_size,
                    version: self
                        .plutus_spending_script_version
                        .unwrap_or(LanguageVersion::V2),
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Reference the on-chain copy of a native spending script; the open
    /// input becomes a native-script spend.
    pub fn simple_script_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
    ) -> BuilderResult<'_> {
        let item = self
            .tx_in_item
            .take()
            .ok_or(TxBuilderError::NoOpenItem("input"))?;
        let item = match item {
            TxIn::PubKey { tx_in } => TxIn::SimpleScript {
                tx_in,
                simple_script_tx_in: SimpleScriptTxInParameter {
                    script_source: Some(SimpleScriptSource::Inline {
                        tx_hash: tx_hash.to_string(),
                        tx_index,
                        simple_script_hash: script_hash.map(str::to_string),
                        script_size,
                    }),
                },
            },
            TxIn::Script { .. } => {
                self.tx_in_item = Some(item);
                return Err(TxBuilderError::SimpleScriptRefOnPlutusInput);
            }
            TxIn::SimpleScript { .. } => {
                self.tx_in_item = Some(item);
                return Err(TxBuilderError::ScriptAlreadyAttached);
            }
        };
        self.tx_in_item = Some(item);
        Ok(self)
    }

    /// Declare an output.
    pub fn tx_out(&mut self, address: &str, amount: Vec<Asset>) -> &mut Self {
        if let Some(output) = self.tx_out_item.take() {
            self.tx_builder_body.outputs.push(output);
        }
        self.touch();
        self.tx_out_item = Some(Output::new(address, amount));
        self
    }

    /// Attach a datum hash to the open output.
    pub fn tx_out_datum_hash_value(&mut self, data: BuilderData) -> BuilderResult<'_> {
        let output = self
            .tx_out_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("output"))?;
        output.datum = Some(Datum::Hash { data });
        Ok(self)
    }

    /// Inline a datum into the open output.
    pub fn tx_out_inline_datum_value(&mut self, data: BuilderData) -> BuilderResult<'_> {
        let output = self
            .tx_out_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("output"))?;
        output.datum = Some(Datum::Inline { data });
        Ok(self)
    }

    /// Embed a datum in the witness set, leaving its hash on the open
    /// output.
    pub fn tx_out_datum_embed_value(&mut self, data: BuilderData) -> BuilderResult<'_> {
        let output = self
            .tx_out_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("output"))?;
        output.datum = Some(Datum::Embedded { data });
        Ok(self)
    }

    /// Publish a reference script with the open output.
    pub fn tx_out_reference_script(
        &mut self,
        script_cbor: &str,
        version: LanguageVersion,
    ) -> BuilderResult<'_> {
        let output = self
            .tx_out_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("output"))?;
        output.reference_script = Some(PlutusScript {
            code: script_cbor.to_string(),
            version,
        });
        Ok(self)
    }

    /// Declare a read-only reference input.
    pub fn read_only_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_size: Option<usize>,
    ) -> &mut Self {
        self.touch();
        self.tx_builder_body.reference_inputs.push(RefTxIn {
            tx_hash: tx_hash.to_string(),
            tx_index,
            script_size,
        });
        self
    }

    /// Declare a mint (negative amounts burn).
    pub fn mint(
        &mut self,
        amount: impl Into<BigInt>,
        policy_id: &str,
        asset_name: &str,
    ) -> BuilderResult<'_> {
        if self.mint_item.is_some() {
            self.queue_mint()?;
        }
        if policy_id.len() != POLICY_ID_LENGTH || hex::decode(policy_id).is_err() {
            return Err(TxBuilderError::InvalidPolicyId(policy_id.to_string()));
        }
        if hex::decode(asset_name).is_err() {
            return Err(TxBuilderError::InvalidHex(asset_name.to_string()));
        }
        self.touch();
        self.mint_item = Some(if self.adding_plutus_mint {
            MintItem::Plutus {
                policy_id: policy_id.to_string(),
                asset_name: asset_name.to_string(),
                amount: amount.into(),
                script_source: None,
                redeemer: None,
            }
        } else {
            MintItem::Native {
                policy_id: policy_id.to_string(),
                asset_name: asset_name.to_string(),
                amount: amount.into(),
                script_source: None,
            }
        });
        self.adding_plutus_mint = false;
        Ok(self)
    }

    /// Signal that the next mint is governed by a plutus policy of the
    /// given version.
    pub fn mint_plutus_script(&mut self, version: LanguageVersion) -> &mut Self {
        self.adding_plutus_mint = true;
        self.plutus_minting_script_version = Some(version);
        self
    }

    /// Provide the minting script for the open mint.
    pub fn minting_script(&mut self, script_cbor: &str) -> BuilderResult<'_> {
        let item = self
            .mint_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("mint"))?;
        match item {
            MintItem::Plutus { script_source, .. } => {
                *script_source = Some(ScriptSource::Provided {
                    script: PlutusScript {
                        code: script_cbor.to_string(),
                        version: self
                            .plutus_minting_script_version
                            .unwrap_or(LanguageVersion::V2),
                    },
                });
            }
            MintItem::Native { script_source, .. } => {
                *script_source = Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                });
            }
        }
        Ok(self)
    }

    /// Reference the on-chain copy of the minting script.
    pub fn mint_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
    ) -> BuilderResult<'_> {
        let item = self
            .mint_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("mint"))?;
        match item {
            MintItem::Plutus { script_source, .. } => {
                *script_source = Some(ScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    script_hash: script_hash.map(str::to_string),
                    script_size,
                    version: self
                        .plutus_minting_script_version
                        .unwrap_or(LanguageVersion::V2),
                });
            }
            MintItem::Native { script_source, .. } => {
                *script_source = Some(SimpleScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    simple_script_hash: script_hash.map(str::to_string),
                    script_size,
                });
            }
        }
        Ok(self)
    }

    /// Provide the redeemer for the open plutus mint.
    pub fn mint_redeemer_value(
        &mut self,
        data: BuilderData,
        ex_units: Option<klotho_common::types::Budget>,
    ) -> BuilderResult<'_> {
        let item = self
            .mint_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("mint"))?;
        match item {
            MintItem::Plutus { redeemer, .. } => {
                *redeemer = Some(Redeemer {
                    data,
                    ex_units: ex_units.unwrap_or(DEFAULT_REDEEMER_BUDGET),
                });
                Ok(self)
            }
            MintItem::Native { .. } => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Pledge a collateral input.
    pub fn tx_in_collateral(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        amount: Option<Vec<Asset>>,
        address: Option<&str>,
    ) -> &mut Self {
        if let Some(collateral) = self.collateral_item.take() {
            self.tx_builder_body.collaterals.push(collateral);
        }
        self.touch();
        self.collateral_item = Some(TxInParameter {
            tx_hash: tx_hash.to_string(),
            tx_index,
            amount,
            address: address.map(str::to_string),
            script_size: None,
        });
        self
    }

    /// Declare a reward withdrawal.
    pub fn withdrawal(&mut self, address: &str, coin: u64) -> BuilderResult<'_> {
        if self.withdrawal_item.is_some() {
            self.queue_withdrawal()?;
        }
        self.touch();
        self.withdrawal_item = Some(if self.adding_plutus_withdrawal {
            Withdrawal::Script {
                address: address.to_string(),
                coin,
                script_source: None,
                redeemer: None,
            }
        } else {
            Withdrawal::PubKey {
                address: address.to_string(),
                coin,
            }
        });
        self.adding_plutus_withdrawal = false;
        Ok(self)
    }

    pub fn withdrawal_plutus_script(&mut self, version: LanguageVersion) -> &mut Self {
        self.adding_plutus_withdrawal = true;
        self.plutus_withdrawal_script_version = Some(version);
        self
    }

    /// Attach a script to the open withdrawal; a plain withdrawal becomes
    /// native-script witnessed.
    pub fn withdrawal_script(&mut self, script_cbor: &str) -> BuilderResult<'_> {
        let item = self
            .withdrawal_item
            .take()
            .ok_or(TxBuilderError::NoOpenItem("withdrawal"))?;
        let item = match item {
            Withdrawal::PubKey { address, coin } => Withdrawal::SimpleScript {
                address,
                coin,
                script_source: Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                }),
            },
            Withdrawal::Script {
                address,
                coin,
                redeemer,
                ..
            } => Withdrawal::Script {
                address,
                coin,
                script_source: Some(ScriptSource::Provided {
                    script: PlutusScript {
                        code: script_cbor.to_string(),
                        version: self
                            .plutus_withdrawal_script_version
                            .unwrap_or(LanguageVersion::V2),
                    },
                }),
                redeemer,
            },
            Withdrawal::SimpleScript { address, coin, .. } => Withdrawal::SimpleScript {
                address,
                coin,
                script_source: Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                }),
            },
        };
        self.withdrawal_item = Some(item);
        Ok(self)
    }

    /// Reference the on-chain copy of the withdrawal script.
    pub fn withdrawal_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
    ) -> BuilderResult<'_> {
        let item = self
            .withdrawal_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("withdrawal"))?;
        match item {
            Withdrawal::Script { script_source, .. } => {
                *script_source = Some(ScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    script_hash: script_hash.map(str::to_string),
                    script_size,
                    version: self
                        .plutus_withdrawal_script_version
                        .unwrap_or(LanguageVersion::V2),
                });
                Ok(self)
            }
            Withdrawal::SimpleScript { script_source, .. } => {
                *script_source = Some(SimpleScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    simple_script_hash: script_hash.map(str::to_string),
                    script_size,
                });
                Ok(self)
            }
            Withdrawal::PubKey { .. } => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Provide the redeemer for the open script withdrawal.
    pub fn withdrawal_redeemer_value(
        &mut self,
        data: BuilderData,
        ex_units: Option<klotho_common::types::Budget>,
    ) -> BuilderResult<'_> {
        let item = self
            .withdrawal_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("withdrawal"))?;
        match item {
            Withdrawal::Script { redeemer, .. } => {
                *redeemer = Some(Redeemer {
                    data,
                    ex_units: ex_units.unwrap_or(DEFAULT_REDEEMER_BUDGET),
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Cast a vote.
    pub fn vote(
        &mut self,
        voter: Voter,
        gov_action_id: RefTxIn,
        voting_procedure: VotingProcedure,
    ) -> BuilderResult<'_> {
        if self.vote_item.is_some() {
            self.queue_vote()?;
        }
        self.touch();
        let vote = VoteType {
            voter,
            gov_action_id,
            voting_procedure,
        };
        self.vote_item = Some(if self.adding_plutus_vote {
            Vote::Script {
                vote,
                redeemer: None,
                script_source: None,
            }
        } else {
            Vote::Basic { vote }
        });
        self.adding_plutus_vote = false;
        Ok(self)
    }

    pub fn vote_plutus_script(&mut self, version: LanguageVersion) -> &mut Self {
        self.adding_plutus_vote = true;
        self.plutus_vote_script_version = Some(version);
        self
    }

    /// Attach a script to the open vote; a basic vote becomes
    /// native-script witnessed.
    pub fn vote_script(&mut self, script_cbor: &str) -> BuilderResult<'_> {
        let item = self
            .vote_item
            .take()
            .ok_or(TxBuilderError::NoOpenItem("vote"))?;
        let item = match item {
            Vote::Basic { vote } => Vote::SimpleScript {
                vote,
                simple_script_source: Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                }),
            },
            Vote::Script { vote, redeemer, .. } => Vote::Script {
                vote,
                redeemer,
                script_source: Some(ScriptSource::Provided {
                    script: PlutusScript {
                        code: script_cbor.to_string(),
                        version: self
                            .plutus_vote_script_version
                            .unwrap_or(LanguageVersion::V2),
                    },
                }),
            },
            Vote::SimpleScript { vote, .. } => Vote::SimpleScript {
                vote,
                simple_script_source: Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                }),
            },
        };
        self.vote_item = Some(item);
        Ok(self)
    }

    /// Reference the on-chain copy of the vote witness script.
    pub fn vote_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
    ) -> BuilderResult<'_> {
        let item = self
            .vote_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("vote"))?;
        match item {
            Vote::Script { script_source, .. } => {
                *script_source = Some(ScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    script_hash: script_hash.map(str::to_string),
                    script_size,
                    version: self
                        .plutus_vote_script_version
                        .unwrap_or(LanguageVersion::V2),
                });
                Ok(self)
            }
            Vote::SimpleScript {
                simple_script_source,
                ..
            } => {
                *simple_script_source = Some(SimpleScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    simple_script_hash: script_hash.map(str::to_string),
                    script_size,
                });
                Ok(self)
            }
            Vote::Basic { .. } => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    /// Provide the redeemer for the open script vote.
    pub fn vote_redeemer_value(
        &mut self,
        data: BuilderData,
        ex_units: Option<klotho_common::types::Budget>,
    ) -> BuilderResult<'_> {
        let item = self
            .vote_item
            .as_mut()
            .ok_or(TxBuilderError::NoOpenItem("vote"))?;
        match item {
            Vote::Script { redeemer, .. } => {
                *redeemer = Some(Redeemer {
                    data,
                    ex_units: ex_units.unwrap_or(DEFAULT_REDEEMER_BUDGET),
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    fn push_cert(&mut self, cert: CertificateType) -> &mut Self {
        self.touch();
        self.tx_builder_body
            .certificates
            .push(Certificate::Basic { cert });
        self
    }

    pub fn register_stake_certificate(&mut self, stake_key_address: &str) -> &mut Self {
        self.push_cert(CertificateType::RegisterStake {
            stake_key_address: stake_key_address.to_string(),
        })
    }

    pub fn deregister_stake_certificate(&mut self, stake_key_address: &str) -> &mut Self {
        self.push_cert(CertificateType::DeregisterStake {
            stake_key_address: stake_key_address.to_string(),
        })
    }

    pub fn delegate_stake_certificate(
        &mut self,
        stake_key_address: &str,
        pool_id: &str,
    ) -> &mut Self {
        self.push_cert(CertificateType::DelegateStake {
            stake_key_address: stake_key_address.to_string(),
            pool_id: pool_id.to_string(),
        })
    }

    pub fn register_pool_certificate(&mut self, pool_params: PoolParams) -> &mut Self {
        self.push_cert(CertificateType::RegisterPool { pool_params })
    }

    pub fn retire_pool_certificate(&mut self, pool_id: &str, epoch: u32) -> &mut Self {
        self.push_cert(CertificateType::RetirePool {
            pool_id: pool_id.to_string(),
            epoch,
        })
    }

    pub fn vote_delegation_certificate(
        &mut self,
        stake_key_address: &str,
        drep: DRep,
    ) -> &mut Self {
        self.push_cert(CertificateType::VoteDelegation {
            stake_key_address: stake_key_address.to_string(),
            drep,
        })
    }

    pub fn stake_and_vote_delegation_certificate(
        &mut self,
        stake_key_address: &str,
        pool_key_hash: &str,
        drep: DRep,
    ) -> &mut Self {
        self.push_cert(CertificateType::StakeAndVoteDelegation {
            stake_key_address: stake_key_address.to_string(),
            pool_key_hash: pool_key_hash.to_string(),
            drep,
        })
    }

    pub fn stake_registration_and_delegation_certificate(
        &mut self,
        stake_key_address: &str,
        pool_key_hash: &str,
        coin: u64,
    ) -> &mut Self {
        self.push_cert(CertificateType::StakeRegistrationAndDelegation {
            stake_key_address: stake_key_address.to_string(),
            pool_key_hash: pool_key_hash.to_string(),
            coin,
        })
    }

    pub fn vote_registration_and_delegation_certificate(
        &mut self,
        stake_key_address: &str,
        drep: DRep,
        coin: u64,
    ) -> &mut Self {
        self.push_cert(CertificateType::VoteRegistrationAndDelegation {
            stake_key_address: stake_key_address.to_string(),
            drep,
            coin,
        })
    }

    pub fn stake_vote_registration_and_delegation_certificate(
        &mut self,
        stake_key_address: &str,
        pool_key_hash: &str,
        drep: DRep,
        coin: u64,
    ) -> &mut Self {
        self.push_cert(CertificateType::StakeVoteRegistrationAndDelegation {
            stake_key_address: stake_key_address.to_string(),
            pool_key_hash: pool_key_hash.to_string(),
            drep,
            coin,
        })
    }

    pub fn committee_hot_auth_certificate(
        &mut self,
        committee_cold_key_address: &str,
        committee_hot_key_address: &str,
    ) -> &mut Self {
        self.push_cert(CertificateType::CommitteeHotAuth {
            committee_cold_key_address: committee_cold_key_address.to_string(),
            committee_hot_key_address: committee_hot_key_address.to_string(),
        })
    }

    pub fn committee_cold_resign_certificate(
        &mut self,
        committee_cold_key_address: &str,
        anchor: Option<Anchor>,
    ) -> &mut Self {
        self.push_cert(CertificateType::CommitteeColdResign {
            committee_cold_key_address: committee_cold_key_address.to_string(),
            anchor,
        })
    }

    pub fn drep_registration_certificate(
        &mut self,
        drep_id: &str,
        coin: u64,
        anchor: Option<Anchor>,
    ) -> &mut Self {
        self.push_cert(CertificateType::DRepRegistration {
            drep_id: drep_id.to_string(),
            coin,
            anchor,
        })
    }

    pub fn drep_deregistration_certificate(&mut self, drep_id: &str, coin: u64) -> &mut Self {
        self.push_cert(CertificateType::DRepDeregistration {
            drep_id: drep_id.to_string(),
            coin,
        })
    }

    pub fn drep_update_certificate(
        &mut self,
        drep_id: &str,
        anchor: Option<Anchor>,
    ) -> &mut Self {
        self.push_cert(CertificateType::DRepUpdate {
            drep_id: drep_id.to_string(),
            anchor,
        })
    }

    /// Attach a witness script to the most recently declared certificate.
    /// With a version the certificate becomes plutus-witnessed, without
    /// one native-script witnessed.
    pub fn certificate_script(
        &mut self,
        script_cbor: &str,
        version: Option<LanguageVersion>,
    ) -> BuilderResult<'_> {
        let cert = self
            .tx_builder_body
            .certificates
            .pop()
            .ok_or(TxBuilderError::NoCertificate)?;
        let cert = cert.into_cert_type();
        let rewrapped = match version {
            Some(version) => Certificate::Script {
                cert,
                redeemer: None,
                script_source: Some(ScriptSource::Provided {
                    script: PlutusScript {
                        code: script_cbor.to_string(),
                        version,
                    },
                }),
            },
            None => Certificate::SimpleScript {
                cert,
                script_source: Some(SimpleScriptSource::Provided {
                    script_code: script_cbor.to_string(),
                }),
            },
        };
        self.tx_builder_body.certificates.push(rewrapped);
        Ok(self)
    }

    /// Reference the on-chain copy of the certificate witness script.
    pub fn certificate_tx_in_reference(
        &mut self,
        tx_hash: &str,
        tx_index: u32,
        script_hash: Option<&str>,
        script_size: Option<usize>,
        version: Option<LanguageVersion>,
    ) -> BuilderResult<'_> {
        let cert = self
            .tx_builder_body
            .certificates
            .pop()
            .ok_or(TxBuilderError::NoCertificate)?;
        let cert = cert.into_cert_type();
        let rewrapped = match version {
            Some(version) => Certificate::Script {
                cert,
                redeemer: None,
                script_source: Some(ScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    script_hash: script_hash.map(str::to_string),
                    script_size,
                    version,
                }),
            },
            None => Certificate::SimpleScript {
                cert,
                script_source: Some(SimpleScriptSource::Inline {
                    tx_hash: tx_hash.to_string(),
                    tx_index,
                    simple_script_hash: script_hash.map(str::to_string),
                    script_size,
                }),
            },
        };
        self.tx_builder_body.certificates.push(rewrapped);
        Ok(self)
    }

    /// Provide the redeemer for the most recently declared plutus
    /// certificate.
    pub fn certificate_redeemer_value(
        &mut self,
        data: BuilderData,
        ex_units: Option<klotho_common::types::Budget>,
    ) -> BuilderResult<'_> {
        let cert = self
            .tx_builder_body
            .certificates
            .last_mut()
            .ok_or(TxBuilderError::NoCertificate)?;
        match cert {
            Certificate::Script { redeemer, .. } => {
                *redeemer = Some(Redeemer {
                    data,
                    ex_units: ex_units.unwrap_or(DEFAULT_REDEEMER_BUDGET),
                });
                Ok(self)
            }
            _ => Err(TxBuilderError::RedeemerOnNonScriptItem),
        }
    }

    pub fn required_signer_hash(&mut self, pub_key_hash: &str) -> &mut Self {
        self.tx_builder_body
            .required_signatures
            .push(pub_key_hash.to_string());
        self
    }

    pub fn change_address(&mut self, address: &str) -> &mut Self {
        self.tx_builder_body.change_address = Some(address.to_string());
        self
    }

    pub fn change_output_datum(&mut self, data: BuilderData) -> &mut Self {
        self.tx_builder_body.change_datum = Some(Datum::Inline { data });
        self
    }

    pub fn invalid_before(&mut self, slot: u64) -> &mut Self {
        self.tx_builder_body.validity_range.invalid_before = Some(slot);
        self
    }

    pub fn invalid_hereafter(&mut self, slot: u64) -> &mut Self {
        self.tx_builder_body.validity_range.invalid_hereafter = Some(slot);
        self
    }

    pub fn metadata_value(&mut self, tag: u64, metadata: serde_json::Value) -> &mut Self {
        self.tx_builder_body.metadata.insert(tag, metadata);
        self
    }

    /// Stage a signing key (hex) for `complete_signing`.
    pub fn signing_key(&mut self, skey_hex: &str) -> &mut Self {
        self.tx_builder_body
            .signing_keys
            .push(skey_hex.to_string());
        self
    }

    /// Supply the candidate pool coin selection may draw from, optionally
    /// adjusting the reserved lovelace threshold.
    pub fn select_utxos_from(&mut self, utxos: &[Utxo], threshold: Option<u64>) -> &mut Self {
        self.tx_builder_body.extra_inputs = utxos.to_vec();
        if let Some(threshold) = threshold {
            self.tx_builder_body.selection_config.threshold = threshold;
        }
        self
    }

    pub fn selection_strategy(&mut self, strategy: UtxoSelectionStrategy) -> &mut Self {
        self.tx_builder_body.selection_config.strategy = strategy;
        self
    }

    pub fn set_network(&mut self, network: Network) -> &mut Self {
        self.tx_builder_body.network = network;
        self
    }

    /// Pin the fee instead of having the balancer compute one.
    pub fn set_fee(&mut self, fee: u64) -> &mut Self {
        self.manual_fee = Some(BigInt::from(fee));
        self.tx_builder_body.fee = Some(BigInt::from(fee));
        self
    }

    pub fn protocol_params(&mut self, params: Protocol) -> &mut Self {
        self.protocol_params = params;
        self
    }

    /// Flush every still-open item into the body, in a fixed order.
    pub(crate) fn queue_all_last_item(&mut self) -> Result<(), TxBuilderError> {
        if let Some(output) = self.tx_out_item.take() {
            self.tx_builder_body.outputs.push(output);
        }
        if self.tx_in_item.is_some() {
            self.queue_input()?;
        }
        if let Some(collateral) = self.collateral_item.take() {
            self.tx_builder_body.collaterals.push(collateral);
        }
        if self.mint_item.is_some() {
            self.queue_mint()?;
        }
        if self.withdrawal_item.is_some() {
            self.queue_withdrawal()?;
        }
        if self.vote_item.is_some() {
            self.queue_vote()?;
        }
        self.validate_certificates()
    }

    fn queue_input(&mut self) -> Result<(), TxBuilderError> {
        if let Some(TxIn::Script { tx_in, script_tx_in }) = &self.tx_in_item {
            let reference = tx_in.reference();
            if script_tx_in.datum_source.is_none() {
                return Err(TxBuilderError::MissingDatum(reference));
            }
            if script_tx_in.redeemer.is_none() {
                return Err(TxBuilderError::MissingRedeemer(reference));
            }
            if script_tx_in.script_source.is_none() {
                return Err(TxBuilderError::MissingScriptSource(reference));
            }
        }
        if let Some(item) = self.tx_in_item.take() {
            self.tx_builder_body.inputs.push(item);
        }
        Ok(())
    }

    fn queue_mint(&mut self) -> Result<(), TxBuilderError> {
        if let Some(item) = &self.mint_item {
            if !item.has_script_source() {
                return Err(TxBuilderError::MissingMintScript {
                    policy_id: item.policy_id().to_string(),
                    asset_name: item.asset_name().to_string(),
                });
            }
            if let MintItem::Plutus {
                redeemer: None,
                policy_id,
                asset_name,
                ..
            } = item
            {
                return Err(TxBuilderError::MissingMintRedeemer {
                    policy_id: policy_id.clone(),
                    asset_name: asset_name.clone(),
                });
            }
        }
        if let Some(item) = self.mint_item.take() {
            self.tx_builder_body.mints.push(item);
        }
        Ok(())
    }

    fn queue_withdrawal(&mut self) -> Result<(), TxBuilderError> {
        if let Some(item) = &self.withdrawal_item {
            match item {
                Withdrawal::Script {
                    address,
                    script_source,
                    redeemer,
                    ..
                } => {
                    if script_source.is_none() {
                        return Err(TxBuilderError::MissingWithdrawalScript(address.clone()));
                    }
                    if redeemer.is_none() {
                        return Err(TxBuilderError::MissingWithdrawalRedeemer(address.clone()));
                    }
                }
                Withdrawal::SimpleScript {
                    address,
                    script_source,
                    ..
                } => {
                    if script_source.is_none() {
                        return Err(TxBuilderError::MissingWithdrawalScript(address.clone()));
                    }
                }
                Withdrawal::PubKey { .. } => {}
            }
        }
        if let Some(item) = self.withdrawal_item.take() {
            self.tx_builder_body.withdrawals.push(item);
        }
        Ok(())
    }

    fn queue_vote(&mut self) -> Result<(), TxBuilderError> {
        if let Some(item) = &self.vote_item {
            match item {
                Vote::Script {
                    script_source,
                    redeemer,
                    ..
                } => {
                    if script_source.is_none() {
                        return Err(TxBuilderError::MissingVoteScript);
                    }
                    if redeemer.is_none() {
                        return Err(TxBuilderError::MissingVoteRedeemer);
                    }
                }
                Vote::SimpleScript {
                    simple_script_source,
                    ..
                } => {
                    if simple_script_source.is_none() {
                        return Err(TxBuilderError::MissingVoteScript);
                    }
                }
                Vote::Basic { .. } => {}
            }
        }
        if let Some(item) = self.vote_item.take() {
            self.tx_builder_body.votes.push(item);
        }
        Ok(())
    }

    fn validate_certificates(&self) -> Result<(), TxBuilderError> {
        for cert in &self.tx_builder_body.certificates {
            match cert {
                Certificate::Script {
                    script_source,
                    redeemer,
                    ..
                } => {
                    if script_source.is_none() {
                        return Err(TxBuilderError::MissingCertificateScript);
                    }
                    if redeemer.is_none() {
                        return Err(TxBuilderError::MissingCertificateRedeemer);
                    }
                }
                Certificate::SimpleScript { script_source, .. } => {
                    if script_source.is_none() {
                        return Err(TxBuilderError::MissingCertificateScript);
                    }
                }
                Certificate::Basic { .. } => {}
            }
        }
        Ok(())
    }

    /// Drop later duplicates of the same `(txHash, outputIndex)`.
    pub(crate) fn remove_duplicate_inputs(&mut self) {
        let mut seen = HashSet::new();
        self.tx_builder_body.inputs.retain(|input| {
            let parameter = input.tx_in_parameter();
            seen.insert((parameter.tx_hash.clone(), parameter.tx_index))
        });
    }

    pub(crate) fn remove_duplicate_ref_inputs(&mut self) {
        let mut seen = HashSet::new();
        self.tx_builder_body
            .reference_inputs
            .retain(|reference| seen.insert((reference.tx_hash.clone(), reference.tx_index)));
    }

    /// Return the builder to an empty session so the instance can be
    /// reused.
    pub fn reset(&mut self) {
        self.tx_builder_body = TxBuilderBody::default();
        self.status = BuildStatus::Empty;
        self.tx_hex = String::new();
        self.tx_evaluation_multiplier = klotho_common::RationalNumber::new(11, 10);
        self.manual_fee = None;
        self.tx_in_item = None;
        self.tx_out_item = None;
        self.collateral_item = None;
        self.mint_item = None;
        self.withdrawal_item = None;
        self.vote_item = None;
        self.adding_plutus_input = false;
        self.plutus_spending_script_version = None;
        self.adding_plutus_mint = false;
        self.plutus_minting_script_version = None;
        self.adding_plutus_withdrawal = false;
        self.plutus_withdrawal_script_version = None;
        self.adding_plutus_vote = false;
        self.plutus_vote_script_version = None;
        self.queried_tx_hashes.clear();
        self.queried_utxos.clear();
    }
}
