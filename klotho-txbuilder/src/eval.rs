//! Redeemer budget refinement: after the evaluator reports per-redeemer
//! execution costs, the stored budgets are rewritten with a safety
//! multiplier before the body is serialized again.

use tracing::debug;

use klotho_common::interfaces::{Action, RedeemerTag};
use klotho_common::types::{Budget, Certificate, MintItem, TxIn, Utxo, Vote, Withdrawal};
use klotho_common::RationalNumber;

use crate::builder::TxBuilder;
use crate::TxBuilderError;

/// `floor(value * multiplier)` in integer arithmetic.
fn scale(value: u64, multiplier: RationalNumber) -> u64 {
    ((value as u128 * multiplier.numerator as u128) / multiplier.denominator as u128) as u64
}

fn scale_budget(budget: Budget, multiplier: RationalNumber) -> Budget {
    Budget {
        mem: scale(budget.mem, multiplier),
        steps: scale(budget.steps, multiplier),
    }
}

impl TxBuilder {
    /// Serialize the current body, hand it to the evaluator and fold the
    /// reported costs back into the stored redeemers. A no-op when no
    /// evaluator is configured.
    pub(crate) async fn evaluate_redeemers(&mut self) -> Result<(), TxBuilderError> {
        let Some(evaluator) = self.evaluator.clone() else {
            return Ok(());
        };
        let tx_hex = self.serialize_body()?;
        let additional: Vec<Utxo> = self
            .tx_builder_body
            .inputs_for_evaluation
            .values()
            .cloned()
            .collect();
        let actions = evaluator
            .evaluate_tx(&tx_hex, &additional)
            .await
            .map_err(|cause| TxBuilderError::Evaluation { tx_hex, cause })?;
        debug!(actions = actions.len(), "applying evaluated redeemer budgets");
        self.update_redeemers(&actions);
        Ok(())
    }

    /// Overwrite the budget of the redeemer each action addresses. A MINT
    /// action fans out to every mint entry sharing the policy id, since
    /// they share one script execution.
    pub(crate) fn update_redeemers(&mut self, actions: &[Action]) {
        let multiplier = self.tx_evaluation_multiplier;
        for action in actions {
            let budget = scale_budget(action.budget, multiplier);
            let index = action.index as usize;
            match action.tag {
                RedeemerTag::Spend => {
                    if let Some(TxIn::Script { script_tx_in, .. }) =
                        self.tx_builder_body.inputs.get_mut(index)
                    {
                        if let Some(redeemer) = script_tx_in.redeemer.as_mut() {
                            redeemer.ex_units = budget;
                        }
                    }
                }
                RedeemerTag::Mint => {
                    let Some(policy_id) = self
                        .tx_builder_body
                        .mints
                        .get(index)
                        .map(|mint| mint.policy_id().to_string())
                    else {
                        continue;
                    };
                    for mint in self.tx_builder_body.mints.iter_mut() {
                        if mint.policy_id() == policy_id {
                            if let MintItem::Plutus {
                                redeemer: Some(redeemer),
                                ..
                            } = mint
                            {
                                redeemer.ex_units = budget;
                            }
                        }
                    }
                }
                RedeemerTag::Cert => {
                    if let Some(Certificate::Script { redeemer, .. }) =
                        self.tx_builder_body.certificates.get_mut(index)
                    {
                        if let Some(redeemer) = redeemer.as_mut() {
                            redeemer.ex_units = budget;
                        }
                    }
                }
                RedeemerTag::Reward => {
                    if let Some(Withdrawal::Script { redeemer, .. }) =
                        self.tx_builder_body.withdrawals.get_mut(index)
                    {
                        if let Some(redeemer) = redeemer.as_mut() {
                            redeemer.ex_units = budget;
                        }
                    }
                }
                RedeemerTag::Vote => {
                    if let Some(Vote::Script { redeemer, .. }) =
                        self.tx_builder_body.votes.get_mut(index)
                    {
                        if let Some(redeemer) = redeemer.as_mut() {
                            redeemer.ex_units = budget;
                        }
                    }
                }
            }
        }
    }
}
