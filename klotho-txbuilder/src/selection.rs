//! Coin selection: given the per-unit deficit left after the declared
//! inputs and mints, choose additional UTxOs from the candidate pool
//! under the configured strategy. The coverage-first selector works in
//! two phases: cover as many outstanding asset types as possible per
//! pick, then chase magnitude for whatever single unit remains.

use std::collections::HashSet;
use std::fmt;

use num_bigint::BigInt;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use klotho_common::types::{Utxo, UtxoSelectionStrategy};
use klotho_common::utxo_selection::{keep_relevant, largest_first, largest_first_multi_asset};
use klotho_common::value::{Value, LOVELACE};

/// Upper bound on picks per phase, carried over from the reference
/// selector.
pub(crate) const MAX_SELECTION_ITERATIONS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    Coverage,
    Magnitude,
    Final,
}

impl fmt::Display for SelectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            SelectionPhase::Coverage => "coverage",
            SelectionPhase::Magnitude => "magnitude",
            SelectionPhase::Final => "final",
        };
        f.write_str(phase)
    }
}

/// Selection could not cover the requirement; carries the phase that gave
/// up and the per-unit deficit still outstanding.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("coin selection failed at {phase} phase; unresolved deficit: {deficit}")]
pub struct CoinSelectionError {
    pub phase: SelectionPhase,
    pub deficit: Value,
}

#[derive(Debug)]
pub(crate) struct SelectionOutcome {
    pub selected: Vec<Utxo>,
    pub remaining: Vec<Utxo>,
}

pub(crate) fn utxo_value(utxo: &Utxo) -> Value {
    Value::from_assets(&utxo.output.amount)
}

/// Dispatch a strategy over the candidate pool. `required` is the raw
/// (unclipped) requirement; the classic strategies additionally reserve
/// the configured lovelace threshold, while the coverage-first selector
/// leaves fee headroom to the balancer's expansion loop.
pub(crate) fn select_utxos(
    strategy: UtxoSelectionStrategy,
    required: &Value,
    threshold: u64,
    include_tx_fees: bool,
    candidates: Vec<Utxo>,
) -> Result<SelectionOutcome, CoinSelectionError> {
    match strategy {
        UtxoSelectionStrategy::CoverageFirst => {
            let mut pool_total = Value::new();
            for utxo in &candidates {
                pool_total.merge(&utxo_value(utxo));
            }
            let mut shortfall = required.clone();
            shortfall.subtract(&pool_total);
            let shortfall = shortfall.positives();
            if !shortfall.is_empty() {
                return Err(CoinSelectionError {
                    phase: SelectionPhase::Final,
                    deficit: shortfall,
                });
            }

            let (selected, remaining, accumulated) = coverage_phase(candidates, required)?;
            let (selected, remaining, _) =
                magnitude_phase(remaining, required, accumulated, selected)?;
            debug!(picked = selected.len(), "coverage-first selection done");
            Ok(SelectionOutcome {
                selected,
                remaining,
            })
        }
        classic => {
            let mut target = required.positives();
            if include_tx_fees && threshold > 0 {
                target.add(LOVELACE, &BigInt::from(threshold));
            }
            let selected = match classic {
                UtxoSelectionStrategy::LargestFirst => largest_first(&target, &candidates),
                UtxoSelectionStrategy::LargestFirstMultiAsset => {
                    largest_first_multi_asset(&target, &candidates)
                }
                UtxoSelectionStrategy::KeepRelevant => keep_relevant(&target, &candidates),
                UtxoSelectionStrategy::CoverageFirst => unreachable!(),
            };
            let picked: HashSet<(String, u32)> = selected
                .iter()
                .map(|utxo| (utxo.input.tx_hash.clone(), utxo.input.output_index))
                .collect();
            let remaining = candidates
                .into_iter()
                .filter(|utxo| {
                    !picked.contains(&(utxo.input.tx_hash.clone(), utxo.input.output_index))
                })
                .collect();
            Ok(SelectionOutcome {
                selected,
                remaining,
            })
        }
    }
}

/// Phase 1: while more than one asset type is outstanding, repeatedly
/// pick the candidate whose inclusion reduces the count of distinct
/// deficit units the most. The rating is the reference formula
/// `types_reduced + intersection / 10`, computed in scaled integers so
/// the tie-break stays exact; ties keep the earliest candidate.
fn coverage_phase(
    mut available: Vec<Utxo>,
    deficit: &Value,
) -> Result<(Vec<Utxo>, Vec<Utxo>, Value), CoinSelectionError> {
    let mut selected = Vec::new();
    let mut accumulated = Value::new();

    for _ in 0..MAX_SELECTION_ITERATIONS {
        let mut current = deficit.clone();
        current.subtract(&accumulated);
        let current = current.positives();
        let types_needed = current.len();
        if types_needed <= 1 {
            break;
        }

        let mut best: Option<usize> = None;
        let mut best_rating = i64::MIN;
        for (index, utxo) in available.iter().enumerate() {
            let value = utxo_value(utxo);
            let mut after = deficit.clone();
            after.subtract(&accumulated);
            after.subtract(&value);
            let remaining_types = after.positives().len();
            let types_reduced = (types_needed - remaining_types) as i64;
            let intersection = current.intersection_count(&value) as i64;
            let rating = types_reduced * 10 + intersection;
            if rating > best_rating {
                best_rating = rating;
                best = Some(index);
            }
        }

        match best {
            Some(index) if best_rating > 0 => {
                let utxo = available.remove(index);
                accumulated.merge(&utxo_value(&utxo));
                selected.push(utxo);
            }
            _ => {
                return Err(CoinSelectionError {
                    phase: SelectionPhase::Coverage,
                    deficit: current,
                })
            }
        }
    }

    Ok((selected, available, accumulated))
}

/// Phase 2: for the single remaining unit, repeatedly pick the candidate
/// holding the largest quantity of it until the deficit is met.
fn magnitude_phase(
    mut available: Vec<Utxo>,
    deficit: &Value,
    mut accumulated: Value,
    mut selected: Vec<Utxo>,
) -> Result<(Vec<Utxo>, Vec<Utxo>, Value), CoinSelectionError> {
    for _ in 0..MAX_SELECTION_ITERATIONS {
        let mut current = deficit.clone();
        current.subtract(&accumulated);
        let current = current.positives();
        if current.is_empty() {
            break;
        }
        let Some(target) = current.first_positive_unit().map(str::to_string) else {
            break;
        };

        let mut best: Option<usize> = None;
        let mut best_amount = BigInt::zero();
        for (index, utxo) in available.iter().enumerate() {
            let amount = utxo_value(utxo).get(&target);
            if amount > best_amount {
                best_amount = amount;
                best = Some(index);
            }
        }

        match best {
            Some(index) => {
                let utxo = available.remove(index);
                accumulated.merge(&utxo_value(&utxo));
                selected.push(utxo);
            }
            None => {
                return Err(CoinSelectionError {
                    phase: SelectionPhase::Magnitude,
                    deficit: current,
                })
            }
        }
    }

    Ok((selected, available, accumulated))
}
