//! The classic UTxO selection strategies. Each takes the required value
//! (deficit plus any reserved threshold, positive entries only are
//! targeted) and a candidate pool, and returns the picked UTxOs. Shortfall
//! detection is left to the caller, which knows the full balancing
//! context.

use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::types::Utxo;
use crate::value::Value;

fn utxo_value(utxo: &Utxo) -> Value {
    Value::from_assets(&utxo.output.amount)
}

/// Candidate pool indexed and sorted by native-coin quantity descending,
/// ties broken by input reference so the order is total.
fn coin_sorted(candidates: &[Utxo]) -> Vec<&Utxo> {
    let mut pool: Vec<&Utxo> = candidates.iter().collect();
    pool.sort_by(|a, b| {
        utxo_value(b)
            .coin()
            .cmp(&utxo_value(a).coin())
            .then_with(|| a.input.tx_hash.cmp(&b.input.tx_hash))
            .then_with(|| a.input.output_index.cmp(&b.input.output_index))
    });
    pool
}

/// Take candidates by native-coin quantity descending until the coin
/// requirement is met. Non-coin assets are not targeted.
pub fn largest_first(required: &Value, candidates: &[Utxo]) -> Vec<Utxo> {
    let target = required.coin();
    let mut selected = Vec::new();
    let mut total = BigInt::zero();
    for utxo in coin_sorted(candidates) {
        if total >= target {
            break;
        }
        total += utxo_value(utxo).coin();
        selected.push(utxo.clone());
    }
    selected
}

/// For each required unit in turn, repeatedly take the candidate holding
/// the largest quantity of that unit until the unit is satisfied.
pub fn largest_first_multi_asset(required: &Value, candidates: &[Utxo]) -> Vec<Utxo> {
    let mut deficit = required.positives();
    let mut remaining: Vec<Utxo> = candidates.to_vec();
    let mut selected = Vec::new();

    let units: Vec<String> = deficit.units().cloned().collect();
    for unit in units {
        while deficit.get(&unit).is_positive() {
            let mut best: Option<usize> = None;
            let mut best_amount = BigInt::zero();
            for (index, utxo) in remaining.iter().enumerate() {
                let amount = utxo_value(utxo).get(&unit);
                if amount > best_amount {
                    best_amount = amount;
                    best = Some(index);
                }
            }
            let Some(index) = best else {
                break;
            };
            let utxo = remaining.remove(index);
            deficit.subtract(&utxo_value(&utxo));
            selected.push(utxo);
        }
    }
    selected
}

/// Consider only candidates intersecting the deficit; greedily take the
/// one covering the most outstanding units (larger coin quantity breaks
/// ties) so the selected set stays small.
pub fn keep_relevant(required: &Value, candidates: &[Utxo]) -> Vec<Utxo> {
    let mut deficit = required.positives();
    let mut remaining: Vec<Utxo> = candidates
        .iter()
        .filter(|utxo| deficit.intersection_count(&utxo_value(utxo)) > 0)
        .cloned()
        .collect();
    let mut selected = Vec::new();

    while !deficit.is_satisfied() && !remaining.is_empty() {
        let current = deficit.positives();
        let mut best: Option<usize> = None;
        let mut best_key = (0usize, BigInt::zero());
        for (index, utxo) in remaining.iter().enumerate() {
            let value = utxo_value(utxo);
            let key = (current.intersection_count(&value), value.coin());
            if key > best_key {
                best_key = key;
                best = Some(index);
            }
        }
        let Some(index) = best else {
            break;
        };
        let utxo = remaining.remove(index);
        deficit.subtract(&utxo_value(&utxo));
        selected.push(utxo);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Asset, LOVELACE};

    fn ada_utxo(hash: &str, coin: u64) -> Utxo {
        Utxo::new(hash, 0, "addr_test1payer", vec![Asset::lovelace(coin)])
    }

    fn token_utxo(hash: &str, coin: u64, unit: &str, quantity: u64) -> Utxo {
        Utxo::new(
            hash,
            0,
            "addr_test1payer",
            vec![Asset::lovelace(coin), Asset::new(unit, quantity)],
        )
    }

    fn coin_required(quantity: u64) -> Value {
        let mut required = Value::new();
        required.add(LOVELACE, &BigInt::from(quantity));
        required
    }

    #[test]
    fn largest_first_prefers_biggest_coin() {
        let pool = vec![ada_utxo("aa", 1_000_000), ada_utxo("bb", 9_000_000)];
        let selected = largest_first(&coin_required(5_000_000), &pool);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].input.tx_hash, "bb");
    }

    #[test]
    fn largest_first_accumulates_until_covered() {
        let pool = vec![
            ada_utxo("aa", 4_000_000),
            ada_utxo("bb", 3_000_000),
            ada_utxo("cc", 2_000_000),
        ];
        let selected = largest_first(&coin_required(6_000_000), &pool);
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn largest_first_multi_asset_targets_each_unit() {
        let mut required = Value::new();
        required.add("policytoken", &BigInt::from(5));
        let pool = vec![
            ada_utxo("aa", 20_000_000),
            token_utxo("bb", 2_000_000, "policytoken", 3),
            token_utxo("cc", 2_000_000, "policytoken", 4),
        ];
        let selected = largest_first_multi_asset(&required, &pool);
        // the largest holder of the deficit unit goes first, the plain
        // ada utxo is never touched
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].input.tx_hash, "cc");
        assert!(selected.iter().all(|u| u.input.tx_hash != "aa"));
    }

    #[test]
    fn keep_relevant_skips_non_intersecting_utxos() {
        let mut required = Value::new();
        required.add("policytoken", &BigInt::from(1));
        let pool = vec![
            token_utxo("aa", 2_000_000, "otherasset", 10),
            token_utxo("bb", 2_000_000, "policytoken", 2),
        ];
        let selected = keep_relevant(&required, &pool);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].input.tx_hash, "bb");
    }

    #[test]
    fn keep_relevant_prefers_widest_intersection() {
        let mut required = Value::new();
        required.add("unita", &BigInt::from(1));
        required.add("unitb", &BigInt::from(1));
        let both = Utxo::new(
            "aa",
            0,
            "addr_test1payer",
            vec![
                Asset::lovelace(2_000_000),
                Asset::new("unita", 1u64),
                Asset::new("unitb", 1u64),
            ],
        );
        let single = token_utxo("bb", 2_000_000, "unita", 1);
        let selected = keep_relevant(&required, &[single, both]);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].input.tx_hash, "aa");
    }
}
