use std::collections::BTreeMap;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

/// Unit tag of the ledger's native coin.
pub const LOVELACE: &str = "lovelace";

/// Length in hex characters of a minting policy identifier.
pub const POLICY_ID_LENGTH: usize = 56;

/// A single asset entry: a unit tag paired with a quantity.
///
/// The unit is either [`LOVELACE`] or a policy id concatenated with the
/// asset-name hex suffix. Quantities are negative only inside mint/burn
/// entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub unit: String,
    pub quantity: BigInt,
}

impl Asset {
    pub fn new(unit: impl Into<String>, quantity: impl Into<BigInt>) -> Self {
        Self {
            unit: unit.into(),
            quantity: quantity.into(),
        }
    }

    pub fn lovelace(quantity: u64) -> Self {
        Self::new(LOVELACE, quantity)
    }

    /// Whether the unit names the native coin. An empty unit is accepted
    /// as a legacy alias.
    pub fn is_lovelace(&self) -> bool {
        self.unit == LOVELACE || self.unit.is_empty()
    }
}

/// A unit-keyed multi-asset quantity map.
///
/// Entries that reach exactly zero are removed, so an empty map means "no
/// value at all" and the sign of every stored entry is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value(BTreeMap<String, BigInt>);

impl Value {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assets<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> Self {
        let mut value = Self::new();
        for asset in assets {
            if asset.is_lovelace() {
                value.add(LOVELACE, &asset.quantity);
            } else {
                value.add(&asset.unit, &asset.quantity);
            }
        }
        value
    }

    pub fn get(&self, unit: &str) -> BigInt {
        self.0.get(unit).cloned().unwrap_or_else(BigInt::zero)
    }

    /// Quantity of the native coin.
    pub fn coin(&self) -> BigInt {
        self.get(LOVELACE)
    }

    pub fn add(&mut self, unit: &str, quantity: &BigInt) {
        if quantity.is_zero() {
            return;
        }
        let entry = self.0.entry(unit.to_string()).or_insert_with(BigInt::zero);
        *entry += quantity;
        if entry.is_zero() {
            self.0.remove(unit);
        }
    }

    pub fn set(&mut self, unit: &str, quantity: BigInt) {
        if quantity.is_zero() {
            self.0.remove(unit);
        } else {
            self.0.insert(unit.to_string(), quantity);
        }
    }

    pub fn merge(&mut self, other: &Value) {
        for (unit, quantity) in &other.0 {
            self.add(unit, quantity);
        }
    }

    pub fn subtract(&mut self, other: &Value) {
        for (unit, quantity) in &other.0 {
            let negated = -quantity;
            self.add(unit, &negated);
        }
    }

    /// The sub-map of entries with strictly positive quantity.
    pub fn positives(&self) -> Value {
        Value(
            self.0
                .iter()
                .filter(|(_, quantity)| quantity.is_positive())
                .map(|(unit, quantity)| (unit.clone(), quantity.clone()))
                .collect(),
        )
    }

    /// True when no entry is strictly positive, i.e. a deficit expressed
    /// in this value is fully covered.
    pub fn is_satisfied(&self) -> bool {
        self.0.values().all(|quantity| !quantity.is_positive())
    }

    pub fn all_non_negative(&self) -> bool {
        self.0.values().all(|quantity| !quantity.is_negative())
    }

    pub fn positive_unit_count(&self) -> usize {
        self.0
            .values()
            .filter(|quantity| quantity.is_positive())
            .count()
    }

    /// Number of units strictly positive in both maps.
    pub fn intersection_count(&self, other: &Value) -> usize {
        self.0
            .iter()
            .filter(|(unit, quantity)| {
                quantity.is_positive() && other.get(unit).is_positive()
            })
            .count()
    }

    pub fn first_positive_unit(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, quantity)| quantity.is_positive())
            .map(|(unit, _)| unit.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn units(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BigInt)> {
        self.0.iter()
    }

    /// Render as an asset list, native coin first, remaining units in map
    /// order.
    pub fn to_assets(&self) -> Vec<Asset> {
        let mut assets = Vec::with_capacity(self.0.len());
        if let Some(coin) = self.0.get(LOVELACE) {
            assets.push(Asset::new(LOVELACE, coin.clone()));
        }
        for (unit, quantity) in &self.0 {
            if unit != LOVELACE {
                assets.push(Asset::new(unit.clone(), quantity.clone()));
            }
        }
        assets
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, (unit, quantity)) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{unit}: {quantity}")?;
        }
        write!(f, "}}")
    }
}
