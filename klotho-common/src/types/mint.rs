use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::data::Redeemer;
use super::script::{ScriptSource, SimpleScriptSource};

/// One minting (or burning, when the amount is negative) intent for a
/// single asset under a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MintItem {
    Plutus {
        policy_id: String,
        asset_name: String,
        amount: BigInt,
        script_source: Option<ScriptSource>,
        redeemer: Option<Redeemer>,
    },
    Native {
        policy_id: String,
        asset_name: String,
        amount: BigInt,
        script_source: Option<SimpleScriptSource>,
    },
}

impl MintItem {
    pub fn policy_id(&self) -> &str {
        match self {
            MintItem::Plutus { policy_id, .. } | MintItem::Native { policy_id, .. } => policy_id,
        }
    }

    pub fn asset_name(&self) -> &str {
        match self {
            MintItem::Plutus { asset_name, .. } | MintItem::Native { asset_name, .. } => asset_name,
        }
    }

    pub fn amount(&self) -> &BigInt {
        match self {
            MintItem::Plutus { amount, .. } | MintItem::Native { amount, .. } => amount,
        }
    }

    /// The asset unit this entry mints: policy id + asset-name hex.
    pub fn unit(&self) -> String {
        format!("{}{}", self.policy_id(), self.asset_name())
    }

    pub fn has_script_source(&self) -> bool {
        match self {
            MintItem::Plutus { script_source, .. } => script_source.is_some(),
            MintItem::Native { script_source, .. } => script_source.is_some(),
        }
    }
}
