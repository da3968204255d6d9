use serde::{Deserialize, Serialize};

use super::data::Redeemer;
use super::script::{ScriptSource, SimpleScriptSource};

/// A delegated representative, addressed by key, by script, or one of the
/// two predefined voting stances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DRep {
    KeyHash(String),
    ScriptHash(String),
    AlwaysAbstain,
    AlwaysNoConfidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub anchor_url: String,
    pub anchor_data_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relay {
    SingleHostAddr {
        ipv4: Option<String>,
        ipv6: Option<String>,
        port: Option<u16>,
    },
    SingleHostName {
        domain_name: String,
        port: Option<u16>,
    },
    MultiHostName {
        domain_name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub vrf_key_hash: String,
    pub operator: String,
    pub pledge: u64,
    pub cost: u64,
    pub margin: (u64, u64),
    pub relays: Vec<Relay>,
    pub owners: Vec<String>,
    pub reward_address: String,
    pub metadata: Option<PoolMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateType {
    RegisterPool {
        pool_params: PoolParams,
    },
    RegisterStake {
        stake_key_address: String,
    },
    DelegateStake {
        stake_key_address: String,
        pool_id: String,
    },
    DeregisterStake {
        stake_key_address: String,
    },
    RetirePool {
        pool_id: String,
        epoch: u32,
    },
    VoteDelegation {
        stake_key_address: String,
        drep: DRep,
    },
    StakeAndVoteDelegation {
        stake_key_address: String,
        pool_key_hash: String,
        drep: DRep,
    },
    StakeRegistrationAndDelegation {
        stake_key_address: String,
        pool_key_hash: String,
        coin: u64,
    },
    VoteRegistrationAndDelegation {
        stake_key_address: String,
        drep: DRep,
        coin: u64,
    },
    StakeVoteRegistrationAndDelegation {
        stake_key_address: String,
        pool_key_hash: String,
        drep: DRep,
        coin: u64,
    },
    CommitteeHotAuth {
        committee_cold_key_address: String,
        committee_hot_key_address: String,
    },
    CommitteeColdResign {
        committee_cold_key_address: String,
        anchor: Option<Anchor>,
    },
    DRepRegistration {
        drep_id: String,
        coin: u64,
        anchor: Option<Anchor>,
    },
    DRepDeregistration {
        drep_id: String,
        coin: u64,
    },
    DRepUpdate {
        drep_id: String,
        anchor: Option<Anchor>,
    },
}

/// A certificate intent, optionally witnessed by a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Certificate {
    Basic {
        cert: CertificateType,
    },
    Script {
        cert: CertificateType,
        redeemer: Option<Redeemer>,
        script_source: Option<ScriptSource>,
    },
    SimpleScript {
        cert: CertificateType,
        script_source: Option<SimpleScriptSource>,
    },
}

impl Certificate {
    pub fn cert_type(&self) -> &CertificateType {
        match self {
            Certificate::Basic { cert }
            | Certificate::Script { cert, .. }
            | Certificate::SimpleScript { cert, .. } => cert,
        }
    }

    pub fn into_cert_type(self) -> CertificateType {
        match self {
            Certificate::Basic { cert }
            | Certificate::Script { cert, .. }
            | Certificate::SimpleScript { cert, .. } => cert,
        }
    }
}
