use serde::{Deserialize, Serialize};

use super::certificate::Anchor;
use super::data::Redeemer;
use super::script::{RefTxIn, ScriptSource, SimpleScriptSource};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Credential {
    KeyHash(String),
    ScriptHash(String),
}

impl Credential {
    pub fn hash(&self) -> &str {
        match self {
            Credential::KeyHash(hash) | Credential::ScriptHash(hash) => hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voter {
    ConstitutionalCommittee { hot_cred: Credential },
    DRep { drep_id: String },
    StakingPool { key_hash: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    No,
    Yes,
    Abstain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingProcedure {
    pub vote_kind: VoteKind,
    pub anchor: Option<Anchor>,
}

/// One cast vote: who votes, on which governance action, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteType {
    pub voter: Voter,
    pub gov_action_id: RefTxIn,
    pub voting_procedure: VotingProcedure,
}

/// A vote intent, polymorphic over the witness kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vote {
    Basic {
        vote: VoteType,
    },
    Script {
        vote: VoteType,
        redeemer: Option<Redeemer>,
        script_source: Option<ScriptSource>,
    },
    SimpleScript {
        vote: VoteType,
        simple_script_source: Option<SimpleScriptSource>,
    },
}

impl Vote {
    pub fn vote_type(&self) -> &VoteType {
        match self {
            Vote::Basic { vote }
            | Vote::Script { vote, .. }
            | Vote::SimpleScript { vote, .. } => vote,
        }
    }
}
