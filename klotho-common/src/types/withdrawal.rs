use serde::{Deserialize, Serialize};

use super::data::Redeemer;
use super::script::{ScriptSource, SimpleScriptSource};

/// A reward withdrawal intent, polymorphic over the witness kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Withdrawal {
    PubKey {
        address: String,
        coin: u64,
    },
    Script {
        address: String,
        coin: u64,
        script_source: Option<ScriptSource>,
        redeemer: Option<Redeemer>,
    },
    SimpleScript {
        address: String,
        coin: u64,
        script_source: Option<SimpleScriptSource>,
    },
}

impl Withdrawal {
    pub fn address(&self) -> &str {
        match self {
            Withdrawal::PubKey { address, .. }
            | Withdrawal::Script { address, .. }
            | Withdrawal::SimpleScript { address, .. } => address,
        }
    }

    pub fn coin(&self) -> u64 {
        match self {
            Withdrawal::PubKey { coin, .. }
            | Withdrawal::Script { coin, .. }
            | Withdrawal::SimpleScript { coin, .. } => *coin,
        }
    }
}
