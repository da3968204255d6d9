pub use crate::{
    BuildStatus, CoinSelectionError, SelectionPhase, TxBuilder, TxBuilderError, TxBuilderOptions,
};
pub use klotho_common::interfaces::{
    async_trait, Action, CollaboratorResult, Evaluator, Fetcher, RedeemerTag, Serializer,
    Submitter,
};
pub use klotho_common::types::*;
pub use klotho_common::value::{Asset, Value, LOVELACE, POLICY_ID_LENGTH};
pub use klotho_common::{Network, Protocol, RationalNumber};
