//! Shared building blocks for the Klotho transaction assembly engine.
//!
//! This crate holds everything the builder and a host application need to
//! agree on: the multi-asset value arithmetic, the typed intent model that
//! accumulates into a transaction body, the protocol parameters, the
//! provider interfaces (fetching, evaluation, serialization, submission)
//! and the classic UTxO selection strategies.

pub mod interfaces;
pub mod protocol;
pub mod types;
pub mod utxo_selection;
pub mod value;

pub use protocol::{Network, Protocol, RationalNumber};
pub use types::*;
pub use value::{Asset, Value, LOVELACE, POLICY_ID_LENGTH};
