//! Declarative transaction assembly for Cardano-shaped ledgers.
//!
//! Klotho turns a set of intents — spend these inputs, pay these outputs,
//! mint these assets, register these certificates, cast these votes,
//! withdraw these rewards — plus a pool of spare UTxOs into a
//! fee-balanced transaction ready for signing and submission. The binary
//! encoding, network providers and key handling stay behind the provider
//! interfaces in [`common::interfaces`].

#[doc(inline)]
pub use klotho_common as common;

#[doc(inline)]
pub use klotho_txbuilder as txbuilder;
