//! The typed intent model the accumulator assembles into a transaction
//! body. Every polymorphic intent is a tagged sum type so consumers match
//! exhaustively.

mod body;
mod certificate;
mod data;
mod mint;
mod output;
mod script;
mod txin;
mod utxo;
mod vote;
mod withdrawal;

pub use body::*;
pub use certificate::*;
pub use data::*;
pub use mint::*;
pub use output::*;
pub use script::*;
pub use txin::*;
pub use utxo::*;
pub use vote::*;
pub use withdrawal::*;
