use serde::{Deserialize, Serialize};

use crate::value::Asset;

use super::data::BuilderData;
use super::script::PlutusScript;

/// How a datum is attached to an output: by hash, inlined into the
/// output, or embedded in the witness set with only its hash on-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Hash { data: BuilderData },
    Inline { data: BuilderData },
    Embedded { data: BuilderData },
}

/// A declared payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub address: String,
    pub amount: Vec<Asset>,
    pub datum: Option<Datum>,
    pub reference_script: Option<PlutusScript>,
}

impl Output {
    pub fn new(address: impl Into<String>, amount: Vec<Asset>) -> Self {
        Self {
            address: address.into(),
            amount,
            datum: None,
            reference_script: None,
        }
    }
}
