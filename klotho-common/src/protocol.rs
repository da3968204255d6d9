use serde::{Deserialize, Serialize};

/// An exact fraction, used wherever the protocol expresses a fractional
/// price. Keeping the numerator/denominator pair around means fee
/// arithmetic never has to touch binary floating point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationalNumber {
    pub numerator: u64,
    pub denominator: u64,
}

impl RationalNumber {
    pub const fn new(numerator: u64, denominator: u64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

/// Network tag a transaction targets. Mainly selects the cost models used
/// by the serializing side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Mainnet,
    Preprod,
    Preview,
    Testnet,
}

/// The protocol parameters the engine consults: fee coefficients,
/// execution-unit prices, size ceilings and deposit amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub epoch: u32,
    pub min_fee_a: u64,
    pub min_fee_b: u64,
    pub max_block_size: u32,
    pub max_tx_size: u32,
    pub max_block_header_size: u32,
    pub key_deposit: u64,
    pub pool_deposit: u64,
    pub drep_deposit: u64,
    pub min_pool_cost: u64,
    pub price_mem: RationalNumber,
    pub price_step: RationalNumber,
    pub max_tx_ex_mem: u64,
    pub max_tx_ex_steps: u64,
    pub max_block_ex_mem: u64,
    pub max_block_ex_steps: u64,
    /// Ceiling on the serialized byte size of any single output's value.
    pub max_val_size: u32,
    pub collateral_percent: u32,
    pub max_collateral_inputs: u32,
    pub coins_per_utxo_size: u64,
    pub min_fee_ref_script_cost_per_byte: u64,
}

impl Default for Protocol {
    fn default() -> Self {
        Self {
            epoch: 0,
            min_fee_a: 44,
            min_fee_b: 155381,
            max_block_size: 98304,
            max_tx_size: 16384,
            max_block_header_size: 1100,
            key_deposit: 2_000_000,
            pool_deposit: 500_000_000,
            drep_deposit: 500_000_000,
            min_pool_cost: 340_000_000,
            // 0.0577 and 0.0000721, kept exact
            price_mem: RationalNumber::new(577, 10_000),
            price_step: RationalNumber::new(721, 10_000_000),
            max_tx_ex_mem: 16_000_000,
            max_tx_ex_steps: 10_000_000_000,
            max_block_ex_mem: 80_000_000,
            max_block_ex_steps: 40_000_000_000,
            max_val_size: 5000,
            collateral_percent: 150,
            max_collateral_inputs: 3,
            coins_per_utxo_size: 4310,
            min_fee_ref_script_cost_per_byte: 15,
        }
    }
}
