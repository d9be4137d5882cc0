use alloy_primitives::{Address, address};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

/// Sentinel used by callers for the chain's native asset.
pub const NATIVE: Address = Address::ZERO;

/// Share tokens are always minted with 18 decimals.
pub const BPT_DECIMALS: u32 = 18;

/// Largest fraction of the input balance a single path may push into a pool.
pub const DEFAULT_MAX_IN_RATIO: Decimal = dec!(0.3);

/// Largest fraction of the output balance a single path may take out of a pool.
pub const DEFAULT_MAX_OUT_RATIO: Decimal = dec!(0.3);

pub const DEFAULT_MAX_POOLS: usize = 4;

pub const DEFAULT_SOLVER_MAX_ITERATIONS: usize = 100;

pub const DEFAULT_SOLVER_TOLERANCE: Decimal = dec!(0.000000000001);

/// Iteration cap of the stable invariant solvers.
pub const STABLE_MAX_ITERATIONS: usize = 255;
