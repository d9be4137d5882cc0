use crate::pools::{LimitRatios, PoolId, PoolType};
use crate::utils::constants::{
    DEFAULT_MAX_IN_RATIO, DEFAULT_MAX_OUT_RATIO, DEFAULT_MAX_POOLS, DEFAULT_SOLVER_MAX_ITERATIONS, DEFAULT_SOLVER_TOLERANCE,
    WETH,
};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};

pub use crate::pools::SwapType;

/// Restricts which pool families take part in a route.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq, Hash, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolFilter {
    #[default]
    All,
    Weighted,
    Stable,
    Linear,
    Element,
}

impl PoolFilter {
    pub fn allows(&self, pool_type: PoolType) -> bool {
        match self {
            PoolFilter::All => true,
            PoolFilter::Weighted => pool_type == PoolType::Weighted,
            PoolFilter::Stable => pool_type == PoolType::Stable,
            PoolFilter::Linear => pool_type == PoolType::Linear,
            PoolFilter::Element => pool_type == PoolType::Element,
        }
    }
}

/// Per request knobs.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapOptions {
    pub max_pools: usize,
    pub pool_type_filter: PoolFilter,
    pub disabled_tokens: BTreeSet<Address>,
    /// Fixed cost of one extra path, in the token the route returns. `None` means free.
    pub execution_cost_per_path: Option<Decimal>,
    /// Only used by time dependent pools.
    pub current_timestamp: u64,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            max_pools: DEFAULT_MAX_POOLS,
            pool_type_filter: PoolFilter::All,
            disabled_tokens: BTreeSet::new(),
            execution_cost_per_path: None,
            current_timestamp: 0,
        }
    }
}

impl SwapOptions {
    pub fn with_max_pools(self, max_pools: usize) -> Self {
        Self { max_pools, ..self }
    }

    pub fn with_execution_cost(self, cost: Decimal) -> Self {
        Self { execution_cost_per_path: Some(cost), ..self }
    }

    pub fn with_timestamp(self, current_timestamp: u64) -> Self {
        Self { current_timestamp, ..self }
    }

    pub fn with_filter(self, pool_type_filter: PoolFilter) -> Self {
        Self { pool_type_filter, ..self }
    }

    pub fn with_disabled_token(mut self, token: Address) -> Self {
        self.disabled_tokens.insert(token);
        self
    }

    pub fn cost_per_path(&self) -> Decimal {
        self.execution_cost_per_path.unwrap_or(Decimal::ZERO)
    }
}

/// Router tunables, usually read from the `[router]` config section.
#[derive(Clone, Debug, PartialEq)]
pub struct RouterConfig {
    pub max_in_ratio: Decimal,
    pub max_out_ratio: Decimal,
    pub solver_max_iterations: usize,
    /// Relative tolerance of the marginal price search.
    pub solver_tolerance: Decimal,
    pub wrapped_native: Address,
    pub default_max_pools: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_in_ratio: DEFAULT_MAX_IN_RATIO,
            max_out_ratio: DEFAULT_MAX_OUT_RATIO,
            solver_max_iterations: DEFAULT_SOLVER_MAX_ITERATIONS,
            solver_tolerance: DEFAULT_SOLVER_TOLERANCE,
            wrapped_native: WETH,
            default_max_pools: DEFAULT_MAX_POOLS,
        }
    }
}

impl RouterConfig {
    pub fn limit_ratios(&self) -> LimitRatios {
        LimitRatios { max_in_ratio: self.max_in_ratio, max_out_ratio: self.max_out_ratio }
    }
}

/// One hop of an executable route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapStep {
    pub pool_id: PoolId,
    pub token_in: Address,
    pub token_out: Address,
    /// Input amount for exact-in routes, output amount for exact-out routes.
    pub swap_amount: Decimal,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    pub token_in: Address,
    pub token_out: Address,
    pub swap_type: SwapType,
    /// One group of hops per path, in execution order.
    pub swaps: Vec<Vec<SwapStep>>,
    pub swap_amount: Decimal,
    /// Total output for exact-in, total input for exact-out.
    pub return_amount: Decimal,
    pub return_amount_considering_fees: Decimal,
    pub market_spot_price: Decimal,
}

impl RouteResult {
    /// The valid "no route" answer.
    pub fn empty(token_in: Address, token_out: Address, swap_type: SwapType, swap_amount: Decimal) -> Self {
        Self {
            token_in,
            token_out,
            swap_type,
            swaps: vec![],
            swap_amount,
            return_amount: Decimal::ZERO,
            return_amount_considering_fees: Decimal::ZERO,
            market_spot_price: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.swaps.is_empty()
    }

    pub fn path_count(&self) -> usize {
        self.swaps.len()
    }

    /// Sum of the amounts entering each path at its first hop.
    pub fn total_path_amount(&self) -> Decimal {
        self.swaps
            .iter()
            .filter_map(|steps| match self.swap_type {
                SwapType::ExactIn => steps.first().map(|s| s.swap_amount),
                SwapType::ExactOut => steps.last().map(|s| s.swap_amount),
            })
            .sum()
    }
}
