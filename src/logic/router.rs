use super::graph::SwapPath;
use super::optimizer::Optimizer;
use super::path_builder::PathBuilder;
use super::path_limits::calculate_path_limits;
use super::types::{RouteResult, RouterConfig, SwapOptions, SwapType};
use crate::errors::RouterError;
use crate::execution::{PoolArena, RouteEndpoints, SwapPlan};
use crate::pools::Pool;
use crate::utils::constants::NATIVE;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use tracing::debug;

/// Entry point of the routing core. Holds only tunables, so one instance can serve any
/// number of concurrent requests.
#[derive(Clone, Debug, Default)]
pub struct Router {
    config: RouterConfig,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Options with the configured default fan-out.
    pub fn default_options(&self) -> SwapOptions {
        SwapOptions::default().with_max_pools(self.config.default_max_pools)
    }

    fn wrap_native(&self, token: Address) -> Address {
        if token == NATIVE { self.config.wrapped_native } else { token }
    }

    /// Best split of `amount` from `token_in` to `token_out` over `pools`.
    ///
    /// `pools` is copied before any balance is touched.
    pub fn route(
        &self,
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        amount: Decimal,
        pools: &[Pool],
        options: &SwapOptions,
    ) -> Result<RouteResult, RouterError> {
        let paths = self.prepare_paths(pools, token_in, token_out, swap_type, options)?;
        self.route_prepared(token_in, token_out, swap_type, amount, pools, &paths, options)
    }

    /// Candidate paths with their limits, ready for [`Router::route_prepared`].
    pub fn prepare_paths(
        &self,
        pools: &[Pool],
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        options: &SwapOptions,
    ) -> Result<Vec<SwapPath>, RouterError> {
        let (wrapped_in, wrapped_out) = (self.wrap_native(token_in), self.wrap_native(token_out));
        let paths = PathBuilder::new(pools, wrapped_in, wrapped_out, options).build()?;
        Ok(calculate_path_limits(paths, swap_type, &self.config.limit_ratios()))
    }

    /// Route over paths prepared earlier against the same `pools`.
    #[allow(clippy::too_many_arguments)]
    pub fn route_prepared(
        &self,
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        amount: Decimal,
        pools: &[Pool],
        paths: &[SwapPath],
        options: &SwapOptions,
    ) -> Result<RouteResult, RouterError> {
        if pools.is_empty() {
            return Err(RouterError::EmptyPoolSet);
        }
        let empty = RouteResult::empty(token_in, token_out, swap_type, amount);
        if amount <= Decimal::ZERO {
            return Ok(empty);
        }

        let cost_per_path = options.cost_per_path();
        let optimizer = Optimizer::new(&self.config, swap_type);
        let Some(allocation) = optimizer.optimize(paths, amount, options.max_pools, cost_per_path)? else {
            debug!("No route for {:#x} -> {:#x}", token_in, token_out);
            return Ok(empty);
        };

        let mut arena = PoolArena::new(pools);
        let endpoints = RouteEndpoints { token_in, token_out, wrapped_native: self.config.wrapped_native };
        SwapPlan::new(&mut arena, swap_type, options.current_timestamp).assemble(&allocation, endpoints, amount, cost_per_path)
    }
}
