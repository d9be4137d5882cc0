//! Candidate path discovery.
//!
//! Direct paths use every pool holding both endpoints. Two-hop paths go through a hop token
//! shared by a pool holding only tokenIn and a pool holding only tokenOut; per hop token the
//! most liquid pool on each side is used. The result is ranked by liquidity and cut down to
//! the paths that fit in `max_pools` distinct pools.

use super::graph::SwapPath;
use super::types::SwapOptions;
use crate::errors::RouterError;
use crate::pools::{Pool, PoolPairData, SwapType};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub struct PathBuilder<'a> {
    pools: &'a [Pool],
    token_in: Address,
    token_out: Address,
    options: &'a SwapOptions,
}

impl<'a> PathBuilder<'a> {
    pub fn new(pools: &'a [Pool], token_in: Address, token_out: Address, options: &'a SwapOptions) -> Self {
        Self { pools, token_in, token_out, options }
    }

    fn parse(&self, pool: &Pool, token_in: Address, token_out: Address) -> Option<PoolPairData> {
        match pool.parse_pair_data(token_in, token_out, self.options.current_timestamp) {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("Skipping pool {} for {:#x} -> {:#x}: {}", pool.id, token_in, token_out, e);
                None
            }
        }
    }

    /// Build, rank and prune the candidate paths.
    pub fn build(&self) -> Result<Vec<SwapPath>, RouterError> {
        if self.pools.is_empty() {
            return Err(RouterError::EmptyPoolSet);
        }
        let disabled = &self.options.disabled_tokens;
        if self.token_in == self.token_out || disabled.contains(&self.token_in) || disabled.contains(&self.token_out) {
            return Ok(vec![]);
        }

        let mut paths = Vec::new();
        let mut in_pools: Vec<&Pool> = Vec::new();
        let mut out_pools: Vec<&Pool> = Vec::new();
        for pool in self.pools.iter().filter(|p| self.options.pool_type_filter.allows(p.pool_type())) {
            let has_in = pool.contains_token(self.token_in);
            let has_out = pool.contains_token(self.token_out);
            match (has_in, has_out) {
                (true, true) => {
                    if let Some(pair) = self.parse(pool, self.token_in, self.token_out) {
                        let liquidity = pair.normalized_liquidity();
                        paths.push(SwapPath::new_direct(pair, liquidity));
                    }
                }
                (true, false) => in_pools.push(pool),
                (false, true) => out_pools.push(pool),
                (false, false) => {}
            }
        }
        let direct_count = paths.len();

        for hop in self.hop_tokens(&in_pools, &out_pools) {
            let first = self.best_pair(&in_pools, self.token_in, hop);
            let second = self.best_pair(&out_pools, hop, self.token_out);
            if let (Some(first), Some(second)) = (first, second) {
                let liquidity = two_hop_liquidity(&first, &second);
                paths.push(SwapPath::new_two_hop(first, second, liquidity));
            }
        }

        paths.sort_by(compare_by_liquidity);
        let candidates = paths.len();
        let kept = prune_to_max_pools(paths, self.options.max_pools);
        debug!(
            "Built {} direct and {} two-hop paths for {:#x} -> {:#x}, kept {} within {} pools",
            direct_count,
            candidates - direct_count,
            self.token_in,
            self.token_out,
            kept.len(),
            self.options.max_pools
        );
        Ok(kept)
    }

    fn hop_tokens(&self, in_pools: &[&Pool], out_pools: &[&Pool]) -> BTreeSet<Address> {
        let reachable_from_in: BTreeSet<Address> = in_pools.iter().flat_map(|p| p.tradable_tokens()).collect();
        let reaching_out: BTreeSet<Address> = out_pools.iter().flat_map(|p| p.tradable_tokens()).collect();
        reachable_from_in
            .intersection(&reaching_out)
            .filter(|t| **t != self.token_in && **t != self.token_out && !self.options.disabled_tokens.contains(*t))
            .copied()
            .collect()
    }

    // Most liquid pair among `pools` for token_in -> token_out, ties to the smaller pool id.
    fn best_pair(&self, pools: &[&Pool], token_in: Address, token_out: Address) -> Option<PoolPairData> {
        pools
            .iter()
            .filter(|p| p.contains_token(token_in) && p.contains_token(token_out))
            .filter_map(|p| self.parse(p, token_in, token_out))
            .max_by(|a, b| {
                a.normalized_liquidity()
                    .cmp(&b.normalized_liquidity())
                    .then_with(|| b.pool_id().cmp(&a.pool_id()))
            })
    }
}

// Liquidity of a two-hop path in tokenOut units: the second hop, or the first hop's liquidity
// priced through the second hop when that is smaller.
fn two_hop_liquidity(first: &PoolPairData, second: &PoolPairData) -> Decimal {
    let second_liquidity = second.normalized_liquidity();
    match second.spot_price_after_swap(Decimal::ZERO, SwapType::ExactIn) {
        Ok(price) => second_liquidity.min(first.normalized_liquidity().saturating_mul(price)),
        Err(_) => Decimal::ZERO,
    }
}

/// Higher liquidity first, then by pool ids.
pub fn compare_by_liquidity(a: &SwapPath, b: &SwapPath) -> Ordering {
    b.liquidity.cmp(&a.liquidity).then_with(|| a.pool_ids().cmp(&b.pool_ids()))
}

/// Keep paths in order while the distinct pools they touch fit in `max_pools`.
pub fn prune_to_max_pools(paths: Vec<SwapPath>, max_pools: usize) -> Vec<SwapPath> {
    let mut selected_pools = BTreeSet::new();
    let mut kept = Vec::new();
    for path in paths {
        let new_pools: Vec<_> = path.pool_ids().into_iter().filter(|id| !selected_pools.contains(id)).collect();
        if selected_pools.len() + new_pools.len() > max_pools {
            continue;
        }
        selected_pools.extend(new_pools);
        kept.push(path);
    }
    kept
}
