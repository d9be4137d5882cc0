use crate::errors::RouterError;
use crate::logic::graph::SwapPath;
use crate::logic::optimizer::SwapAllocation;
use crate::logic::types::{RouteResult, SwapStep};
use crate::pools::{Pool, PoolId, SwapType};
use crate::utils::constants::NATIVE;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Private copy of a pool snapshot, indexed by pool id. Only [`SwapPlan`] writes to it.
#[derive(Clone, Debug, Default)]
pub struct PoolArena {
    pools: Vec<Pool>,
    index: BTreeMap<PoolId, usize>,
}

impl PoolArena {
    pub fn new(snapshot: &[Pool]) -> Self {
        let pools = snapshot.to_vec();
        let index = pools.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
        Self { pools, index }
    }

    pub fn get(&self, pool_id: &PoolId) -> Option<&Pool> {
        self.index.get(pool_id).map(|i| &self.pools[*i])
    }

    fn get_mut(&mut self, pool_id: &PoolId) -> Option<&mut Pool> {
        self.index.get(pool_id).map(|i| &mut self.pools[*i])
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Endpoints of the request as the caller sent them, before native substitution.
#[derive(Clone, Copy, Debug)]
pub struct RouteEndpoints {
    pub token_in: Address,
    pub token_out: Address,
    pub wrapped_native: Address,
}

/// Turns an allocation into executable swap steps.
///
/// Paths are replayed one after the other against the arena so that a pool used by two
/// paths quotes the second one against the balances the first one left behind.
pub struct SwapPlan<'a> {
    arena: &'a mut PoolArena,
    swap_type: SwapType,
    current_timestamp: u64,
}

impl<'a> SwapPlan<'a> {
    pub fn new(arena: &'a mut PoolArena, swap_type: SwapType, current_timestamp: u64) -> Self {
        Self { arena, swap_type, current_timestamp }
    }

    pub fn assemble(
        &mut self,
        allocation: &SwapAllocation,
        endpoints: RouteEndpoints,
        swap_amount: Decimal,
        cost_per_path: Decimal,
    ) -> Result<RouteResult, RouterError> {
        let mut swaps = Vec::with_capacity(allocation.paths.len());
        let mut return_amount = Decimal::ZERO;
        for (path, amount) in allocation.paths.iter().zip(&allocation.amounts) {
            let (steps, returned) = match self.swap_type {
                SwapType::ExactIn => self.replay_exact_in(path, *amount)?,
                SwapType::ExactOut => self.replay_exact_out(path, *amount)?,
            };
            return_amount += returned;
            swaps.push(steps);
        }

        let cost = cost_per_path.saturating_mul(Decimal::from(swaps.len()));
        let return_amount_considering_fees = match self.swap_type {
            SwapType::ExactIn => return_amount.saturating_sub(cost),
            SwapType::ExactOut => return_amount.saturating_add(cost),
        };
        debug!(
            "Assembled {} paths, return {} (independent quotes {})",
            swaps.len(),
            return_amount,
            allocation.return_amount
        );

        restore_native(&mut swaps, endpoints);
        Ok(RouteResult {
            token_in: endpoints.token_in,
            token_out: endpoints.token_out,
            swap_type: self.swap_type,
            swaps,
            swap_amount,
            return_amount,
            return_amount_considering_fees,
            market_spot_price: allocation.market_spot_price,
        })
    }

    // Forward through the hops, each hop's output feeding the next.
    fn replay_exact_in(&mut self, path: &SwapPath, amount: Decimal) -> Result<(Vec<SwapStep>, Decimal), RouterError> {
        let mut steps = Vec::with_capacity(path.len());
        let mut flowing = amount;
        for hop in &path.hops {
            let base = hop.base();
            let amount_out = self.execute(&base.pool_id, base.token_in, base.token_out, flowing, SwapType::ExactIn)?;
            steps.push(SwapStep {
                pool_id: base.pool_id,
                token_in: base.token_in,
                token_out: base.token_out,
                swap_amount: flowing,
                amount_in: flowing,
                amount_out,
            });
            flowing = amount_out;
        }
        Ok((steps, flowing))
    }

    // Backwards from the last hop, each hop's required input being the previous hop's output.
    fn replay_exact_out(&mut self, path: &SwapPath, amount: Decimal) -> Result<(Vec<SwapStep>, Decimal), RouterError> {
        let mut steps = Vec::with_capacity(path.len());
        let mut flowing = amount;
        for hop in path.hops.iter().rev() {
            let base = hop.base();
            let amount_in = self.execute(&base.pool_id, base.token_in, base.token_out, flowing, SwapType::ExactOut)?;
            steps.push(SwapStep {
                pool_id: base.pool_id,
                token_in: base.token_in,
                token_out: base.token_out,
                swap_amount: flowing,
                amount_in,
                amount_out: flowing,
            });
            flowing = amount_in;
        }
        steps.reverse();
        Ok((steps, flowing))
    }

    // Quote one hop against the arena's current balances and book the trade.
    fn execute(
        &mut self,
        pool_id: &PoolId,
        token_in: Address,
        token_out: Address,
        amount: Decimal,
        swap_type: SwapType,
    ) -> Result<Decimal, RouterError> {
        let pool = self
            .arena
            .get_mut(pool_id)
            .ok_or(RouterError::UnknownToken { pool_id: *pool_id, token: token_in })?;
        let pair = pool.parse_pair_data(token_in, token_out, self.current_timestamp)?;
        let quoted = pair.quote(amount, swap_type)?;
        let (amount_in, amount_out) = match swap_type {
            SwapType::ExactIn => (amount, quoted),
            SwapType::ExactOut => (quoted, amount),
        };
        pool.apply_swap(token_in, amount_in, token_out, amount_out)?;
        Ok(quoted)
    }
}

// Paths run on the wrapped token; callers that asked for the native asset get it back.
fn restore_native(swaps: &mut [Vec<SwapStep>], endpoints: RouteEndpoints) {
    let native_in = endpoints.token_in == NATIVE;
    let native_out = endpoints.token_out == NATIVE;
    if !native_in && !native_out {
        return;
    }
    for steps in swaps.iter_mut() {
        if native_in {
            if let Some(first) = steps.first_mut() {
                if first.token_in == endpoints.wrapped_native {
                    first.token_in = NATIVE;
                }
            }
        }
        if native_out {
            if let Some(last) = steps.last_mut() {
                if last.token_out == endpoints.wrapped_native {
                    last.token_out = NATIVE;
                }
            }
        }
    }
}
