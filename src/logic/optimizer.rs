//! Smart order routing: split an amount over candidate paths so their marginal prices match.
//!
//! Paths are tried best spot price first. For every prefix of that order the split is found
//! by searching the common marginal price `λ` such that the amounts each path takes at `λ`
//! add up to the request. A path count is kept while it improves proceeds net of the per path
//! execution cost.

use super::graph::SwapPath;
use super::path_limits::amount_decimals;
use super::types::RouterConfig;
use crate::errors::RouterError;
use crate::pools::SwapType;
use crate::utils::decimal::round_down;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Chosen paths with the amount each one takes, in the request's amount token.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapAllocation {
    pub paths: Vec<SwapPath>,
    pub amounts: Vec<Decimal>,
    /// Sum of independent path quotes.
    pub return_amount: Decimal,
    pub return_amount_considering_fees: Decimal,
    /// Best zero volume price among the chosen paths.
    pub market_spot_price: Decimal,
}

// A path with its zero volume price and the price at its limit.
struct Candidate<'p> {
    path: &'p SwapPath,
    spot_price: Decimal,
    limit_price: Decimal,
}

struct Evaluated {
    indices: Vec<usize>,
    amounts: Vec<Decimal>,
    total: Decimal,
    net: Decimal,
}

pub struct Optimizer<'a> {
    config: &'a RouterConfig,
    swap_type: SwapType,
}

impl<'a> Optimizer<'a> {
    pub fn new(config: &'a RouterConfig, swap_type: SwapType) -> Self {
        Self { config, swap_type }
    }

    /// Allocate `amount` over `paths` (which must carry their limits).
    ///
    /// Returns `None` when there is nothing to route through.
    pub fn optimize(
        &self,
        paths: &[SwapPath],
        amount: Decimal,
        max_pools: usize,
        cost_per_path: Decimal,
    ) -> Result<Option<SwapAllocation>, RouterError> {
        let candidates = self.rank(paths);
        let Some(first) = candidates.first() else {
            return Ok(None);
        };
        let max_pools = max_pools.max(1);

        let mut by_limit: Vec<usize> = (0..candidates.len()).collect();
        by_limit.sort_by(|a, b| candidates[*b].path.limit.cmp(&candidates[*a].path.limit).then(a.cmp(b)));
        by_limit.truncate(max_pools);
        let available = total_limit(&candidates, &by_limit);
        if available < amount {
            return Err(RouterError::InsufficientLiquidity {
                token_in: first.path.token_in().unwrap_or_default(),
                token_out: first.path.token_out().unwrap_or_default(),
                requested: amount,
                available,
            });
        }

        let mut best: Option<Evaluated> = None;
        for count in 1..=max_pools.min(candidates.len()) {
            let indices: Vec<usize> = (0..count).collect();
            let capacity = total_limit(&candidates, &indices);
            if capacity < amount {
                continue;
            }
            let evaluated = match self.evaluate(&candidates, indices, amount, cost_per_path) {
                Ok(evaluated) => evaluated,
                Err(e) => {
                    warn!("Skipping split over {} paths: {}", count, e);
                    continue;
                }
            };
            debug!("Split over {} paths returns {} (net {})", count, evaluated.total, evaluated.net);
            if !best.as_ref().is_none_or(|current| self.improves(evaluated.net, current.net)) {
                break;
            }
            best = Some(evaluated);
        }

        let best = match best {
            Some(best) => best,
            None => {
                by_limit.sort();
                self.evaluate(&candidates, by_limit, amount, cost_per_path)?
            }
        };

        let mut chosen_paths = Vec::new();
        let mut amounts = Vec::new();
        let mut market_spot_price = Decimal::ZERO;
        for (index, path_amount) in best.indices.iter().zip(best.amounts) {
            if path_amount.is_zero() {
                continue;
            }
            let candidate = &candidates[*index];
            market_spot_price = market_spot_price.max(candidate.spot_price);
            chosen_paths.push(candidate.path.clone());
            amounts.push(path_amount);
        }
        Ok(Some(SwapAllocation {
            paths: chosen_paths,
            amounts,
            return_amount: best.total,
            return_amount_considering_fees: best.net,
            market_spot_price,
        }))
    }

    fn improves(&self, candidate: Decimal, current: Decimal) -> bool {
        match self.swap_type {
            SwapType::ExactIn => candidate > current,
            SwapType::ExactOut => candidate < current,
        }
    }

    // Best zero volume price first, ties to liquidity then pool ids.
    fn rank<'p>(&self, paths: &'p [SwapPath]) -> Vec<Candidate<'p>> {
        let mut candidates: Vec<Candidate<'p>> = paths
            .iter()
            .filter(|p| p.limit > Decimal::ZERO)
            .filter_map(|path| match path.spot_price_after_swap(Decimal::ZERO, self.swap_type) {
                Ok(spot_price) => {
                    let limit_price =
                        path.spot_price_after_swap(path.limit, self.swap_type).unwrap_or(Decimal::ZERO).min(spot_price);
                    Some(Candidate { path, spot_price, limit_price })
                }
                Err(e) => {
                    warn!("Dropping {}: {}", path, e);
                    None
                }
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.spot_price
                .cmp(&a.spot_price)
                .then_with(|| b.path.liquidity.cmp(&a.path.liquidity))
                .then_with(|| a.path.pool_ids().cmp(&b.path.pool_ids()))
        });
        candidates
    }

    fn evaluate(
        &self,
        candidates: &[Candidate<'_>],
        indices: Vec<usize>,
        amount: Decimal,
        cost_per_path: Decimal,
    ) -> Result<Evaluated, RouterError> {
        let selected: Vec<&Candidate<'_>> = indices.iter().map(|i| &candidates[*i]).collect();
        let raw = self.equalize(&selected, amount)?;
        let amounts = self.round_allocation(&selected, raw, amount);

        let mut total = Decimal::ZERO;
        let mut used = 0u32;
        for (candidate, path_amount) in selected.iter().zip(&amounts) {
            if path_amount.is_zero() {
                continue;
            }
            total += candidate.path.quote(*path_amount, self.swap_type)?;
            used += 1;
        }
        let cost = cost_per_path.saturating_mul(Decimal::from(used));
        let net = match self.swap_type {
            SwapType::ExactIn => total.saturating_sub(cost),
            SwapType::ExactOut => total.saturating_add(cost),
        };
        Ok(Evaluated { indices, amounts, total, net })
    }

    /// Amounts that equalize marginal prices across `selected` and add up to `amount`.
    fn equalize(&self, selected: &[&Candidate<'_>], amount: Decimal) -> Result<Vec<Decimal>, RouterError> {
        if let [single] = selected {
            return Ok(vec![amount.min(single.path.limit)]);
        }
        let tolerance = self.config.solver_tolerance;
        let mut low = selected.iter().map(|c| c.limit_price).min().unwrap_or(Decimal::ZERO);
        let mut high = selected.iter().map(|c| c.spot_price).max().unwrap_or(Decimal::ZERO);
        let mut amounts: Vec<Decimal> = selected.iter().map(|c| c.path.limit).collect();
        let mut converged = false;

        for _ in 0..self.config.solver_max_iterations {
            let price = (low + high) / Decimal::TWO;
            amounts = selected.iter().map(|c| self.amount_at_price(c, price)).collect::<Result<_, _>>()?;
            let placed: Decimal = amounts.iter().sum();
            if (placed - amount).abs() <= amount * tolerance {
                converged = true;
                break;
            }
            // amounts shrink as the price rises
            match placed.cmp(&amount) {
                Ordering::Greater => low = price,
                _ => high = price,
            }
            if high - low <= high * tolerance {
                converged = true;
                break;
            }
        }
        if !converged {
            warn!("Marginal price search hit {} iterations, using best effort split", self.config.solver_max_iterations);
        }

        redistribute(selected, &mut amounts, amount);
        Ok(amounts)
    }

    /// Amount a path takes before its marginal price falls to `price`.
    fn amount_at_price(&self, candidate: &Candidate<'_>, price: Decimal) -> Result<Decimal, RouterError> {
        let limit = candidate.path.limit;
        if candidate.spot_price <= price {
            return Ok(Decimal::ZERO);
        }
        if candidate.limit_price >= price {
            return Ok(limit);
        }
        let tolerance = self.config.solver_tolerance;
        let (mut low, mut high) = (Decimal::ZERO, limit);
        let mut x = limit / Decimal::TWO;
        for _ in 0..self.config.solver_max_iterations {
            let rate = candidate.path.spot_price_after_swap(x, self.swap_type)?;
            if (rate - price).abs() <= price * tolerance {
                return Ok(x);
            }
            if rate > price {
                low = x;
            } else {
                high = x;
            }
            if high - low <= limit * tolerance {
                break;
            }
            let slope = candidate.path.derivative_spot_price_after_swap(x, self.swap_type)?;
            let bisect = (low + high) / Decimal::TWO;
            let newton = (slope < Decimal::ZERO)
                .then(|| (rate - price).checked_div(slope).and_then(|step| x.checked_sub(step)))
                .flatten();
            x = match newton {
                Some(newton) if newton > low && newton < high => newton,
                _ => bisect,
            };
        }
        Ok(x)
    }

    /// Truncate to the amount token's precision and hand the dust to paths with headroom.
    fn round_allocation(&self, selected: &[&Candidate<'_>], amounts: Vec<Decimal>, amount: Decimal) -> Vec<Decimal> {
        let Some(first) = selected.first() else {
            return amounts;
        };
        let decimals = amount_decimals(first.path, self.swap_type);
        let mut rounded: Vec<Decimal> = amounts.into_iter().map(|a| round_down(a, decimals)).collect();
        let placed: Decimal = rounded.iter().sum();
        let mut dust = round_down(amount - placed, decimals);
        if dust <= Decimal::ZERO {
            return rounded;
        }

        // largest allocation first, earlier path on ties
        let mut order: Vec<usize> = (0..rounded.len()).collect();
        order.sort_by(|a, b| rounded[*b].cmp(&rounded[*a]).then(a.cmp(b)));
        for i in order {
            let headroom = selected[i].path.limit - rounded[i];
            let take = dust.min(headroom);
            if take > Decimal::ZERO {
                rounded[i] += take;
                dust -= take;
            }
            if dust.is_zero() {
                break;
            }
        }
        rounded
    }
}

// Saturating, capacity is only compared against the request.
fn total_limit(candidates: &[Candidate<'_>], indices: &[usize]) -> Decimal {
    indices.iter().fold(Decimal::ZERO, |acc, i| acc.saturating_add(candidates[*i].path.limit))
}

// Push what the price search left over onto paths with headroom, or take back an overshoot.
fn redistribute(selected: &[&Candidate<'_>], amounts: &mut [Decimal], amount: Decimal) {
    let placed: Decimal = amounts.iter().sum();
    let mut residual = amount - placed;
    if residual > Decimal::ZERO {
        for (candidate, allocated) in selected.iter().zip(amounts.iter_mut()) {
            let take = residual.min(candidate.path.limit - *allocated);
            if take > Decimal::ZERO {
                *allocated += take;
                residual -= take;
            }
        }
    } else if residual < Decimal::ZERO {
        for allocated in amounts.iter_mut().rev() {
            let give_back = (-residual).min(*allocated);
            *allocated -= give_back;
            residual += give_back;
            if residual.is_zero() {
                break;
            }
        }
    }
}
