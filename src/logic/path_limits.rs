use super::graph::SwapPath;
use crate::errors::RouterError;
use crate::pools::{LimitRatios, SwapType};
use crate::utils::decimal::round_down;
use rust_decimal::Decimal;
use tracing::warn;

/// Largest amount `path` can take, in tokenIn for exact-in and tokenOut for exact-out.
///
/// For two hops the tighter hop wins, after mapping the second hop's limit through the first
/// hop (or the first through the second for exact-out) into the request's token.
pub fn path_limit(path: &SwapPath, swap_type: SwapType, ratios: &LimitRatios) -> Result<Decimal, RouterError> {
    let limit = match (path.hops.as_slice(), swap_type) {
        ([hop], _) => hop.limit_amount(swap_type, ratios)?,
        ([first, second], SwapType::ExactIn) => {
            let first_limit = first.limit_amount(swap_type, ratios)?;
            let second_limit = second.limit_amount(swap_type, ratios)?;
            if first.quote_exact_in(first_limit)? > second_limit {
                first.quote_exact_out(second_limit)?
            } else {
                first_limit
            }
        }
        ([first, second], SwapType::ExactOut) => {
            let first_limit = first.limit_amount(swap_type, ratios)?;
            let second_limit = second.limit_amount(swap_type, ratios)?;
            if second.quote_exact_out(second_limit)? > first_limit {
                second.quote_exact_in(first_limit)?
            } else {
                second_limit
            }
        }
        _ => return Ok(Decimal::ZERO),
    };
    Ok(round_down(limit.max(Decimal::ZERO), amount_decimals(path, swap_type)))
}

/// Decimals of the token the request amount is denominated in.
pub fn amount_decimals(path: &SwapPath, swap_type: SwapType) -> u32 {
    match swap_type {
        SwapType::ExactIn => path.hops.first().map(|h| h.base().decimals_in),
        SwapType::ExactOut => path.hops.last().map(|h| h.base().decimals_out),
    }
    .unwrap_or(0)
}

/// Attach limits, dropping paths whose limit is zero or cannot be computed.
pub fn calculate_path_limits(paths: Vec<SwapPath>, swap_type: SwapType, ratios: &LimitRatios) -> Vec<SwapPath> {
    paths
        .into_iter()
        .filter_map(|mut path| match path_limit(&path, swap_type, ratios) {
            Ok(limit) if limit > Decimal::ZERO => {
                path.limit = limit;
                Some(path)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Dropping {}: {}", path, e);
                None
            }
        })
        .collect()
}
