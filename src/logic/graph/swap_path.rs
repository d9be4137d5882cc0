use super::swap_path_hash::SwapPathHash;
use crate::errors::RouterError;
use crate::pools::{PoolId, PoolPairData, SwapType};
use crate::utils::decimal::product;
use alloy_primitives::Address;
use rust_decimal::Decimal;
use sha2::digest::Update;
use sha2::{Digest, Sha256};
use std::fmt::Display;

/// A route of one or two hops from the request's tokenIn to its tokenOut.
///
/// Quotes are composed hop by hop, rounding at every token boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct SwapPath {
    // hash of the tokens and pools, used as the path's identity
    pub swap_path_hash: SwapPathHash,
    pub hops: Vec<PoolPairData>,
    /// Liquidity proxy in tokenOut units, used for ranking.
    pub liquidity: Decimal,
    /// Largest amount the path takes, in the amount token of the swap type. Zero until computed.
    pub limit: Decimal,
}

impl Display for SwapPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SwapPath({}, pools={:?}, tokens={:?})",
            self.swap_path_hash.short(),
            self.pool_ids().iter().map(|p| p.to_string()).collect::<Vec<String>>(),
            self.tokens().iter().map(|t| format!("{t:#}")).collect::<Vec<String>>()
        )
    }
}

impl SwapPath {
    pub fn new_direct(hop: PoolPairData, liquidity: Decimal) -> Self {
        Self::new(vec![hop], liquidity)
    }

    /// The caller is responsible for `first` ending at the token `second` starts with.
    pub fn new_two_hop(first: PoolPairData, second: PoolPairData, liquidity: Decimal) -> Self {
        Self::new(vec![first, second], liquidity)
    }

    fn new(hops: Vec<PoolPairData>, liquidity: Decimal) -> Self {
        let swap_path_hash = generate_swap_path_hash(&hops);
        SwapPath { swap_path_hash, hops, liquidity, limit: Decimal::ZERO }
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn token_in(&self) -> Option<Address> {
        self.hops.first().map(|h| h.base().token_in)
    }

    pub fn token_out(&self) -> Option<Address> {
        self.hops.last().map(|h| h.base().token_out)
    }

    /// tokenIn, then every hop's tokenOut.
    pub fn tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self.token_in().into_iter().collect();
        tokens.extend(self.hops.iter().map(|h| h.base().token_out));
        tokens
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.hops.iter().map(|h| h.pool_id()).collect()
    }

    pub fn contains_pool(&self, pool_id: &PoolId) -> bool {
        self.hops.iter().any(|h| h.pool_id() == *pool_id)
    }

    /// Output for an exact-in amount, or the input needed for an exact-out amount.
    pub fn quote(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        match swap_type {
            SwapType::ExactIn => self.hops.iter().try_fold(amount, |acc, hop| hop.quote_exact_in(acc)),
            SwapType::ExactOut => self.hops.iter().rev().try_fold(amount, |acc, hop| hop.quote_exact_out(acc)),
        }
    }

    /// Composite marginal rate, tokenOut per tokenIn, after trading `amount` on this path.
    pub fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        match (self.hops.as_slice(), swap_type) {
            ([hop], _) => hop.spot_price_after_swap(amount, swap_type),
            ([first, second], SwapType::ExactIn) => {
                let middle = first.quote_exact_in(amount)?;
                let rate = first.spot_price_after_swap(amount, swap_type)?;
                rate.checked_mul(second.spot_price_after_swap(middle, swap_type)?).ok_or_else(|| out_of_range(first))
            }
            ([first, second], SwapType::ExactOut) => {
                let middle = second.quote_exact_out(amount)?;
                let rate = second.spot_price_after_swap(amount, swap_type)?;
                rate.checked_mul(first.spot_price_after_swap(middle, swap_type)?).ok_or_else(|| out_of_range(first))
            }
            _ => Err(self.too_long()),
        }
    }

    /// Derivative of [`SwapPath::spot_price_after_swap`] with respect to `amount`.
    pub fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        match (self.hops.as_slice(), swap_type) {
            ([hop], _) => hop.derivative_spot_price_after_swap(amount, swap_type),
            ([first, second], SwapType::ExactIn) => {
                // d/dA r1(A) * r2(m(A)) with dm/dA = r1(A)
                let middle = first.quote_exact_in(amount)?;
                let r1 = first.spot_price_after_swap(amount, swap_type)?;
                let d1 = first.derivative_spot_price_after_swap(amount, swap_type)?;
                let r2 = second.spot_price_after_swap(middle, swap_type)?;
                let d2 = second.derivative_spot_price_after_swap(middle, swap_type)?;
                product(&[r1, r1, d2])
                    .and_then(|second_term| d1.checked_mul(r2)?.checked_add(second_term))
                    .ok_or_else(|| out_of_range(first))
            }
            ([first, second], SwapType::ExactOut) => {
                // d/dA r2(A) * r1(m(A)) with dm/dA = 1 / r2(A)
                let middle = second.quote_exact_out(amount)?;
                let d2 = second.derivative_spot_price_after_swap(amount, swap_type)?;
                let r1 = first.spot_price_after_swap(middle, swap_type)?;
                let d1 = first.derivative_spot_price_after_swap(middle, swap_type)?;
                d2.checked_mul(r1).and_then(|term| term.checked_add(d1)).ok_or_else(|| out_of_range(first))
            }
            _ => Err(self.too_long()),
        }
    }

    fn too_long(&self) -> RouterError {
        match self.hops.first() {
            Some(first) => RouterError::unsupported(&first.pool_id(), first.base().pool_type, "paths longer than two hops"),
            None => RouterError::EmptyPoolSet,
        }
    }
}

fn out_of_range(hop: &PoolPairData) -> RouterError {
    hop.base().degenerate("composite price out of range")
}

/// Hash all the token addresses and pool ids of the path to a sha256 hash.
/// To have a stable reproducible hash and to make it easy to use in other languages.
pub fn generate_swap_path_hash(hops: &[PoolPairData]) -> SwapPathHash {
    let mut hasher = Sha256::new();

    if let Some(first) = hops.first() {
        Update::update(&mut hasher, first.base().token_in.as_slice());
    }
    for hop in hops.iter() {
        Update::update(&mut hasher, hop.base().token_out.as_slice());
    }
    for hop in hops.iter() {
        Update::update(&mut hasher, hop.pool_id().as_slice());
    }

    let hash_slice: [u8; 32] = hasher.finalize().into();
    SwapPathHash::from(hash_slice)
}
