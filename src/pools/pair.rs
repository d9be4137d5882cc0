use super::element::ElementPairData;
use super::linear::LinearPairData;
use super::pool::PoolType;
use super::pool_id::PoolId;
use super::stable::StablePairData;
use super::weighted::WeightedPairData;
use crate::errors::RouterError;
use crate::utils::constants::{DEFAULT_MAX_IN_RATIO, DEFAULT_MAX_OUT_RATIO};
use crate::utils::decimal::{round_down, round_up};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SwapType {
    ExactIn,
    ExactOut,
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PairType {
    TokenToToken,
    TokenToBpt,
    BptToToken,
}

/// Fields every pool family resolves the same way.
#[derive(Clone, Debug, PartialEq)]
pub struct PairBase {
    pub pool_id: PoolId,
    pub pool_type: PoolType,
    pub pair_type: PairType,
    pub token_in: Address,
    pub token_out: Address,
    pub balance_in: Decimal,
    pub balance_out: Decimal,
    pub decimals_in: u32,
    pub decimals_out: u32,
    pub swap_fee: Decimal,
}

impl PairBase {
    pub fn degenerate(&self, reason: &str) -> RouterError {
        RouterError::degenerate(&self.pool_id, self.pool_type, reason)
    }

    pub fn unsupported(&self, operation: &'static str) -> RouterError {
        RouterError::unsupported(&self.pool_id, self.pool_type, operation)
    }

    /// `1 - swap_fee`.
    pub fn fee_complement(&self) -> Decimal {
        Decimal::ONE - self.swap_fee
    }
}

/// Share of a balance a single swap may consume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LimitRatios {
    pub max_in_ratio: Decimal,
    pub max_out_ratio: Decimal,
}

impl Default for LimitRatios {
    fn default() -> Self {
        Self { max_in_ratio: DEFAULT_MAX_IN_RATIO, max_out_ratio: DEFAULT_MAX_OUT_RATIO }
    }
}

/// Capability set shared by every AMM family.
///
/// Amounts are normalized and unrounded here; [`PoolPairData`] applies the token precision.
/// Spot prices are tokenOut per tokenIn, so they fall as the traded amount grows.
pub trait PoolPricing {
    fn base(&self) -> &PairBase;

    /// Output-side balance weighted by how much of it is reachable at a fair price.
    fn normalized_liquidity(&self) -> Decimal;

    fn limit_amount(&self, swap_type: SwapType, ratios: &LimitRatios) -> Result<Decimal, RouterError> {
        let base = self.base();
        let limit = match swap_type {
            SwapType::ExactIn => base.balance_in.checked_mul(ratios.max_in_ratio),
            SwapType::ExactOut => base.balance_out.checked_mul(ratios.max_out_ratio),
        };
        limit.ok_or_else(|| base.degenerate("limit out of range"))
    }

    fn exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError>;

    fn exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError>;

    /// Marginal rate after swapping `amount` (input for exact-in, output for exact-out).
    fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError>;

    /// Derivative of [`PoolPricing::spot_price_after_swap`] with respect to `amount`.
    fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError>;
}

/// Pair view for one pool, dispatched by family.
#[derive(Clone, Debug, PartialEq)]
pub enum PoolPairData {
    Weighted(WeightedPairData),
    Stable(StablePairData),
    Linear(LinearPairData),
    Element(ElementPairData),
}

macro_rules! dispatch {
    ($self:ident, $pair:ident => $body:expr) => {
        match $self {
            PoolPairData::Weighted($pair) => $body,
            PoolPairData::Stable($pair) => $body,
            PoolPairData::Linear($pair) => $body,
            PoolPairData::Element($pair) => $body,
        }
    };
}

impl PoolPairData {
    pub fn base(&self) -> &PairBase {
        dispatch!(self, pair => pair.base())
    }

    pub fn pool_id(&self) -> PoolId {
        self.base().pool_id
    }

    pub fn normalized_liquidity(&self) -> Decimal {
        dispatch!(self, pair => pair.normalized_liquidity())
    }

    pub fn limit_amount(&self, swap_type: SwapType, ratios: &LimitRatios) -> Result<Decimal, RouterError> {
        dispatch!(self, pair => pair.limit_amount(swap_type, ratios))
    }

    /// Output for `amount_in`, truncated to tokenOut precision.
    pub fn quote_exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError> {
        if amount_in <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let out = dispatch!(self, pair => pair.exact_in(amount_in))?;
        Ok(round_down(out.max(Decimal::ZERO), self.base().decimals_out))
    }

    /// Input required for `amount_out`, rounded up to tokenIn precision.
    pub fn quote_exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError> {
        if amount_out <= Decimal::ZERO {
            return Ok(Decimal::ZERO);
        }
        let amount_in = dispatch!(self, pair => pair.exact_out(amount_out))?;
        Ok(round_up(amount_in.max(Decimal::ZERO), self.base().decimals_in))
    }

    /// Exact-in quotes the output, exact-out quotes the required input.
    pub fn quote(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        match swap_type {
            SwapType::ExactIn => self.quote_exact_in(amount),
            SwapType::ExactOut => self.quote_exact_out(amount),
        }
    }

    pub fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        dispatch!(self, pair => pair.spot_price_after_swap(amount, swap_type))
    }

    pub fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        dispatch!(self, pair => pair.derivative_spot_price_after_swap(amount, swap_type))
    }
}
