//! Linear pools: a main token, its wrapped (yield bearing) version with a price rate, and the
//! pool's share token.
//!
//! The main balance is mapped to a nominal balance that charges the fee outside the target
//! band `[lower_target, upper_target]` and pays it back when trades move the balance towards
//! the band. Prices are piecewise constant.

use super::pair::{PairBase, PoolPricing, SwapType};
use crate::errors::RouterError;
use crate::utils::decimal::{div, product};
use rust_decimal::Decimal;

const ONE: Decimal = Decimal::ONE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LinearPairKind {
    MainToWrapped,
    WrappedToMain,
    MainToBpt,
    BptToMain,
    WrappedToBpt,
    BptToWrapped,
}

impl LinearPairKind {
    /// `None` for an index means the share token.
    pub fn resolve(index_in: Option<usize>, index_out: Option<usize>, main: usize, wrapped: usize) -> Option<Self> {
        match (index_in, index_out) {
            (Some(i), Some(o)) if i == main && o == wrapped => Some(Self::MainToWrapped),
            (Some(i), Some(o)) if i == wrapped && o == main => Some(Self::WrappedToMain),
            (Some(i), None) if i == main => Some(Self::MainToBpt),
            (Some(i), None) if i == wrapped => Some(Self::WrappedToBpt),
            (None, Some(o)) if o == main => Some(Self::BptToMain),
            (None, Some(o)) if o == wrapped => Some(Self::BptToWrapped),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinearPairData {
    pub base: PairBase,
    pub kind: LinearPairKind,
    pub main_balance: Decimal,
    pub wrapped_balance: Decimal,
    /// Main tokens per wrapped token.
    pub rate: Decimal,
    pub lower_target: Decimal,
    pub upper_target: Decimal,
    pub total_shares: Decimal,
}

impl LinearPairData {
    fn fee(&self) -> Decimal {
        self.base.swap_fee
    }

    fn to_nominal(&self, real: Decimal) -> Option<Decimal> {
        if real < self.lower_target {
            real.checked_sub((self.lower_target - real).checked_mul(self.fee())?)
        } else if real <= self.upper_target {
            Some(real)
        } else {
            real.checked_sub((real - self.upper_target).checked_mul(self.fee())?)
        }
    }

    fn from_nominal(&self, nominal: Decimal) -> Option<Decimal> {
        let real = if nominal < self.lower_target {
            div(nominal.checked_add(self.fee().checked_mul(self.lower_target)?)?, ONE + self.fee())?
        } else if nominal <= self.upper_target {
            nominal
        } else {
            div(nominal.checked_sub(self.fee().checked_mul(self.upper_target)?)?, ONE - self.fee())?
        };
        (real >= Decimal::ZERO).then_some(real)
    }

    // d(nominal)/d(real) at `real`.
    fn nominal_slope(&self, real: Decimal) -> Decimal {
        if real < self.lower_target {
            ONE + self.fee()
        } else if real < self.upper_target {
            ONE
        } else {
            ONE - self.fee()
        }
    }

    fn invariant(&self) -> Option<Decimal> {
        self.to_nominal(self.main_balance)?.checked_add(self.wrapped_balance.checked_mul(self.rate)?)
    }

    fn has_supply(&self) -> bool {
        self.total_shares > Decimal::ZERO
    }

    fn main_in_for_nominal_gain(&self, nominal_gain: Decimal) -> Option<Decimal> {
        let nominal = self.to_nominal(self.main_balance)?.checked_add(nominal_gain)?;
        self.from_nominal(nominal)?.checked_sub(self.main_balance)
    }

    fn main_out_for_nominal_loss(&self, nominal_loss: Decimal) -> Option<Decimal> {
        let nominal = self.to_nominal(self.main_balance)?.checked_sub(nominal_loss)?;
        self.main_balance.checked_sub(self.from_nominal(nominal)?)
    }

    fn nominal_change(&self, main_delta: Decimal) -> Option<Decimal> {
        self.to_nominal(self.main_balance.checked_add(main_delta)?)?.checked_sub(self.to_nominal(self.main_balance)?)
    }

    fn out_given_in(&self, amount: Decimal) -> Option<Decimal> {
        let invariant = self.invariant()?;
        match self.kind {
            LinearPairKind::MainToWrapped => div(self.nominal_change(amount)?, self.rate),
            LinearPairKind::WrappedToMain => self.main_out_for_nominal_loss(amount.checked_mul(self.rate)?),
            LinearPairKind::MainToBpt if !self.has_supply() => self.to_nominal(amount),
            LinearPairKind::MainToBpt => div(self.total_shares.checked_mul(self.nominal_change(amount)?)?, invariant),
            LinearPairKind::BptToMain => {
                self.main_out_for_nominal_loss(div(invariant.checked_mul(amount)?, self.total_shares)?)
            }
            LinearPairKind::WrappedToBpt if !self.has_supply() => amount.checked_mul(self.rate),
            LinearPairKind::WrappedToBpt => div(product(&[self.total_shares, amount, self.rate])?, invariant),
            LinearPairKind::BptToWrapped => {
                div(invariant.checked_mul(amount)?, self.total_shares.checked_mul(self.rate)?)
            }
        }
    }

    fn in_given_out(&self, amount: Decimal) -> Option<Decimal> {
        let invariant = self.invariant()?;
        match self.kind {
            LinearPairKind::MainToWrapped => {
                if amount > self.wrapped_balance {
                    return None;
                }
                self.main_in_for_nominal_gain(amount.checked_mul(self.rate)?)
            }
            LinearPairKind::WrappedToMain => {
                if amount > self.main_balance {
                    return None;
                }
                div(-self.nominal_change(-amount)?, self.rate)
            }
            LinearPairKind::MainToBpt if !self.has_supply() => self.from_nominal(amount),
            LinearPairKind::MainToBpt => {
                self.main_in_for_nominal_gain(div(invariant.checked_mul(amount)?, self.total_shares)?)
            }
            LinearPairKind::BptToMain => {
                if amount > self.main_balance {
                    return None;
                }
                div(-self.total_shares.checked_mul(self.nominal_change(-amount)?)?, invariant)
            }
            LinearPairKind::WrappedToBpt if !self.has_supply() => div(amount, self.rate),
            LinearPairKind::WrappedToBpt => {
                div(invariant.checked_mul(amount)?, self.total_shares.checked_mul(self.rate)?)
            }
            LinearPairKind::BptToWrapped => {
                if amount > self.wrapped_balance {
                    return None;
                }
                div(product(&[self.total_shares, amount, self.rate])?, invariant)
            }
        }
    }

    /// Main balance after the swap, for the kinds whose price depends on it.
    fn main_balance_after(&self, amount: Decimal, swap_type: SwapType) -> Option<Decimal> {
        let main_delta = match (self.kind, swap_type) {
            (LinearPairKind::MainToWrapped | LinearPairKind::MainToBpt, SwapType::ExactIn) => amount,
            (LinearPairKind::MainToWrapped | LinearPairKind::MainToBpt, SwapType::ExactOut) => self.in_given_out(amount)?,
            (LinearPairKind::WrappedToMain | LinearPairKind::BptToMain, SwapType::ExactIn) => -self.out_given_in(amount)?,
            (LinearPairKind::WrappedToMain | LinearPairKind::BptToMain, SwapType::ExactOut) => -amount,
            _ => Decimal::ZERO,
        };
        self.main_balance.checked_add(main_delta)
    }

    fn spot_price(&self, amount: Decimal, swap_type: SwapType) -> Option<Decimal> {
        let main_after = self.main_balance_after(amount, swap_type)?;
        let slope = self.nominal_slope(main_after);
        let invariant = self.invariant()?;
        match self.kind {
            LinearPairKind::MainToWrapped => div(slope, self.rate),
            LinearPairKind::WrappedToMain => div(self.rate, slope),
            LinearPairKind::MainToBpt if !self.has_supply() => Some(slope),
            LinearPairKind::MainToBpt => div(self.total_shares.checked_mul(slope)?, invariant),
            LinearPairKind::BptToMain => div(invariant, self.total_shares.checked_mul(slope)?),
            LinearPairKind::WrappedToBpt if !self.has_supply() => Some(self.rate),
            LinearPairKind::WrappedToBpt => div(self.total_shares.checked_mul(self.rate)?, invariant),
            LinearPairKind::BptToWrapped => div(invariant, self.total_shares.checked_mul(self.rate)?),
        }
    }
}

impl PoolPricing for LinearPairData {
    fn base(&self) -> &PairBase {
        &self.base
    }

    fn normalized_liquidity(&self) -> Decimal {
        self.base.balance_out
    }

    fn exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError> {
        self.out_given_in(amount_in)
            .ok_or_else(|| self.base.degenerate("exact-in drains the main balance"))
    }

    fn exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError> {
        self.in_given_out(amount_out)
            .ok_or_else(|| self.base.degenerate("exact-out exceeds the pool balance"))
    }

    fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.spot_price(amount, swap_type).ok_or_else(|| self.base.degenerate("spot price out of range"))
    }

    fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        // prices only jump at the band edges
        self.spot_price(amount, swap_type)
            .map(|_| Decimal::ZERO)
            .ok_or_else(|| self.base.degenerate("spot price out of range"))
    }
}
