//! Decimal arithmetic helpers shared by every pricing routine.
//!
//! Amounts are carried in normalized (human) units. Whenever an amount crosses a token
//! boundary it is truncated to that token's precision: outputs round down, required inputs
//! round up, so a plan never promises more than the pool can deliver.

use alloy_primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};

/// Maximum number of fractional digits a [`Decimal`] can carry.
pub const MAX_SCALE: u32 = 28;

/// Truncate `value` to `decimals` fractional digits, towards zero.
pub fn round_down(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals.min(MAX_SCALE), RoundingStrategy::ToZero)
}

/// Round `value` to `decimals` fractional digits, away from zero.
pub fn round_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals.min(MAX_SCALE), RoundingStrategy::AwayFromZero)
}

/// The smallest representable amount of a token with `decimals` decimals.
pub fn smallest_unit(decimals: u32) -> Decimal {
    Decimal::new(1, decimals.min(MAX_SCALE))
}

/// Checked `base ^ exponent` for a strictly positive base (any base to the zero is one).
///
/// Returns `None` when the base is not positive or the result does not fit.
pub fn pow(base: Decimal, exponent: Decimal) -> Option<Decimal> {
    if exponent.is_zero() {
        return Some(Decimal::ONE);
    }
    if base.is_sign_negative() || base.is_zero() {
        return None;
    }
    if exponent == Decimal::ONE {
        return Some(base);
    }
    base.checked_powd(exponent)
}

/// Checked division that treats a zero divisor as a domain failure.
pub fn div(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() { None } else { numerator.checked_div(denominator) }
}

/// Checked product of `factors`, `None` once an intermediate product overflows.
///
/// Order the factors so large balances meet their divisors early.
pub fn product(factors: &[Decimal]) -> Option<Decimal> {
    factors.iter().try_fold(Decimal::ONE, |acc, factor| acc.checked_mul(*factor))
}

/// Checked sum of `values`.
pub fn sum(values: &[Decimal]) -> Option<Decimal> {
    values.iter().try_fold(Decimal::ZERO, |acc, value| acc.checked_add(*value))
}

/// Convert a normalized amount to integer base units, truncating dust below one unit.
pub fn to_raw(value: Decimal, decimals: u32) -> Option<U256> {
    let truncated = round_down(value, decimals);
    if truncated.is_sign_negative() {
        return None;
    }
    let mantissa = truncated.mantissa().to_u128()?;
    let scale = truncated.scale();
    let raw = U256::from(mantissa);
    if scale <= decimals {
        Some(raw * U256::from(10).pow(U256::from(decimals - scale)))
    } else {
        Some(raw / U256::from(10).pow(U256::from(scale - decimals)))
    }
}

/// Convert an integer amount in base units to a normalized amount.
pub fn from_raw(raw: U256, decimals: u32) -> Option<Decimal> {
    let value = Decimal::from_str_exact(&raw.to_string()).ok()?;
    let divisor = Decimal::TEN.checked_powu(decimals.into())?;
    value.checked_div(divisor)
}
