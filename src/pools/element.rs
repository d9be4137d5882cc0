//! Element (yield space) pools trading a principal token against its base token.
//!
//! The curve is `x^(1-t) + y^(1-t) = k` with `t` the remaining time to expiry in units of
//! the pool's time scale. At expiry the curve is a straight line and trades settle one to
//! one before fees.

use super::pair::{LimitRatios, PairBase, PairType, PoolPricing, SwapType};
use crate::errors::RouterError;
use crate::utils::decimal::{div, pow, product, sum};
use rust_decimal::Decimal;

const ONE: Decimal = Decimal::ONE;

#[derive(Clone, Debug, PartialEq)]
pub struct ElementPairData {
    /// Balances already include the virtual principal liquidity.
    pub base: PairBase,
    pub time_to_expiry: Decimal,
}

impl ElementPairData {
    fn ensure_token_pair(&self, operation: &'static str) -> Result<(), RouterError> {
        match self.base.pair_type {
            PairType::TokenToToken => Ok(()),
            PairType::TokenToBpt | PairType::BptToToken => Err(self.base.unsupported(operation)),
        }
    }

    // 1 - t, the curve exponent.
    fn exponent(&self) -> Result<Decimal, RouterError> {
        let exponent = ONE - self.time_to_expiry;
        if exponent <= Decimal::ZERO {
            return Err(self.base.degenerate("time to expiry is not below one time unit"));
        }
        Ok(exponent)
    }

    // x^s + y^s - z^s: what is left of the invariant for the other balance once one becomes `z`.
    fn residual(&self, s: Decimal, z: Decimal) -> Option<Decimal> {
        let b = &self.base;
        sum(&[pow(b.balance_in, s)?, pow(b.balance_out, s)?])?.checked_sub(pow(z, s)?)
    }

    // Input balance once `amount` has been paid in, net of the swap fee.
    fn balance_in_after(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        b.balance_in.checked_add(b.fee_complement().checked_mul(amount)?)
    }

    fn out_given_in(&self, amount: Decimal, s: Decimal) -> Option<Decimal> {
        let b = &self.base;
        let x = self.balance_in_after(amount)?;
        let remaining = self.residual(s, x)?;
        if remaining.is_sign_negative() {
            return None;
        }
        if remaining.is_zero() {
            return Some(b.balance_out);
        }
        b.balance_out.checked_sub(pow(remaining, div(ONE, s)?)?)
    }

    fn in_given_out(&self, amount: Decimal, s: Decimal) -> Option<Decimal> {
        let b = &self.base;
        if amount >= b.balance_out {
            return None;
        }
        let y = b.balance_out - amount;
        let remaining = self.residual(s, y)?;
        let x = pow(remaining, div(ONE, s)?)?;
        div(x - b.balance_in, b.fee_complement())
    }

    // Pool balances (x, y) after the swap.
    fn state_after(&self, amount: Decimal, swap_type: SwapType, s: Decimal) -> Option<(Decimal, Decimal)> {
        let b = &self.base;
        match swap_type {
            SwapType::ExactIn => {
                let out = self.out_given_in(amount, s)?;
                Some((self.balance_in_after(amount)?, b.balance_out - out))
            }
            SwapType::ExactOut => {
                let amount_in = self.in_given_out(amount, s)?;
                Some((self.balance_in_after(amount_in)?, b.balance_out - amount))
            }
        }
    }

    fn spot_price(&self, amount: Decimal, swap_type: SwapType, s: Decimal) -> Option<Decimal> {
        let (x, y) = self.state_after(amount, swap_type, s)?;
        self.base.fee_complement().checked_mul(pow(div(y, x)?, self.time_to_expiry)?)
    }

    fn spot_price_derivative(&self, amount: Decimal, swap_type: SwapType, s: Decimal) -> Option<Decimal> {
        let t = self.time_to_expiry;
        if t.is_zero() {
            return Some(Decimal::ZERO);
        }
        let (x, y) = self.state_after(amount, swap_type, s)?;
        let gamma = self.base.fee_complement();
        let ratio = div(y, x)?;
        let lead = t.checked_mul(pow(ratio, t - ONE)?)?;
        match swap_type {
            SwapType::ExactIn => {
                let spread = pow(ratio, t)?.checked_mul(x)?.checked_add(y)?;
                Some(-product(&[gamma, gamma, lead, div(div(spread, x)?, x)?])?)
            }
            SwapType::ExactOut => {
                let spread = x.checked_add(y.checked_mul(pow(div(x, y)?, t)?)?)?;
                Some(-product(&[gamma, lead, div(div(spread, x)?, x)?])?)
            }
        }
    }
}

impl PoolPricing for ElementPairData {
    fn base(&self) -> &PairBase {
        &self.base
    }

    fn normalized_liquidity(&self) -> Decimal {
        self.base.balance_out
    }

    fn limit_amount(&self, swap_type: SwapType, ratios: &LimitRatios) -> Result<Decimal, RouterError> {
        let b = &self.base;
        match swap_type {
            SwapType::ExactIn => {
                let s = self.exponent()?;
                let full = pow(b.balance_in, s)
                    .zip(pow(b.balance_out, s))
                    .and_then(|(x, y)| pow(x.checked_add(y)?, div(ONE, s)?))
                    .ok_or_else(|| b.degenerate("limit out of range"))?;
                Ok(full - b.balance_in)
            }
            SwapType::ExactOut => {
                b.balance_out.checked_mul(ratios.max_out_ratio).ok_or_else(|| b.degenerate("limit out of range"))
            }
        }
    }

    fn exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError> {
        self.ensure_token_pair("exact-in share token quote")?;
        let s = self.exponent()?;
        self.out_given_in(amount_in, s)
            .ok_or_else(|| self.base.degenerate("negative radicand in exact-in"))
    }

    fn exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError> {
        self.ensure_token_pair("exact-out share token quote")?;
        let s = self.exponent()?;
        self.in_given_out(amount_out, s)
            .ok_or_else(|| self.base.degenerate("exact-out exceeds the curve"))
    }

    fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.ensure_token_pair("share token spot price")?;
        let s = self.exponent()?;
        self.spot_price(amount, swap_type, s)
            .ok_or_else(|| self.base.degenerate("spot price out of range"))
    }

    fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.ensure_token_pair("share token spot price derivative")?;
        let s = self.exponent()?;
        self.spot_price_derivative(amount, swap_type, s)
            .ok_or_else(|| self.base.degenerate("spot price derivative out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pools::pair::PoolPairData;
    use crate::pools::pair::tests::{assert_close, assert_monotonic_sweep, numeric_derivative, numeric_rate};
    use crate::pools::pool::tests::token;
    use crate::pools::{Pool, PoolId, PoolKind};
    use alloy_primitives::Address;
    use rust_decimal_macros::dec;

    const PRINCIPAL: u8 = 1;
    const BASE: u8 = 2;
    const EXPIRY: u64 = 1_700_000_000;
    const UNIT_SECONDS: u64 = 1_000_000_000;

    fn element_pool() -> Pool {
        Pool {
            id: PoolId::Address(Address::repeat_byte(0xe1)),
            address: Address::repeat_byte(0xe1),
            swap_fee: dec!(0.1),
            total_shares: dec!(1000),
            tokens: vec![token(PRINCIPAL, dec!(2000), 18, None), token(BASE, dec!(2500), 18, None)],
            kind: PoolKind::Element {
                expiry_time: EXPIRY,
                unit_seconds: UNIT_SECONDS,
                principal_token: Address::repeat_byte(PRINCIPAL),
                base_token: Address::repeat_byte(BASE),
            },
        }
    }

    fn base_to_principal(timestamp: u64) -> PoolPairData {
        element_pool().parse_pair_data(Address::repeat_byte(BASE), Address::repeat_byte(PRINCIPAL), timestamp).unwrap()
    }

    #[test]
    fn test_virtual_principal_liquidity() {
        let pair = base_to_principal(EXPIRY);
        assert_eq!(pair.base().balance_in, dec!(2500));
        assert_eq!(pair.base().balance_out, dec!(3000));
    }

    #[test]
    fn test_expiry_matches_linear_pricing() -> eyre::Result<()> {
        let pair = base_to_principal(EXPIRY);
        let ratios = LimitRatios::default();
        assert_eq!(pair.spot_price_after_swap(dec!(100), SwapType::ExactIn)?, dec!(0.9));
        assert_eq!(pair.derivative_spot_price_after_swap(dec!(100), SwapType::ExactIn)?, Decimal::ZERO);
        assert_close(pair.limit_amount(SwapType::ExactIn, &ratios)?, dec!(3000), dec!(0.000000001));
        assert_close(pair.quote_exact_in(dec!(100))?, dec!(90), dec!(0.000000001));
        Ok(())
    }

    #[test]
    fn test_time_value_before_expiry() -> eyre::Result<()> {
        let at_expiry = base_to_principal(EXPIRY);
        // a tenth of a time unit before expiry
        let early = base_to_principal(EXPIRY - UNIT_SECONDS / 10);
        let ratios = LimitRatios::default();
        let linear_price = at_expiry.spot_price_after_swap(dec!(100), SwapType::ExactIn)?;
        let price = early.spot_price_after_swap(dec!(100), SwapType::ExactIn)?;
        // principal trades at a premium in base terms: (3000 / 2500)^0.1 > 1
        assert!(price - linear_price > dec!(0.005), "{price} vs {linear_price}");
        let linear_limit = at_expiry.limit_amount(SwapType::ExactIn, &ratios)?;
        let limit = early.limit_amount(SwapType::ExactIn, &ratios)?;
        assert!((limit - linear_limit).abs() > dec!(1));
        Ok(())
    }

    #[test]
    fn test_spot_price_derivative_matches_finite_difference() -> eyre::Result<()> {
        let pool = element_pool();
        let early = EXPIRY - UNIT_SECONDS / 4;
        let pairs = [
            pool.parse_pair_data(Address::repeat_byte(BASE), Address::repeat_byte(PRINCIPAL), early)?,
            pool.parse_pair_data(Address::repeat_byte(PRINCIPAL), Address::repeat_byte(BASE), early)?,
        ];
        for pair in &pairs {
            for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
                let amount = dec!(150);
                let analytic = pair.spot_price_after_swap(amount, swap_type)?;
                let numeric = numeric_rate(pair, amount, dec!(0.001), swap_type);
                assert_close(analytic, numeric, analytic * dec!(0.000001));

                let analytic = pair.derivative_spot_price_after_swap(amount, swap_type)?;
                let numeric = numeric_derivative(pair, amount, dec!(0.001), swap_type);
                assert!(analytic < Decimal::ZERO);
                assert_close(analytic, numeric, analytic.abs() * dec!(0.001));
            }
        }
        Ok(())
    }

    #[test]
    fn test_quotes_rise_and_prices_fall_with_size() -> eyre::Result<()> {
        let pool = element_pool();
        let amounts: Vec<Decimal> = (0..=15).map(|step| Decimal::from(step * 100)).collect();
        for timestamp in [EXPIRY - UNIT_SECONDS / 2, EXPIRY - UNIT_SECONDS / 10] {
            let buy = pool.parse_pair_data(Address::repeat_byte(BASE), Address::repeat_byte(PRINCIPAL), timestamp)?;
            let sell = pool.parse_pair_data(Address::repeat_byte(PRINCIPAL), Address::repeat_byte(BASE), timestamp)?;
            assert_monotonic_sweep(&buy, &amounts);
            assert_monotonic_sweep(&sell, &amounts);
        }
        Ok(())
    }

    #[test]
    fn test_share_token_quotes_are_unsupported() -> eyre::Result<()> {
        let pool = element_pool();
        let pair = pool.parse_pair_data(Address::repeat_byte(BASE), pool.address, EXPIRY)?;
        let err = pair.quote_exact_in(dec!(1)).unwrap_err();
        assert!(matches!(err, RouterError::UnsupportedOperation { .. }));
        assert!(!pool.contains_token(pool.address));
        Ok(())
    }

    #[test]
    fn test_full_time_unit_is_degenerate() {
        let pair = base_to_principal(EXPIRY - UNIT_SECONDS);
        let err = pair.quote_exact_in(dec!(1)).unwrap_err();
        assert!(matches!(err, RouterError::DegenerateInvariant { .. }));
    }
}
