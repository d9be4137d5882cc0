//! Stable (amplified invariant) pools.
//!
//! `amp` follows the `A * n^(n-1)` convention, so the invariant coefficient is `amp * n`.
//! All marginal quantities are computed in balances normalized by the invariant, which keeps
//! every intermediate product of order one.

use super::pair::{PairBase, PairType, PoolPricing, SwapType};
use crate::errors::RouterError;
use crate::utils::constants::STABLE_MAX_ITERATIONS;
use crate::utils::decimal::{div, product, sum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ONE: Decimal = Decimal::ONE;
const CONVERGENCE: Decimal = dec!(0.0000000000000001);

#[derive(Clone, Debug, PartialEq)]
pub struct StablePairData {
    pub base: PairBase,
    pub amp: Decimal,
    pub balances: Vec<Decimal>,
    pub index_in: Option<usize>,
    pub index_out: Option<usize>,
}

fn converged(current: Decimal, previous: Decimal) -> bool {
    (current - previous).abs() <= current.abs() * CONVERGENCE
}

impl StablePairData {
    fn coins(&self) -> Decimal {
        Decimal::from(self.balances.len())
    }

    fn ann(&self) -> Option<Decimal> {
        self.amp.checked_mul(self.coins())
    }

    fn invariant(&self, balances: &[Decimal]) -> Option<Decimal> {
        let n = self.coins();
        let total = sum(balances)?;
        if total.is_zero() {
            return Some(Decimal::ZERO);
        }
        let ann = self.ann()?;
        let mut d = total;
        for _ in 0..STABLE_MAX_ITERATIONS {
            let mut d_p = d;
            for balance in balances {
                d_p = d_p.checked_mul(div(d, balance.checked_mul(n)?)?)?;
            }
            let previous = d;
            let ratio = div(d, total)?;
            let numerator = ann.checked_mul(total)?.checked_add(d_p.checked_mul(n)?)?.checked_mul(ratio)?;
            let denominator = (ann - ONE).checked_mul(ratio)?.checked_add((n + ONE).checked_mul(div(d_p, total)?)?)?;
            d = div(numerator, denominator)?;
            if converged(d, previous) {
                return Some(d);
            }
        }
        None
    }

    // Balance of token `index` that keeps `d` given every other balance.
    fn balance_for_invariant(&self, balances: &[Decimal], index: usize, d: Decimal) -> Option<Decimal> {
        let n = self.coins();
        let ann = self.ann()?;
        let mut c = d;
        let mut others = Decimal::ZERO;
        for (i, balance) in balances.iter().enumerate() {
            if i == index {
                continue;
            }
            others = others.checked_add(*balance)?;
            c = c.checked_mul(div(d, balance.checked_mul(n)?)?)?;
        }
        c = c.checked_mul(div(d, ann.checked_mul(n)?)?)?;
        let b = others.checked_add(div(d, ann)?)?;
        let mut y = d;
        for _ in 0..STABLE_MAX_ITERATIONS {
            let previous = y;
            y = div(y.checked_mul(y)?.checked_add(c)?, sum(&[y, y, b])? - d)?;
            if converged(y, previous) {
                return Some(y);
            }
        }
        None
    }

    // Product of d / (n * x_j) over every balance.
    fn share_product(&self, balances: &[Decimal], d: Decimal) -> Option<Decimal> {
        let n = self.coins();
        let mut h = ONE;
        for balance in balances {
            h = h.checked_mul(div(d, balance.checked_mul(n)?)?)?;
        }
        Some(h)
    }

    /// Price of token `o` in token `i` (before fees) and its derivative along the curve.
    fn token_rate(&self, balances: &[Decimal], d: Decimal, i: usize, o: usize) -> Option<(Decimal, Decimal)> {
        let ann = self.ann()?;
        let h = self.share_product(balances, d)?;
        let x = div(balances[i], d)?;
        let y = div(balances[o], d)?;
        let n_term = ann.checked_add(div(h, x)?)?;
        let m_term = ann.checked_add(div(h, y)?)?;
        let rate = div(n_term, m_term)?;
        let h_xy = div(div(h, x)?, y)?;
        let twice_h = h.checked_add(h)?;
        let dn = rate.checked_mul(h_xy)? - div(div(twice_h, x)?, x)?;
        let dm = div(div(rate.checked_mul(twice_h)?, y)?, y)? - h_xy;
        let cross = dn.checked_mul(m_term)?.checked_sub(n_term.checked_mul(dm)?)?;
        let derivative = div(div(div(cross, m_term)?, m_term)?, d)?;
        Some((rate, derivative))
    }

    /// First and second derivative of the invariant with respect to balance `k`.
    fn invariant_slopes(&self, balances: &[Decimal], d: Decimal, k: usize) -> Option<(Decimal, Decimal)> {
        let n = self.coins();
        let ann = self.ann()?;
        let h = self.share_product(balances, d)?;
        let x = div(balances[k], d)?;
        let numerator = ann.checked_add(div(h, x)?)?;
        let denominator = (ann - ONE).checked_add((n + ONE).checked_mul(h)?)?;
        let first = div(numerator, denominator)?;
        let numerator_slope = div(h.checked_mul((n + ONE).checked_mul(first)?.checked_sub(div(Decimal::TWO, x)?)?)?, x)?;
        let denominator_slope = product(&[n + ONE, h, n.checked_mul(first)?.checked_sub(div(ONE, x)?)?])?;
        let cross = numerator_slope.checked_mul(denominator)?.checked_sub(numerator.checked_mul(denominator_slope)?)?;
        let second = div(div(div(cross, denominator)?, denominator)?, d)?;
        Some((first, second))
    }

    // Fee complement for joins and exits through token `k`.
    fn join_exit_fee(&self, k: usize) -> Option<Decimal> {
        let total = sum(&self.balances)?;
        Some(ONE - self.base.swap_fee * (ONE - div(self.balances[k], total)?))
    }

    fn indices(&self) -> Option<(usize, usize)> {
        Some((self.index_in?, self.index_out?))
    }

    fn token_out_given_in(&self, amount: Decimal) -> Option<Decimal> {
        let (i, o) = self.indices()?;
        let d = self.invariant(&self.balances)?;
        let mut balances = self.balances.clone();
        balances[i] = balances[i].checked_add(self.base.fee_complement().checked_mul(amount)?)?;
        let y = self.balance_for_invariant(&balances, o, d)?;
        Some(self.balances[o] - y)
    }

    fn token_in_given_out(&self, amount: Decimal) -> Option<Decimal> {
        let (i, o) = self.indices()?;
        if amount >= self.balances[o] {
            return None;
        }
        let d = self.invariant(&self.balances)?;
        let mut balances = self.balances.clone();
        balances[o] -= amount;
        let x = self.balance_for_invariant(&balances, i, d)?;
        div(x - self.balances[i], self.base.fee_complement())
    }

    fn bpt_out_given_token_in(&self, amount: Decimal) -> Option<Decimal> {
        let k = self.index_in?;
        let d0 = self.invariant(&self.balances)?;
        let mut balances = self.balances.clone();
        balances[k] = balances[k].checked_add(self.join_exit_fee(k)?.checked_mul(amount)?)?;
        let d1 = self.invariant(&balances)?;
        self.base.balance_out.checked_mul(div(d1, d0)? - ONE)
    }

    fn token_in_given_bpt_out(&self, amount: Decimal) -> Option<Decimal> {
        let k = self.index_in?;
        let d0 = self.invariant(&self.balances)?;
        let d1 = d0.checked_mul(ONE.checked_add(div(amount, self.base.balance_out)?)?)?;
        let x = self.balance_for_invariant(&self.balances, k, d1)?;
        div(x - self.balances[k], self.join_exit_fee(k)?)
    }

    fn token_out_given_bpt_in(&self, amount: Decimal) -> Option<Decimal> {
        let k = self.index_out?;
        if amount >= self.base.balance_in {
            return None;
        }
        let d0 = self.invariant(&self.balances)?;
        let d1 = d0.checked_mul(ONE - div(amount, self.base.balance_in)?)?;
        let x = self.balance_for_invariant(&self.balances, k, d1)?;
        self.join_exit_fee(k)?.checked_mul(self.balances[k] - x)
    }

    fn bpt_in_given_token_out(&self, amount: Decimal) -> Option<Decimal> {
        let k = self.index_out?;
        let remaining = self.balances[k] - div(amount, self.join_exit_fee(k)?)?;
        if remaining <= Decimal::ZERO {
            return None;
        }
        let d0 = self.invariant(&self.balances)?;
        let mut balances = self.balances.clone();
        balances[k] = remaining;
        let d1 = self.invariant(&balances)?;
        self.base.balance_in.checked_mul(ONE - div(d1, d0)?)
    }

    // Balances after the swap described by `amount`, plus the invariant they sit on.
    fn state_after(&self, amount: Decimal, swap_type: SwapType) -> Option<(Vec<Decimal>, Decimal)> {
        let gamma = self.base.fee_complement();
        let mut balances = self.balances.clone();
        let d0 = self.invariant(&self.balances)?;
        match (self.base.pair_type, swap_type) {
            (PairType::TokenToToken, SwapType::ExactIn) => {
                let (i, o) = self.indices()?;
                balances[i] = balances[i].checked_add(gamma.checked_mul(amount)?)?;
                balances[o] = self.balance_for_invariant(&balances, o, d0)?;
                Some((balances, d0))
            }
            (PairType::TokenToToken, SwapType::ExactOut) => {
                let (i, o) = self.indices()?;
                if amount >= balances[o] {
                    return None;
                }
                balances[o] -= amount;
                balances[i] = self.balance_for_invariant(&balances, i, d0)?;
                Some((balances, d0))
            }
            (PairType::TokenToBpt, SwapType::ExactIn) => {
                let k = self.index_in?;
                balances[k] = balances[k].checked_add(self.join_exit_fee(k)?.checked_mul(amount)?)?;
                let d1 = self.invariant(&balances)?;
                Some((balances, d1))
            }
            (PairType::TokenToBpt, SwapType::ExactOut) => {
                let k = self.index_in?;
                let d1 = d0.checked_mul(ONE.checked_add(div(amount, self.base.balance_out)?)?)?;
                balances[k] = self.balance_for_invariant(&balances, k, d1)?;
                Some((balances, d1))
            }
            (PairType::BptToToken, SwapType::ExactIn) => {
                let k = self.index_out?;
                if amount >= self.base.balance_in {
                    return None;
                }
                let d1 = d0.checked_mul(ONE - div(amount, self.base.balance_in)?)?;
                balances[k] = self.balance_for_invariant(&balances, k, d1)?;
                Some((balances, d1))
            }
            (PairType::BptToToken, SwapType::ExactOut) => {
                let k = self.index_out?;
                balances[k] -= div(amount, self.join_exit_fee(k)?)?;
                if balances[k] <= Decimal::ZERO {
                    return None;
                }
                let d1 = self.invariant(&balances)?;
                Some((balances, d1))
            }
        }
    }

    /// Spot price and its derivative after swapping `amount`.
    fn price_and_slope(&self, amount: Decimal, swap_type: SwapType) -> Option<(Decimal, Decimal)> {
        let (balances, d) = self.state_after(amount, swap_type)?;
        let gamma = self.base.fee_complement();
        match (self.base.pair_type, swap_type) {
            (PairType::TokenToToken, SwapType::ExactIn) => {
                let (i, o) = self.indices()?;
                let (rate, slope) = self.token_rate(&balances, d, i, o)?;
                Some((gamma.checked_mul(rate)?, product(&[gamma, gamma, slope])?))
            }
            (PairType::TokenToToken, SwapType::ExactOut) => {
                let (i, o) = self.indices()?;
                let (rate, slope) = self.token_rate(&balances, d, i, o)?;
                Some((gamma.checked_mul(rate)?, div(gamma.checked_mul(slope)?, rate)?))
            }
            (PairType::TokenToBpt, swap_type) => {
                let k = self.index_in?;
                let g = self.join_exit_fee(k)?;
                let (first, second) = self.invariant_slopes(&balances, d, k)?;
                let shares_per_invariant = div(self.base.balance_out, self.invariant(&self.balances)?)?;
                let rate = product(&[g, shares_per_invariant, first])?;
                let slope = match swap_type {
                    SwapType::ExactIn => product(&[g, g, shares_per_invariant, second])?,
                    SwapType::ExactOut => div(g.checked_mul(second)?, first)?,
                };
                Some((rate, slope))
            }
            (PairType::BptToToken, swap_type) => {
                let k = self.index_out?;
                let g = self.join_exit_fee(k)?;
                let (first, second) = self.invariant_slopes(&balances, d, k)?;
                let d0 = self.invariant(&self.balances)?;
                let invariant_per_share = div(d0, self.base.balance_in)?;
                let rate = div(g.checked_mul(invariant_per_share)?, first)?;
                let slope = match swap_type {
                    SwapType::ExactIn => {
                        let scaled = product(&[g, invariant_per_share, invariant_per_share, second])?;
                        div(div(div(scaled, first)?, first)?, first)?
                    }
                    SwapType::ExactOut => div(div(invariant_per_share.checked_mul(second)?, first)?, first)?,
                };
                Some((rate, slope))
            }
        }
    }
}

impl PoolPricing for StablePairData {
    fn base(&self) -> &PairBase {
        &self.base
    }

    fn normalized_liquidity(&self) -> Decimal {
        self.base.balance_out.saturating_mul(self.amp)
    }

    fn exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError> {
        let out = match self.base.pair_type {
            PairType::TokenToToken => self.token_out_given_in(amount_in),
            PairType::TokenToBpt => self.bpt_out_given_token_in(amount_in),
            PairType::BptToToken => self.token_out_given_bpt_in(amount_in),
        };
        out.ok_or_else(|| self.base.degenerate("invariant did not converge for exact-in"))
    }

    fn exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError> {
        let amount_in = match self.base.pair_type {
            PairType::TokenToToken => self.token_in_given_out(amount_out),
            PairType::TokenToBpt => self.token_in_given_bpt_out(amount_out),
            PairType::BptToToken => self.bpt_in_given_token_out(amount_out),
        };
        amount_in.ok_or_else(|| self.base.degenerate("invariant did not converge for exact-out"))
    }

    fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.price_and_slope(amount, swap_type)
            .map(|(price, _)| price)
            .ok_or_else(|| self.base.degenerate("spot price out of range"))
    }

    fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.price_and_slope(amount, swap_type)
            .map(|(_, slope)| slope)
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

    fn stable_pool(amp: Decimal, balances: [Decimal; 3]) -> Pool {
        Pool {
            id: PoolId::Address(Address::repeat_byte(0x51)),
            address: Address::repeat_byte(0x51),
            swap_fee: dec!(0.0004),
            total_shares: dec!(29000),
            tokens: vec![token(1, balances[0], 18, None), token(2, balances[1], 6, None), token(3, balances[2], 6, None)],
            kind: PoolKind::Stable { amp },
        }
    }

    fn pair(pool: &Pool, token_in: Address, token_out: Address) -> PoolPairData {
        pool.parse_pair_data(token_in, token_out, 0).unwrap()
    }

    #[test]
    fn test_balanced_pool_trades_near_par() -> eyre::Result<()> {
        let pool = stable_pool(dec!(200), [dec!(10000), dec!(10000), dec!(10000)]);
        let pair = pair(&pool, Address::repeat_byte(1), Address::repeat_byte(2));
        let out = pair.quote_exact_in(dec!(100))?;
        // deep amplification keeps the price within a few bps of par after fees
        assert!(out > dec!(99.9) && out < dec!(99.96), "{out}");
        let spot = pair.spot_price_after_swap(Decimal::ZERO, SwapType::ExactIn)?;
        assert_close(spot, dec!(0.9996), dec!(0.0000001));
        Ok(())
    }

    #[test]
    fn test_invariant_is_sum_when_balanced() {
        let pool = stable_pool(dec!(50), [dec!(500), dec!(500), dec!(500)]);
        let PoolPairData::Stable(data) = pair(&pool, Address::repeat_byte(1), Address::repeat_byte(3)) else {
            panic!("stable pair expected");
        };
        let d = data.invariant(&data.balances).unwrap();
        assert_close(d, dec!(1500), dec!(0.000000001));
    }

    #[test]
    fn test_exact_out_inverts_exact_in() -> eyre::Result<()> {
        let pool = stable_pool(dec!(60), [dec!(12000), dec!(7000), dec!(9500)]);
        let pair = pair(&pool, Address::repeat_byte(2), Address::repeat_byte(1));
        for amount in [dec!(1), dec!(250), dec!(2000)] {
            let out = pair.quote_exact_in(amount)?;
            let required = pair.quote_exact_out(out)?;
            assert_close(required, amount, dec!(0.000002));
        }
        Ok(())
    }

    #[test]
    fn test_spot_price_and_derivative_match_finite_differences() -> eyre::Result<()> {
        let pool = stable_pool(dec!(60), [dec!(12000), dec!(7000), dec!(9500)]);
        let pairs = [
            pair(&pool, Address::repeat_byte(1), Address::repeat_byte(2)),
            pair(&pool, Address::repeat_byte(3), Address::repeat_byte(1)),
            pair(&pool, Address::repeat_byte(2), pool.address),
            pair(&pool, pool.address, Address::repeat_byte(3)),
        ];
        for pair in &pairs {
            for swap_type in [SwapType::ExactIn, SwapType::ExactOut] {
                let amount = dec!(800);
                let analytic = pair.spot_price_after_swap(amount, swap_type)?;
                let numeric = numeric_rate(pair, amount, dec!(0.01), swap_type);
                assert_close(analytic, numeric, analytic * dec!(0.000001));

                let analytic = pair.derivative_spot_price_after_swap(amount, swap_type)?;
                let numeric = numeric_derivative(pair, amount, dec!(0.01), swap_type);
                assert!(analytic < Decimal::ZERO, "{:?} {swap_type}", pair.base().pair_type);
                assert_close(analytic, numeric, analytic.abs() * dec!(0.001));
            }
        }
        Ok(())
    }

    #[test]
    fn test_quotes_rise_and_prices_fall_with_size() {
        let pool = stable_pool(dec!(60), [dec!(12000), dec!(7000), dec!(9500)]);
        let amounts: Vec<Decimal> = (0..=24).map(|step| Decimal::from(step * 250)).collect();
        assert_monotonic_sweep(&pair(&pool, Address::repeat_byte(1), Address::repeat_byte(2)), &amounts);
        assert_monotonic_sweep(&pair(&pool, Address::repeat_byte(3), Address::repeat_byte(1)), &amounts);
        assert_monotonic_sweep(&pair(&pool, Address::repeat_byte(2), pool.address), &amounts);
    }

    #[test]
    fn test_drained_token_is_degenerate() {
        let pool = stable_pool(dec!(200), [dec!(10000000000), dec!(10000000000), dec!(0.000000001)]);
        let pair = pair(&pool, Address::repeat_byte(1), Address::repeat_byte(2));
        let err = pair.spot_price_after_swap(Decimal::ZERO, SwapType::ExactIn).unwrap_err();
        assert!(matches!(err, RouterError::DegenerateInvariant { .. }));
        assert!(matches!(pair.quote_exact_in(dec!(100)), Err(RouterError::DegenerateInvariant { .. })));
        assert!(matches!(
            pair.derivative_spot_price_after_swap(dec!(100), SwapType::ExactOut),
            Err(RouterError::DegenerateInvariant { .. })
        ));
    }

    #[test]
    fn test_liquidity_scales_with_amp() {
        let pool = stable_pool(dec!(100), [dec!(10), dec!(20), dec!(30)]);
        let pair = pair(&pool, Address::repeat_byte(1), Address::repeat_byte(3));
        assert_eq!(pair.normalized_liquidity(), dec!(3000));
    }
}
