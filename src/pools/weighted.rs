//! Constant-weight pools.
//!
//! Token pairs follow the weighted product invariant. Pairs against the share token are
//! single-asset joins and exits, where only the taxable part `1 - w` of the amount pays the
//! swap fee.

use super::pair::{PairBase, PairType, PoolPricing, SwapType};
use crate::errors::RouterError;
use crate::utils::decimal::{div, pow, product};
use rust_decimal::Decimal;

#[derive(Clone, Debug, PartialEq)]
pub struct WeightedPairData {
    pub base: PairBase,
    /// Normalized weight of the input token, one for the share token.
    pub weight_in: Decimal,
    pub weight_out: Decimal,
}

const ONE: Decimal = Decimal::ONE;

impl WeightedPairData {
    // Fee complement for joins and exits through token `weight`.
    fn join_exit_fee(&self, weight: Decimal) -> Decimal {
        ONE - self.base.swap_fee * (ONE - weight)
    }

    // Input balance once `amount` has been paid in, net of the swap fee.
    fn adjusted_in(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        b.balance_in.checked_add(b.fee_complement().checked_mul(amount)?)
    }

    fn token_out_given_in(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        let factor = pow(div(b.balance_in, self.adjusted_in(amount)?)?, div(self.weight_in, self.weight_out)?)?;
        b.balance_out.checked_mul(ONE - factor)
    }

    fn token_in_given_out(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        if amount >= b.balance_out {
            return None;
        }
        let factor = pow(div(b.balance_out, b.balance_out - amount)?, div(self.weight_out, self.weight_in)?)?;
        div(b.balance_in.checked_mul(factor - ONE)?, b.fee_complement())
    }

    fn bpt_out_given_token_in(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        let g = self.join_exit_fee(self.weight_in);
        let ratio = pow(ONE.checked_add(div(g.checked_mul(amount)?, b.balance_in)?)?, self.weight_in)?;
        b.balance_out.checked_mul(ratio - ONE)
    }

    fn token_in_given_bpt_out(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        let g = self.join_exit_fee(self.weight_in);
        let ratio = pow(ONE.checked_add(div(amount, b.balance_out)?)?, div(ONE, self.weight_in)?)?;
        div(b.balance_in.checked_mul(ratio - ONE)?, g)
    }

    fn token_out_given_bpt_in(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        if amount >= b.balance_in {
            return None;
        }
        let g = self.join_exit_fee(self.weight_out);
        let remaining = pow(ONE - div(amount, b.balance_in)?, div(ONE, self.weight_out)?)?;
        product(&[g, b.balance_out, ONE - remaining])
    }

    fn bpt_in_given_token_out(&self, amount: Decimal) -> Option<Decimal> {
        let b = &self.base;
        let g = self.join_exit_fee(self.weight_out);
        let gross_out = div(amount, g)?;
        if gross_out >= b.balance_out {
            return None;
        }
        let remaining = pow(ONE - div(gross_out, b.balance_out)?, self.weight_out)?;
        b.balance_in.checked_mul(ONE - remaining)
    }

    fn spot_price(&self, amount: Decimal, swap_type: SwapType) -> Option<Decimal> {
        let b = &self.base;
        let gamma = b.fee_complement();
        match (b.pair_type, swap_type) {
            (PairType::TokenToToken, SwapType::ExactIn) => {
                let adjusted_in = self.adjusted_in(amount)?;
                let ratio = div(self.weight_in, self.weight_out)?;
                let factor = pow(div(b.balance_in, adjusted_in)?, ratio)?;
                product(&[div(b.balance_out, adjusted_in)?, ratio, gamma, factor])
            }
            (PairType::TokenToToken, SwapType::ExactOut) => {
                let remaining = b.balance_out - amount;
                let factor = pow(div(remaining, b.balance_out)?, div(self.weight_out, self.weight_in)?)?;
                product(&[div(remaining, b.balance_in)?, div(self.weight_in, self.weight_out)?, gamma, factor])
            }
            (PairType::TokenToBpt, SwapType::ExactIn) => {
                let g = self.join_exit_fee(self.weight_in);
                let growth = ONE.checked_add(div(g.checked_mul(amount)?, b.balance_in)?)?;
                let factor = pow(growth, self.weight_in - ONE)?;
                product(&[div(b.balance_out, b.balance_in)?, self.weight_in, g, factor])
            }
            (PairType::TokenToBpt, SwapType::ExactOut) => {
                let g = self.join_exit_fee(self.weight_in);
                let growth = ONE.checked_add(div(amount, b.balance_out)?)?;
                let factor = pow(growth, ONE - div(ONE, self.weight_in)?)?;
                product(&[div(b.balance_out, b.balance_in)?, self.weight_in, g, factor])
            }
            (PairType::BptToToken, SwapType::ExactIn) => {
                let g = self.join_exit_fee(self.weight_out);
                let remaining = ONE - div(amount, b.balance_in)?;
                let factor = pow(remaining, div(ONE, self.weight_out)? - ONE)?;
                product(&[div(b.balance_out, b.balance_in)?, div(g, self.weight_out)?, factor])
            }
            (PairType::BptToToken, SwapType::ExactOut) => {
                let g = self.join_exit_fee(self.weight_out);
                let remaining = ONE - div(amount, g.checked_mul(b.balance_out)?)?;
                let factor = pow(remaining, ONE - self.weight_out)?;
                product(&[div(b.balance_out, b.balance_in)?, div(g, self.weight_out)?, factor])
            }
        }
    }

    // Balances are divided out before the weight and fee factors are applied, so the
    // squared balance terms never materialize.
    fn spot_price_derivative(&self, amount: Decimal, swap_type: SwapType) -> Option<Decimal> {
        let b = &self.base;
        let gamma = b.fee_complement();
        match (b.pair_type, swap_type) {
            (PairType::TokenToToken, SwapType::ExactIn) => {
                let adjusted_in = self.adjusted_in(amount)?;
                let ratio = div(self.weight_in, self.weight_out)?;
                let factor = pow(div(b.balance_in, adjusted_in)?, ratio)?;
                let per_in = div(div(b.balance_out, adjusted_in)?, adjusted_in)?;
                Some(-product(&[per_in, ratio, gamma, gamma, ratio + ONE, factor])?)
            }
            (PairType::TokenToToken, SwapType::ExactOut) => {
                let remaining = b.balance_out - amount;
                let factor = pow(div(remaining, b.balance_out)?, div(self.weight_out, self.weight_in)?)?;
                let scale = product(&[gamma, div(self.weight_in + self.weight_out, self.weight_out)?, factor])?;
                Some(-div(scale, b.balance_in)?)
            }
            (PairType::TokenToBpt, SwapType::ExactIn) => {
                let g = self.join_exit_fee(self.weight_in);
                let growth = ONE.checked_add(div(g.checked_mul(amount)?, b.balance_in)?)?;
                let factor = pow(growth, self.weight_in - Decimal::TWO)?;
                let per_in = div(div(b.balance_out, b.balance_in)?, b.balance_in)?;
                product(&[per_in, self.weight_in, self.weight_in - ONE, g, g, factor])
            }
            (PairType::TokenToBpt, SwapType::ExactOut) => {
                let g = self.join_exit_fee(self.weight_in);
                let growth = ONE.checked_add(div(amount, b.balance_out)?)?;
                let factor = pow(growth, -div(ONE, self.weight_in)?)?;
                div(product(&[g, self.weight_in - ONE, factor])?, b.balance_in)
            }
            (PairType::BptToToken, SwapType::ExactIn) => {
                let g = self.join_exit_fee(self.weight_out);
                let inverse_weight = div(ONE, self.weight_out)?;
                let remaining = ONE - div(amount, b.balance_in)?;
                let factor = pow(remaining, inverse_weight - Decimal::TWO)?;
                let per_in = div(div(b.balance_out, b.balance_in)?, b.balance_in)?;
                Some(-product(&[per_in, g, inverse_weight, inverse_weight - ONE, factor])?)
            }
            (PairType::BptToToken, SwapType::ExactOut) => {
                let g = self.join_exit_fee(self.weight_out);
                let remaining = ONE - div(amount, g.checked_mul(b.balance_out)?)?;
                let factor = pow(remaining, -self.weight_out)?;
                let scale = product(&[ONE - self.weight_out, div(ONE, self.weight_out)?, factor])?;
                Some(-div(scale, b.balance_in)?)
            }
        }
    }
}

impl PoolPricing for WeightedPairData {
    fn base(&self) -> &PairBase {
        &self.base
    }

    fn normalized_liquidity(&self) -> Decimal {
        match self.base.pair_type {
            PairType::TokenToToken => {
                let total = self.weight_in + self.weight_out;
                self.base.balance_out.checked_mul(self.weight_in).and_then(|v| div(v, total)).unwrap_or(Decimal::ZERO)
            }
            PairType::TokenToBpt | PairType::BptToToken => self.base.balance_out,
        }
    }

    fn exact_in(&self, amount_in: Decimal) -> Result<Decimal, RouterError> {
        let out = match self.base.pair_type {
            PairType::TokenToToken => self.token_out_given_in(amount_in),
            PairType::TokenToBpt => self.bpt_out_given_token_in(amount_in),
            PairType::BptToToken => self.token_out_given_bpt_in(amount_in),
        };
        out.ok_or_else(|| self.base.degenerate("exact-in quote out of range"))
    }

    fn exact_out(&self, amount_out: Decimal) -> Result<Decimal, RouterError> {
        let amount_in = match self.base.pair_type {
            PairType::TokenToToken => self.token_in_given_out(amount_out),
            PairType::TokenToBpt => self.token_in_given_bpt_out(amount_out),
            PairType::BptToToken => self.bpt_in_given_token_out(amount_out),
        };
        amount_in.ok_or_else(|| self.base.degenerate("exact-out quote out of range"))
    }

    fn spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.spot_price(amount, swap_type).ok_or_else(|| self.base.degenerate("spot price out of range"))
    }

    fn derivative_spot_price_after_swap(&self, amount: Decimal, swap_type: SwapType) -> Result<Decimal, RouterError> {
        self.spot_price_derivative(amount, swap_type)
            .ok_or_else(|| self.base.degenerate("spot price derivative out of range"))
    }
}
