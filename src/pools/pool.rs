use super::element::ElementPairData;
use super::linear::{LinearPairData, LinearPairKind};
use super::pair::{PairBase, PairType, PoolPairData};
use super::pool_id::PoolId;
use super::stable::StablePairData;
use super::weighted::WeightedPairData;
use crate::errors::RouterError;
use crate::utils::constants::BPT_DECIMALS;
use crate::utils::decimal::{div, sum};
use alloy_primitives::Address;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use strum_macros::{Display, EnumIter, EnumString, VariantNames};

#[derive(
    Copy, Clone, Debug, Display, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, VariantNames, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    Weighted,
    Stable,
    Linear,
    Element,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolToken {
    pub address: Address,
    pub balance: Decimal,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_rate: Option<Decimal>,
}

/// Parameters that only exist for one pool family.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "poolType")]
pub enum PoolKind {
    Weighted,
    #[serde(rename_all = "camelCase")]
    Stable { amp: Decimal },
    #[serde(rename_all = "camelCase")]
    Linear { wrapped_index: usize, lower_target: Decimal, upper_target: Decimal },
    #[serde(rename_all = "camelCase")]
    Element { expiry_time: u64, unit_seconds: u64, principal_token: Address, base_token: Address },
}

/// One pool as it appears in a snapshot.
///
/// The pool's own `address` doubles as its share token (BPT) for every family that supports
/// joins and exits through swaps.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    pub id: PoolId,
    pub address: Address,
    pub swap_fee: Decimal,
    pub total_shares: Decimal,
    pub tokens: Vec<PoolToken>,
    #[serde(flatten)]
    pub kind: PoolKind,
}

impl Display for Pool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(fee={})@{}", self.pool_type(), self.swap_fee, self.id)
    }
}

impl Debug for Pool {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(fee={})@{} tokens={}", self.pool_type(), self.swap_fee, self.id, self.tokens.len())
    }
}

// Which side of a pair a token sits on, after resolving the share token.
enum Side {
    Token(usize),
    Bpt,
}

impl Pool {
    pub fn pool_type(&self) -> PoolType {
        match self.kind {
            PoolKind::Weighted => PoolType::Weighted,
            PoolKind::Stable { .. } => PoolType::Stable,
            PoolKind::Linear { .. } => PoolType::Linear,
            PoolKind::Element { .. } => PoolType::Element,
        }
    }

    pub fn token_index(&self, token: Address) -> Option<usize> {
        self.tokens.iter().position(|t| t.address == token)
    }

    /// Element pools never expose their share token for trading.
    pub fn supports_bpt_swaps(&self) -> bool {
        !matches!(self.kind, PoolKind::Element { .. })
    }

    /// Every token a path may enter or leave this pool with.
    pub fn tradable_tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self.tokens.iter().map(|t| t.address).collect();
        if self.supports_bpt_swaps() && !tokens.contains(&self.address) {
            tokens.push(self.address);
        }
        tokens
    }

    pub fn contains_token(&self, token: Address) -> bool {
        self.token_index(token).is_some() || (self.supports_bpt_swaps() && token == self.address)
    }

    /// Weight of token `index` divided by the sum of all weights.
    pub fn normalized_weight(&self, index: usize) -> Result<Decimal, RouterError> {
        let weights: Vec<Decimal> = self.tokens.iter().filter_map(|t| t.weight).collect();
        let weight = self.tokens.get(index).and_then(|t| t.weight);
        match (weight, sum(&weights)) {
            (Some(w), Some(total)) if total > Decimal::ZERO && w > Decimal::ZERO => {
                div(w, total).ok_or_else(|| RouterError::degenerate(&self.id, self.pool_type(), "token weight out of range"))
            }
            _ => Err(RouterError::degenerate(&self.id, self.pool_type(), "missing or zero token weight")),
        }
    }

    fn side(&self, token: Address) -> Result<Side, RouterError> {
        if token == self.address {
            return Ok(Side::Bpt);
        }
        if let Some(index) = self.token_index(token) {
            return Ok(Side::Token(index));
        }
        Err(RouterError::UnknownToken { pool_id: self.id, token })
    }

    fn side_balance(&self, side: &Side) -> (Decimal, u32) {
        match side {
            Side::Token(index) => (self.tokens[*index].balance, self.tokens[*index].decimals),
            Side::Bpt => (self.total_shares, BPT_DECIMALS),
        }
    }

    /// Build the per-pair view every pricing routine consumes.
    ///
    /// `current_timestamp` only matters for Element pools.
    pub fn parse_pair_data(
        &self,
        token_in: Address,
        token_out: Address,
        current_timestamp: u64,
    ) -> Result<PoolPairData, RouterError> {
        let side_in = self.side(token_in)?;
        let side_out = self.side(token_out)?;
        let pair_type = match (&side_in, &side_out) {
            (Side::Token(_), Side::Token(_)) => PairType::TokenToToken,
            (Side::Token(_), Side::Bpt) => PairType::TokenToBpt,
            (Side::Bpt, Side::Token(_)) => PairType::BptToToken,
            (Side::Bpt, Side::Bpt) => return Err(RouterError::UnknownToken { pool_id: self.id, token: token_out }),
        };
        let (balance_in, decimals_in) = self.side_balance(&side_in);
        let (balance_out, decimals_out) = self.side_balance(&side_out);
        let mut base = PairBase {
            pool_id: self.id,
            pool_type: self.pool_type(),
            pair_type,
            token_in,
            token_out,
            balance_in,
            balance_out,
            decimals_in,
            decimals_out,
            swap_fee: self.swap_fee,
        };
        let index_in = match side_in {
            Side::Token(index) => Some(index),
            Side::Bpt => None,
        };
        let index_out = match side_out {
            Side::Token(index) => Some(index),
            Side::Bpt => None,
        };

        let pair = match &self.kind {
            PoolKind::Weighted => {
                let weight_in = index_in.map(|i| self.normalized_weight(i)).transpose()?.unwrap_or(Decimal::ONE);
                let weight_out = index_out.map(|i| self.normalized_weight(i)).transpose()?.unwrap_or(Decimal::ONE);
                PoolPairData::Weighted(WeightedPairData { base, weight_in, weight_out })
            }
            PoolKind::Stable { amp } => PoolPairData::Stable(StablePairData {
                base,
                amp: *amp,
                balances: self.tokens.iter().map(|t| t.balance).collect(),
                index_in,
                index_out,
            }),
            PoolKind::Linear { wrapped_index, lower_target, upper_target } => {
                let wrapped = self
                    .tokens
                    .get(*wrapped_index)
                    .ok_or_else(|| RouterError::degenerate(&self.id, self.pool_type(), "wrapped index out of range"))?;
                let main_index = (0..self.tokens.len())
                    .find(|i| i != wrapped_index && self.tokens[*i].address != self.address)
                    .ok_or_else(|| RouterError::degenerate(&self.id, self.pool_type(), "no main token"))?;
                let kind = LinearPairKind::resolve(index_in, index_out, main_index, *wrapped_index)
                    .ok_or_else(|| RouterError::UnknownToken { pool_id: self.id, token: token_in })?;
                PoolPairData::Linear(LinearPairData {
                    base,
                    kind,
                    main_balance: self.tokens[main_index].balance,
                    wrapped_balance: wrapped.balance,
                    rate: wrapped.price_rate.unwrap_or(Decimal::ONE),
                    lower_target: *lower_target,
                    upper_target: *upper_target,
                    total_shares: self.total_shares,
                })
            }
            PoolKind::Element { expiry_time, unit_seconds, principal_token, .. } => {
                if pair_type == PairType::TokenToToken {
                    // share supply counts as virtual principal liquidity
                    let virtual_balance = if token_in == *principal_token {
                        Some(&mut base.balance_in)
                    } else if token_out == *principal_token {
                        Some(&mut base.balance_out)
                    } else {
                        None
                    };
                    if let Some(balance) = virtual_balance {
                        *balance = balance
                            .checked_add(self.total_shares)
                            .ok_or_else(|| RouterError::degenerate(&self.id, self.pool_type(), "principal balance out of range"))?;
                    }
                }
                if *unit_seconds == 0 {
                    return Err(RouterError::degenerate(&self.id, self.pool_type(), "zero unit seconds"));
                }
                let remaining = expiry_time.saturating_sub(current_timestamp);
                let time_to_expiry = Decimal::from(remaining) / Decimal::from(*unit_seconds);
                PoolPairData::Element(ElementPairData { base, time_to_expiry })
            }
        };
        Ok(pair)
    }

    /// Replace one balance, or the share supply when `token` is the pool's own address.
    pub fn update_token_balance(&mut self, token: Address, new_balance: Decimal) -> Result<(), RouterError> {
        if token == self.address {
            self.total_shares = new_balance;
            Ok(())
        } else if let Some(index) = self.token_index(token) {
            self.tokens[index].balance = new_balance;
            Ok(())
        } else {
            Err(RouterError::UnknownToken { pool_id: self.id, token })
        }
    }

    pub fn balance_of(&self, token: Address) -> Option<Decimal> {
        if token == self.address {
            Some(self.total_shares)
        } else {
            self.token_index(token).map(|i| self.tokens[i].balance)
        }
    }

    /// Move balances by one executed trade. Share tokens paid in are burned and share tokens
    /// paid out are minted.
    pub fn apply_swap(
        &mut self,
        token_in: Address,
        amount_in: Decimal,
        token_out: Address,
        amount_out: Decimal,
    ) -> Result<(), RouterError> {
        let unknown = |token| RouterError::UnknownToken { pool_id: self.id, token };
        let balance_in = self.balance_of(token_in).ok_or_else(|| unknown(token_in))?;
        let balance_out = self.balance_of(token_out).ok_or_else(|| unknown(token_out))?;
        let new_in = if token_in == self.address { balance_in.checked_sub(amount_in) } else { balance_in.checked_add(amount_in) };
        let new_out =
            if token_out == self.address { balance_out.checked_add(amount_out) } else { balance_out.checked_sub(amount_out) };
        let overflow = || RouterError::degenerate(&self.id, self.pool_type(), "balance update out of range");
        let (new_in, new_out) = (new_in.ok_or_else(overflow)?, new_out.ok_or_else(overflow)?);
        self.update_token_balance(token_in, new_in)?;
        self.update_token_balance(token_out, new_out)
    }
}
