use crate::pools::{PoolId, PoolType};
use alloy_primitives::Address;
use rust_decimal::Decimal;

/// Errors raised by the pricing and routing core.
///
/// None of these are retried internally: the core performs no I/O, so the same snapshot
/// and request always fail the same way.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("token {token} is not part of pool {pool_id}")]
    UnknownToken { pool_id: PoolId, token: Address },
    #[error("{pool_type} pool {pool_id} does not support {operation}")]
    UnsupportedOperation { pool_id: PoolId, pool_type: PoolType, operation: &'static str },
    #[error("insufficient liquidity for {token_in} -> {token_out}: requested {requested}, available {available}")]
    InsufficientLiquidity { token_in: Address, token_out: Address, requested: Decimal, available: Decimal },
    #[error("{pool_type} pool {pool_id} left its invariant domain: {reason}")]
    DegenerateInvariant { pool_id: PoolId, pool_type: PoolType, reason: String },
    #[error("no pools supplied")]
    EmptyPoolSet,
}

impl RouterError {
    pub fn degenerate(pool_id: &PoolId, pool_type: PoolType, reason: impl Into<String>) -> Self {
        RouterError::DegenerateInvariant { pool_id: *pool_id, pool_type, reason: reason.into() }
    }

    pub fn unsupported(pool_id: &PoolId, pool_type: PoolType, operation: &'static str) -> Self {
        RouterError::UnsupportedOperation { pool_id: *pool_id, pool_type, operation }
    }
}
