pub mod element;
pub mod linear;
pub mod pair;
pub mod pool;
pub mod pool_id;
pub mod stable;
pub mod weighted;

pub use pair::{LimitRatios, PairBase, PairType, PoolPairData, PoolPricing, SwapType};
pub use pool::{Pool, PoolKind, PoolToken, PoolType};
pub use pool_id::PoolId;
