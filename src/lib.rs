// Three-Layer Architecture
pub mod data_sync; // Data Layer: pool snapshots, route cache, service wrapper
pub mod execution; // Execution Layer: swap step assembly
pub mod logic; // Logic Layer: path discovery, limits, order splitting

pub mod errors;
pub mod pools;

// Common utilities and types
pub mod utils;

// Re-export key components from each layer
pub use data_sync::{JsonFilePoolProvider, PoolSnapshot, PoolSnapshotProvider, RouterConfigSection, SorService, StaticPoolProvider};
pub use errors::RouterError;
pub use logic::{PoolFilter, RouteResult, Router, RouterConfig, SwapOptions, SwapPath, SwapStep};
pub use pools::{Pool, PoolId, PoolKind, PoolToken, PoolType, SwapType};
