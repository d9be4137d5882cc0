/// Logic Layer - Smart Order Router
///
/// This layer is responsible for:
/// - Discovering direct and two-hop candidate paths
/// - Bounding every path by the pools' trade limits
/// - Splitting an amount across paths at equal marginal price

pub mod graph;
pub mod optimizer;
pub mod path_builder;
pub mod path_limits;
pub mod router;
pub mod types;

#[cfg(test)]
mod tests;

pub use graph::{SwapPath, SwapPathHash};
pub use optimizer::{Optimizer, SwapAllocation};
pub use path_builder::PathBuilder;
pub use path_limits::calculate_path_limits;
pub use router::Router;
pub use types::{PoolFilter, RouteResult, RouterConfig, SwapOptions, SwapStep};
