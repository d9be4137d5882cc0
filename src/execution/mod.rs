/// Execution Layer
///
/// Turns an optimizer allocation into ordered swap steps, replaying every path against a
/// private copy of the pools and mapping wrapped native tokens back to the native asset.
pub mod swap_plan;

pub use swap_plan::{PoolArena, RouteEndpoints, SwapPlan};
