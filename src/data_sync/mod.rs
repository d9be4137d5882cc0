/// Data Layer
///
/// Everything the routing core needs from the outside world:
///
/// - Pool snapshot providers (static fixtures or JSON files)
/// - A route cache of prepared paths, dropped whenever the snapshot changes
/// - The `[router]` config section
/// - `SorService`, which ties the three to a `Router`
pub mod config;
pub mod provider;
pub mod route_cache;
pub mod service;

pub use config::{RouterConfigRoot, RouterConfigSection};
pub use provider::{JsonFilePoolProvider, PoolSnapshot, PoolSnapshotProvider, StaticPoolProvider};
pub use route_cache::{RouteCache, RouteCacheKey, RouteCacheStats};
pub use service::SorService;
