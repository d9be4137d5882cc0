use crate::data_sync::config::RouterConfigSection;
use crate::data_sync::provider::{PoolSnapshot, PoolSnapshotProvider};
use crate::data_sync::route_cache::{RouteCache, RouteCacheKey};
use crate::errors::RouterError;
use crate::logic::graph::SwapPath;
use crate::logic::types::{RouteResult, RouterConfig, SwapOptions, SwapType};
use crate::logic::Router;
use crate::utils::config_loader::SectionLoader;
use alloy_primitives::Address;
use dashmap::DashMap;
use eyre::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Keeps the latest pool snapshot and the prepared paths per request shape next to a
/// [`Router`].
///
/// Every request routes against its own copy of the pools, so `get_swaps` calls may run
/// concurrently with each other and with `fetch_pools`.
pub struct SorService {
    provider: Box<dyn PoolSnapshotProvider>,
    router: Router,
    snapshot: RwLock<Option<Arc<PoolSnapshot>>>,
    cache: RouteCache,
    // execution cost per path, keyed by the token it is denominated in
    cost_by_token: DashMap<Address, Decimal>,
}

impl SorService {
    pub fn new(provider: Box<dyn PoolSnapshotProvider>, config: RouterConfig) -> Self {
        Self {
            provider,
            router: Router::new(config),
            snapshot: RwLock::new(None),
            cache: RouteCache::new(),
            cost_by_token: DashMap::new(),
        }
    }

    /// Build the service with the `[router]` section of a TOML file.
    pub async fn from_config_file(provider: Box<dyn PoolSnapshotProvider>, file_name: String) -> Result<Self> {
        let section = RouterConfigSection::load_section_from_file(file_name).await?;
        Ok(Self::new(provider, section.into_config()))
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn cache(&self) -> &RouteCache {
        &self.cache
    }

    /// Pull a fresh snapshot. On failure the previous snapshot is dropped as well, so stale
    /// pools are never routed against, and `false` is returned.
    pub async fn fetch_pools(&self) -> bool {
        let fetched = self.provider.fetch_pools().await.and_then(|snapshot| {
            let fingerprint = snapshot.fingerprint()?;
            Ok((snapshot, fingerprint))
        });
        let mut current = self.snapshot.write().await;
        match fetched {
            Ok((snapshot, fingerprint)) => {
                if self.cache.observe_snapshot(fingerprint) {
                    info!("Pool snapshot changed to {} ({} pools)", fingerprint, snapshot.pools.len());
                }
                *current = Some(Arc::new(snapshot));
                true
            }
            Err(e) => {
                warn!("Failed to fetch pools: {}", e);
                *current = None;
                self.cache.reset();
                false
            }
        }
    }

    pub async fn pool_count(&self) -> usize {
        self.snapshot.read().await.as_ref().map(|s| s.pools.len()).unwrap_or(0)
    }

    /// Execution cost per path used when a request does not carry one. `token` is the token the
    /// cost is denominated in: tokenOut of exact-in requests, tokenIn of exact-out requests.
    pub fn set_cost_output_token(&self, token: Address, cost: Decimal) {
        self.cost_by_token.insert(token, cost);
    }

    pub async fn get_swaps(
        &self,
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        amount: Decimal,
        options: SwapOptions,
    ) -> Result<RouteResult> {
        let options = self.with_cost_override(token_in, token_out, swap_type, options);

        let guard = self.snapshot.read().await;
        let snapshot = guard.clone().ok_or(RouterError::EmptyPoolSet)?;
        let paths = self.paths_for(&snapshot, token_in, token_out, swap_type, &options)?;
        drop(guard);

        let result =
            self.router.route_prepared(token_in, token_out, swap_type, amount, &snapshot.pools, &paths, &options)?;
        debug!(
            "{} {} {:#x} -> {:#x} over {} paths returns {}",
            swap_type,
            amount,
            token_in,
            token_out,
            result.path_count(),
            result.return_amount
        );
        Ok(result)
    }

    fn with_cost_override(
        &self,
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        options: SwapOptions,
    ) -> SwapOptions {
        if options.execution_cost_per_path.is_some() {
            return options;
        }
        let cost_token = match swap_type {
            SwapType::ExactIn => token_out,
            SwapType::ExactOut => token_in,
        };
        match self.cost_by_token.get(&cost_token) {
            Some(cost) => options.with_execution_cost(*cost.value()),
            None => options,
        }
    }

    // Must be called with the snapshot lock held so a refresh cannot slip stale paths in.
    fn paths_for(
        &self,
        snapshot: &PoolSnapshot,
        token_in: Address,
        token_out: Address,
        swap_type: SwapType,
        options: &SwapOptions,
    ) -> Result<Arc<Vec<SwapPath>>, RouterError> {
        if !options.disabled_tokens.is_empty() {
            let paths = self.router.prepare_paths(&snapshot.pools, token_in, token_out, swap_type, options)?;
            return Ok(Arc::new(paths));
        }
        let key = RouteCacheKey {
            token_in,
            token_out,
            swap_type,
            timestamp: options.current_timestamp,
            pool_type_filter: options.pool_type_filter,
            max_pools: options.max_pools,
        };
        if let Some(paths) = self.cache.get(&key) {
            return Ok(paths);
        }
        let paths = self.router.prepare_paths(&snapshot.pools, token_in, token_out, swap_type, options)?;
        Ok(self.cache.insert(key, paths))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_sync::provider::{JsonFilePoolProvider, StaticPoolProvider};
    use crate::pools::Pool;
    use crate::pools::pool::tests::{token, weighted_pool};
    use rust_decimal_macros::dec;
    use std::sync::atomic::Ordering;

    const A: u8 = 1;
    const B: u8 = 2;

    fn pools(balance: Decimal) -> Vec<Pool> {
        let half = Some(dec!(0.5));
        vec![
            weighted_pool(0x81, dec!(0.003), vec![token(A, balance, 18, half), token(B, balance, 6, half)]),
            weighted_pool(0x82, dec!(0.003), vec![token(A, dec!(1000), 18, half), token(B, dec!(1000), 6, half)]),
        ]
    }

    fn static_service() -> SorService {
        let provider = StaticPoolProvider::new(PoolSnapshot::new(pools(dec!(10000))));
        SorService::new(Box::new(provider), RouterConfig::default())
    }

    async fn swap(service: &SorService, amount: Decimal, options: SwapOptions) -> Result<RouteResult> {
        service.get_swaps(Address::repeat_byte(A), Address::repeat_byte(B), SwapType::ExactIn, amount, options).await
    }

    #[tokio::test]
    async fn test_requires_a_snapshot() -> eyre::Result<()> {
        let service = static_service();
        let err = swap(&service, dec!(10), SwapOptions::default()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<RouterError>(), Some(&RouterError::EmptyPoolSet));

        assert!(service.fetch_pools().await);
        assert_eq!(service.pool_count().await, 2);
        assert!(!swap(&service, dec!(10), SwapOptions::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_prepared_paths_are_reused() -> eyre::Result<()> {
        let service = static_service();
        service.fetch_pools().await;
        let first = swap(&service, dec!(10), SwapOptions::default()).await?;
        let second = swap(&service, dec!(10), SwapOptions::default()).await?;
        assert_eq!(first, second);
        assert_eq!(service.cache().stats.misses.load(Ordering::Relaxed), 1);
        assert_eq!(service.cache().stats.hits.load(Ordering::Relaxed), 1);

        // a refetch of the same pools keeps the entries
        service.fetch_pools().await;
        swap(&service, dec!(10), SwapOptions::default()).await?;
        assert_eq!(service.cache().stats.hits.load(Ordering::Relaxed), 2);

        // disabled tokens bypass the cache
        swap(&service, dec!(10), SwapOptions::default().with_disabled_token(Address::repeat_byte(9))).await?;
        assert_eq!(service.cache().stats.hits.load(Ordering::Relaxed) + service.cache().stats.misses.load(Ordering::Relaxed), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_change_and_fetch_failure() -> eyre::Result<()> {
        let file = std::env::temp_dir().join(format!("sor_router_service_{}.json", std::process::id()));
        std::fs::write(&file, serde_json::to_string(&pools(dec!(10000)))?)?;
        let service = SorService::new(Box::new(JsonFilePoolProvider::new(&file)), RouterConfig::default());

        assert!(service.fetch_pools().await);
        let before = swap(&service, dec!(100), SwapOptions::default()).await?;
        assert_eq!(service.cache().len(), 1);

        std::fs::write(&file, serde_json::to_string(&pools(dec!(20000)))?)?;
        assert!(service.fetch_pools().await);
        assert!(service.cache().is_empty());
        let after = swap(&service, dec!(100), SwapOptions::default()).await?;
        assert!(after.return_amount > before.return_amount);

        std::fs::remove_file(&file)?;
        assert!(!service.fetch_pools().await);
        assert_eq!(service.pool_count().await, 0);
        assert!(swap(&service, dec!(100), SwapOptions::default()).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_cost_override_applies_without_request_cost() -> eyre::Result<()> {
        let service = static_service();
        service.fetch_pools().await;
        assert_eq!(swap(&service, dec!(200), SwapOptions::default()).await?.path_count(), 2);

        service.set_cost_output_token(Address::repeat_byte(B), dec!(50));
        let costly = swap(&service, dec!(200), SwapOptions::default()).await?;
        assert_eq!(costly.path_count(), 1);
        assert_eq!(costly.return_amount_considering_fees, costly.return_amount - dec!(50));

        // an explicit request cost wins
        let explicit = swap(&service, dec!(200), SwapOptions::default().with_execution_cost(Decimal::ZERO)).await?;
        assert_eq!(explicit.path_count(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_from_config_file() -> eyre::Result<()> {
        let file = std::env::temp_dir().join(format!("sor_router_service_config_{}.toml", std::process::id()));
        std::fs::write(&file, "[router]\ndefault_max_pools = 1\n")?;
        let provider = StaticPoolProvider::new(PoolSnapshot::new(pools(dec!(10000))));
        let service = SorService::from_config_file(Box::new(provider), file.to_string_lossy().into_owned()).await?;
        std::fs::remove_file(&file)?;
        service.fetch_pools().await;

        let options = service.router().default_options();
        assert_eq!(options.max_pools, 1);
        assert_eq!(swap(&service, dec!(200), options).await?.path_count(), 1);
        Ok(())
    }
}
