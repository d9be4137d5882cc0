use crate::pools::Pool;
use alloy_primitives::B256;
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::debug;

/// Pools as of one point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub pools: Vec<Pool>,
    /// Unix seconds the snapshot was taken at, if the source reports it.
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl PoolSnapshot {
    pub fn new(pools: Vec<Pool>) -> Self {
        Self { pools, timestamp: None }
    }

    /// sha256 of the canonical JSON of the pools.
    pub fn fingerprint(&self) -> Result<B256> {
        let encoded = serde_json::to_vec(&self.pools)?;
        let digest: [u8; 32] = Sha256::digest(&encoded).into();
        Ok(B256::from(digest))
    }
}

// Subgraph style `{"pools": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
    Wrapped(PoolSnapshot),
    Bare(Vec<Pool>),
}

#[async_trait]
pub trait PoolSnapshotProvider: Send + Sync {
    async fn fetch_pools(&self) -> Result<PoolSnapshot>;
}

/// Serves a fixed snapshot, mostly for tests and fixtures.
#[derive(Clone, Debug, Default)]
pub struct StaticPoolProvider {
    snapshot: PoolSnapshot,
}

impl StaticPoolProvider {
    pub fn new(snapshot: PoolSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl PoolSnapshotProvider for StaticPoolProvider {
    async fn fetch_pools(&self) -> Result<PoolSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Reads the snapshot from a JSON file on every fetch.
#[derive(Clone, Debug)]
pub struct JsonFilePoolProvider {
    path: PathBuf,
}

impl JsonFilePoolProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PoolSnapshotProvider for JsonFilePoolProvider {
    async fn fetch_pools(&self) -> Result<PoolSnapshot> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .wrap_err_with(|| format!("reading pool snapshot {}", self.path.display()))?;
        let snapshot = match serde_json::from_str::<SnapshotFile>(&contents)
            .wrap_err_with(|| format!("parsing pool snapshot {}", self.path.display()))?
        {
            SnapshotFile::Wrapped(snapshot) => snapshot,
            SnapshotFile::Bare(pools) => PoolSnapshot::new(pools),
        };
        debug!("Loaded {} pools from {}", snapshot.pools.len(), self.path.display());
        Ok(snapshot)
    }
}
