//! Offline provider reading pre-fetched snapshots from `<dir>/<symbol>.json`.

use crate::core::snapshot::{ProviderSnapshot, SnapshotProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub struct SnapshotFileProvider {
    dir: PathBuf,
}

impl SnapshotFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn snapshot_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }
}

#[async_trait]
impl SnapshotProvider for SnapshotFileProvider {
    fn name(&self) -> &str {
        "snapshots"
    }

    async fn fetch_snapshot(&self, symbol: &str) -> Result<ProviderSnapshot> {
        let path = self.snapshot_path(symbol);
        debug!("Reading snapshot from {}", path.display());

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
        let mut snapshot: ProviderSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot file: {}", path.display()))?;
        snapshot.daily_series.sort_by_key(|bar| bar.date);
        Ok(snapshot)
    }
}
