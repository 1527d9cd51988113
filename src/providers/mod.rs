pub mod snapshot_file;
pub mod util;
pub mod yahoo_finance;

use crate::core::config::{AppConfig, ProviderKind};
use crate::core::snapshot::SnapshotProvider;
use anyhow::{Context, Result};

/// Builds the provider for `kind` from its section of the configuration.
pub fn build_provider(kind: ProviderKind, config: &AppConfig) -> Result<Box<dyn SnapshotProvider>> {
    match kind {
        ProviderKind::Yahoo => {
            let base_url = config
                .providers
                .yahoo
                .as_ref()
                .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
            Ok(Box::new(yahoo_finance::YahooFinanceProvider::new(base_url)))
        }
        ProviderKind::Snapshots => {
            let snapshots = config
                .providers
                .snapshots
                .as_ref()
                .context("providers.snapshots.path must be set to use the snapshots provider")?;
            Ok(Box::new(snapshot_file::SnapshotFileProvider::new(
                &snapshots.path,
            )))
        }
    }
}
