use crate::core::asset::AssetRecord;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Writes `records` as a pretty-printed JSON array, creating parent directories.
pub fn write_records<P: AsRef<Path>>(path: P, records: &[AssetRecord]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(records).context("Failed to serialize records")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write records to {}", path.display()))?;

    debug!(count = records.len(), "Wrote records to {}", path.display());
    Ok(())
}

pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<AssetRecord>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse records file: {}", path.display()))
}
