use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::parse::parse_dataset;
use super::record::RawStore;

pub fn load_dataset(path: &Path) -> Result<RawStore> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read dataset {}", path.display()))?;

    let store = parse_dataset(&raw)
        .with_context(|| format!("failed to parse dataset {}", path.display()))?;

    if store.is_empty() {
        return Err(anyhow!("dataset {} contains no peers", path.display()));
    }

    tracing::info!(
        path = %path.display(),
        peers = store.len(),
        links = store.edge_count(),
        "loaded static dataset"
    );

    Ok(store)
}
