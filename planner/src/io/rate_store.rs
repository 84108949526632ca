//! Success-rate file storage (`.planner/success_rates.json`).
//!
//! A flat JSON object of pattern key to rate. Writes go through a temp file and
//! a rename so a concurrent reader never sees a torn file.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Persisted pattern key to success-rate mapping.
pub type SuccessRates = BTreeMap<String, f64>;

/// Load success rates from disk. A missing file yields an empty mapping.
pub fn load_rates(path: &Path) -> Result<SuccessRates> {
    if !path.exists() {
        debug!(path = %path.display(), "no success-rate file, starting empty");
        return Ok(SuccessRates::new());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read success rates {}", path.display()))?;
    let rates: SuccessRates = serde_json::from_str(&contents)
        .with_context(|| format!("parse success rates {}", path.display()))?;
    debug!(path = %path.display(), patterns = rates.len(), "success rates loaded");
    Ok(rates)
}

/// Atomically write success rates to disk (temp file + rename).
pub fn write_rates(path: &Path, rates: &SuccessRates) -> Result<()> {
    debug!(path = %path.display(), patterns = rates.len(), "writing success rates");
    let mut buf = serde_json::to_string_pretty(rates)?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}
