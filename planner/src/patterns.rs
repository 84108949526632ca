//! Decomposition patterns and their learned success rates.
//!
//! The pattern table is fixed once the store is built and is shared read-only
//! across planning threads. Success rates sit behind a mutex; every update is
//! written through to the rate file while the lock is held, so writers never
//! interleave and the on-disk file is always a complete snapshot.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::success_rate::{INITIAL_RATE, adjust_rate, clamp_rate};
use crate::io::config::PatternConfig;
use crate::io::rate_store::{SuccessRates, load_rates, write_rates};

/// A goal keyword and the canonical steps it expands into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionPattern {
    pub key: String,
    pub steps: Vec<String>,
}

impl DecompositionPattern {
    pub fn new(key: &str, steps: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            steps: steps.iter().map(|step| step.to_string()).collect(),
        }
    }

    /// Case-insensitive containment of the key within `goal`.
    pub fn matches(&self, goal: &str) -> bool {
        goal.to_lowercase().contains(&self.key.to_lowercase())
    }
}

/// Built-in patterns, in iteration order.
pub fn default_patterns() -> Vec<DecompositionPattern> {
    vec![
        DecompositionPattern::new(
            "prepare",
            &["define requirements", "allocate resources", "create timeline"],
        ),
        DecompositionPattern::new(
            "build",
            &["design architecture", "implement core modules", "test components"],
        ),
        DecompositionPattern::new(
            "launch",
            &["finalize product", "plan marketing", "deploy to production"],
        ),
    ]
}

/// Layer configured patterns over `base`.
///
/// A configured key equal to an existing one replaces its steps in place; new
/// keys are appended in configuration order.
pub fn extend_patterns(
    mut base: Vec<DecompositionPattern>,
    extra: &[PatternConfig],
) -> Vec<DecompositionPattern> {
    for pattern in extra {
        match base.iter_mut().find(|existing| existing.key == pattern.key) {
            Some(existing) => existing.steps = pattern.steps.clone(),
            None => base.push(DecompositionPattern {
                key: pattern.key.clone(),
                steps: pattern.steps.clone(),
            }),
        }
    }
    base
}

/// Pattern table plus persisted per-pattern success rates.
#[derive(Debug)]
pub struct PatternStore {
    patterns: Vec<DecompositionPattern>,
    rates: Mutex<SuccessRates>,
    path: Option<PathBuf>,
}

impl PatternStore {
    /// Open a store backed by `path`, loading any persisted rates.
    ///
    /// An unreadable or corrupt file is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>, patterns: Vec<DecompositionPattern>) -> Self {
        let path = path.into();
        let rates = Self::load(&path);
        Self {
            patterns,
            rates: Mutex::new(rates),
            path: Some(path),
        }
    }

    /// A store that never touches the filesystem.
    pub fn in_memory(patterns: Vec<DecompositionPattern>) -> Self {
        Self {
            patterns,
            rates: Mutex::new(SuccessRates::new()),
            path: None,
        }
    }

    /// Read persisted rates, falling back to an empty mapping on any failure.
    pub fn load(path: &Path) -> SuccessRates {
        match load_rates(path) {
            Ok(rates) => rates
                .into_iter()
                .map(|(key, rate)| (key, clamp_rate(rate)))
                .collect(),
            Err(err) => {
                warn!(path = %path.display(), err = %format!("{err:#}"), "failed to load success rates");
                SuccessRates::new()
            }
        }
    }

    /// Persist `rates` if the store is file-backed. Failures are logged and dropped.
    pub fn save(&self, rates: &SuccessRates) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(err) = write_rates(path, rates) {
            warn!(path = %path.display(), err = %format!("{err:#}"), "failed to save success rates");
        }
    }

    pub fn patterns(&self) -> &[DecompositionPattern] {
        &self.patterns
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current rate for `key`; unseen keys report the initial rate.
    pub fn success_rate(&self, key: &str) -> f64 {
        self.lock_rates()
            .get(key)
            .copied()
            .unwrap_or(INITIAL_RATE)
    }

    /// Snapshot of every recorded rate.
    pub fn rates(&self) -> SuccessRates {
        self.lock_rates().clone()
    }

    /// Record one outcome for `key` and write the full mapping through.
    ///
    /// Returns the new rate.
    pub fn update_success_rate(&self, key: &str, success: bool) -> f64 {
        let mut rates = self.lock_rates();
        let current = rates.get(key).copied().unwrap_or(INITIAL_RATE);
        let updated = adjust_rate(current, success);
        rates.insert(key.to_string(), updated);
        debug!(key, success, from = current, to = updated, "success rate updated");
        self.save(&rates);
        updated
    }

    /// Overwrite the rate for `key` (clamped) and write through.
    #[cfg(any(test, feature = "test-support"))]
    pub fn set_success_rate(&self, key: &str, rate: f64) {
        let mut rates = self.lock_rates();
        rates.insert(key.to_string(), clamp_rate(rate));
        debug!(key, rate = clamp_rate(rate), "success rate set");
        self.save(&rates);
    }

    fn lock_rates(&self) -> MutexGuard<'_, SuccessRates> {
        self.rates.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
