//! Planner configuration stored under `.planner/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::confidence::DEFAULT_CONFIDENCE_THRESHOLD;

/// Planner configuration (TOML).
///
/// Intended to be edited by humans. Missing fields default to the documented
/// planner defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlannerConfig {
    /// Worker-pool capacity for each fan-out level.
    pub max_workers: usize,

    /// Deepest recursion level that is still decomposed.
    pub max_depth: u32,

    /// Minimum confidence for a pattern to be accepted.
    pub confidence_threshold: f64,

    /// Ask the decomposer for the sorted, duplicate-free subgoal view.
    pub prioritize: bool,

    /// Record per-pattern success/failure after each fan-out.
    pub learn_from_outcomes: bool,

    /// Optional wall-clock budget for a top-level plan call, in seconds.
    pub deadline_secs: Option<u64>,

    /// Seed for the confidence draw. Unset uses the thread RNG.
    pub seed: Option<u64>,

    /// Success-rate file, relative to the state directory unless absolute.
    pub success_rates_path: PathBuf,

    pub safety: SafetyConfig,

    /// Extra decomposition patterns layered over the built-ins.
    pub patterns: Vec<PatternConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SafetyConfig {
    /// Goals containing any of these terms (case-insensitive) are rejected.
    pub blocked_terms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternConfig {
    pub key: String,
    pub steps: Vec<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_depth: 5,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            prioritize: true,
            learn_from_outcomes: true,
            deadline_secs: None,
            seed: None,
            success_rates_path: PathBuf::from("success_rates.json"),
            safety: SafetyConfig::default(),
            patterns: Vec::new(),
        }
    }
}

impl PlannerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(anyhow!("max_workers must be > 0"));
        }
        if !self.confidence_threshold.is_finite() || self.confidence_threshold <= 0.0 {
            return Err(anyhow!("confidence_threshold must be a finite number > 0"));
        }
        if self.deadline_secs == Some(0) {
            return Err(anyhow!("deadline_secs must be > 0 when set"));
        }
        for pattern in &self.patterns {
            if pattern.key.trim().is_empty() {
                return Err(anyhow!("patterns: key must be non-empty"));
            }
            if pattern.steps.is_empty() {
                return Err(anyhow!("patterns.{}: steps must be non-empty", pattern.key));
            }
        }
        Ok(())
    }

    /// Resolve `success_rates_path` against the state directory.
    pub fn rates_path_in(&self, state_dir: &Path) -> PathBuf {
        if self.success_rates_path.is_absolute() {
            self.success_rates_path.clone()
        } else {
            state_dir.join(&self.success_rates_path)
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PlannerConfig::default()`.
pub fn load_config(path: &Path) -> Result<PlannerConfig> {
    if !path.exists() {
        let cfg = PlannerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PlannerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &PlannerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, PlannerConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = PlannerConfig {
            seed: Some(7),
            deadline_secs: Some(30),
            safety: SafetyConfig {
                blocked_terms: vec!["sabotage".to_string()],
            },
            patterns: vec![PatternConfig {
                key: "research".to_string(),
                steps: vec!["survey".to_string(), "summarize".to_string()],
            }],
            ..PlannerConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "max_workers = 2\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.max_depth, 5);
        assert!(cfg.prioritize);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero_workers = PlannerConfig {
            max_workers: 0,
            ..PlannerConfig::default()
        };
        assert!(zero_workers.validate().is_err());

        let bad_threshold = PlannerConfig {
            confidence_threshold: f64::NAN,
            ..PlannerConfig::default()
        };
        assert!(bad_threshold.validate().is_err());

        let empty_steps = PlannerConfig {
            patterns: vec![PatternConfig {
                key: "x".to_string(),
                steps: Vec::new(),
            }],
            ..PlannerConfig::default()
        };
        let err = empty_steps.validate().unwrap_err();
        assert!(err.to_string().contains("steps must be non-empty"));
    }

    #[test]
    fn relative_rates_path_resolves_under_state_dir() {
        let cfg = PlannerConfig::default();
        let resolved = cfg.rates_path_in(Path::new("/tmp/.planner"));
        assert_eq!(resolved, Path::new("/tmp/.planner/success_rates.json"));
    }
}
