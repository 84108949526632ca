//! Initialization helpers for `.planner/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use super::config::{PlannerConfig, load_config, write_config};
use super::rate_store::{SuccessRates, write_rates};

const PLANNER_GITIGNORE: &str = ".tmp*\n";

/// Canonical paths within `.planner/` for a project root.
#[derive(Debug, Clone)]
pub struct PlannerPaths {
    pub root: PathBuf,
    pub state_dir: PathBuf,
    pub gitignore_path: PathBuf,
    pub config_path: PathBuf,
}

impl PlannerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let state_dir = root.join(".planner");
        Self {
            root: root.clone(),
            state_dir: state_dir.clone(),
            gitignore_path: state_dir.join(".gitignore"),
            config_path: state_dir.join("config.toml"),
        }
    }

    /// Load the config and resolve the success-rate file it points at.
    pub fn load(&self) -> Result<(PlannerConfig, PathBuf)> {
        let cfg = load_config(&self.config_path)?;
        let rates_path = cfg.rates_path_in(&self.state_dir);
        Ok((cfg, rates_path))
    }
}

/// Options for `init_planner`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing planner-owned files.
    pub force: bool,
}

/// Create `.planner/` scaffolding in `root`.
///
/// Fails if `.planner/` already exists unless `options.force` is set.
pub fn init_planner(root: &Path, options: &InitOptions) -> Result<PlannerPaths> {
    let paths = PlannerPaths::new(root);
    if paths.state_dir.exists() && !options.force {
        return Err(anyhow!(
            "planner init: .planner already exists (use --force to overwrite)"
        ));
    }
    if paths.state_dir.exists() && !paths.state_dir.is_dir() {
        return Err(anyhow!(
            "planner init: .planner exists but is not a directory"
        ));
    }

    fs::create_dir_all(&paths.state_dir)
        .with_context(|| format!("create directory {}", paths.state_dir.display()))?;
    fs::write(&paths.gitignore_path, PLANNER_GITIGNORE)
        .with_context(|| format!("write file {}", paths.gitignore_path.display()))?;

    let cfg = PlannerConfig::default();
    write_config(&paths.config_path, &cfg)?;
    write_rates(&cfg.rates_path_in(&paths.state_dir), &SuccessRates::new())?;

    Ok(paths)
}
