//! Recursive goal planner CLI.
//!
//! Keeps its configuration and learned success rates under `.planner/` in the
//! current directory. `plan` prints one step per line, or the full outcome
//! with diagnostics as JSON.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use planner::collaborators::{Agent, BlockList, Collaborators, NamedAgent, SeededDraw};
use planner::core::types::PlanContext;
use planner::exit_codes;
use planner::io::config::PlannerConfig;
use planner::io::init::{InitOptions, PlannerPaths, init_planner};
use planner::logging;
use planner::patterns::{PatternStore, default_patterns, extend_patterns};
use planner::plan::{PlanError, PlanRequest, RecursivePlanner};

#[derive(Parser)]
#[command(
    name = "planner",
    version,
    about = "Recursive goal-decomposition planner"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.planner/config.toml` and an empty success-rate file.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Decompose a goal into an ordered plan.
    Plan {
        /// Goal to plan.
        goal: String,
        /// JSON file with the planning context (weight_modifier, traits, ...).
        #[arg(long)]
        context: Option<PathBuf>,
        /// Collaborating agent name; repeat for several agents.
        #[arg(long = "agent")]
        agents: Vec<String>,
        /// Override `max_depth`.
        #[arg(long)]
        max_depth: Option<u32>,
        /// Override `max_workers`.
        #[arg(long)]
        workers: Option<usize>,
        /// Override `seed` for a reproducible confidence draw.
        #[arg(long)]
        seed: Option<u64>,
        /// Print the plan and diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print learned success rates.
    Rates,
    /// Record one outcome for a pattern.
    Record {
        /// Pattern key.
        key: String,
        #[arg(long, value_enum)]
        outcome: Outcome,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Outcome {
    Success,
    Failure,
}

/// Command-line overrides layered over the loaded config.
#[derive(Debug, Clone, Default)]
struct PlanOverrides {
    max_depth: Option<u32>,
    workers: Option<usize>,
    seed: Option<u64>,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let paths = PlannerPaths::new(".");
    match cli.command {
        Command::Init { force } => {
            init_planner(&paths.root, &InitOptions { force })?;
            Ok(exit_codes::OK)
        }
        Command::Plan {
            goal,
            context,
            agents,
            max_depth,
            workers,
            seed,
            json,
        } => {
            let overrides = PlanOverrides {
                max_depth,
                workers,
                seed,
            };
            cmd_plan(&paths, &goal, context.as_deref(), &agents, &overrides, json)
        }
        Command::Rates => cmd_rates(&paths),
        Command::Record { key, outcome } => cmd_record(&paths, &key, outcome),
    }
}

fn cmd_plan(
    paths: &PlannerPaths,
    goal: &str,
    context_path: Option<&Path>,
    agent_names: &[String],
    overrides: &PlanOverrides,
    json: bool,
) -> Result<i32> {
    let (cfg, rates_path) = paths.load()?;
    let cfg = apply_overrides(cfg, overrides)?;
    let context = match context_path {
        Some(path) => load_context(path)?,
        None => PlanContext::default(),
    };
    let agents: Vec<Arc<dyn Agent>> = agent_names
        .iter()
        .map(|name| Arc::new(NamedAgent::new(name.as_str())) as Arc<dyn Agent>)
        .collect();

    let planner = build_planner(cfg, rates_path);
    let request =
        PlanRequest::new(goal, &context, planner.config().max_depth).with_agents(&agents);
    let outcome = match planner.plan(&request) {
        Ok(outcome) => outcome,
        Err(err @ PlanError::UnsafeGoal { .. }) => {
            eprintln!("{err}");
            return Ok(exit_codes::UNSAFE);
        }
    };

    if json {
        let payload = serde_json::to_string_pretty(&outcome).context("serialize plan")?;
        println!("{payload}");
    } else {
        for step in &outcome.plan {
            println!("{step}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_rates(paths: &PlannerPaths) -> Result<i32> {
    let (_, rates_path) = paths.load()?;
    for (key, rate) in PatternStore::load(&rates_path) {
        println!("{key}\t{rate:.4}");
    }
    Ok(exit_codes::OK)
}

fn cmd_record(paths: &PlannerPaths, key: &str, outcome: Outcome) -> Result<i32> {
    let (cfg, rates_path) = paths.load()?;
    let store = open_store(&cfg, rates_path);
    let updated = store.update_success_rate(key, outcome == Outcome::Success);
    println!("{key}\t{updated:.4}");
    Ok(exit_codes::OK)
}

/// Apply command-line overrides to the loaded config.
fn apply_overrides(mut cfg: PlannerConfig, overrides: &PlanOverrides) -> Result<PlannerConfig> {
    if let Some(max_depth) = overrides.max_depth {
        cfg.max_depth = max_depth;
    }
    if let Some(workers) = overrides.workers {
        cfg.max_workers = workers;
    }
    if let Some(seed) = overrides.seed {
        cfg.seed = Some(seed);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn build_planner(cfg: PlannerConfig, rates_path: PathBuf) -> RecursivePlanner {
    let store = open_store(&cfg, rates_path);

    let mut collaborators = Collaborators::default();
    if !cfg.safety.blocked_terms.is_empty() {
        collaborators = collaborators.with_safety(BlockList::new(&cfg.safety.blocked_terms));
    }
    if let Some(seed) = cfg.seed {
        collaborators = collaborators.with_draw(SeededDraw::new(seed));
    }
    RecursivePlanner::new(cfg, Arc::new(store), collaborators)
}

fn open_store(cfg: &PlannerConfig, rates_path: PathBuf) -> PatternStore {
    PatternStore::open(rates_path, extend_patterns(default_patterns(), &cfg.patterns))
}

fn load_context(path: &Path) -> Result<PlanContext> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read context {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse context {}", path.display()))
}
