//! External collaborator interfaces consumed by the planner.
//!
//! The planner never computes safety, trait readings, recovery plans or
//! conflict policy itself; it calls through these traits. Each has a plain
//! default so the crate works end to end, and tests swap in scripted versions.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::core::confidence::BASE_DRAW_RANGE;
use crate::core::types::TraitSample;

/// Pass/fail predicate evaluated before any goal is planned.
pub trait SafetyGate: Send + Sync {
    fn is_safe(&self, goal: &str) -> bool;
}

/// Source of trait readings used when the context does not override them.
pub trait TraitProvider: Send + Sync {
    fn sample(&self, at: SystemTime) -> Result<TraitSample>;
}

/// Synthesizes a fallback plan fragment after a subgoal failed.
pub trait RecoveryReviewer: Send + Sync {
    fn review(&self, error: &str) -> Vec<String>;
}

/// Approves or vetoes assigning a subgoal to an agent.
pub trait ConflictResolver: Send + Sync {
    fn resolve(&self, subgoal: &str, agent: &dyn Agent) -> bool;
}

/// Fire-and-forget hook raised when a goal matched nothing under high phi.
pub trait AmbiguitySignal: Send + Sync {
    fn ambiguous(&self, goal: &str);
}

/// Base draw for pattern confidence, in `[0.5, 1.0]`.
pub trait ConfidenceDraw: Send + Sync {
    fn draw(&self) -> f64;
}

/// A collaborating agent. Only its name is needed for assignment.
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
}

/// Agent identified by name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedAgent(pub String);

impl NamedAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Agent for NamedAgent {
    fn name(&self) -> &str {
        &self.0
    }
}

pub struct AllowAll;

impl SafetyGate for AllowAll {
    fn is_safe(&self, _goal: &str) -> bool {
        true
    }
}

/// Rejects goals containing any blocked term, case-insensitively.
#[derive(Debug, Clone)]
pub struct BlockList {
    terms: Vec<String>,
}

impl BlockList {
    pub fn new(terms: &[String]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|term| term.trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
        }
    }
}

impl SafetyGate for BlockList {
    fn is_safe(&self, goal: &str) -> bool {
        let goal = goal.to_lowercase();
        !self.terms.iter().any(|term| goal.contains(term))
    }
}

pub struct NeutralTraits;

impl TraitProvider for NeutralTraits {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        Ok(TraitSample::NEUTRAL)
    }
}

/// Always returns the same reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedTraits(pub TraitSample);

impl TraitProvider for FixedTraits {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        Ok(self.0)
    }
}

/// Hands the failure back as a single step for a human to pick up.
pub struct ManualReview;

impl RecoveryReviewer for ManualReview {
    fn review(&self, error: &str) -> Vec<String> {
        vec![format!("manual review: {error}")]
    }
}

pub struct ApproveAll;

impl ConflictResolver for ApproveAll {
    fn resolve(&self, _subgoal: &str, _agent: &dyn Agent) -> bool {
        true
    }
}

pub struct LogAmbiguity;

impl AmbiguitySignal for LogAmbiguity {
    fn ambiguous(&self, goal: &str) {
        info!(goal, "decomposition ambiguous: no pattern accepted under high phi");
    }
}

/// Uniform draw from the thread-local RNG.
pub struct ThreadDraw;

impl ConfidenceDraw for ThreadDraw {
    fn draw(&self) -> f64 {
        let (lo, hi) = BASE_DRAW_RANGE;
        rand::thread_rng().gen_range(lo..=hi)
    }
}

/// Reproducible draw sequence from a seeded RNG.
pub struct SeededDraw {
    rng: Mutex<StdRng>,
}

impl SeededDraw {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl ConfidenceDraw for SeededDraw {
    fn draw(&self) -> f64 {
        let (lo, hi) = BASE_DRAW_RANGE;
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(lo..=hi)
    }
}

/// Constant draw, for forcing accept/reject outcomes.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl ConfidenceDraw for FixedDraw {
    fn draw(&self) -> f64 {
        self.0
    }
}

/// The full set of collaborators a planner calls through.
#[derive(Clone)]
pub struct Collaborators {
    pub safety: Arc<dyn SafetyGate>,
    pub traits: Arc<dyn TraitProvider>,
    pub recovery: Arc<dyn RecoveryReviewer>,
    pub resolver: Arc<dyn ConflictResolver>,
    pub ambiguity: Arc<dyn AmbiguitySignal>,
    pub draw: Arc<dyn ConfidenceDraw>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            safety: Arc::new(AllowAll),
            traits: Arc::new(NeutralTraits),
            recovery: Arc::new(ManualReview),
            resolver: Arc::new(ApproveAll),
            ambiguity: Arc::new(LogAmbiguity),
            draw: Arc::new(ThreadDraw),
        }
    }
}

impl Collaborators {
    pub fn with_safety(mut self, safety: impl SafetyGate + 'static) -> Self {
        self.safety = Arc::new(safety);
        self
    }

    pub fn with_traits(mut self, traits: impl TraitProvider + 'static) -> Self {
        self.traits = Arc::new(traits);
        self
    }

    pub fn with_recovery(mut self, recovery: impl RecoveryReviewer + 'static) -> Self {
        self.recovery = Arc::new(recovery);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ConflictResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_ambiguity(mut self, ambiguity: impl AmbiguitySignal + 'static) -> Self {
        self.ambiguity = Arc::new(ambiguity);
        self
    }

    pub fn with_draw(mut self, draw: impl ConfidenceDraw + 'static) -> Self {
        self.draw = Arc::new(draw);
        self
    }
}
