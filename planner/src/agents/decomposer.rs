//! Pattern-based goal decomposition with confidence gating.

use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{debug, instrument, warn};

use crate::collaborators::{AmbiguitySignal, Collaborators, ConfidenceDraw, TraitProvider};
use crate::core::confidence::{ResolvedTraits, pattern_confidence};
use crate::core::contradictions::{detect_contradictions, prioritize};
use crate::core::types::{PatternDecision, PlanContext, TraitSample};
use crate::patterns::PatternStore;

/// Phi above which an empty decomposition is reported as ambiguous.
pub const AMBIGUITY_PHI: f64 = 0.8;

/// Result of one decomposition call.
///
/// Both views are kept: `raw` preserves pattern order and duplicates, while
/// `subgoals` is what the caller asked for (prioritized or not).
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    /// Accepted steps in pattern-iteration order, duplicates included.
    pub raw: Vec<String>,
    /// `raw`, or its sorted duplicate-free form when prioritized.
    pub subgoals: Vec<String>,
    /// Subgoals occurring more than once in `raw`, sorted.
    pub contradictions: Vec<String>,
    pub decisions: Vec<PatternDecision>,
}

impl Decomposition {
    /// No pattern was accepted: the goal is atomic.
    pub fn is_empty(&self) -> bool {
        self.subgoals.is_empty()
    }

    pub fn accepted_keys(&self) -> impl Iterator<Item = &str> {
        self.decisions
            .iter()
            .filter(|decision| decision.accepted)
            .map(|decision| decision.key.as_str())
    }

    /// Prioritized view of `raw`, regardless of how this call was made.
    pub fn prioritized_view(&self) -> Vec<String> {
        prioritize(&self.raw)
    }
}

/// Matches goals against the pattern table and gates each match on confidence.
#[derive(Clone)]
pub struct Decomposer {
    store: Arc<PatternStore>,
    traits: Arc<dyn TraitProvider>,
    ambiguity: Arc<dyn AmbiguitySignal>,
    draw: Arc<dyn ConfidenceDraw>,
    threshold: f64,
}

impl Decomposer {
    pub fn new(store: Arc<PatternStore>, collaborators: &Collaborators, threshold: f64) -> Self {
        Self {
            store,
            traits: Arc::clone(&collaborators.traits),
            ambiguity: Arc::clone(&collaborators.ambiguity),
            draw: Arc::clone(&collaborators.draw),
            threshold,
        }
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    /// Expand `goal` into subgoals from every accepted pattern.
    ///
    /// Only a failing trait provider produces an error. An empty result means
    /// the goal is atomic.
    #[instrument(skip_all, fields(goal = %goal, prioritize = prioritize_result))]
    pub fn decompose(
        &self,
        goal: &str,
        context: &PlanContext,
        prioritize_result: bool,
    ) -> Result<Decomposition> {
        let traits = self.resolve_traits(context)?;
        let weight = context.weight();
        let mut trace = vec![format!("goal: '{goal}'")];
        let mut raw = Vec::new();
        let mut decisions = Vec::new();

        for pattern in self.store.patterns() {
            if !pattern.matches(goal) {
                continue;
            }
            let rate = self.store.success_rate(&pattern.key);
            let confidence = pattern_confidence(self.draw.draw(), rate, &traits, weight);
            let accepted = confidence >= self.threshold;
            trace.push(format!(
                "pattern '{}': conf={confidence:.2} rate={rate:.2} phi={:.2} -> {}",
                pattern.key,
                traits.phi,
                if accepted { "accepted" } else { "rejected" }
            ));
            if accepted {
                raw.extend(pattern.steps.iter().cloned());
            }
            decisions.push(PatternDecision {
                key: pattern.key.clone(),
                confidence,
                accepted,
            });
        }

        let contradictions = detect_contradictions(&raw);
        if !contradictions.is_empty() {
            warn!(goal, ?contradictions, "contradictory subgoals");
            trace.push(format!("contradictions: {contradictions:?}"));
        }

        if raw.is_empty() && traits.phi > AMBIGUITY_PHI {
            trace.push("ambiguity signalled".to_string());
            self.ambiguity.ambiguous(goal);
        }

        let subgoals = if prioritize_result {
            let sorted = prioritize(&raw);
            trace.push(format!("prioritized: {sorted:?}"));
            sorted
        } else {
            raw.clone()
        };

        debug!(trace = %trace.join("\n"), "decomposition trace");
        Ok(Decomposition {
            raw,
            subgoals,
            contradictions,
            decisions,
        })
    }

    fn resolve_traits(&self, context: &PlanContext) -> Result<ResolvedTraits> {
        let overrides = context.traits.as_ref();
        let sample = match overrides {
            Some(traits) if traits.is_complete() => TraitSample::NEUTRAL,
            _ => self
                .traits
                .sample(SystemTime::now())
                .context("sample traits")?,
        };
        Ok(ResolvedTraits::merge(overrides, &sample))
    }
}
