//! Shared deterministic types for planner core logic.
//!
//! These types define stable contracts between the decomposer, the distributor
//! and the recursive planner. They carry no I/O and serialize to stable JSON so
//! the CLI can emit them verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied planning context, read-only for the duration of a plan call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanContext {
    /// Multiplier applied to every pattern confidence (defaults to `1.0`).
    pub weight_modifier: Option<f64>,
    /// Trait overrides. Missing fields fall back to the trait provider.
    pub traits: Option<ContextTraits>,
    /// Persona routing vectors. Carried through untouched for routing collaborators.
    pub vectors: Map<String, Value>,
    /// Any other caller keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlanContext {
    pub fn weight(&self) -> f64 {
        self.weight_modifier.unwrap_or(1.0)
    }
}

/// Per-field trait overrides supplied through [`PlanContext::traits`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextTraits {
    #[serde(alias = "gamma_creativity")]
    pub creativity: Option<f64>,
    #[serde(alias = "lambda_linguistics")]
    pub linguistics: Option<f64>,
    #[serde(alias = "chi_culturevolution")]
    pub culture: Option<f64>,
    #[serde(alias = "phi_scalar")]
    pub phi: Option<f64>,
    pub alpha_attention: Option<f64>,
}

impl ContextTraits {
    /// True when every provider-backed field is overridden.
    pub fn is_complete(&self) -> bool {
        self.creativity.is_some()
            && self.linguistics.is_some()
            && self.culture.is_some()
            && self.phi.is_some()
    }
}

/// A full trait reading, as produced by a trait provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraitSample {
    pub creativity: f64,
    pub linguistics: f64,
    pub culture: f64,
    pub phi: f64,
    pub attention: f64,
}

impl TraitSample {
    /// Trait values that leave confidence unchanged: zero bias, centred phi.
    pub const NEUTRAL: TraitSample = TraitSample {
        creativity: 0.0,
        linguistics: 0.0,
        culture: 0.0,
        phi: 0.5,
        attention: 0.5,
    };
}

/// Outcome of scoring one matched pattern during decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDecision {
    pub key: String,
    pub confidence: f64,
    pub accepted: bool,
}

/// Non-fatal events recorded while planning.
///
/// Every failure other than an unsafe top-level goal degrades into one of these
/// and the plan carries on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Goal reached beyond `max_depth` and was kept atomic.
    DepthLimit { goal: String, depth: u32 },
    /// No pattern was accepted for the goal; it is a leaf.
    Atomic { goal: String, depth: u32 },
    /// The same subgoal was produced more than once by accepted patterns.
    Contradiction { goal: String, subgoals: Vec<String> },
    /// The conflict resolver refused the round-robin assignment.
    ConflictRejected { subgoal: String, agent: String },
    /// The safety gate rejected a subgoal, which was dropped.
    UnsafeSubgoal { subgoal: String, depth: u32 },
    /// Planning a subgoal failed and the recovery fragment was spliced in.
    SubgoalFailure {
        subgoal: String,
        error: String,
        recovery: Vec<String>,
    },
    /// The planning deadline passed before the goal was expanded.
    DeadlineExceeded { goal: String, depth: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_accepts_long_trait_names() {
        let raw = r#"{
            "weight_modifier": 1.5,
            "traits": {"gamma_creativity": 0.2, "phi_scalar": 0.9},
            "user": "ada"
        }"#;
        let ctx: PlanContext = serde_json::from_str(raw).expect("parse");
        let traits = ctx.traits.expect("traits");
        assert_eq!(traits.creativity, Some(0.2));
        assert_eq!(traits.phi, Some(0.9));
        assert!(traits.linguistics.is_none());
        assert!(!traits.is_complete());
        assert_eq!(ctx.weight(), 1.5);
        assert_eq!(ctx.extra.get("user"), Some(&Value::from("ada")));
    }

    #[test]
    fn empty_context_has_unit_weight() {
        let ctx: PlanContext = serde_json::from_str("{}").expect("parse");
        assert_eq!(ctx, PlanContext::default());
        assert_eq!(ctx.weight(), 1.0);
    }

    #[test]
    fn diagnostics_serialize_with_kind_tag() {
        let diag = Diagnostic::UnsafeSubgoal {
            subgoal: "x".to_string(),
            depth: 2,
        };
        let json = serde_json::to_value(&diag).expect("serialize");
        assert_eq!(json["kind"], "unsafe_subgoal");
        assert_eq!(json["depth"], 2);
    }
}
