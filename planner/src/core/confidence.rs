//! Pattern acceptance confidence.
//!
//! `confidence = base * success_rate * trait_bias * curvature * weight * attention`
//!
//! The base draw is the only stochastic input; everything else is a pure
//! function of persisted history and the planning context.

use crate::core::types::{ContextTraits, TraitSample};

/// Default acceptance threshold for a pattern.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Attention weight used when the context does not supply `alpha_attention`.
pub const DEFAULT_ALPHA_ATTENTION: f64 = 0.5;

/// Lower and upper bound of the base random draw.
pub const BASE_DRAW_RANGE: (f64, f64) = (0.5, 1.0);

/// Trait values after merging context overrides with the provider sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTraits {
    pub creativity: f64,
    pub linguistics: f64,
    pub culture: f64,
    pub phi: f64,
    pub alpha_attention: f64,
}

impl ResolvedTraits {
    /// Merge context overrides over a provider sample, field by field.
    ///
    /// `alpha_attention` is taken from the context only; the provider's
    /// attention reading does not feed the formula.
    pub fn merge(overrides: Option<&ContextTraits>, sample: &TraitSample) -> Self {
        let overrides = overrides.copied().unwrap_or_default();
        Self {
            creativity: overrides.creativity.unwrap_or(sample.creativity),
            linguistics: overrides.linguistics.unwrap_or(sample.linguistics),
            culture: overrides.culture.unwrap_or(sample.culture),
            phi: overrides.phi.unwrap_or(sample.phi),
            alpha_attention: overrides
                .alpha_attention
                .unwrap_or(DEFAULT_ALPHA_ATTENTION),
        }
    }

    pub fn trait_bias(&self) -> f64 {
        1.0 + self.creativity + self.culture + 0.5 * self.linguistics
    }

    pub fn curvature(&self) -> f64 {
        1.0 + (self.phi - 0.5).abs()
    }

    pub fn attention_factor(&self) -> f64 {
        0.8 + 0.4 * self.alpha_attention
    }
}

/// Clamp a base draw into [`BASE_DRAW_RANGE`].
pub fn clamp_base(base: f64) -> f64 {
    let (lo, hi) = BASE_DRAW_RANGE;
    if base.is_nan() {
        return lo;
    }
    base.clamp(lo, hi)
}

/// Compute the acceptance confidence for one matched pattern.
pub fn pattern_confidence(
    base: f64,
    success_rate: f64,
    traits: &ResolvedTraits,
    context_weight: f64,
) -> f64 {
    clamp_base(base)
        * success_rate
        * traits.trait_bias()
        * traits.curvature()
        * context_weight
        * traits.attention_factor()
}
