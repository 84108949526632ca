//! Recursive goal-decomposition planner.
//!
//! A goal is matched against keyword patterns, each match is gated on a
//! confidence score biased by learned per-pattern success rates, and the
//! accepted subgoals are planned recursively on bounded worker pools until
//! they become atomic or hit the depth cap. The crate is split as:
//!
//! - **[`core`]**: Pure, deterministic logic (confidence, rate arithmetic,
//!   contradiction detection). No I/O.
//! - **[`io`]**: Side-effecting operations (config, success-rate file,
//!   `.planner/` scaffolding).
//! - **[`collaborators`]**: Interfaces to external services the planner calls
//!   through (safety, traits, recovery, conflict policy), with defaults.
//!
//! Orchestration lives in [`patterns`], [`agents`] and [`plan`].

pub mod agents;
pub mod collaborators;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod patterns;
pub mod plan;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
