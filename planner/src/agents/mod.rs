//! Decomposition and assignment stages used by the recursive planner.

pub mod decomposer;
pub mod distributor;
