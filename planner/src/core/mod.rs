//! Deterministic, pure logic shared by the planner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests; the only
//! randomness in planning enters through an injected draw, never from here.

pub mod budget;
pub mod confidence;
pub mod contradictions;
pub mod success_rate;
pub mod types;
