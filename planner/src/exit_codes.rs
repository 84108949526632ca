//! Stable exit codes for planner CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed due to invalid config, state or arguments.
pub const INVALID: i32 = 1;
/// `planner plan` rejected the goal at the safety gate.
pub const UNSAFE: i32 = 2;
