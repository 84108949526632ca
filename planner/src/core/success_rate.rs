//! Success-rate arithmetic for decomposition patterns.

/// Rate assumed for a pattern with no recorded history.
pub const INITIAL_RATE: f64 = 1.0;
/// Lowest rate a pattern can decay to.
pub const MIN_RATE: f64 = 0.1;
/// Highest rate a pattern can reach.
pub const MAX_RATE: f64 = 1.0;
/// Step applied per recorded outcome.
pub const RATE_STEP: f64 = 0.05;

/// Clamp a rate into `[MIN_RATE, MAX_RATE]`. NaN is treated as unseen.
pub fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        return INITIAL_RATE;
    }
    rate.clamp(MIN_RATE, MAX_RATE)
}

/// Nudge `rate` up on success or down on failure, then clamp.
pub fn adjust_rate(rate: f64, success: bool) -> f64 {
    let delta = if success { RATE_STEP } else { -RATE_STEP };
    clamp_rate(clamp_rate(rate) + delta)
}
