//! Shared time budget helpers for cooperative planning deadlines.

use std::time::{Duration, Instant};

/// Return the remaining time budget until the provided deadline, if any is left.
pub fn remaining_budget(deadline: Instant) -> Option<Duration> {
    let remaining = deadline
        .checked_duration_since(Instant::now())
        .unwrap_or(Duration::from_secs(0));
    if remaining.is_zero() {
        return None;
    }
    Some(remaining)
}

/// True when a deadline is set and has already passed.
pub fn deadline_exceeded(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| remaining_budget(deadline).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_deadline_never_expires() {
        assert!(!deadline_exceeded(None));
    }

    #[test]
    fn past_deadline_is_exceeded() {
        let past = Instant::now() - Duration::from_millis(5);
        assert!(remaining_budget(past).is_none());
        assert!(deadline_exceeded(Some(past)));
    }

    #[test]
    fn future_deadline_has_budget() {
        let future = Instant::now() + Duration::from_secs(60);
        assert!(remaining_budget(future).is_some());
        assert!(!deadline_exceeded(Some(future)));
    }
}
