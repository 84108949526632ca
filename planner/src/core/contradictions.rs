//! Duplicate detection and prioritization over subgoal lists.

use std::collections::{BTreeMap, BTreeSet};

/// Return every subgoal occurring more than once, sorted.
///
/// Detection is by exact string identity. The input is not modified.
pub fn detect_contradictions(subgoals: &[String]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for subgoal in subgoals {
        *counts.entry(subgoal.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(subgoal, _)| subgoal.to_string())
        .collect()
}

/// Deduplicate and sort lexicographically.
///
/// Discards duplicate counts and the original order.
pub fn prioritize(subgoals: &[String]) -> Vec<String> {
    subgoals
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reports_each_duplicate_once() {
        let subgoals = strings(&["b", "a", "b", "c", "b", "a"]);
        assert_eq!(detect_contradictions(&subgoals), strings(&["a", "b"]));
    }

    #[test]
    fn unique_input_has_no_contradictions() {
        assert!(detect_contradictions(&strings(&["x", "y"])).is_empty());
        assert!(detect_contradictions(&[]).is_empty());
    }

    #[test]
    fn prioritize_sorts_and_dedups() {
        let subgoals = strings(&["test components", "design", "test components"]);
        assert_eq!(
            prioritize(&subgoals),
            strings(&["design", "test components"])
        );
    }
}
