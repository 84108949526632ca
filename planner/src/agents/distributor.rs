//! Round-robin subgoal assignment across collaborating agents.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::collaborators::{Agent, ConflictResolver};

/// A subgoal paired with the agent it was assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub subgoal: String,
    pub agent: String,
}

/// Result of distributing one subgoal list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Distribution {
    /// Approved assignments, in input order.
    pub assigned: Vec<Assignment>,
    /// Subgoals the resolver refused, with the agent they were offered to.
    pub rejected: Vec<Assignment>,
}

impl Distribution {
    /// Subgoals that survived assignment, in input order.
    pub fn subgoals(&self) -> Vec<String> {
        self.assigned
            .iter()
            .map(|assignment| assignment.subgoal.clone())
            .collect()
    }
}

/// Assigns subgoals to agents and consults the conflict resolver for each.
#[derive(Clone)]
pub struct Distributor {
    resolver: Arc<dyn ConflictResolver>,
}

impl Distributor {
    pub fn new(resolver: Arc<dyn ConflictResolver>) -> Self {
        Self { resolver }
    }

    /// Offer `subgoals[i]` to `agents[i % agents.len()]`.
    ///
    /// Returns `None` when there are no agents: distribution is skipped and the
    /// caller keeps every subgoal.
    pub fn assign(&self, subgoals: &[String], agents: &[Arc<dyn Agent>]) -> Option<Distribution> {
        if agents.is_empty() {
            return None;
        }
        let names: Vec<&str> = agents.iter().map(|agent| agent.name()).collect();
        info!(agents = ?names, "distributing subgoals");

        let mut distribution = Distribution::default();
        for (i, subgoal) in subgoals.iter().enumerate() {
            let agent = &agents[i % agents.len()];
            let assignment = Assignment {
                subgoal: subgoal.clone(),
                agent: agent.name().to_string(),
            };
            if self.resolver.resolve(subgoal, agent.as_ref()) {
                info!(subgoal = %subgoal, agent = agent.name(), "subgoal assigned");
                distribution.assigned.push(assignment);
            } else {
                warn!(subgoal = %subgoal, agent = agent.name(), "assignment conflict, dropping subgoal");
                distribution.rejected.push(assignment);
            }
        }
        Some(distribution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{ApproveAll, NamedAgent};
    use crate::test_support::{RejectAgent, agents};

    fn subgoals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_agents_skips_distribution() {
        let distributor = Distributor::new(Arc::new(ApproveAll));
        assert!(distributor.assign(&subgoals(&["a", "b"]), &[]).is_none());
    }

    #[test]
    fn round_robin_wraps_agents() {
        let distributor = Distributor::new(Arc::new(ApproveAll));
        let got = distributor
            .assign(&subgoals(&["a", "b", "c"]), &agents(&["x", "y"]))
            .expect("distribution");
        let owners: Vec<&str> = got.assigned.iter().map(|a| a.agent.as_str()).collect();
        assert_eq!(owners, vec!["x", "y", "x"]);
        assert_eq!(got.subgoals(), subgoals(&["a", "b", "c"]));
        assert!(got.rejected.is_empty());
    }

    #[test]
    fn rejected_assignments_are_dropped() {
        let distributor = Distributor::new(Arc::new(RejectAgent("y".to_string())));
        let agents: Vec<Arc<dyn Agent>> = vec![
            Arc::new(NamedAgent::new("x")),
            Arc::new(NamedAgent::new("y")),
        ];
        let got = distributor
            .assign(&subgoals(&["a", "b", "c", "d"]), &agents)
            .expect("distribution");
        assert_eq!(got.subgoals(), subgoals(&["a", "c"]));
        let dropped: Vec<&str> = got.rejected.iter().map(|a| a.subgoal.as_str()).collect();
        assert_eq!(dropped, vec!["b", "d"]);
    }
}
