//! Recursive goal planning with bounded parallel fan-out.
//!
//! Each `plan` call runs one level as:
//!
//! 1. safety gate on the goal (the only fatal outcome)
//! 2. depth and deadline checks, returning the goal atomic when exceeded
//! 3. decomposition, returning the goal atomic when nothing is accepted
//! 4. optional round-robin distribution across agents
//! 5. fan-out of the surviving subgoals to a fresh pool of at most
//!    `max_workers` threads; each worker gates its subgoal and recurses
//!    synchronously, so no worker ever waits on a task in its own pool
//! 6. merge of fragments in completion order, splicing in a recovery fragment
//!    for every failed task
//!
//! Completion order is nondeterministic. Callers comparing plans across runs
//! must compare them as sets.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::agents::decomposer::Decomposer;
use crate::agents::distributor::Distributor;
use crate::collaborators::{Agent, Collaborators, RecoveryReviewer, SafetyGate};
use crate::core::budget::deadline_exceeded;
use crate::core::types::{Diagnostic, PlanContext};
use crate::io::config::PlannerConfig;
use crate::patterns::PatternStore;

/// Errors surfaced to the caller of [`RecursivePlanner::plan`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The top-level goal failed the safety gate. Nothing was decomposed.
    #[error("unsafe goal rejected: '{goal}'")]
    UnsafeGoal { goal: String },
}

/// Parameters for one planning call.
#[derive(Clone)]
pub struct PlanRequest<'a> {
    pub goal: &'a str,
    pub context: &'a PlanContext,
    /// Depth of `goal` in the overall recursion (0 for a fresh call).
    pub depth: u32,
    /// Deepest level still decomposed; deeper goals are returned atomic.
    pub max_depth: u32,
    /// Collaborating agents. Empty skips distribution.
    pub agents: &'a [Arc<dyn Agent>],
    /// Overrides the configured deadline for this call.
    pub deadline: Option<Instant>,
}

impl<'a> PlanRequest<'a> {
    pub fn new(goal: &'a str, context: &'a PlanContext, max_depth: u32) -> Self {
        Self {
            goal,
            context,
            depth: 0,
            max_depth,
            agents: &[],
            deadline: None,
        }
    }

    pub fn at_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_agents(mut self, agents: &'a [Arc<dyn Agent>]) -> Self {
        self.agents = agents;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Merged plan plus everything that degraded along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub plan: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// What a single subgoal task produced.
enum TaskOutput {
    Planned(Vec<String>),
    /// Rejected by the safety gate; contributes nothing.
    Unsafe,
}

/// Task result carried back over the join channel. Errors are rendered messages.
type TaskResult = std::result::Result<TaskOutput, String>;

/// State shared by every level of one top-level `plan` call.
struct PlanRun<'a> {
    context: &'a PlanContext,
    max_depth: u32,
    agents: &'a [Arc<dyn Agent>],
    deadline: Option<Instant>,
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl PlanRun<'_> {
    fn record(&self, diagnostic: Diagnostic) {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Recursively expands goals into ordered plans.
pub struct RecursivePlanner {
    config: PlannerConfig,
    store: Arc<PatternStore>,
    decomposer: Decomposer,
    distributor: Distributor,
    safety: Arc<dyn SafetyGate>,
    recovery: Arc<dyn RecoveryReviewer>,
}

impl RecursivePlanner {
    pub fn new(
        config: PlannerConfig,
        store: Arc<PatternStore>,
        collaborators: Collaborators,
    ) -> Self {
        let decomposer = Decomposer::new(
            Arc::clone(&store),
            &collaborators,
            config.confidence_threshold,
        );
        Self {
            config,
            store,
            decomposer,
            distributor: Distributor::new(Arc::clone(&collaborators.resolver)),
            safety: collaborators.safety,
            recovery: collaborators.recovery,
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    /// Plan `goal` from depth 0 with the configured depth cap and no agents.
    pub fn plan_goal(&self, goal: &str, context: &PlanContext) -> Result<Vec<String>, PlanError> {
        let request = PlanRequest::new(goal, context, self.config.max_depth);
        self.plan(&request).map(|outcome| outcome.plan)
    }

    /// Plan the requested goal.
    ///
    /// Fails only when the goal itself is unsafe. Every other failure is
    /// recovered and reported in [`PlanOutcome::diagnostics`].
    #[instrument(skip_all, fields(goal = %request.goal, depth = request.depth, max_depth = request.max_depth))]
    pub fn plan(&self, request: &PlanRequest<'_>) -> Result<PlanOutcome, PlanError> {
        info!("planning goal");
        if !self.safety.is_safe(request.goal) {
            error!(goal = %request.goal, "goal rejected by safety gate");
            return Err(PlanError::UnsafeGoal {
                goal: request.goal.to_string(),
            });
        }

        let deadline = request.deadline.or_else(|| {
            self.config
                .deadline_secs
                .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)))
        });
        let run = PlanRun {
            context: request.context,
            max_depth: request.max_depth,
            agents: request.agents,
            deadline,
            diagnostics: Mutex::new(Vec::new()),
        };

        let plan = match self.expand(&run, request.goal, request.depth) {
            Ok(plan) => plan,
            Err(err) => self.recover(&run, request.goal, &format!("{err:#}")),
        };
        info!(steps = plan.len(), "plan complete");
        Ok(PlanOutcome {
            plan,
            diagnostics: run.into_diagnostics(),
        })
    }

    /// Expand an already-gated goal at `depth`.
    fn expand(&self, run: &PlanRun<'_>, goal: &str, depth: u32) -> Result<Vec<String>> {
        if depth > run.max_depth {
            warn!(goal, depth, "max recursion depth reached, returning atomic goal");
            run.record(Diagnostic::DepthLimit {
                goal: goal.to_string(),
                depth,
            });
            return Ok(vec![goal.to_string()]);
        }
        if deadline_exceeded(run.deadline) {
            warn!(goal, depth, "planning deadline passed, returning atomic goal");
            run.record(Diagnostic::DeadlineExceeded {
                goal: goal.to_string(),
                depth,
            });
            return Ok(vec![goal.to_string()]);
        }

        let decomposition = self
            .decomposer
            .decompose(goal, run.context, self.config.prioritize)?;
        if !decomposition.contradictions.is_empty() {
            run.record(Diagnostic::Contradiction {
                goal: goal.to_string(),
                subgoals: decomposition.contradictions.clone(),
            });
        }
        if decomposition.is_empty() {
            debug!(goal, depth, "no subgoals, goal is atomic");
            run.record(Diagnostic::Atomic {
                goal: goal.to_string(),
                depth,
            });
            return Ok(vec![goal.to_string()]);
        }

        let mut subgoals = decomposition.subgoals.clone();
        if let Some(distribution) = self.distributor.assign(&subgoals, run.agents) {
            for rejected in &distribution.rejected {
                run.record(Diagnostic::ConflictRejected {
                    subgoal: rejected.subgoal.clone(),
                    agent: rejected.agent.clone(),
                });
            }
            subgoals = distribution.subgoals();
        }

        let mut plan = Vec::new();
        let mut all_succeeded = true;
        for (subgoal, result) in self.fan_out(run, subgoals, depth) {
            match result {
                Ok(TaskOutput::Planned(fragment)) => plan.extend(fragment),
                Ok(TaskOutput::Unsafe) => all_succeeded = false,
                Err(message) => {
                    all_succeeded = false;
                    plan.extend(self.recover(run, &subgoal, &message));
                }
            }
        }

        if self.config.learn_from_outcomes {
            for key in decomposition.accepted_keys() {
                self.store.update_success_rate(key, all_succeeded);
            }
        }
        debug!(goal, depth, steps = plan.len(), "level merged");
        Ok(plan)
    }

    /// Plan `subgoals` on a fresh bounded pool and return results as they complete.
    fn fan_out(
        &self,
        run: &PlanRun<'_>,
        subgoals: Vec<String>,
        depth: u32,
    ) -> Vec<(String, TaskResult)> {
        if subgoals.is_empty() {
            return Vec::new();
        }
        let workers = self.config.max_workers.clamp(1, subgoals.len());
        debug!(tasks = subgoals.len(), workers, depth, "fanning out subgoals");

        let queue = Mutex::new(VecDeque::from(subgoals));
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    while let Some(subgoal) = next_task(queue) {
                        let result = panic::catch_unwind(AssertUnwindSafe(|| {
                            self.plan_subgoal(run, &subgoal, depth)
                        }))
                        .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));
                        if tx.send((subgoal, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);
            rx.into_iter().collect()
        })
    }

    fn plan_subgoal(&self, run: &PlanRun<'_>, subgoal: &str, depth: u32) -> TaskResult {
        if !self.safety.is_safe(subgoal) {
            warn!(subgoal, "subgoal failed safety gate, skipping");
            run.record(Diagnostic::UnsafeSubgoal {
                subgoal: subgoal.to_string(),
                depth: depth + 1,
            });
            return Ok(TaskOutput::Unsafe);
        }
        self.expand(run, subgoal, depth + 1)
            .map(TaskOutput::Planned)
            .map_err(|err| format!("{err:#}"))
    }

    fn recover(&self, run: &PlanRun<'_>, subgoal: &str, message: &str) -> Vec<String> {
        error!(subgoal, error = message, "planning failed, invoking recovery");
        let recovery = self.recovery.review(message);
        run.record(Diagnostic::SubgoalFailure {
            subgoal: subgoal.to_string(),
            error: message.to_string(),
            recovery: recovery.clone(),
        });
        recovery
    }
}

fn next_task(queue: &Mutex<VecDeque<String>>) -> Option<String> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("subgoal task panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("subgoal task panicked: {message}")
    } else {
        "subgoal task panicked".to_string()
    }
}
