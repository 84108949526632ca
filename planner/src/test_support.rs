//! Test-only collaborators with scripted or observable behavior.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};

use crate::collaborators::{
    Agent, AmbiguitySignal, ConflictResolver, NamedAgent, RecoveryReviewer, SafetyGate,
    TraitProvider,
};
use crate::core::types::TraitSample;

/// Build shared agents from names.
pub fn agents(names: &[&str]) -> Vec<Arc<dyn Agent>> {
    names
        .iter()
        .map(|name| Arc::new(NamedAgent::new(*name)) as Arc<dyn Agent>)
        .collect()
}

/// Neutral trait provider that counts how often it was sampled.
#[derive(Clone, Default)]
pub struct CountingTraits {
    calls: Arc<AtomicUsize>,
}

impl CountingTraits {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TraitProvider for CountingTraits {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TraitSample::NEUTRAL)
    }
}

/// Trait provider that always fails.
pub struct FailingTraits;

impl TraitProvider for FailingTraits {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        Err(anyhow!("traits unavailable"))
    }
}

/// Succeeds for the first `ok_calls` samples, then fails.
pub struct TraitsFailAfter {
    ok_calls: usize,
    calls: AtomicUsize,
}

impl TraitsFailAfter {
    pub fn new(ok_calls: usize) -> Self {
        Self {
            ok_calls,
            calls: AtomicUsize::new(0),
        }
    }
}

impl TraitProvider for TraitsFailAfter {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.ok_calls {
            Ok(TraitSample::NEUTRAL)
        } else {
            Err(anyhow!("traits unavailable"))
        }
    }
}

/// Neutral trait provider that sleeps and tracks peak concurrent callers.
#[derive(Clone)]
pub struct GaugeTraits {
    delay: Duration,
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl GaugeTraits {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl TraitProvider for GaugeTraits {
    fn sample(&self, _at: SystemTime) -> Result<TraitSample> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(TraitSample::NEUTRAL)
    }
}

/// Safety gate that panics on one exact goal and passes everything else.
pub struct PanicOn(pub String);

impl SafetyGate for PanicOn {
    fn is_safe(&self, goal: &str) -> bool {
        if goal == self.0 {
            panic!("safety gate crashed on '{goal}'");
        }
        true
    }
}

/// Records every error it reviews and answers with numbered fallback steps.
#[derive(Clone, Default)]
pub struct RecordingRecovery {
    errors: Arc<Mutex<Vec<String>>>,
}

impl RecordingRecovery {
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RecoveryReviewer for RecordingRecovery {
    fn review(&self, error: &str) -> Vec<String> {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors.push(error.to_string());
        vec![format!("fallback #{}", errors.len())]
    }
}

/// Vetoes every assignment to the named agent.
pub struct RejectAgent(pub String);

impl ConflictResolver for RejectAgent {
    fn resolve(&self, _subgoal: &str, agent: &dyn Agent) -> bool {
        agent.name() != self.0
    }
}

/// Records goals reported as ambiguous.
#[derive(Clone, Default)]
pub struct CountingAmbiguity {
    goals: Arc<Mutex<Vec<String>>>,
}

impl CountingAmbiguity {
    pub fn goals(&self) -> Vec<String> {
        self.goals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AmbiguitySignal for CountingAmbiguity {
    fn ambiguous(&self, goal: &str) {
        self.goals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(goal.to_string());
    }
}
