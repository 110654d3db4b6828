// src/core/policy.rs — Stopping policies
//
// A policy is a pure predicate over the ledger. It never sees or keeps any
// other state, so asking twice about the same history gives the same answer.

use serde_json::Value;

use super::artifact::{Artifact, Payload};
use super::driver::RunConfig;
use super::ledger::count_where;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Continue => write!(f, "continue"),
            Decision::Stop => write!(f, "stop"),
        }
    }
}

/// Decides whether the loop keeps going. Must be total: every ledger state,
/// the empty one included, gets an answer, and the empty one gets `Continue`.
pub trait StoppingPolicy: Send + Sync {
    fn decide(&self, history: &[Artifact], config: &RunConfig) -> Decision;

    fn describe(&self) -> String {
        "custom".into()
    }
}

impl<F> StoppingPolicy for F
where
    F: Fn(&[Artifact], &RunConfig) -> Decision + Send + Sync,
{
    fn decide(&self, history: &[Artifact], config: &RunConfig) -> Decision {
        if history.is_empty() {
            return Decision::Continue;
        }
        self(history, config)
    }
}

/// Stop once augmentation events exceed `config.max_iterations`.
///
/// The bound is on lookup cycles, not on raw ledger length.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentationBudget;

impl StoppingPolicy for AugmentationBudget {
    fn decide(&self, history: &[Artifact], config: &RunConfig) -> Decision {
        let lookups = count_where(history, Artifact::is_augmentation);
        if lookups > config.max_iterations {
            Decision::Stop
        } else {
            Decision::Continue
        }
    }

    fn describe(&self) -> String {
        "augmentation events > max_iterations".into()
    }
}

/// Stop when a numeric field of the latest artifact reaches `threshold`.
#[derive(Debug, Clone)]
pub struct FieldThreshold {
    pub field: String,
    pub threshold: f64,
}

impl FieldThreshold {
    pub fn new(field: impl Into<String>, threshold: f64) -> Self {
        Self {
            field: field.into(),
            threshold,
        }
    }
}

impl StoppingPolicy for FieldThreshold {
    fn decide(&self, history: &[Artifact], _config: &RunConfig) -> Decision {
        let value = history.last().and_then(|a| match &a.payload {
            Payload::State(map) => map.get(&self.field).and_then(Value::as_f64),
            _ => None,
        });
        match value {
            Some(v) if v >= self.threshold => Decision::Stop,
            _ => Decision::Continue,
        }
    }

    fn describe(&self) -> String {
        format!("{} >= {}", self.field, self.threshold)
    }
}

/// Stop once the history holds more than `limit` entries.
#[derive(Debug, Clone, Copy)]
pub struct HistoryLength {
    pub limit: usize,
}

impl StoppingPolicy for HistoryLength {
    fn decide(&self, history: &[Artifact], _config: &RunConfig) -> Decision {
        if history.len() > self.limit {
            Decision::Stop
        } else {
            Decision::Continue
        }
    }

    fn describe(&self) -> String {
        format!("history length > {}", self.limit)
    }
}

/// Stop when the latest entry is a draft that asks for no further lookups.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalAnswer;

impl StoppingPolicy for FinalAnswer {
    fn decide(&self, history: &[Artifact], _config: &RunConfig) -> Decision {
        match history.last().map(|a| &a.payload) {
            Some(p @ Payload::Draft(_)) if p.lookup_requests().is_empty() => Decision::Stop,
            _ => Decision::Continue,
        }
    }

    fn describe(&self) -> String {
        "draft without pending lookups".into()
    }
}
