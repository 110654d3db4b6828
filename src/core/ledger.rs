// src/core/ledger.rs — Append-only run history

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::artifact::{Artifact, Payload, Seq};
use crate::infra::errors::EngineError;

/// Ordered, append-only history of one run. Owned by a single driver.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<Artifact>,
    seen: HashSet<Seq>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded with the run's initial input at sequence 0.
    pub fn seeded(stage: impl Into<String>, payload: Payload) -> Self {
        let mut ledger = Self::new();
        ledger.entries.push(Artifact::new(0, stage, payload));
        ledger.seen.insert(0);
        ledger
    }

    /// Append to the end. Rejects a sequence index that is already present
    /// and leaves the ledger untouched in that case.
    pub fn append(&mut self, artifact: Artifact) -> Result<(), EngineError> {
        if self.seen.contains(&artifact.seq) {
            return Err(EngineError::InvalidArtifact { seq: artifact.seq });
        }
        self.seen.insert(artifact.seq);
        self.entries.push(artifact);
        Ok(())
    }

    /// Copy of the full history. Not live: later appends do not show up in it.
    pub fn snapshot(&self) -> Vec<Artifact> {
        self.entries.clone()
    }

    /// Borrowed view for stages and policies during a step.
    pub fn entries(&self) -> &[Artifact] {
        &self.entries
    }

    pub fn count_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Artifact) -> bool,
    {
        count_where(&self.entries, predicate)
    }

    /// Next free sequence index (one past the largest seen).
    pub fn next_seq(&self) -> Seq {
        self.seen.iter().max().map(|s| s + 1).unwrap_or(0)
    }

    pub fn last(&self) -> Option<&Artifact> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<Artifact> {
        self.entries
    }
}

/// Number of entries matching `predicate`. Pure.
pub fn count_where<F>(entries: &[Artifact], predicate: F) -> usize
where
    F: Fn(&Artifact) -> bool,
{
    entries.iter().filter(|a| predicate(a)).count()
}

/// How successive writes to one state field combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    /// Last write wins.
    #[default]
    Replace,
    /// Numeric sum of every write.
    Add,
    /// Array concatenation in write order.
    Concat,
}

impl Reducer {
    fn apply(self, current: Option<&Value>, update: &Value) -> Value {
        match (self, current) {
            (Reducer::Replace, _) | (_, None) => update.clone(),
            (Reducer::Add, Some(cur)) => add_numbers(cur, update),
            (Reducer::Concat, Some(Value::Array(cur))) => {
                let mut out = cur.clone();
                match update {
                    Value::Array(items) => out.extend(items.iter().cloned()),
                    other => out.push(other.clone()),
                }
                Value::Array(out)
            }
            (Reducer::Concat, Some(_)) => update.clone(),
        }
    }
}

fn add_numbers(a: &Value, b: &Value) -> Value {
    match (a.as_i64(), b.as_i64()) {
        (Some(x), Some(y)) => Value::from(x.saturating_add(y)),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Value::from(x + y),
            _ => b.clone(),
        },
    }
}

/// Per-field reducers. Fields without an entry use `Reducer::Replace`.
pub type StateReducers = BTreeMap<String, Reducer>;

/// Fold every `State` payload of `entries`, in order, into one state object.
pub fn fold_state(entries: &[Artifact], reducers: &StateReducers) -> Map<String, Value> {
    let mut state = Map::new();
    for artifact in entries {
        let Payload::State(update) = &artifact.payload else {
            continue;
        };
        for (field, value) in update {
            let reducer = reducers.get(field).copied().unwrap_or_default();
            let merged = reducer.apply(state.get(field), value);
            state.insert(field.clone(), merged);
        }
    }
    state
}

impl Ledger {
    pub fn fold_state(&self, reducers: &StateReducers) -> Map<String, Value> {
        fold_state(&self.entries, reducers)
    }
}
