// src/core/stage.rs — Pluggable stage functions

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;

use super::artifact::{Artifact, Augmentation, LookupRequest, LookupResult, Payload};
use crate::infra::errors::ReviserError;
use crate::search::{SearchProvider, SearchResult};

/// What one stage invocation adds to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput {
    /// Nothing to add. Not an error.
    Nothing,
    One(Payload),
    /// Several entries, appended in the given order.
    Batch(Vec<Payload>),
}

impl StageOutput {
    pub fn into_payloads(self) -> Vec<Payload> {
        match self {
            StageOutput::Nothing => Vec::new(),
            StageOutput::One(p) => vec![p],
            StageOutput::Batch(ps) => ps,
        }
    }
}

/// A transform from the current history to zero or more new entries.
///
/// Stages only see the history; they never get to touch past entries.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError>;
}

/// Adapter turning a plain synchronous function into a stage.
pub struct FnStage<F> {
    name: String,
    f: F,
}

impl<F> FnStage<F>
where
    F: Fn(&[Artifact]) -> Result<StageOutput, ReviserError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> Stage for FnStage<F>
where
    F: Fn(&[Artifact]) -> Result<StageOutput, ReviserError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        (self.f)(history)
    }
}

/// Resolves the lookups embedded in the latest entry.
///
/// One `Augment` entry per batch; results keep the order the queries were
/// listed in even when they are fetched concurrently. A latest entry with no
/// lookups yields `StageOutput::Nothing`.
pub struct AugmentStage {
    name: String,
    search: Arc<dyn SearchProvider>,
    parallel: bool,
}

impl AugmentStage {
    pub fn new(name: impl Into<String>, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            name: name.into(),
            search,
            parallel: false,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    async fn resolve(&self, request: &LookupRequest) -> Result<LookupResult, ReviserError> {
        let results = match request {
            LookupRequest::Search { query } => {
                tracing::debug!(provider = self.search.id(), %query, "Searching");
                self.search.search(query).await?
            }
            LookupRequest::Clock { format } => vec![SearchResult::text(system_time(format)?)],
        };
        Ok(LookupResult {
            request: request.clone(),
            results,
        })
    }
}

#[async_trait]
impl Stage for AugmentStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let Some(latest) = history.last() else {
            return Ok(StageOutput::Nothing);
        };
        let requests = latest.payload.lookup_requests();
        if requests.is_empty() {
            tracing::debug!(stage = %self.name, seq = latest.seq, "No lookups requested");
            return Ok(StageOutput::Nothing);
        }

        let results = if self.parallel {
            try_join_all(requests.iter().map(|r| self.resolve(r))).await?
        } else {
            let mut out = Vec::with_capacity(requests.len());
            for r in requests {
                out.push(self.resolve(r).await?);
            }
            out
        };

        tracing::info!(
            stage = %self.name,
            lookups = results.len(),
            "Augmentation batch complete",
        );

        Ok(StageOutput::One(Payload::Augment(Augmentation {
            call_id: latest.payload.call_id().map(str::to_string),
            results,
        })))
    }
}

/// Current local time formatted with a strftime-style pattern.
pub fn system_time(format: &str) -> Result<String, ReviserError> {
    let now = chrono::Local::now();
    let mut out = String::new();
    write!(out, "{}", now.format(format)).map_err(|_| ReviserError::Tool {
        tool: "get_system_time".into(),
        message: format!("invalid time format '{format}'"),
    })?;
    Ok(out)
}
