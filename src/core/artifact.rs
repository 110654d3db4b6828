// src/core/artifact.rs — Ledger entries and their payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::search::SearchResult;

/// Position of an artifact in its ledger. Unique per run.
pub type Seq = u64;

/// One immutable unit of produced content in a run's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub seq: Seq,
    /// Name of the stage that produced it ("input" for the seed).
    pub stage: String,
    pub created_at: DateTime<Utc>,
    pub payload: Payload,
}

impl Artifact {
    pub fn new(seq: Seq, stage: impl Into<String>, payload: Payload) -> Self {
        Self {
            seq,
            stage: stage.into(),
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.payload.kind()
    }

    /// True for entries produced by an external-lookup stage.
    pub fn is_augmentation(&self) -> bool {
        matches!(self.payload, Payload::Augment(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Input,
    Draft,
    Augment,
    Critique,
    State,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Input => "input",
            ArtifactKind::Draft => "draft",
            ArtifactKind::Augment => "augment",
            ArtifactKind::Critique => "critique",
            ArtifactKind::State => "state",
        };
        f.write_str(s)
    }
}

/// What a stage produced. Stages and policies branch on this with `match`,
/// never on stage or tool names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
    Input { text: String },
    Draft(Draft),
    Augment(Augmentation),
    Critique(Critique),
    State(Map<String, Value>),
}

impl Payload {
    pub fn input(text: impl Into<String>) -> Self {
        Payload::Input { text: text.into() }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            Payload::Input { .. } => ArtifactKind::Input,
            Payload::Draft(_) => ArtifactKind::Draft,
            Payload::Augment(_) => ArtifactKind::Augment,
            Payload::Critique(_) => ArtifactKind::Critique,
            Payload::State(_) => ArtifactKind::State,
        }
    }

    /// Lookups this payload asks the next augmentation stage to perform.
    pub fn lookup_requests(&self) -> &[LookupRequest] {
        match self {
            Payload::Draft(d) => &d.requests,
            Payload::Critique(Critique {
                revision: Some(d), ..
            }) => &d.requests,
            _ => &[],
        }
    }

    /// Tool-call id the lookups answer, when the model issued them as a call.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Payload::Draft(d) => d.call_id.as_deref(),
            Payload::Critique(Critique {
                revision: Some(d), ..
            }) => d.call_id.as_deref(),
            _ => None,
        }
    }

    /// Most readable text form, used for transcripts and previews.
    pub fn text(&self) -> String {
        match self {
            Payload::Input { text } => text.clone(),
            Payload::Draft(d) => d.answer.answer.clone(),
            Payload::Augment(a) => a
                .results
                .iter()
                .map(|r| format!("{}: {} result(s)", r.request, r.results.len()))
                .collect::<Vec<_>>()
                .join("; "),
            Payload::Critique(c) => match &c.revision {
                Some(d) => d.answer.answer.clone(),
                None => c.notes.clone(),
            },
            Payload::State(map) => Value::Object(map.clone()).to_string(),
        }
    }
}

/// A candidate answer plus the lookups it wants done before revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub call_id: Option<String>,
    /// Tool the model answered through, when it answered with a call.
    #[serde(default)]
    pub tool: Option<String>,
    pub answer: Answer,
    #[serde(default)]
    pub requests: Vec<LookupRequest>,
}

impl Draft {
    pub fn text(answer: impl Into<String>) -> Self {
        Self {
            call_id: None,
            tool: None,
            answer: Answer::plain(answer),
            requests: Vec::new(),
        }
    }
}

/// Structured answer as the model fills it in through a forced tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub reflection: Option<Reflection>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl Answer {
    pub fn plain(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            ..Default::default()
        }
    }

    /// One search request per query, in the order the model listed them.
    pub fn search_requests(&self) -> Vec<LookupRequest> {
        self.search_queries
            .iter()
            .filter(|q| !q.trim().is_empty())
            .map(|q| LookupRequest::Search { query: q.clone() })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub missing: String,
    pub superfluous: String,
}

/// Critique of the previous draft, optionally carrying the revised draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub notes: String,
    pub revision: Option<Draft>,
}

/// A lookup embedded in a draft, resolved by the augmentation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum LookupRequest {
    Search { query: String },
    Clock { format: String },
}

impl std::fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupRequest::Search { query } => write!(f, "search({query:?})"),
            LookupRequest::Clock { format } => write!(f, "clock({format:?})"),
        }
    }
}

/// One augmentation batch: every lookup of the triggering draft, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Augmentation {
    pub call_id: Option<String>,
    pub results: Vec<LookupResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub request: LookupRequest,
    pub results: Vec<SearchResult>,
}

impl Augmentation {
    /// Query → results object, the shape fed back to the model as a tool message.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for r in &self.results {
            let key = match &r.request {
                LookupRequest::Search { query } => query.clone(),
                LookupRequest::Clock { format } => format!("clock {format}"),
            };
            out.insert(key, serde_json::json!(r.results));
        }
        Value::Object(out)
    }
}
