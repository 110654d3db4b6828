// src/search/mod.rs — External lookup layer

pub mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::ReviserError;

/// Web search as seen by the augmentation stage.
///
/// Timeouts and retries are the implementation's business; the loop treats
/// every call as one blocking lookup.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ReviserError>;
}

/// One hit. Opaque to the engine beyond being serializable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchResult {
    /// A bare text result with no source, e.g. a tool's answer.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_result() {
        let r = SearchResult::text("42");
        assert_eq!(r.content, "42");
        assert!(r.url.is_empty());
        assert!(r.score.is_none());
    }

    #[test]
    fn test_parse_partial_result() {
        let r: SearchResult =
            serde_json::from_str(r#"{"url": "https://a.dev", "content": "x"}"#).unwrap();
        assert_eq!(r.url, "https://a.dev");
        assert!(r.title.is_empty());
    }

    #[test]
    fn test_score_omitted_when_absent() {
        let v = serde_json::to_value(SearchResult::text("x")).unwrap();
        assert!(v.get("score").is_none());
    }
}
