// src/search/tavily.rs — Tavily web search client

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{SearchProvider, SearchResult};
use crate::infra::config::SearchConfig;
use crate::infra::errors::ReviserError;

const DEFAULT_BASE_URL: &str = "https://api.tavily.com";
pub const API_KEY_ENV: &str = "TAVILY_API_KEY";

pub struct TavilySearch {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
    max_results: u32,
    search_depth: String,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

impl TavilySearch {
    pub fn new(api_key: String) -> Result<Self, ReviserError> {
        Self::from_config(api_key, &SearchConfig::default())
    }

    pub fn from_config(api_key: String, config: &SearchConfig) -> Result<Self, ReviserError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ReviserError::Config(format!("Tavily HTTP client: {e}")))?;
        Ok(Self {
            api_key,
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            max_results: config.max_results,
            search_depth: config.search_depth.clone(),
        })
    }

    /// Build from `TAVILY_API_KEY`.
    pub fn from_env(config: &SearchConfig) -> Result<Self, ReviserError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(ReviserError::MissingApiKey(API_KEY_ENV))?;
        Self::from_config(key, config)
    }

    fn error(&self, query: &str, message: impl Into<String>) -> ReviserError {
        ReviserError::Search {
            provider: "tavily".into(),
            query: query.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    fn id(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ReviserError> {
        let body = serde_json::json!({
            "query": query,
            "max_results": self.max_results,
            "search_depth": self.search_depth,
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(query, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.error(query, format!("HTTP {}: {}", status, error_body)));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| self.error(query, format!("Failed to parse response: {}", e)))?;

        tracing::debug!(%query, hits = parsed.results.len(), "Tavily search done");
        Ok(parsed.results)
    }
}
