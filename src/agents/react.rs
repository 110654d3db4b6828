// src/agents/react.rs — ReAct agent: reason, call a tool, observe, repeat

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use super::chain::ModelChain;
use super::prompts;
use super::schema;
use super::transcript::to_messages;
use crate::core::{
    Answer, Artifact, AugmentStage, Draft, FinalAnswer, LoopDriver, Payload, RunConfig, Stage,
    StageOutput,
};
use crate::infra::config::{Config, ModelConfig};
use crate::infra::errors::{EngineError, ReviserError};
use crate::provider::{ChatResponse, ModelProvider, ToolDef};
use crate::search::SearchProvider;

pub const REASON: &str = "reason";
pub const TOOLS: &str = "tools";

pub fn tools() -> Vec<ToolDef> {
    vec![schema::web_search_tool(), schema::system_time_tool()]
}

pub struct ReasonStage {
    provider: Arc<dyn ModelProvider>,
    config: ModelConfig,
}

impl ReasonStage {
    pub fn new(provider: Arc<dyn ModelProvider>, config: &ModelConfig) -> Self {
        Self {
            provider,
            config: config.clone(),
        }
    }

    fn chain(&self) -> Result<ModelChain, ReviserError> {
        let tools = tools();
        let system = prompts::react_prompt(&tools, Local::now())?;
        Ok(tools
            .into_iter()
            .fold(ModelChain::new(self.provider.clone(), &self.config, system), |c, t| {
                c.with_tool(t)
            }))
    }
}

/// One action per step: the first tool call wins, a reply without one is final.
fn step_from(response: ChatResponse) -> Result<Draft, ReviserError> {
    if let Some(call) = response.tool_calls.first() {
        if response.tool_calls.len() > 1 {
            tracing::debug!(
                dropped = response.tool_calls.len() - 1,
                "Keeping only the first tool call"
            );
        }
        let request = schema::lookup_from_call(call)?;
        return Ok(Draft {
            call_id: Some(call.id.clone()),
            tool: Some(call.name.clone()),
            answer: Answer::plain(response.content.clone()),
            requests: vec![request],
        });
    }
    if response.content.trim().is_empty() {
        return Err(ReviserError::MalformedResponse(
            "model returned neither an answer nor a tool call".into(),
        ));
    }
    Ok(Draft::text(response.content))
}

#[async_trait]
impl Stage for ReasonStage {
    fn name(&self) -> &str {
        REASON
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let response = self.chain()?.invoke(to_messages(history)).await?;
        let draft = step_from(response)?;
        match draft.requests.first() {
            Some(request) => tracing::info!(%request, "Action"),
            None => tracing::info!("Final answer"),
        }
        Ok(StageOutput::One(Payload::Draft(draft)))
    }
}

/// reason → tools → reason …, stopping on the first reply that calls no tool.
pub fn build(
    provider: Arc<dyn ModelProvider>,
    search: Arc<dyn SearchProvider>,
    config: &Config,
    question: &str,
) -> Result<LoopDriver, EngineError> {
    let stages = [REASON, TOOLS];
    let cap = config
        .engine
        .hard_cap
        .unwrap_or((config.engine.recursion_limit / stages.len()).max(1));
    let run = RunConfig::new(stages, Payload::input(question))
        .check_after(REASON)
        .with_hard_cap(cap);

    LoopDriver::builder(run)
        .stage(ReasonStage::new(provider, &config.model))
        .stage(AugmentStage::new(TOOLS, search))
        .policy(FinalAnswer)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LookupRequest;
    use crate::provider::{StopReason, TokenUsage, ToolCall};
    use serde_json::json;

    fn response(content: &str, calls: Vec<ToolCall>) -> ChatResponse {
        ChatResponse {
            content: content.into(),
            tool_calls: calls,
            usage: TokenUsage::default(),
            stop_reason: StopReason::Unknown,
        }
    }

    fn call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: name.into(),
            arguments: args,
        }
    }

    #[test]
    fn test_tool_call_becomes_action() {
        let draft = step_from(response(
            "Thought: I need the date",
            vec![
                call("c1", schema::SYSTEM_TIME, json!({})),
                call("c2", schema::WEB_SEARCH, json!({"query": "x"})),
            ],
        ))
        .unwrap();
        assert_eq!(draft.call_id.as_deref(), Some("c1"));
        assert_eq!(
            draft.requests,
            vec![LookupRequest::Clock {
                format: schema::DEFAULT_TIME_FORMAT.into()
            }]
        );
    }

    #[test]
    fn test_plain_reply_is_final() {
        let draft = step_from(response("The last launch was 3 days ago.", vec![])).unwrap();
        assert!(draft.requests.is_empty());
        assert!(draft.call_id.is_none());
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        assert!(step_from(response(" ", vec![])).is_err());
    }

    #[test]
    fn test_unknown_tool_is_rejected() {
        let err = step_from(response("", vec![call("c", "shell", json!({}))])).unwrap_err();
        assert!(matches!(err, ReviserError::Tool { .. }));
    }
}
