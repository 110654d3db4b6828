// src/agents/reflection.rs — Basic reflection: generate, critique, regenerate

use std::sync::Arc;

use async_trait::async_trait;

use super::chain::ModelChain;
use super::prompts;
use super::transcript::to_messages;
use crate::core::{
    Artifact, Critique, Draft, HistoryLength, LoopDriver, Payload, RunConfig, Stage, StageOutput,
};
use crate::infra::config::Config;
use crate::infra::errors::{EngineError, ReviserError};
use crate::provider::ModelProvider;
use crate::util::preview;

pub const GENERATE: &str = "generate";
pub const REFLECT: &str = "reflect";

pub struct GenerateStage {
    chain: ModelChain,
}

impl GenerateStage {
    pub fn new(chain: ModelChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Stage for GenerateStage {
    fn name(&self) -> &str {
        GENERATE
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let response = self.chain.invoke(to_messages(history)).await?;
        tracing::info!(post = %preview(&response.content, 60), "Post generated");
        Ok(StageOutput::One(Payload::Draft(Draft::text(response.content))))
    }
}

/// Grades the latest post. The critique is fed back as a user turn.
pub struct ReflectStage {
    chain: ModelChain,
}

impl ReflectStage {
    pub fn new(chain: ModelChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl Stage for ReflectStage {
    fn name(&self) -> &str {
        REFLECT
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let response = self.chain.invoke(to_messages(history)).await?;
        if response.content.trim().is_empty() {
            return Err(ReviserError::MalformedResponse(
                "reflection came back empty".into(),
            ));
        }
        tracing::info!(critique = %preview(&response.content, 60), "Critique ready");
        Ok(StageOutput::One(Payload::Critique(Critique {
            notes: response.content,
            revision: None,
        })))
    }
}

/// generate → reflect → generate …, checked after each generate.
pub fn build(
    provider: Arc<dyn ModelProvider>,
    config: &Config,
    topic: &str,
) -> Result<LoopDriver, EngineError> {
    let generate = ModelChain::new(provider.clone(), &config.model, prompts::GENERATION);
    let reflect = ModelChain::new(provider, &config.model, prompts::REFLECTION);

    let stages = [GENERATE, REFLECT];
    let cap = config
        .engine
        .hard_cap
        .unwrap_or((config.engine.recursion_limit / stages.len()).max(1));
    let run = RunConfig::new(stages, Payload::input(topic))
        .check_after(GENERATE)
        .with_hard_cap(cap);

    LoopDriver::builder(run)
        .stage(GenerateStage::new(generate))
        .stage(ReflectStage::new(reflect))
        .policy(HistoryLength {
            limit: config.engine.history_limit,
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl ModelProvider for Silent {
        fn id(&self) -> &str {
            "silent"
        }
        fn name(&self) -> &str {
            "Silent"
        }
        async fn chat(
            &self,
            _req: crate::provider::ChatRequest,
        ) -> Result<crate::provider::ChatResponse, ReviserError> {
            Ok(crate::provider::ChatResponse {
                content: "  ".into(),
                tool_calls: vec![],
                usage: Default::default(),
                stop_reason: Default::default(),
            })
        }
    }

    #[test]
    fn test_build_wiring() {
        let driver = build(Arc::new(Silent), &Config::default(), "AI agents").unwrap();
        let cfg = driver.config();
        assert_eq!(cfg.stages, vec![GENERATE, REFLECT]);
        assert_eq!(cfg.check_after.as_deref(), Some(GENERATE));
        assert_eq!(cfg.pass_cap(), 12);
    }

    #[tokio::test]
    async fn test_empty_reflection_is_an_error() {
        let stage = ReflectStage::new(ModelChain::new(
            Arc::new(Silent),
            &Config::default().model,
            prompts::REFLECTION,
        ));
        let history = [Artifact::new(0, "input", Payload::input("x"))];
        assert!(matches!(
            stage.run(&history).await,
            Err(ReviserError::MalformedResponse(_))
        ));
    }
}
