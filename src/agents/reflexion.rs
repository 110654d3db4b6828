// src/agents/reflexion.rs — Reflexion: draft, search, revise until the lookup budget runs out

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;

use super::chain::ModelChain;
use super::prompts;
use super::schema::{self, ANSWER_QUESTION, REVISE_ANSWER};
use super::transcript::to_messages;
use crate::core::{
    Artifact, AugmentStage, AugmentationBudget, Critique, LoopDriver, Payload, RunConfig, Stage,
    StageOutput,
};
use crate::infra::config::{Config, ModelConfig};
use crate::infra::errors::{EngineError, ReviserError};
use crate::provider::{ChatResponse, ModelProvider};
use crate::search::SearchProvider;

pub const DRAFT: &str = "draft";
pub const EXECUTE_TOOLS: &str = "execute_tools";
pub const REVISE: &str = "revise";

/// Whether an actor call produces the first draft or a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    FirstResponder,
    Revisor,
}

impl ActorRole {
    fn stage_name(self) -> &'static str {
        match self {
            ActorRole::FirstResponder => DRAFT,
            ActorRole::Revisor => REVISE,
        }
    }

    fn tool(self) -> &'static str {
        match self {
            ActorRole::FirstResponder => ANSWER_QUESTION,
            ActorRole::Revisor => REVISE_ANSWER,
        }
    }

    fn instruction(self) -> &'static str {
        match self {
            ActorRole::FirstResponder => prompts::FIRST_INSTRUCTION,
            ActorRole::Revisor => prompts::REVISE_INSTRUCTIONS,
        }
    }
}

/// Actor call forced through `AnswerQuestion` or `ReviseAnswer`.
///
/// The system prompt is rendered per call so it carries the current time.
pub struct ActorStage {
    role: ActorRole,
    provider: Arc<dyn ModelProvider>,
    config: ModelConfig,
}

impl ActorStage {
    pub fn new(role: ActorRole, provider: Arc<dyn ModelProvider>, config: &Config) -> Self {
        Self {
            role,
            provider,
            config: config.model.clone(),
        }
    }

    fn chain(&self) -> Result<ModelChain, ReviserError> {
        let system = prompts::actor_prompt(self.role.instruction(), Local::now())?;
        let tool = match self.role {
            ActorRole::FirstResponder => schema::answer_question_tool(),
            ActorRole::Revisor => schema::revise_answer_tool(),
        };
        Ok(ModelChain::new(self.provider.clone(), &self.config, system)
            .forced_tool(tool)
            .with_trailer(prompts::ACTOR_TRAILER))
    }

    fn payload_from(&self, response: &ChatResponse) -> Result<Payload, ReviserError> {
        let call = response.tool_call(self.role.tool()).ok_or_else(|| {
            ReviserError::MalformedResponse(format!("model did not call {}", self.role.tool()))
        })?;
        let draft = schema::draft_from_call(call)?;
        Ok(match self.role {
            ActorRole::FirstResponder => Payload::Draft(draft),
            ActorRole::Revisor => Payload::Critique(Critique {
                notes: draft
                    .answer
                    .reflection
                    .as_ref()
                    .map(|r| format!("missing: {}\nsuperfluous: {}", r.missing, r.superfluous))
                    .unwrap_or_default(),
                revision: Some(draft),
            }),
        })
    }
}

#[async_trait]
impl Stage for ActorStage {
    fn name(&self) -> &str {
        self.role.stage_name()
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let response = self.chain()?.invoke(to_messages(history)).await?;
        let payload = self.payload_from(&response)?;
        tracing::info!(
            stage = self.role.stage_name(),
            queries = payload.lookup_requests().len(),
            "Actor answered",
        );
        Ok(StageOutput::One(payload))
    }
}

/// draft → execute_tools → revise, then execute_tools → revise until the
/// augmentation budget (`max_iterations`) is spent.
pub fn build(
    provider: Arc<dyn ModelProvider>,
    search: Arc<dyn SearchProvider>,
    config: &Config,
    question: &str,
) -> Result<LoopDriver, EngineError> {
    let mut run = RunConfig::new([DRAFT, EXECUTE_TOOLS, REVISE], Payload::input(question))
        .loop_from(1)
        .check_after(REVISE)
        .with_max_iterations(config.engine.max_iterations);
    if let Some(cap) = config.engine.hard_cap {
        run = run.with_hard_cap(cap);
    }

    LoopDriver::builder(run)
        .stage(ActorStage::new(ActorRole::FirstResponder, provider.clone(), config))
        .stage(AugmentStage::new(EXECUTE_TOOLS, search).with_parallel(config.search.parallel))
        .stage(ActorStage::new(ActorRole::Revisor, provider, config))
        .policy(AugmentationBudget)
        .build()
}

/// The answer of the newest draft or revision in `ledger`.
pub fn final_answer(ledger: &[Artifact]) -> Option<&crate::core::Answer> {
    ledger.iter().rev().find_map(|a| match &a.payload {
        Payload::Draft(d) => Some(&d.answer),
        Payload::Critique(Critique {
            revision: Some(d), ..
        }) => Some(&d.answer),
        _ => None,
    })
}
