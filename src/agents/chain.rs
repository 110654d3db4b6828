// src/agents/chain.rs — One configured model call: prompt, tools, transcript

use std::sync::Arc;

use crate::infra::config::ModelConfig;
use crate::infra::errors::ReviserError;
use crate::provider::{ChatRequest, ChatResponse, Message, ModelProvider, ToolDef};

/// A system prompt bound to a model, its tools and sampling settings.
#[derive(Clone)]
pub struct ModelChain {
    provider: Arc<dyn ModelProvider>,
    model: String,
    system: String,
    tools: Vec<ToolDef>,
    tool_choice: Option<String>,
    trailer: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ModelChain {
    pub fn new(provider: Arc<dyn ModelProvider>, model: &ModelConfig, system: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.name.clone(),
            system: system.into(),
            tools: Vec::new(),
            tool_choice: None,
            trailer: None,
            temperature: model.temperature,
            max_tokens: model.max_tokens,
        }
    }

    /// Offer a tool the model may call.
    pub fn with_tool(mut self, tool: ToolDef) -> Self {
        self.tools.push(tool);
        self
    }

    /// Offer a tool and require the model to answer through it.
    pub fn forced_tool(mut self, tool: ToolDef) -> Self {
        self.tool_choice = Some(tool.name.clone());
        self.tools.push(tool);
        self
    }

    /// System instruction placed after the transcript.
    pub fn with_trailer(mut self, trailer: impl Into<String>) -> Self {
        self.trailer = Some(trailer.into());
        self
    }

    pub fn forced(&self) -> Option<&str> {
        self.tool_choice.as_deref()
    }

    pub fn request(&self, mut messages: Vec<Message>) -> ChatRequest {
        if let Some(trailer) = &self.trailer {
            messages.push(Message::system(trailer.clone()));
        }
        ChatRequest {
            model: self.model.clone(),
            messages,
            tools: self.tools.clone(),
            tool_choice: self.tool_choice.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: Some(self.system.clone()),
        }
    }

    pub async fn invoke(&self, messages: Vec<Message>) -> Result<ChatResponse, ReviserError> {
        let request = self.request(messages);
        tracing::debug!(
            provider = self.provider.id(),
            model = %request.model,
            messages = request.messages.len(),
            forced = ?self.tool_choice,
            "Invoking model",
        );
        self.provider.chat(request).await
    }
}
