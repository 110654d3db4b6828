// src/agents/schema.rs — Tool definitions the model answers through

use serde_json::json;

use crate::core::{Answer, Draft, LookupRequest};
use crate::infra::errors::ReviserError;
use crate::provider::{ToolCall, ToolDef};

pub const ANSWER_QUESTION: &str = "AnswerQuestion";
pub const REVISE_ANSWER: &str = "ReviseAnswer";
pub const WEB_SEARCH: &str = "web_search";
pub const SYSTEM_TIME: &str = "get_system_time";

/// strftime pattern used when the model omits one.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn reflection_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "description": "Your reflection on the initial answer.",
        "properties": {
            "missing": {"type": "string", "description": "Critique of what is missing."},
            "superfluous": {"type": "string", "description": "Critique of what is superfluous."}
        },
        "required": ["missing", "superfluous"]
    })
}

pub fn answer_question_tool() -> ToolDef {
    ToolDef {
        name: ANSWER_QUESTION.into(),
        description: "Answer the question.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "answer": {"type": "string", "description": "~250 word detailed answer to the question."},
                "search_queries": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "1-3 search queries for researching improvements to address the critique of your current answer."
                },
                "reflection": reflection_schema()
            },
            "required": ["answer", "search_queries", "reflection"]
        }),
    }
}

/// `AnswerQuestion` plus the citations backing the revision.
pub fn revise_answer_tool() -> ToolDef {
    let mut def = answer_question_tool();
    def.name = REVISE_ANSWER.into();
    def.description = "Revise your original answer to your question.".into();
    def.parameters["properties"]["references"] = json!({
        "type": "array",
        "items": {"type": "string"},
        "description": "Citations motivating your updated answer."
    });
    if let Some(required) = def.parameters["required"].as_array_mut() {
        required.push(json!("references"));
    }
    def
}

pub fn web_search_tool() -> ToolDef {
    ToolDef {
        name: WEB_SEARCH.into(),
        description: "Search the web. Useful for questions about current events. Input is a search query.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The search query."}
            },
            "required": ["query"]
        }),
    }
}

pub fn system_time_tool() -> ToolDef {
    ToolDef {
        name: SYSTEM_TIME.into(),
        description: "Returns the current date and time in the specified format.".into(),
        parameters: json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "strftime format string",
                    "default": DEFAULT_TIME_FORMAT
                }
            }
        }),
    }
}

/// Structured draft from an `AnswerQuestion` / `ReviseAnswer` call.
pub fn draft_from_call(call: &ToolCall) -> Result<Draft, ReviserError> {
    let answer: Answer = serde_json::from_value(call.arguments.clone()).map_err(|e| {
        ReviserError::MalformedResponse(format!("{} arguments: {e}", call.name))
    })?;
    Ok(Draft {
        call_id: Some(call.id.clone()),
        tool: Some(call.name.clone()),
        requests: answer.search_requests(),
        answer,
    })
}

/// Lookup requested through one of the ReAct tools.
pub fn lookup_from_call(call: &ToolCall) -> Result<LookupRequest, ReviserError> {
    match call.name.as_str() {
        WEB_SEARCH => {
            let query = call.arguments["query"]
                .as_str()
                .filter(|q| !q.trim().is_empty())
                .ok_or_else(|| {
                    ReviserError::MalformedResponse(format!("{WEB_SEARCH} call without a query"))
                })?;
            Ok(LookupRequest::Search {
                query: query.to_string(),
            })
        }
        SYSTEM_TIME => Ok(LookupRequest::Clock {
            format: call.arguments["format"]
                .as_str()
                .unwrap_or(DEFAULT_TIME_FORMAT)
                .to_string(),
        }),
        other => Err(ReviserError::Tool {
            tool: other.to_string(),
            message: "unknown tool".into(),
        }),
    }
}

/// Arguments a lookup is replayed with when the transcript is rebuilt.
pub fn lookup_call(id: &str, request: &LookupRequest) -> ToolCall {
    let (name, arguments) = match request {
        LookupRequest::Search { query } => (WEB_SEARCH, json!({"query": query})),
        LookupRequest::Clock { format } => (SYSTEM_TIME, json!({"format": format})),
    };
    ToolCall {
        id: id.to_string(),
        name: name.into(),
        arguments,
    }
}
