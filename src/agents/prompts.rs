// src/agents/prompts.rs — Prompt templates for the revision agents

use chrono::{DateTime, Local};
use minijinja::{context, Environment};

use crate::infra::errors::ReviserError;
use crate::provider::ToolDef;

pub const GENERATION: &str = "You are a twitter techie influencer assistant tasked with writing excellent twitter posts. \
Generate the best twitter post possible for the user's request. \
If the user provides critique, respond with a revised version of your previous attempts.";

pub const REFLECTION: &str = "You are a viral twitter influencer grading a tweet. \
Generate critique and recommendations for the user's tweet. \
Always provide detailed recommendations, including requests for length, virality, style, etc.";

pub const FIRST_INSTRUCTION: &str = "Provide a detailed ~250 word answer";

pub const REVISE_INSTRUCTIONS: &str = r#"Revise your previous answer using the new information.
    - You should use the previous critique to add important information to your answer.
        - You MUST include numerical citations in your revised answer to ensure it can be verified.
        - Add a "References" section to the bottom of your answer (which does not count towards the word limit). In form of:
            - [1] https://example.com
            - [2] https://example.com
    - You should use the previous critique to remove superfluous information from your answer and make SURE it is not more than 250 words."#;

/// Appended after the transcript on every actor call.
pub const ACTOR_TRAILER: &str = "Answer the user's question above using the required format.";

const ACTOR: &str = "You are expert AI researcher.
Current time: {{ time }}

1. {{ first_instruction }}
2. Reflect and critique your answer. Be severe to maximize improvement.
3. After the reflection, **list 1-3 search queries separately** for researching improvements. Do not include them inside the reflection.
";

const REACT: &str = "Answer the following question as best you can. Current time: {{ time }}

You have access to the following tools:
{% for tool in tools %}
- {{ tool.name }}: {{ tool.description }}
{%- endfor %}

Think step by step. Call one tool at a time when you need outside information, \
and read its result before deciding the next step. \
When you know the final answer, reply with it in plain text and call no tool.";

fn environment() -> Result<Environment<'static>, ReviserError> {
    let mut env = Environment::new();
    env.add_template("actor", ACTOR)?;
    env.add_template("react", REACT)?;
    Ok(env)
}

/// Actor system prompt for the reflexion draft and revise stages.
pub fn actor_prompt(first_instruction: &str, now: DateTime<Local>) -> Result<String, ReviserError> {
    let env = environment()?;
    let rendered = env.get_template("actor")?.render(context! {
        time => now.to_rfc3339(),
        first_instruction => first_instruction,
    })?;
    Ok(rendered)
}

pub fn react_prompt(tools: &[ToolDef], now: DateTime<Local>) -> Result<String, ReviserError> {
    let env = environment()?;
    let tools: Vec<_> = tools
        .iter()
        .map(|t| context! { name => &t.name, description => &t.description })
        .collect();
    let rendered = env.get_template("react")?.render(context! {
        time => now.to_rfc3339(),
        tools => tools,
    })?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::schema;
    use chrono::TimeZone;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_actor_prompt_fills_slots() {
        let p = actor_prompt(FIRST_INSTRUCTION, noon()).unwrap();
        assert!(p.starts_with("You are expert AI researcher."));
        assert!(p.contains("Current time: 2024-01-15T12:00:00"));
        assert!(p.contains("1. Provide a detailed ~250 word answer"));
        assert!(p.contains("3. After the reflection"));
        assert!(!p.contains("{{"));
    }

    #[test]
    fn test_actor_prompt_revise_keeps_references_block() {
        let p = actor_prompt(REVISE_INSTRUCTIONS, noon()).unwrap();
        assert!(p.contains("- [1] https://example.com"));
        assert!(p.contains("not more than 250 words"));
    }

    #[test]
    fn test_react_prompt_lists_tools() {
        let tools = [schema::web_search_tool(), schema::system_time_tool()];
        let p = react_prompt(&tools, noon()).unwrap();
        assert!(p.contains("- web_search: Search the web."));
        assert!(p.contains("- get_system_time: Returns the current date"));
        assert!(p.contains("call no tool"));
    }
}
