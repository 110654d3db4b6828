// src/agents/transcript.rs — Replay a ledger as a chat transcript

use super::schema::{self, ANSWER_QUESTION, REVISE_ANSWER};
use crate::core::{Artifact, Critique, Draft, Payload};
use crate::provider::{Message, ToolCall};

/// Tool result body for a call that requested no lookups.
const EMPTY_RESULT: &str = "{}";

/// Chat messages for `history`, in ledger order.
///
/// State entries carry no conversation and are skipped. An assistant turn
/// with tool calls that the next entry does not answer gets an empty `{}`
/// tool result per call, so every call in the transcript is paired.
pub fn to_messages(history: &[Artifact]) -> Vec<Message> {
    let mut out = Vec::with_capacity(history.len());
    for (i, artifact) in history.iter().enumerate() {
        let message = match &artifact.payload {
            Payload::Input { text } => Message::user(text.clone()),
            Payload::Draft(draft) => draft_message(draft),
            Payload::Critique(Critique {
                revision: Some(draft),
                ..
            }) => draft_message(draft),
            Payload::Critique(Critique { notes, .. }) => Message::user(notes.clone()),
            Payload::Augment(aug) => {
                let body = aug.to_json().to_string();
                match &aug.call_id {
                    Some(id) => Message::tool_result(id.clone(), body),
                    None => Message::user(format!("Lookup results: {body}")),
                }
            }
            Payload::State(_) => continue,
        };

        let unanswered: Vec<String> = message
            .tool_calls
            .iter()
            .map(|c| c.id.clone())
            .filter(|id| !answered_by(history.get(i + 1), id))
            .collect();
        out.push(message);
        out.extend(
            unanswered
                .into_iter()
                .map(|id| Message::tool_result(id, EMPTY_RESULT)),
        );
    }
    out
}

fn answered_by(next: Option<&Artifact>, call_id: &str) -> bool {
    matches!(
        next.map(|a| &a.payload),
        Some(Payload::Augment(aug)) if aug.call_id.as_deref() == Some(call_id)
    )
}

fn draft_message(draft: &Draft) -> Message {
    match (&draft.call_id, draft.tool.as_deref()) {
        (Some(id), Some(tool @ (ANSWER_QUESTION | REVISE_ANSWER))) => {
            let arguments = serde_json::to_value(&draft.answer).unwrap_or_default();
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: id.clone(),
                    name: tool.to_string(),
                    arguments,
                }],
            )
        }
        (Some(id), _) if !draft.requests.is_empty() => Message::assistant_with_tool_calls(
            draft.answer.answer.clone(),
            draft
                .requests
                .iter()
                .map(|r| schema::lookup_call(id, r))
                .collect(),
        ),
        _ => Message::assistant(draft.answer.answer.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Answer, Augmentation, LookupRequest, LookupResult};
    use crate::provider::Role;
    use crate::search::SearchResult;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn art(seq: u64, payload: Payload) -> Artifact {
        Artifact::new(seq, "test", payload)
    }

    #[test]
    fn test_reflection_transcript_roles() {
        let history = vec![
            art(0, Payload::input("AI Agents taking over content creation")),
            art(1, Payload::Draft(Draft::text("tweet v1"))),
            art(
                2,
                Payload::Critique(Critique {
                    notes: "add hashtags".into(),
                    revision: None,
                }),
            ),
        ];
        let roles: Vec<Role> = to_messages(&history).into_iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    }

    #[test]
    fn test_structured_draft_and_tool_result_pair_up() {
        let answer = Answer {
            answer: "AI helps".into(),
            search_queries: vec!["q".into()],
            ..Default::default()
        };
        let draft = Draft {
            call_id: Some("call_1".into()),
            tool: Some(ANSWER_QUESTION.into()),
            requests: answer.search_requests(),
            answer,
        };
        let aug = Augmentation {
            call_id: Some("call_1".into()),
            results: vec![LookupResult {
                request: LookupRequest::Search { query: "q".into() },
                results: vec![SearchResult::text("hit")],
            }],
        };
        let msgs = to_messages(&[art(1, Payload::Draft(draft)), art(2, Payload::Augment(aug))]);

        assert_eq!(msgs[0].tool_calls[0].name, ANSWER_QUESTION);
        assert_eq!(msgs[0].tool_calls[0].arguments["answer"], "AI helps");
        assert_eq!(msgs[1].role, Role::Tool);
        assert_eq!(msgs[1].tool_call_id.as_deref(), Some("call_1"));
        let body: serde_json::Value = serde_json::from_str(&msgs[1].content).unwrap();
        assert_eq!(body["q"][0]["content"], "hit");
    }

    #[test]
    fn test_react_lookup_replayed_as_tool_call() {
        let draft = Draft {
            call_id: Some("call_7".into()),
            tool: Some(schema::SYSTEM_TIME.into()),
            answer: Answer::plain(""),
            requests: vec![LookupRequest::Clock {
                format: "%Y".into(),
            }],
        };
        let msgs = to_messages(&[art(1, Payload::Draft(draft))]);
        assert_eq!(msgs[0].tool_calls[0].name, schema::SYSTEM_TIME);
        assert_eq!(msgs[0].tool_calls[0].arguments, json!({"format": "%Y"}));
    }

    #[test]
    fn test_call_without_lookups_gets_empty_result() {
        let draft = Draft {
            call_id: Some("call_1".into()),
            tool: Some(ANSWER_QUESTION.into()),
            answer: Answer::plain("Nothing to look up"),
            requests: vec![],
        };
        let msgs = to_messages(&[
            art(0, Payload::input("q")),
            art(1, Payload::Draft(draft)),
        ]);
        let roles: Vec<Role> = msgs.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(msgs[2].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msgs[2].content, "{}");
    }

    #[test]
    fn test_answered_call_gets_no_extra_result() {
        let draft = Draft {
            call_id: Some("call_2".into()),
            tool: Some(schema::WEB_SEARCH.into()),
            answer: Answer::plain(""),
            requests: vec![LookupRequest::Search { query: "q".into() }],
        };
        let aug = Augmentation {
            call_id: Some("call_2".into()),
            results: vec![],
        };
        let msgs = to_messages(&[art(1, Payload::Draft(draft)), art(2, Payload::Augment(aug))]);
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].role, Role::Tool);
    }

    #[test]
    fn test_state_entries_skipped() {
        let msgs = to_messages(&[art(0, Payload::State(serde_json::Map::new()))]);
        assert!(msgs.is_empty());
    }
}
