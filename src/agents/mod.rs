// src/agents/mod.rs — Revision agents built on the loop driver

pub mod chain;
pub mod counter;
pub mod prompts;
pub mod react;
pub mod reflection;
pub mod reflexion;
pub mod schema;
pub mod transcript;

use serde::Serialize;

/// The agent patterns the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Pattern {
    Count,
    Reflect,
    Reflexion,
    React,
}

/// Static shape of a pattern's stage cycle, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Topology {
    pub stages: Vec<&'static str>,
    pub loop_from: usize,
    /// Stage after which the stopping policy is asked. `None` = every stage.
    pub check_after: Option<&'static str>,
    pub stop_when: &'static str,
}

impl Pattern {
    pub fn topology(self) -> Topology {
        match self {
            Pattern::Count => Topology {
                stages: vec![counter::INCREMENT],
                loop_from: 0,
                check_after: None,
                stop_when: "count >= target",
            },
            Pattern::Reflect => Topology {
                stages: vec![reflection::GENERATE, reflection::REFLECT],
                loop_from: 0,
                check_after: Some(reflection::GENERATE),
                stop_when: "history length > limit",
            },
            Pattern::Reflexion => Topology {
                stages: vec![reflexion::DRAFT, reflexion::EXECUTE_TOOLS, reflexion::REVISE],
                loop_from: 1,
                check_after: Some(reflexion::REVISE),
                stop_when: "augmentations > max_iterations",
            },
            Pattern::React => Topology {
                stages: vec![react::REASON, react::TOOLS],
                loop_from: 0,
                check_after: Some(react::REASON),
                stop_when: "reply calls no tool",
            },
        }
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pattern::Count => "count",
            Pattern::Reflect => "reflect",
            Pattern::Reflexion => "reflexion",
            Pattern::React => "react",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_loop_back_in_range() {
        for p in [Pattern::Count, Pattern::Reflect, Pattern::Reflexion, Pattern::React] {
            let t = p.topology();
            assert!(t.loop_from < t.stages.len(), "{p}");
            if let Some(check) = t.check_after {
                assert!(t.stages.contains(&check), "{p}");
            }
        }
    }

    #[test]
    fn test_reflexion_loops_past_draft() {
        let t = Pattern::Reflexion.topology();
        assert_eq!(t.stages[t.loop_from], reflexion::EXECUTE_TOOLS);
    }
}
