// src/cli/graph.rs — Render a pattern's stage cycle as Mermaid or plain text

use std::fmt::Write as _;

use crate::agents::Topology;

const START: &str = "__start__";
const END: &str = "__end__";

/// One transition. Conditional edges are the ones the stopping policy guards.
#[derive(Debug, Clone, PartialEq)]
struct Edge<'a> {
    from: &'a str,
    to: &'a str,
    conditional: bool,
}

fn edges(t: &Topology) -> Vec<Edge<'_>> {
    let mut out = Vec::new();
    if let Some(first) = t.stages.first() {
        out.push(Edge {
            from: START,
            to: *first,
            conditional: false,
        });
    }
    for (i, stage) in t.stages.iter().enumerate() {
        let next = if i + 1 < t.stages.len() {
            t.stages[i + 1]
        } else {
            t.stages[t.loop_from]
        };
        let guarded = t.check_after.map_or(true, |c| c == *stage);
        out.push(Edge {
            from: *stage,
            to: next,
            conditional: guarded,
        });
        if guarded {
            out.push(Edge {
                from: *stage,
                to: END,
                conditional: true,
            });
        }
    }
    out
}

pub fn to_mermaid(t: &Topology) -> String {
    let mut out = String::from("graph TD;\n");
    let _ = writeln!(out, "\t{START}([<p>{START}</p>]):::first");
    for stage in &t.stages {
        let _ = writeln!(out, "\t{stage}({stage})");
    }
    let _ = writeln!(out, "\t{END}([<p>{END}</p>]):::last");
    for e in edges(t) {
        let arrow = if e.conditional { "-.->" } else { "-->" };
        let _ = writeln!(out, "\t{} {} {};", e.from, arrow, e.to);
    }
    out.push_str("\tclassDef default fill:#f2f0ff,line-height:1.2\n");
    out.push_str("\tclassDef first fill-opacity:0\n");
    out.push_str("\tclassDef last fill:#bfb6fc\n");
    out
}

pub fn to_ascii(t: &Topology) -> String {
    let mut out = String::new();
    for e in edges(t) {
        let label = match (e.conditional, e.to) {
            (false, _) => String::new(),
            (true, END) => format!("  [stop: {}]", t.stop_when),
            (true, _) => "  [continue]".into(),
        };
        let arrow = if e.conditional { "~~>" } else { "-->" };
        let _ = writeln!(out, "{:>14} {} {}{}", e.from, arrow, e.to, label);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::Pattern;

    #[test]
    fn test_reflexion_edges() {
        let t = Pattern::Reflexion.topology();
        let e = edges(&t);
        assert_eq!(e.len(), 5);
        assert!(e.contains(&Edge {
            from: "revise",
            to: "execute_tools",
            conditional: true
        }));
        assert!(e.contains(&Edge {
            from: "draft",
            to: "execute_tools",
            conditional: false
        }));
    }

    #[test]
    fn test_mermaid_reflect() {
        let m = to_mermaid(&Pattern::Reflect.topology());
        assert!(m.starts_with("graph TD;"));
        assert!(m.contains("\t__start__ --> generate;"));
        assert!(m.contains("\tgenerate -.-> reflect;"));
        assert!(m.contains("\tgenerate -.-> __end__;"));
        assert!(m.contains("\treflect --> generate;"));
    }

    #[test]
    fn test_counter_self_loop() {
        let m = to_mermaid(&Pattern::Count.topology());
        assert!(m.contains("\tincrement -.-> increment;"));
    }

    #[test]
    fn test_ascii_labels_stop_condition() {
        let a = to_ascii(&Pattern::React.topology());
        assert!(a.contains("__end__  [stop: reply calls no tool]"));
        assert!(a.contains("tools --> reason"));
    }
}
