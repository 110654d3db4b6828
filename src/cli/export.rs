// src/cli/export.rs — Ledger export
//
// Writes a finished run as pretty JSON: run metadata plus every ledger entry.

use std::path::Path;

use serde::Serialize;

use crate::core::{Artifact, RunReport};

#[derive(Debug, Serialize)]
pub struct RunExport<'a> {
    pub run_id: &'a str,
    pub pattern: &'a str,
    pub outcome: String,
    pub steps: usize,
    pub passes: usize,
    pub elapsed_ms: u64,
    pub exported_at: String,
    pub version: &'static str,
    pub ledger: &'a [Artifact],
}

impl<'a> RunExport<'a> {
    pub fn new(pattern: &'a str, report: &'a RunReport) -> Self {
        let outcome = match report.outcome.stop_reason() {
            Some(reason) => reason.to_string(),
            None => "failed".into(),
        };
        Self {
            run_id: &report.run_id,
            pattern,
            outcome,
            steps: report.steps,
            passes: report.passes,
            elapsed_ms: report.elapsed.as_millis() as u64,
            exported_at: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            ledger: report.outcome.ledger(),
        }
    }
}

/// Write `report` to `path`, creating parent directories as needed.
pub fn write_ledger(path: &Path, pattern: &str, report: &RunReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&RunExport::new(pattern, report))?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), entries = report.outcome.ledger().len(), "Ledger exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Payload, RunOutcome, StopReason};
    use std::time::Duration;

    fn report() -> RunReport {
        RunReport {
            run_id: "run-1".into(),
            outcome: RunOutcome::Stopped {
                reason: StopReason::CapExhausted,
                ledger: vec![
                    Artifact::new(0, "input", Payload::input("q")),
                    Artifact::new(1, "draft", Payload::input("a")),
                ],
            },
            steps: 1,
            passes: 1,
            elapsed: Duration::from_millis(42),
        }
    }

    #[test]
    fn test_export_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/out.json");
        let report = report();
        write_ledger(&path, "reflexion", &report).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["pattern"], "reflexion");
        assert_eq!(raw["outcome"], "cap-exhausted");
        assert_eq!(raw["elapsed_ms"], 42);
        assert_eq!(raw["ledger"].as_array().unwrap().len(), 2);
        assert_eq!(raw["ledger"][0]["payload"]["kind"], "input");

        let entries: Vec<Artifact> = serde_json::from_value(raw["ledger"].clone()).unwrap();
        assert_eq!(entries[1].seq, 1);
    }
}
