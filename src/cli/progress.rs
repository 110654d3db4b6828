// src/cli/progress.rs — Terminal progress renderer for loop runs

use crate::core::ProgressEvent;

/// Build a progress callback that writes formatted output to stderr.
///
/// All progress output goes to stderr so stdout remains clean for the result.
/// Returns a closure suitable for `LoopDriver::with_progress()`.
pub fn terminal_progress() -> impl Fn(ProgressEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_event(&event))
}

pub fn format_event(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::RunStart {
            run_id,
            stages,
            pass_cap,
        } => format!(
            "[run {}] {} | cap {} pass(es)",
            crate::util::truncate_str(run_id, 8),
            stages.join(" -> "),
            pass_cap,
        ),
        ProgressEvent::StageStart { step, pass, stage } => {
            format!("[step {} pass {}] {}...", step, pass, stage)
        }
        ProgressEvent::StageEnd {
            step,
            stage,
            appended,
            decision,
        } => {
            let decision = decision.map(|d| format!(" -> {d}")).unwrap_or_default();
            format!("[step {}] {} +{} entr(ies){}", step, stage, appended, decision)
        }
        ProgressEvent::Complete {
            steps,
            passes,
            outcome,
        } => format!("[done] {} steps={} passes={}", outcome, steps, passes),
    }
}
