// src/cli/run.rs — Run a pattern end to end: wire collaborators, drive, report

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::counter::{self, StateShape};
use crate::agents::{react, reflection, reflexion, Pattern};
use crate::core::{LoopDriver, Payload, RunOutcome, RunReport, StopReason};
use crate::infra::config::Config;
use crate::infra::paths;
use crate::provider::openai::OpenAIProvider;
use crate::provider::retry::RetryProvider;
use crate::provider::ModelProvider;
use crate::search::tavily::TavilySearch;
use crate::search::SearchProvider;

/// Output options shared by every run command.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    /// Also write the ledger to `runs/<pattern>-<run id>.json` in the data dir.
    pub save: bool,
    pub quiet: bool,
}

/// OpenAI-compatible chat provider with retries, from env + config.
pub fn model_provider(config: &Config) -> anyhow::Result<Arc<dyn ModelProvider>> {
    let inner = OpenAIProvider::from_env(config.model.base_url.as_deref())?
        .with_timeout(Duration::from_secs(config.model.timeout_seconds))?;
    Ok(Arc::new(RetryProvider::with_settings(
        Arc::new(inner),
        config.retry.clone(),
    )))
}

pub fn search_provider(config: &Config) -> anyhow::Result<Arc<dyn SearchProvider>> {
    Ok(Arc::new(TavilySearch::from_env(&config.search)?))
}

/// Drive one run with progress, Ctrl-C cancellation and optional export.
///
/// A failed run still exports its partial ledger before the error surfaces.
pub async fn drive(pattern: Pattern, driver: LoopDriver, opts: &RunOptions) -> anyhow::Result<RunReport> {
    let driver = if opts.quiet {
        driver
    } else {
        driver.with_progress(super::progress::terminal_progress())
    };

    let cancel = driver.cancel_flag();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current stage");
            cancel.cancel();
        }
    });

    let report = driver.run().await;
    ctrl_c.abort();

    let saved = if opts.save {
        let dir = paths::runs_dir()
            .ok_or_else(|| anyhow::anyhow!("no data directory; set REVISER_HOME"))?;
        Some(dir.join(format!("{pattern}-{}.json", report.run_id)))
    } else {
        None
    };
    for path in opts.output.iter().chain(saved.iter()) {
        super::export::write_ledger(path, &pattern.to_string(), &report)?;
        if !opts.quiet {
            eprintln!("[export] ledger written to {}", path.display());
        }
    }

    match &report.outcome {
        RunOutcome::Failed { error, ledger } => {
            anyhow::bail!("{pattern} run failed after {} entries: {error}", ledger.len())
        }
        RunOutcome::Stopped { reason, .. } => {
            if *reason != StopReason::Policy && !opts.quiet {
                eprintln!("[stop] {reason}");
            }
        }
    }
    Ok(report)
}

pub async fn run_count(
    complex: bool,
    target: Option<i64>,
    config: &Config,
    opts: &RunOptions,
) -> anyhow::Result<()> {
    let shape = if complex {
        StateShape::Tracked
    } else {
        StateShape::Simple
    };
    let target = target.unwrap_or(config.engine.counter_target);
    let driver = counter::build(shape, target, &config.engine)?;
    let report = drive(Pattern::Count, driver, opts).await?;

    let state = counter::final_state(shape, report.outcome.ledger());
    println!("{}", serde_json::to_string(&state)?);
    Ok(())
}

pub async fn run_reflect(topic: &str, config: &Config, opts: &RunOptions) -> anyhow::Result<()> {
    let driver = reflection::build(model_provider(config)?, config, topic)?;
    let report = drive(Pattern::Reflect, driver, opts).await?;

    let post = report
        .outcome
        .ledger()
        .iter()
        .rev()
        .find(|a| matches!(a.payload, Payload::Draft(_)))
        .map(|a| a.payload.text())
        .unwrap_or_default();
    println!("{post}");
    Ok(())
}

pub async fn run_reflexion(question: &str, config: &Config, opts: &RunOptions) -> anyhow::Result<()> {
    let driver = reflexion::build(
        model_provider(config)?,
        search_provider(config)?,
        config,
        question,
    )?;
    let report = drive(Pattern::Reflexion, driver, opts).await?;

    let answer = reflexion::final_answer(report.outcome.ledger())
        .ok_or_else(|| anyhow::anyhow!("run ended before a draft was produced"))?;
    println!("{}", answer.answer);
    if !answer.references.is_empty() && !answer.answer.contains("References") {
        println!("\nReferences:");
        for (i, r) in answer.references.iter().enumerate() {
            println!("  [{}] {}", i + 1, r);
        }
    }
    Ok(())
}

pub async fn run_react(question: &str, config: &Config, opts: &RunOptions) -> anyhow::Result<()> {
    let driver = react::build(
        model_provider(config)?,
        search_provider(config)?,
        config,
        question,
    )?;
    let report = drive(Pattern::React, driver, opts).await?;

    match report.outcome.last().map(|a| &a.payload) {
        Some(Payload::Draft(d)) if d.requests.is_empty() => println!("{}", d.answer.answer),
        _ => anyhow::bail!(
            "no final answer within {} pass(es); raise loop.recursion_limit",
            report.passes
        ),
    }
    Ok(())
}

pub fn run_graph(pattern: Pattern, mermaid: bool) {
    let topology = pattern.topology();
    if mermaid {
        print!("{}", super::graph::to_mermaid(&topology));
    } else {
        print!("{}", super::graph::to_ascii(&topology));
    }
}
