// src/core/driver.rs — Loop driver
//
// Sequences stages, appends their output, consults the stopping policy and
// enforces a hard cap on passes through the stage sequence that holds no
// matter what the policy says.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::artifact::{Artifact, Payload};
use super::ledger::Ledger;
use super::policy::{Decision, StoppingPolicy};
use super::stage::Stage;
use crate::infra::errors::EngineError;

/// Stage name recorded on the seed entry.
pub const INPUT_STAGE: &str = "input";

/// Immutable configuration fixed when the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Stage names, invoked in order and then cycled.
    pub stages: Vec<String>,
    /// Index the sequence wraps back to after its last stage.
    pub loop_from: usize,
    pub max_iterations: usize,
    /// Cap on completed passes. `None` means `max_iterations + 1`.
    pub hard_cap: Option<usize>,
    /// Consult the policy only after this stage. `None` = after every stage.
    pub check_after: Option<String>,
    pub input: Payload,
}

impl RunConfig {
    pub fn new<I, S>(stages: I, input: Payload) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stages: stages.into_iter().map(Into::into).collect(),
            loop_from: 0,
            max_iterations: 2,
            hard_cap: None,
            check_after: None,
            input,
        }
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_hard_cap(mut self, passes: usize) -> Self {
        self.hard_cap = Some(passes);
        self
    }

    pub fn loop_from(mut self, index: usize) -> Self {
        self.loop_from = index;
        self
    }

    pub fn check_after(mut self, stage: impl Into<String>) -> Self {
        self.check_after = Some(stage.into());
        self
    }

    /// Passes the driver will complete at most.
    pub fn pass_cap(&self) -> usize {
        self.hard_cap
            .unwrap_or_else(|| self.max_iterations.saturating_add(1))
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.stages.is_empty() {
            return Err(EngineError::EmptySequence);
        }
        if self.loop_from >= self.stages.len() {
            return Err(EngineError::InvalidLoopBack {
                index: self.loop_from,
                len: self.stages.len(),
            });
        }
        Ok(())
    }
}

/// Shared flag a caller trips to stop a run at the next step boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Running,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stopping policy said stop.
    Policy,
    /// The hard pass cap ran out first.
    CapExhausted,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Policy => write!(f, "policy"),
            StopReason::CapExhausted => write!(f, "cap-exhausted"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    Stopped {
        reason: StopReason,
        ledger: Vec<Artifact>,
    },
    /// Ledger holds everything appended before the failure.
    Failed {
        error: EngineError,
        ledger: Vec<Artifact>,
    },
}

impl RunOutcome {
    pub fn ledger(&self) -> &[Artifact] {
        match self {
            RunOutcome::Stopped { ledger, .. } | RunOutcome::Failed { ledger, .. } => ledger,
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            RunOutcome::Stopped { reason, .. } => Some(*reason),
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn state(&self) -> DriverState {
        match self {
            RunOutcome::Stopped { .. } => DriverState::Stopped,
            RunOutcome::Failed { .. } => DriverState::Failed,
        }
    }

    pub fn last(&self) -> Option<&Artifact> {
        self.ledger().last()
    }

    /// Ledger on any stop, error on failure.
    pub fn into_result(self) -> Result<Vec<Artifact>, EngineError> {
        match self {
            RunOutcome::Stopped { ledger, .. } => Ok(ledger),
            RunOutcome::Failed { error, .. } => Err(error),
        }
    }

    fn label(&self) -> String {
        match self {
            RunOutcome::Stopped { reason, .. } => format!("stopped ({reason})"),
            RunOutcome::Failed { error, .. } => format!("failed: {error}"),
        }
    }
}

/// Outcome plus run bookkeeping.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub outcome: RunOutcome,
    /// Stage invocations.
    pub steps: usize,
    /// Completed passes through the stage sequence.
    pub passes: usize,
    pub elapsed: Duration,
}

/// Lifecycle notifications for progress rendering.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    RunStart {
        run_id: String,
        stages: Vec<String>,
        pass_cap: usize,
    },
    StageStart {
        step: usize,
        pass: usize,
        stage: String,
    },
    StageEnd {
        step: usize,
        stage: String,
        appended: usize,
        decision: Option<Decision>,
    },
    Complete {
        steps: usize,
        passes: usize,
        outcome: String,
    },
}

/// Drives one run. Consumed by `run`, so the ledger cannot change afterwards.
pub struct LoopDriver {
    config: RunConfig,
    stages: HashMap<String, Arc<dyn Stage>>,
    policy: Box<dyn StoppingPolicy>,
    cancel: CancelFlag,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl std::fmt::Debug for LoopDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopDriver")
            .field("config", &self.config)
            .field("policy", &self.policy.describe())
            .finish_non_exhaustive()
    }
}

impl LoopDriver {
    pub fn builder(config: RunConfig) -> LoopDriverBuilder {
        LoopDriverBuilder {
            config,
            stages: HashMap::new(),
            policy: None,
            cancel: CancelFlag::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    fn consults_policy_after(&self, stage: &str) -> bool {
        self.config
            .check_after
            .as_deref()
            .map_or(true, |name| name == stage)
    }

    /// Run until the policy stops, the cap runs out, the flag is tripped or a
    /// stage fails. Never retries a stage.
    pub async fn run(self) -> RunReport {
        let run_id = uuid::Uuid::new_v4().to_string();
        let start = Instant::now();
        let pass_cap = self.config.pass_cap();
        let mut ledger = Ledger::seeded(INPUT_STAGE, self.config.input.clone());

        self.emit(ProgressEvent::RunStart {
            run_id: run_id.clone(),
            stages: self.config.stages.clone(),
            pass_cap,
        });
        tracing::info!(
            run_id = %run_id,
            stages = ?self.config.stages,
            pass_cap,
            policy = %self.policy.describe(),
            "Run started",
        );

        let mut cursor = 0usize;
        let mut steps = 0usize;
        let mut passes = 0usize;

        let finish = loop {
            if self.cancel.is_cancelled() {
                tracing::info!(run_id = %run_id, steps, "Run cancelled");
                break Finish::Stop(StopReason::Cancelled);
            }
            if passes >= pass_cap {
                tracing::warn!(run_id = %run_id, passes, "Pass cap exhausted");
                break Finish::Stop(StopReason::CapExhausted);
            }

            let name = self.config.stages[cursor].clone();
            let Some(stage) = self.stages.get(&name).cloned() else {
                break Finish::Fail(EngineError::UnknownStage(name));
            };

            steps += 1;
            self.emit(ProgressEvent::StageStart {
                step: steps,
                pass: passes + 1,
                stage: name.clone(),
            });
            tracing::debug!(step = steps, pass = passes + 1, stage = %name, "Stage start");

            let output = match stage.run(ledger.entries()).await {
                Ok(output) => output,
                Err(cause) => {
                    tracing::error!(stage = %name, error = %cause, "Stage failed");
                    break Finish::Fail(EngineError::StageFailure { stage: name, cause });
                }
            };

            let payloads = output.into_payloads();
            let appended = payloads.len();
            if let Err(e) = payloads.into_iter().try_for_each(|payload| {
                ledger.append(Artifact::new(ledger.next_seq(), name.as_str(), payload))
            }) {
                break Finish::Fail(e);
            }

            let decision = self
                .consults_policy_after(&name)
                .then(|| self.policy.decide(ledger.entries(), &self.config));

            self.emit(ProgressEvent::StageEnd {
                step: steps,
                stage: name.clone(),
                appended,
                decision,
            });
            tracing::debug!(stage = %name, appended, ledger_len = ledger.len(), ?decision, "Stage end");

            if decision == Some(Decision::Stop) {
                break Finish::Stop(StopReason::Policy);
            }

            if cursor + 1 == self.config.stages.len() {
                passes += 1;
                cursor = self.config.loop_from;
            } else {
                cursor += 1;
            }
        };

        let entries = ledger.into_entries();
        let outcome = match finish {
            Finish::Stop(reason) => RunOutcome::Stopped {
                reason,
                ledger: entries,
            },
            Finish::Fail(error) => RunOutcome::Failed {
                error,
                ledger: entries,
            },
        };

        self.emit(ProgressEvent::Complete {
            steps,
            passes,
            outcome: outcome.label(),
        });
        tracing::info!(run_id = %run_id, steps, passes, outcome = %outcome.label(), "Run finished");

        RunReport {
            run_id,
            outcome,
            steps,
            passes,
            elapsed: start.elapsed(),
        }
    }
}

/// How the step loop ended.
enum Finish {
    Stop(StopReason),
    Fail(EngineError),
}

/// Collects stages and a policy, then checks the sequence before a run.
pub struct LoopDriverBuilder {
    config: RunConfig,
    stages: HashMap<String, Arc<dyn Stage>>,
    policy: Option<Box<dyn StoppingPolicy>>,
    cancel: CancelFlag,
}

impl LoopDriverBuilder {
    /// Register a stage under its own name. A later stage with the same name wins.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages
            .insert(stage.name().to_string(), Arc::new(stage));
        self
    }

    pub fn shared_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.name().to_string(), stage);
        self
    }

    pub fn policy(mut self, policy: impl StoppingPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    pub fn cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fails if the sequence is empty, loops back out of range, or names a
    /// stage that was never registered. Without a policy, only the cap stops.
    pub fn build(self) -> Result<LoopDriver, EngineError> {
        self.config.validate()?;
        if let Some(missing) = self
            .config
            .stages
            .iter()
            .find(|s| !self.stages.contains_key(*s))
        {
            return Err(EngineError::UnknownStage(missing.clone()));
        }
        let policy: Box<dyn StoppingPolicy> = match self.policy {
            Some(policy) => policy,
            None => Box::new(|_: &[Artifact], _: &RunConfig| Decision::Continue),
        };
        Ok(LoopDriver {
            config: self.config,
            stages: self.stages,
            policy,
            cancel: self.cancel,
            on_progress: None,
        })
    }
}
