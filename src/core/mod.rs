// src/core/mod.rs — Bounded iterative revision engine

pub mod artifact;
pub mod driver;
pub mod ledger;
pub mod policy;
pub mod stage;

pub use artifact::{
    Answer, Artifact, ArtifactKind, Augmentation, Critique, Draft, LookupRequest, LookupResult,
    Payload, Reflection, Seq,
};
pub use driver::{
    CancelFlag, DriverState, LoopDriver, LoopDriverBuilder, ProgressEvent, RunConfig, RunOutcome,
    RunReport, StopReason, INPUT_STAGE,
};
pub use ledger::{count_where, fold_state, Ledger, Reducer, StateReducers};
pub use policy::{
    AugmentationBudget, Decision, FieldThreshold, FinalAnswer, HistoryLength, StoppingPolicy,
};
pub use stage::{AugmentStage, FnStage, Stage, StageOutput};
