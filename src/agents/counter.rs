// src/agents/counter.rs — State walkthrough: increment a counter until a threshold

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::core::{
    fold_state, Artifact, FieldThreshold, LoopDriver, Payload, Reducer, RunConfig, Stage,
    StageOutput, StateReducers,
};
use crate::infra::config::LoopConfig;
use crate::infra::errors::{EngineError, ReviserError};

pub const INCREMENT: &str = "increment";

/// Simple state tracks `count`; tracked state adds `sum` (added) and
/// `history` (concatenated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateShape {
    Simple,
    Tracked,
}

impl StateShape {
    pub fn reducers(self) -> StateReducers {
        match self {
            StateShape::Simple => StateReducers::new(),
            StateShape::Tracked => StateReducers::from([
                ("sum".to_string(), Reducer::Add),
                ("history".to_string(), Reducer::Concat),
            ]),
        }
    }

    pub fn initial(self) -> Payload {
        let state = match self {
            StateShape::Simple => json!({"count": 0}),
            StateShape::Tracked => json!({"count": 0, "sum": 0, "history": []}),
        };
        match state {
            Value::Object(map) => Payload::State(map),
            _ => Payload::State(Map::new()),
        }
    }
}

pub struct IncrementStage {
    shape: StateShape,
    reducers: StateReducers,
}

impl IncrementStage {
    pub fn new(shape: StateShape) -> Self {
        Self {
            shape,
            reducers: shape.reducers(),
        }
    }
}

#[async_trait]
impl Stage for IncrementStage {
    fn name(&self) -> &str {
        INCREMENT
    }

    async fn run(&self, history: &[Artifact]) -> Result<StageOutput, ReviserError> {
        let state = fold_state(history, &self.reducers);
        let count = state.get("count").and_then(Value::as_i64).unwrap_or(0);
        let next = count + 1;

        let mut update = Map::new();
        update.insert("count".into(), json!(next));
        if self.shape == StateShape::Tracked {
            update.insert("sum".into(), json!(next));
            update.insert("history".into(), json!([next]));
        }
        Ok(StageOutput::One(Payload::State(update)))
    }
}

/// Counter run: stops once `count >= target`, capped at `recursion_limit` passes.
pub fn build(shape: StateShape, target: i64, loop_cfg: &LoopConfig) -> Result<LoopDriver, EngineError> {
    let config = RunConfig::new([INCREMENT], shape.initial())
        .with_hard_cap(loop_cfg.hard_cap.unwrap_or(loop_cfg.recursion_limit));
    LoopDriver::builder(config)
        .stage(IncrementStage::new(shape))
        .policy(FieldThreshold::new("count", target as f64))
        .build()
}

/// Aggregated state at the end of a run.
pub fn final_state(shape: StateShape, ledger: &[Artifact]) -> Map<String, Value> {
    fold_state(ledger, &shape.reducers())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_increment_reads_folded_count() {
        let stage = IncrementStage::new(StateShape::Simple);
        let history = vec![
            Artifact::new(0, "input", StateShape::Simple.initial()),
            Artifact::new(1, INCREMENT, Payload::State(json!({"count": 3}).as_object().unwrap().clone())),
        ];
        let out = stage.run(&history).await.unwrap();
        let StageOutput::One(Payload::State(update)) = out else {
            panic!("expected a state update");
        };
        assert_eq!(update.get("count"), Some(&json!(4)));
        assert!(update.get("sum").is_none());
    }

    #[tokio::test]
    async fn test_tracked_update_fields() {
        let stage = IncrementStage::new(StateShape::Tracked);
        let out = stage
            .run(&[Artifact::new(0, "input", StateShape::Tracked.initial())])
            .await
            .unwrap();
        assert_eq!(
            out,
            StageOutput::One(Payload::State(
                json!({"count": 1, "sum": 1, "history": [1]})
                    .as_object()
                    .unwrap()
                    .clone()
            ))
        );
    }

    #[test]
    fn test_initial_state() {
        let Payload::State(map) = StateShape::Tracked.initial() else {
            panic!("expected state");
        };
        assert_eq!(map.get("history"), Some(&json!([])));
        assert_eq!(StateShape::Simple.reducers().len(), 0);
    }

    #[test]
    fn test_build_uses_recursion_limit_as_cap() {
        let driver = build(StateShape::Simple, 5, &LoopConfig::default()).unwrap();
        assert_eq!(driver.config().pass_cap(), 25);
    }
}
