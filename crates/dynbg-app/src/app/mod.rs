//! Application use cases

pub mod evaluation_service;

pub use evaluation_service::{
    CycleOutcome, CycleReport, EvaluationSettings, SceneEvaluator, SceneEvent, SkipReason,
};
