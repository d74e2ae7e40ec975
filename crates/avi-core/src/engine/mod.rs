//! Engine module for FlowEngine implementation
//!
//! Provides the core engine and its typed builder for deterministic
//! linear workflow execution.

pub mod builder;
pub mod core;

pub use builder::{EngineBuilder, EngineBuilderInit};
pub use core::{event_variant, FlowEngine};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CoreEngineError;
    use crate::model::{Artifact, ArtifactKind, ExecutionContext};
    use crate::repo::build_flow_definition;
    use crate::step::{StepDefinition, StepKind, StepRunResult};
    use serde_json::json;

    #[derive(Debug)]
    struct SourceStep;

    impl StepDefinition for SourceStep {
        fn id(&self) -> &str { "source" }
        fn base_params(&self) -> serde_json::Value { json!({}) }
        fn run(&self, _ctx: &ExecutionContext) -> StepRunResult {
            StepRunResult::Success { outputs: vec![Artifact { kind: ArtifactKind::GenericJson,
                                                              payload: json!({"data": "hello"}),
                                                              hash: String::new(),
                                                              metadata: None }] }
        }
        fn kind(&self) -> StepKind { StepKind::Source }
    }

    #[derive(Debug)]
    struct TransformStep;

    impl StepDefinition for TransformStep {
        fn id(&self) -> &str { "transform" }
        fn base_params(&self) -> serde_json::Value { json!({}) }
        fn run(&self, ctx: &ExecutionContext) -> StepRunResult {
            match &ctx.input {
                Some(input) => StepRunResult::Success { outputs: vec![Artifact { kind: ArtifactKind::GenericJson,
                                                                                 payload: json!({"transformed": input.payload["data"]}),
                                                                                 hash: String::new(),
                                                                                 metadata: None }] },
                None => StepRunResult::Failure { error: CoreEngineError::MissingInputs },
            }
        }
        fn kind(&self) -> StepKind { StepKind::Transform }
    }

    #[derive(Debug)]
    struct FailingStep;

    impl StepDefinition for FailingStep {
        fn id(&self) -> &str { "failing" }
        fn base_params(&self) -> serde_json::Value { json!({}) }
        fn run(&self, _ctx: &ExecutionContext) -> StepRunResult {
            StepRunResult::Failure { error: CoreEngineError::step_failed("failing", "boom") }
        }
        fn kind(&self) -> StepKind { StepKind::Sink }
    }

    fn engine_with(steps: Vec<Box<dyn StepDefinition>>) -> FlowEngine<crate::InMemoryEventStore, crate::InMemoryFlowRepository> {
        let mut engine = FlowEngine::default();
        engine.set_default_definition(build_flow_definition(steps));
        engine
    }

    #[test]
    fn runs_chain_and_emits_completed() {
        let mut engine = engine_with(vec![Box::new(SourceStep), Box::new(TransformStep)]);
        let flow_id = engine.run().expect("flow should complete");

        assert_eq!(engine.event_variants().unwrap(), vec!["I", "S", "F", "S", "F", "C"]);
        let out = engine.last_output(flow_id).expect("final output");
        assert_eq!(out.payload["transformed"], "hello");
    }

    #[test]
    fn step_by_step_then_completed() {
        let mut engine = engine_with(vec![Box::new(SourceStep), Box::new(TransformStep)]);
        assert!(engine.step().is_ok());
        assert!(engine.step().is_ok());
        assert_eq!(engine.step(), Err(CoreEngineError::FlowCompleted));
        assert!(engine.flow_fingerprint().is_some());
    }

    #[test]
    fn failure_stops_the_flow() {
        let mut engine = engine_with(vec![Box::new(SourceStep), Box::new(FailingStep), Box::new(TransformStep)]);
        let err = engine.run().unwrap_err();
        assert_eq!(err, CoreEngineError::step_failed("failing", "boom"));
        assert_eq!(engine.event_variants().unwrap(), vec!["I", "S", "F", "S", "X"]);

        // stop-on-failure: no se reintenta
        assert_eq!(engine.step(), Err(CoreEngineError::FlowHasFailed));
        assert!(engine.flow_fingerprint().is_none());
    }

    #[test]
    fn first_step_must_be_source() {
        let mut engine = engine_with(vec![Box::new(TransformStep)]);
        assert_eq!(engine.run(), Err(CoreEngineError::FirstStepMustBeSource));
    }

    #[test]
    fn fingerprint_is_reproducible_across_engines() {
        let mut a = engine_with(vec![Box::new(SourceStep), Box::new(TransformStep)]);
        let mut b = engine_with(vec![Box::new(SourceStep), Box::new(TransformStep)]);
        a.run().unwrap();
        b.run().unwrap();
        assert_eq!(a.flow_fingerprint(), b.flow_fingerprint());
    }
}
