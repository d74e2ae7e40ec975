//! Builder para `FlowEngine`.
//!
//! Obliga a declarar el primer paso (fuente) y a encadenar pasos cuyos tipos
//! de entrada y salida sean compatibles: `add_step` exige
//! `N::Input: SameAs<S::Output>`. Es la forma tipada de declarar las
//! dependencias entre tareas; la resolución la hace el engine, no los steps.
//!
//! ```ignore
//! let engine = FlowEngine::new()
//!     .first_step(DummyTaskStep::new(..))
//!     .add_step(DownloadDataStep::new(..))
//!     .add_step(ProcessDataStep::new(..))
//!     .build();
//! ```

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::engine::FlowEngine;
use crate::event::EventStore;
use crate::repo::FlowRepository;
use crate::step::{SameAs, StepDefinition, TypedStep};

/// Estado inicial del builder: sólo las stores.
#[derive(Debug)]
pub struct EngineBuilderInit<E: EventStore, R: FlowRepository> {
    pub event_store: E,
    pub repository: R,
}

impl<E: EventStore, R: FlowRepository> EngineBuilderInit<E, R> {
    /// Define el primer paso del flujo. Conceptualmente debe ser `Source`;
    /// el engine lo verifica al ejecutar (`FirstStepMustBeSource`).
    #[inline]
    pub fn first_step<S>(self, step: S) -> EngineBuilder<S, E, R>
        where S: TypedStep + Debug + 'static
    {
        debug_assert!(matches!(step.kind(), crate::step::StepKind::Source),
                      "El primer paso debe ser de tipo Source");

        EngineBuilder { event_store: self.event_store,
                        repository: self.repository,
                        steps: vec![Box::new(step)],
                        _out: PhantomData }
    }
}

/// Builder principal que acumula pasos y garantiza compatibilidad de tipos.
pub struct EngineBuilder<S: TypedStep + Debug + 'static, E: EventStore, R: FlowRepository> {
    event_store: E,
    repository: R,
    steps: Vec<Box<dyn StepDefinition>>,
    _out: PhantomData<S::Output>,
}

impl<S: TypedStep + Debug + 'static, E: EventStore, R: FlowRepository> EngineBuilder<S, E, R> {
    /// Añade el siguiente paso; su input debe ser el output del anterior.
    #[inline]
    pub fn add_step<N>(mut self, next: N) -> EngineBuilder<N, E, R>
        where N: TypedStep + Debug + 'static,
              N::Input: SameAs<S::Output>
    {
        self.steps.push(Box::new(next));

        EngineBuilder { event_store: self.event_store,
                        repository: self.repository,
                        steps: self.steps,
                        _out: PhantomData }
    }

    /// Construye el `FlowEngine` con la definición generada desde los pasos.
    #[inline]
    pub fn build(self) -> FlowEngine<E, R> {
        let mut engine = FlowEngine::new_with_stores(self.event_store, self.repository);
        engine.set_default_definition(crate::repo::build_flow_definition(self.steps));
        engine
    }
}
