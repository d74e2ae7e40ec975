use std::marker::PhantomData;

use super::{StepDefinition, TypedStep};
use crate::repo::{build_flow_definition, FlowDefinition};

/// Marker trait: dos tipos son el mismo (sólo `T: SameAs<T>`).
pub trait SameAs<T> {}
impl<T> SameAs<T> for T {}

/// Pipeline tipado: el input del siguiente step debe coincidir en compilación
/// con el output del anterior.
///
///   let def = Pipe::new(DummyTaskStep::new(..)).then(DownloadDataStep::new(..)).build();
pub struct Pipe<S: TypedStep + 'static> {
    steps: Vec<Box<dyn StepDefinition>>,
    _out: PhantomData<<S as TypedStep>::Output>,
}

impl<S: TypedStep + std::fmt::Debug + 'static> Pipe<S> {
    pub fn new(step: S) -> Self {
        Self { steps: vec![Box::new(step)],
               _out: PhantomData }
    }

    pub fn then<N>(mut self, next: N) -> Pipe<N>
        where N: TypedStep + std::fmt::Debug + 'static,
              <N as TypedStep>::Input: SameAs<<S as TypedStep>::Output>
    {
        self.steps.push(Box::new(next));
        Pipe::<N> { steps: self.steps,
                    _out: PhantomData }
    }

    pub fn build(self) -> FlowDefinition {
        build_flow_definition(self.steps)
    }
}
