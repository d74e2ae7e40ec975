use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{StepKind, StepRunResult, StepSignal};
use crate::errors::CoreEngineError;
use crate::model::ArtifactSpec;

/// Resultado tipado de ejecutar un `TypedStep`.
pub enum StepRunResultTyped<Out: ArtifactSpec> {
    Success { outputs: Vec<Out> },
    SuccessWithSignals { outputs: Vec<Out>, signals: Vec<StepSignal> },
    Failure { error: CoreEngineError },
}

impl<Out: ArtifactSpec> StepRunResultTyped<Out> {
    /// Un único output o un error.
    pub fn from_result(res: Result<Out, CoreEngineError>) -> Self {
        match res {
            Ok(out) => Self::Success { outputs: vec![out] },
            Err(error) => Self::Failure { error },
        }
    }

    /// Convierte a `StepRunResult` neutro serializando los outputs.
    pub fn into_neutral(self) -> StepRunResult {
        match self {
            StepRunResultTyped::Success { outputs } => match encode_all(outputs) {
                Ok(outputs) => StepRunResult::Success { outputs },
                Err(error) => StepRunResult::Failure { error },
            },
            StepRunResultTyped::SuccessWithSignals { outputs, signals } => match encode_all(outputs) {
                Ok(outputs) => StepRunResult::SuccessWithSignals { outputs, signals },
                Err(error) => StepRunResult::Failure { error },
            },
            StepRunResultTyped::Failure { error } => StepRunResult::Failure { error },
        }
    }
}

fn encode_all<Out: ArtifactSpec>(outputs: Vec<Out>) -> Result<Vec<crate::model::Artifact>, CoreEngineError> {
    outputs.into_iter()
           .map(|o| o.into_artifact().map_err(CoreEngineError::from))
           .collect()
}

/// Interfaz de alto nivel para definir Steps con tipos fuertes
/// (Params / Input / Output). Un adaptador (abajo) la expone como
/// `StepDefinition` neutral.
pub trait TypedStep {
    /// Parámetros deserializables y clonables.
    type Params: DeserializeOwned + Serialize + Clone + Default;
    /// Tipo esperado como input.
    type Input: ArtifactSpec;
    /// Tipo producido como output.
    type Output: ArtifactSpec;

    /// Identificador estable del step dentro del flow.
    fn id(&self) -> &'static str;

    fn name(&self) -> &str {
        self.id()
    }

    fn kind(&self) -> StepKind;

    /// Parámetros deterministas con los que se construyó el step.
    fn params_default(&self) -> Self::Params {
        Default::default()
    }

    /// Ejecución tipada. Para `Source`, `input` será `None`.
    fn run_typed(&self, input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output>;
}

// -------------------------------------------------------------
// Adaptador: cualquier `TypedStep` implementa `StepDefinition` neutro.
// -------------------------------------------------------------
impl<T> crate::step::StepDefinition for T where T: TypedStep + std::fmt::Debug + 'static
{
    fn id(&self) -> &str {
        <Self as TypedStep>::id(self)
    }

    fn name(&self) -> &str {
        <Self as TypedStep>::name(self)
    }

    fn base_params(&self) -> Value {
        serde_json::to_value(self.params_default()).unwrap_or(Value::Null)
    }

    fn run(&self, ctx: &crate::model::ExecutionContext) -> StepRunResult {
        // Params no decodificables: se usan los del step.
        let params: T::Params = ctx.params_as().unwrap_or_else(|_| self.params_default());

        let typed_in = match ctx.input.as_ref().map(T::Input::from_artifact).transpose() {
            Ok(i) => i,
            Err(e) => return StepRunResult::Failure { error: e.into() },
        };

        <Self as TypedStep>::run_typed(self, typed_in, params).into_neutral()
    }

    fn kind(&self) -> StepKind {
        <Self as TypedStep>::kind(self)
    }
}
