//! Step fuente: fichero placeholder que sólo marca la dependencia cumplida.

use avi_core::step::{StepKind, StepRunResultTyped, TypedStep};
use log::{debug, info};
use std::thread;

use super::TaskParams;
use crate::artifacts::PlaceholderArtifact;
use crate::config::AviConfig;
use crate::error::AviError;
use crate::fsio::{path_string, read, write_atomic};

pub const PLACEHOLDER_MARKER: &str = "dummyStuff";

#[derive(Debug, Clone)]
pub struct DummyTaskStep {
    config: AviConfig,
    params: TaskParams,
}

impl DummyTaskStep {
    pub fn new(config: AviConfig, params: TaskParams) -> Self {
        Self { config, params }
    }

    fn execute(&self, params: &TaskParams) -> Result<PlaceholderArtifact, AviError> {
        let name = params.require_output_file()?;
        let path = self.config.dummy_output(name);

        if path.exists() && !self.config.force {
            info!("placeholder {} already exists, skipping", path.display());
            let marker = String::from_utf8_lossy(&read(&path)?).into_owned();
            return Ok(PlaceholderArtifact { path: path_string(&path),
                                            marker,
                                            schema_version: 1 });
        }

        debug!("placeholder delay {:?}", self.config.placeholder_delay);
        thread::sleep(self.config.placeholder_delay);
        write_atomic(&path, PLACEHOLDER_MARKER.as_bytes())?;
        info!("wrote placeholder {}", path.display());
        Ok(PlaceholderArtifact { path: path_string(&path),
                                 marker: PLACEHOLDER_MARKER.to_string(),
                                 schema_version: 1 })
    }
}

impl TypedStep for DummyTaskStep {
    type Params = TaskParams;
    type Input = PlaceholderArtifact; // ignorado (Source)
    type Output = PlaceholderArtifact;

    fn id(&self) -> &'static str {
        "dummy_task"
    }

    fn kind(&self) -> StepKind {
        StepKind::Source
    }

    fn params_default(&self) -> Self::Params {
        self.params.clone()
    }

    fn run_typed(&self, _input: Option<Self::Input>, params: Self::Params) -> StepRunResultTyped<Self::Output> {
        StepRunResultTyped::from_result(self.execute(&params).map_err(|e| e.into_core(self.id())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(dir: &std::path::Path) -> AviConfig {
        AviConfig { placeholder_delay: Duration::ZERO,
                    ..AviConfig::default().with_output_path(dir) }
    }

    #[test]
    fn writes_marker_file() {
        let dir = tempfile::tempdir().unwrap();
        let step = DummyTaskStep::new(config(dir.path()), TaskParams::new("", "run1"));
        let out = step.execute(&step.params).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("dummyData_run1.vot")).unwrap(), "dummyStuff");
        assert_eq!(out.marker, "dummyStuff");
    }

    #[test]
    fn existing_output_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dummyData_run1.vot");
        std::fs::write(&path, "previous").unwrap();
        let step = DummyTaskStep::new(config(dir.path()), TaskParams::new("", "run1"));
        let out = step.execute(&step.params).unwrap();
        assert_eq!(out.marker, "previous");

        let forced = DummyTaskStep::new(AviConfig { force: true,
                                                    ..config(dir.path()) },
                                        TaskParams::new("", "run1"));
        forced.execute(&forced.params).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "dummyStuff");
    }

    #[test]
    fn blank_output_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let step = DummyTaskStep::new(config(dir.path()), TaskParams::new("", "  "));
        assert!(matches!(step.execute(&step.params), Err(AviError::MissingParameter("output_file"))));
    }
}
