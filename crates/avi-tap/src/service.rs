use std::fmt::Debug;

use crate::error::Result;
use crate::uws::JobPhase;

/// Referencia a un job UWS creado en el servicio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRef {
    /// URL absoluta del recurso del job.
    pub url: String,
}

impl JobRef {
    pub fn new(url: impl Into<String>) -> Self {
        JobRef { url: url.into() }
    }

    /// Último segmento de la URL del job.
    pub fn id(&self) -> &str {
        self.url.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.url)
    }

    pub fn endpoint(&self, suffix: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), suffix)
    }
}

/// Operaciones del protocolo TAP asíncrono que necesita el cliente.
pub trait TapService: Send + Sync + Debug {
    /// Crea un job ADQL en fase `PENDING`.
    fn submit(&self, query: &str) -> Result<JobRef>;
    fn start(&self, job: &JobRef) -> Result<()>;
    fn phase(&self, job: &JobRef) -> Result<JobPhase>;
    /// Mensaje de error de un job en fase `ERROR`.
    fn error(&self, job: &JobRef) -> Result<String>;
    /// Cuerpo crudo del resultado, sin reinterpretar.
    fn result(&self, job: &JobRef) -> Result<Vec<u8>>;
    fn abort(&self, job: &JobRef) -> Result<()>;
    fn delete(&self, job: &JobRef) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_is_last_segment() {
        let job = JobRef::new("http://tap.example.org/tap/async/1712/");
        assert_eq!(job.id(), "1712");
        assert_eq!(job.endpoint("phase"), "http://tap.example.org/tap/async/1712/phase");
    }
}
