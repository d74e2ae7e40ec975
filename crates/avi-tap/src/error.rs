use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TapError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("invalid service URL '{0}'")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {status} for {method} {url}")]
    Status { method: &'static str, status: u16, url: String },
    #[error("job creation response carried no Location header")]
    MissingLocation,
    #[error("unrecognised job phase '{0}'")]
    UnknownPhase(String),
    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },
    #[error("job {job_id} was aborted by the service")]
    JobAborted { job_id: String },
    #[error("job {job_id} did not finish within {timeout:?}")]
    Timeout { job_id: String, timeout: Duration },
    #[error("wait for job {job_id} was cancelled")]
    Cancelled { job_id: String },
    #[error("job has not been submitted yet")]
    NotSubmitted,
    #[error("job {job_id} finished in phase {phase}, no result available")]
    NoResult { job_id: String, phase: String },
}

pub type Result<T> = std::result::Result<T, TapError>;
