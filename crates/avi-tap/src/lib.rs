//! avi-tap: cliente del protocolo TAP asíncrono (UWS) para consultas ADQL.
pub mod error;
pub mod http;
pub mod job;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod service;
pub mod uws;

pub use error::TapError;
pub use http::{HttpTapService, DEFAULT_TAP_URL};
pub use job::{AsyncJob, CancellationToken, PollPolicy};
pub use service::{JobRef, TapService};
pub use uws::JobPhase;
