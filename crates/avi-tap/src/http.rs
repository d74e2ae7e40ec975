//! Cliente HTTP bloqueante contra un endpoint TAP real.

use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use reqwest::redirect::Policy;
use reqwest::{StatusCode, Url};
use std::time::Duration;

use crate::error::{Result, TapError};
use crate::service::{JobRef, TapService};
use crate::uws::{error_message, JobPhase};

/// Servicio por defecto (VizieR).
pub const DEFAULT_TAP_URL: &str = "http://tapvizier.u-strasbg.fr/TAPVizieR/tap";

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone)]
pub struct HttpTapService {
    base: Url,
    client: Client,
}

impl HttpTapService {
    /// Las redirecciones se siguen a mano: la creación del job responde con
    /// `303 See Other` y la URL del job va en `Location`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base = Url::parse(base_url).map_err(|_| TapError::InvalidUrl(base_url.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(timeout)
                                      .connect_timeout(Duration::from_secs(10))
                                      .redirect(Policy::none())
                                      .build()?;
        Ok(HttpTapService { base, client })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn resolve(&self, from: &str, location: &str) -> Result<String> {
        let from = Url::parse(from).unwrap_or_else(|_| self.base.clone());
        from.join(location)
            .map(String::from)
            .map_err(|_| TapError::InvalidUrl(location.to_string()))
    }

    fn location(resp: &Response) -> Option<String> {
        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    fn get(&self, url: &str) -> Result<Response> {
        let mut current = url.to_string();
        for _ in 0..=MAX_REDIRECTS {
            let resp = self.client.get(&current).send()?;
            if resp.status().is_redirection() {
                if let Some(loc) = Self::location(&resp) {
                    current = self.resolve(&current, &loc)?;
                    debug!("following redirect to {current}");
                    continue;
                }
            }
            return check("GET", &current, resp);
        }
        Err(TapError::Status { method: "GET",
                               status: StatusCode::LOOP_DETECTED.as_u16(),
                               url: current })
    }

    fn post_phase(&self, job: &JobRef, phase: &str) -> Result<()> {
        let url = job.endpoint("phase");
        let resp = self.client.post(&url).form(&[("PHASE", phase)]).send()?;
        if resp.status().is_redirection() {
            return Ok(());
        }
        check("POST", &url, resp).map(|_| ())
    }
}

fn check(method: &'static str, url: &str, resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(TapError::Status { method,
                               status: status.as_u16(),
                               url: url.to_string() })
    }
}

impl TapService for HttpTapService {
    fn submit(&self, query: &str) -> Result<JobRef> {
        let url = self.base.join("async").map_err(|_| TapError::InvalidUrl(self.base.to_string()))?;
        let resp = self.client
                       .post(url.clone())
                       .form(&[("REQUEST", "doQuery"), ("LANG", "ADQL"), ("FORMAT", "votable"), ("QUERY", query)])
                       .send()?;
        let status = resp.status();
        if !(status.is_redirection() || status.is_success()) {
            return Err(TapError::Status { method: "POST",
                                          status: status.as_u16(),
                                          url: url.to_string() });
        }
        let location = Self::location(&resp).ok_or(TapError::MissingLocation)?;
        let job = JobRef::new(self.resolve(url.as_str(), &location)?);
        debug!("created job {} at {}", job.id(), job.url);
        Ok(job)
    }

    fn start(&self, job: &JobRef) -> Result<()> {
        self.post_phase(job, "RUN")
    }

    fn phase(&self, job: &JobRef) -> Result<JobPhase> {
        let body = self.get(&job.endpoint("phase"))?.text()?;
        JobPhase::from_document(&body)
    }

    fn error(&self, job: &JobRef) -> Result<String> {
        let body = self.get(&job.endpoint("error"))?.text()?;
        Ok(error_message(&body))
    }

    fn result(&self, job: &JobRef) -> Result<Vec<u8>> {
        let bytes = self.get(&job.endpoint("results/result"))?.bytes()?;
        Ok(bytes.to_vec())
    }

    fn abort(&self, job: &JobRef) -> Result<()> {
        self.post_phase(job, "ABORT")
    }

    fn delete(&self, job: &JobRef) -> Result<()> {
        let resp = self.client.delete(&job.url).send()?;
        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            return Ok(());
        }
        if status == StatusCode::METHOD_NOT_ALLOWED {
            // algunos servicios sólo aceptan la forma POST ACTION=DELETE
            warn!("DELETE not allowed for job {}, retrying with ACTION=DELETE", job.id());
            let resp = self.client.post(&job.url).form(&[("ACTION", "DELETE")]).send()?;
            if resp.status().is_redirection() {
                return Ok(());
            }
            return check("POST", &job.url, resp).map(|_| ());
        }
        check("DELETE", &job.url, resp).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let svc = HttpTapService::new(DEFAULT_TAP_URL, Duration::from_secs(5)).unwrap();
        assert_eq!(svc.base_url(), "http://tapvizier.u-strasbg.fr/TAPVizieR/tap/");
    }

    #[test]
    fn relative_location_is_resolved() {
        let svc = HttpTapService::new("http://tap.example.org/tap", Duration::from_secs(5)).unwrap();
        let url = svc.resolve("http://tap.example.org/tap/async", "/tap/async/42").unwrap();
        assert_eq!(url, "http://tap.example.org/tap/async/42");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(HttpTapService::new("not a url", Duration::from_secs(1)), Err(TapError::InvalidUrl(_))));
    }
}
