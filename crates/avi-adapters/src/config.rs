//! Configuración del pipeline desde variables de entorno (con soporte `.env`).

use avi_tap::{PollPolicy, DEFAULT_TAP_URL};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::AviError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[derive(Debug, Clone, PartialEq)]
pub struct AviConfig {
    /// Directorio donde se escriben los tres artefactos.
    pub output_path: PathBuf,
    pub tap_url: String,
    pub poll: PollPolicy,
    pub http_timeout: Duration,
    /// Espera artificial del step placeholder.
    pub placeholder_delay: Duration,
    /// Re-ejecuta steps aunque su fichero de salida ya exista.
    pub force: bool,
}

impl Default for AviConfig {
    fn default() -> Self {
        AviConfig { output_path: PathBuf::from("./output"),
                    tap_url: DEFAULT_TAP_URL.to_string(),
                    poll: PollPolicy::default(),
                    http_timeout: Duration::from_secs(60),
                    placeholder_delay: Duration::from_secs(3),
                    force: false }
    }
}

impl AviConfig {
    pub fn from_env() -> Result<Self, AviError> {
        init_dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Variables ausentes toman el valor por defecto; valores no parseables
    /// son error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AviError>
        where F: Fn(&str) -> Option<String>
    {
        let defaults = AviConfig::default();
        let secs = |key: &'static str, default: Duration| -> Result<Duration, AviError> {
            match parse_var::<f64>(&lookup, key)? {
                None => Ok(default),
                Some(v) if v.is_finite() && v >= 0.0 => Ok(Duration::from_secs_f64(v)),
                Some(v) => Err(AviError::Config { var: key, value: v.to_string() }),
            }
        };
        let poll = PollPolicy { interval: secs("AVI_POLL_INTERVAL_SECS", defaults.poll.interval)?,
                                backoff: parse_var(&lookup, "AVI_POLL_BACKOFF")?.unwrap_or(defaults.poll.backoff),
                                max_interval: secs("AVI_MAX_POLL_INTERVAL_SECS", defaults.poll.max_interval)?,
                                timeout: secs("AVI_JOB_TIMEOUT_SECS", defaults.poll.timeout)? };
        Ok(AviConfig { output_path: lookup("AVI_OUTPUT_PATH").map(PathBuf::from).unwrap_or(defaults.output_path),
                       tap_url: lookup("AVI_TAP_URL").unwrap_or(defaults.tap_url),
                       poll,
                       http_timeout: secs("AVI_HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
                       placeholder_delay: secs("AVI_PLACEHOLDER_DELAY_SECS", defaults.placeholder_delay)?,
                       force: parse_flag(&lookup, "AVI_FORCE")?.unwrap_or(defaults.force) })
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn dummy_output(&self, output_file: &str) -> PathBuf {
        self.output_path.join(format!("dummyData_{output_file}.vot"))
    }

    pub fn download_output(&self, output_file: &str) -> PathBuf {
        self.output_path.join(format!("simulatedData_{output_file}.vot"))
    }

    pub fn process_output(&self, output_file: &str) -> PathBuf {
        self.output_path.join(output_file)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_path
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, AviError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim()
                        .parse()
                        .map(Some)
                        .map_err(|_| AviError::Config { var: key, value: raw }),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<bool>, AviError> {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(None),
        Some(v) => match v.as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(AviError::Config { var: key, value: v }),
        },
    }
}
