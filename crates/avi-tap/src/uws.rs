//! Vocabulario UWS: fases de un job y lectura de los documentos de estado
//! y de error que devuelve el servicio.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;
use std::str::FromStr;

use crate::error::TapError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Pending,
    Queued,
    Executing,
    Completed,
    Error,
    Aborted,
    Unknown,
    Held,
    Suspended,
    Archived,
}

impl JobPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            JobPhase::Pending => "PENDING",
            JobPhase::Queued => "QUEUED",
            JobPhase::Executing => "EXECUTING",
            JobPhase::Completed => "COMPLETED",
            JobPhase::Error => "ERROR",
            JobPhase::Aborted => "ABORTED",
            JobPhase::Unknown => "UNKNOWN",
            JobPhase::Held => "HELD",
            JobPhase::Suspended => "SUSPENDED",
            JobPhase::Archived => "ARCHIVED",
        }
    }

    /// Fases en las que el job ya no avanza por sí solo.
    pub fn is_terminal(self) -> bool {
        matches!(self,
                 JobPhase::Completed | JobPhase::Error | JobPhase::Aborted | JobPhase::Archived | JobPhase::Held)
    }

    /// Acepta tanto el texto plano de `{job}/phase` como un documento XML que
    /// contenga `<uws:phase>`.
    pub fn from_document(body: &str) -> Result<Self, TapError> {
        let trimmed = body.trim();
        if !trimmed.starts_with('<') {
            return trimmed.parse();
        }
        let mut reader = Reader::from_str(trimmed);
        reader.trim_text(true);
        let mut in_phase = false;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => in_phase = e.local_name().as_ref() == b"phase",
                Ok(Event::Text(t)) if in_phase => {
                    let text = t.unescape().map_err(|_| TapError::UnknownPhase(trimmed.to_string()))?;
                    return text.trim().parse();
                }
                Ok(Event::End(_)) => in_phase = false,
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
        }
        Err(TapError::UnknownPhase(trimmed.to_string()))
    }
}

impl FromStr for JobPhase {
    type Err = TapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => JobPhase::Pending,
            "QUEUED" => JobPhase::Queued,
            "EXECUTING" | "RUN" => JobPhase::Executing,
            "COMPLETED" => JobPhase::Completed,
            "ERROR" => JobPhase::Error,
            "ABORTED" => JobPhase::Aborted,
            "UNKNOWN" => JobPhase::Unknown,
            "HELD" => JobPhase::Held,
            "SUSPENDED" => JobPhase::Suspended,
            "ARCHIVED" => JobPhase::Archived,
            _ => return Err(TapError::UnknownPhase(s.to_string())),
        })
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mensaje legible de `{job}/error`.
///
/// Los servicios TAP suelen devolver un VOTable con
/// `<INFO name="QUERY_STATUS" value="ERROR">mensaje</INFO>`; otros devuelven
/// texto plano o un documento UWS con `<message>`.
pub fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if !trimmed.starts_with('<') {
        return trimmed.to_string();
    }
    let mut reader = Reader::from_str(trimmed);
    reader.trim_text(true);

    let mut capture = false;
    let mut preferred: Option<String> = None;
    let mut all_text = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                capture = match e.local_name().as_ref() {
                    b"INFO" => e.attributes()
                                .flatten()
                                .any(|a| a.key.local_name().as_ref() == b"value" && a.value.as_ref() == b"ERROR"),
                    b"message" => true,
                    _ => false,
                };
            }
            Ok(Event::Text(t)) => {
                if let Ok(text) = t.unescape() {
                    let text = text.trim().to_string();
                    if capture && preferred.is_none() {
                        preferred = Some(text.clone());
                    }
                    all_text.push(text);
                }
            }
            Ok(Event::End(_)) => capture = false,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    preferred.filter(|m| !m.is_empty())
             .unwrap_or_else(|| if all_text.is_empty() { trimmed.to_string() } else { all_text.join(" ") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_xml_phase() {
        assert_eq!(JobPhase::from_document("EXECUTING\n").unwrap(), JobPhase::Executing);
        let xml = r#"<?xml version="1.0"?><uws:job xmlns:uws="http://www.ivoa.net/xml/UWS/v1.0">
            <uws:jobId>1234</uws:jobId><uws:phase>COMPLETED</uws:phase></uws:job>"#;
        assert_eq!(JobPhase::from_document(xml).unwrap(), JobPhase::Completed);
        assert!(matches!(JobPhase::from_document("RUNNING"), Err(TapError::UnknownPhase(_))));
    }

    #[test]
    fn terminal_phases() {
        assert!(JobPhase::Completed.is_terminal());
        assert!(JobPhase::Error.is_terminal());
        assert!(!JobPhase::Queued.is_terminal());
        assert!(!JobPhase::Executing.is_terminal());
    }

    #[test]
    fn error_message_prefers_query_status_info() {
        let doc = r#"<VOTABLE><RESOURCE type="results">
            <INFO name="QUERY_STATUS" value="ERROR">Incorrect ADQL query: column "foo" unknown</INFO>
            <INFO name="PROVIDER" value="CDS">VizieR</INFO>
        </RESOURCE></VOTABLE>"#;
        assert_eq!(error_message(doc), "Incorrect ADQL query: column \"foo\" unknown");
        assert_eq!(error_message("  plain failure "), "plain failure");
        assert_eq!(error_message("<err><message>boom</message></err>"), "boom");
    }
}
