//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SG_LOG_LEVEL`: Filter (z.B. `info` oder `skinnygate_signaling=debug`), Standard: info
//! - `SG_LOG_FORMAT`: Format (text/json), Standard: text
//!
//! Die Umgebung hat Vorrang vor den Werten aus der Konfigurationsdatei.

use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{ObservabilityError, ObservabilityResult};

pub const ENV_LEVEL: &str = "SG_LOG_LEVEL";
pub const ENV_FORMAT: &str = "SG_LOG_FORMAT";

/// Ausgabeformat der Logzeilen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `None` bei unbekanntem Format
    pub fn parsen(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Wertet Umgebung und Konfiguration aus
///
/// Ungueltige Formate fallen auf `text` zurueck.
pub fn format_bestimmen(konfiguriert: &str) -> LogFormat {
    std::env::var(ENV_FORMAT)
        .ok()
        .and_then(|f| LogFormat::parsen(&f))
        .or_else(|| LogFormat::parsen(konfiguriert))
        .unwrap_or(LogFormat::Text)
}

fn filter_bestimmen(level: &str) -> ObservabilityResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(ENV_LEVEL) {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|e| ObservabilityError::Filter(format!("{level}: {e}")))
}

/// Initialisiert das Logging-System.
///
/// Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) -> ObservabilityResult<()> {
    let filter = filter_bestimmen(level)?;

    let ergebnis = match format_bestimmen(format) {
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => fmt().with_env_filter(filter).with_target(true).try_init(),
    };
    ergebnis.map_err(|e| ObservabilityError::Logging(e.to_string()))
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}
