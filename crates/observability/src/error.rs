//! Fehlertypen des Observability-Crates

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Prometheus-Fehler: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Metriken sind kein gueltiges UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Logging konnte nicht initialisiert werden: {0}")]
    Logging(String),

    #[error("Ungueltiger Log-Filter: {0}")]
    Filter(String),
}

pub type ObservabilityResult<T> = std::result::Result<T, ObservabilityError>;
