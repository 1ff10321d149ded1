//! Error types for the boundary layer.
//!
//! The control core never fails; everything here comes from decoding
//! simulator frames, loading configuration, or running the listener.

use thiserror::Error;

/// A simulator frame that could not be turned into an event.
///
/// The offending frame is dropped; the connection stays up.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload was not valid JSON.
    #[error("malformed event payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload was JSON but not a `["event", {...}]` array.
    #[error("event payload is not an [name, data] array")]
    NotAnEvent,

    /// A telemetry field was absent.
    #[error("telemetry field '{0}' is missing")]
    MissingField(&'static str),

    /// A telemetry field could not be read as a number.
    #[error("telemetry field '{field}' is not a number: {value}")]
    InvalidNumber {
        field: &'static str,
        value: String,
    },

    /// A telemetry field parsed to NaN or infinity.
    #[error("telemetry field '{field}' is not finite: {value}")]
    NonFinite {
        field: &'static str,
        value: f64,
    },
}

/// Errors arising from configuration loading or validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File I/O error.
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing failed.
    #[error("parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    /// A field has an out-of-range value.
    #[error("field '{field}' has invalid value {value}: {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    /// Several fields failed validation.
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ConfigError>),
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Listener and connection errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound. Fatal at startup.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Top-level error for the binary.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("tracing init failed: {0}")]
    Tracing(String),
}
