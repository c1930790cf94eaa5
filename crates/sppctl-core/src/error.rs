//! Error types for spp-ctl.
//!
//! The taxonomy follows how a failure should be reported to a REST caller:
//! transport failures mean the worker is presumed dead, protocol failures mean
//! the worker answered but refused the command, and key failures mean the
//! request was rejected before anything reached a worker.

use thiserror::Error;

/// Main error type for the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    // Transport errors
    #[error("{process}: {command}: no reply ({reason})")]
    NoReply {
        /// Process label such as `vf(2)`.
        process: String,
        command: String,
        reason: String,
    },

    // Worker-reported errors
    #[error("command error: {message}")]
    Protocol {
        message: String,
        /// Decoded reply carrying the error, passed through to callers.
        payload: serde_json::Value,
    },

    // Request validation errors
    #[error("key({key}) required.")]
    KeyRequired { key: String },

    #[error("invalid key({key}): {value}.")]
    KeyInvalid { key: String, value: String },

    // Registry errors
    #[error("{what} not found.")]
    NotFound { what: String },

    #[error("{process} does not accept command: {command}")]
    Unsupported { process: String, command: String },

    // Topology errors
    #[error("CPU layout unavailable: {message}")]
    LayoutUnavailable { message: String },

    // Ambient errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

impl From<std::io::Error> for BrokerError {
    fn from(err: std::io::Error) -> Self {
        BrokerError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BrokerError {
    pub fn key_required(key: impl Into<String>) -> Self {
        BrokerError::KeyRequired { key: key.into() }
    }

    pub fn key_invalid(key: impl Into<String>, value: impl std::fmt::Display) -> Self {
        BrokerError::KeyInvalid {
            key: key.into(),
            value: value.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        BrokerError::NotFound { what: what.into() }
    }

    /// HTTP status code this error is reported with.
    ///
    /// - 400: the request was invalid or the worker rejected the command
    /// - 404: the referenced process is not registered
    /// - 500: transport failures and broker-internal errors
    pub fn status_code(&self) -> u16 {
        match self {
            BrokerError::KeyRequired { .. }
            | BrokerError::KeyInvalid { .. }
            | BrokerError::Protocol { .. } => 400,

            BrokerError::NotFound { .. } => 404,

            _ => 500,
        }
    }

    /// Whether the failure means the worker process is presumed dead.
    pub fn is_transport(&self) -> bool {
        matches!(self, BrokerError::NoReply { .. })
    }
}
