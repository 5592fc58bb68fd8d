//! Layered error definitions
//!
//! Categorized by source: config / transport / codec

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Transport Errors =====
    /// Transport endpoint could not be created (bind / connect / register)
    #[error("transport '{channel}' setup error: {message}")]
    TransportSetup { channel: String, message: String },

    /// Handoff of a sample to a transport failed
    #[error("transport '{channel}' send error: {message}")]
    TransportSend { channel: String, message: String },

    // ===== Codec Errors =====
    /// Wire payload could not be encoded or decoded
    #[error("codec error: {message}")]
    Codec { message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create transport setup error
    pub fn transport_setup(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportSetup {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create transport send error
    pub fn transport_send(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportSend {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create codec error
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}
