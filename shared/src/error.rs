//! Error types for the conversation connector actions.
//!
//! Callers match on the rendered message text, so every variant's `Display`
//! is the exact literal the actions have always produced.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message emitted when a Facebook event is neither a text message nor a postback.
pub const UNSUPPORTED_EVENT_MESSAGE: &str = "Neither message.text event detected nor postback.payload event detected. Please add appropriate code to handle a different facebook event.";

/// Errors that can occur in the connector actions.
#[derive(Error, Debug)]
pub enum Error {
    /// A required parameter is missing or malformed. The message is reported verbatim.
    #[error("{0}")]
    Validation(String),

    /// Package metadata or credential store lookup failed
    #[error("{0}")]
    AuthLookup(String),

    /// Channel payload has no recognized event shape
    #[error("{}", UNSUPPORTED_EVENT_MESSAGE)]
    UnsupportedEvent,

    /// Destination is not an absolute URI
    #[error("Invalid URI \"{0}\"")]
    InvalidUri(String),

    /// Outbound post returned a non-2xx status
    #[error("Action returned with status code {code}, message: {reason}")]
    HttpStatus { code: u16, reason: String },

    /// Outbound request never produced a response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Webhook signature or verify token mismatch
    #[error("Signature error: {0}")]
    Signature(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Legacy error name callers key off (`AssertionError` for failed parameter checks).
    pub fn name(&self) -> &'static str {
        match self {
            Error::Validation(_) => "AssertionError",
            Error::AuthLookup(_) => "AuthLookupError",
            Error::UnsupportedEvent => "UnsupportedEventError",
            Error::InvalidUri(_) => "InvalidUriError",
            Error::HttpStatus { .. } => "HttpStatusError",
            Error::Transport(_) => "TransportError",
            Error::Signature(_) => "SignatureError",
            Error::Config(_) => "ConfigError",
            Error::Serialization(_) => "SerializationError",
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) | Error::UnsupportedEvent | Error::Serialization(_) => 400,
            Error::Signature(_) => 403,
            Error::AuthLookup(_) | Error::HttpStatus { .. } | Error::Transport(_) => 502,
            _ => 500,
        }
    }
}
