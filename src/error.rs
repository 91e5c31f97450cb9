//! Error types for the relay.

use thiserror::Error;

/// Result type for relay operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures that can end an authentication attempt.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Session data handed to us by the page is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An assertion endpoint answered with something other than 200.
    #[error("Assertion endpoint {url} answered with HTTP {status}")]
    ExchangeHttp { url: String, status: u16 },

    /// 200 response that does not carry a usable assertion.
    #[error("Invalid assertion: {0}")]
    InvalidAssertion(String),

    /// The form was submitted but the relying party never took over.
    #[error("Returning to the service failed")]
    ReturnTimeout,

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The widget rejected or was aborted.
    #[error("Widget error: {0}")]
    Widget(String),
}

impl BridgeError {
    /// Short machine-readable kind, used as the telemetry message prefix.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::Configuration(_) => "configuration",
            BridgeError::ExchangeHttp { .. } => "exchange_http",
            BridgeError::InvalidAssertion(_) => "invalid_assertion",
            BridgeError::ReturnTimeout => "return_timeout",
            BridgeError::Transport(_) => "transport",
            BridgeError::Widget(_) => "widget",
        }
    }
}
