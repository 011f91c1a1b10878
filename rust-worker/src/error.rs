//! Error types for the notification pipeline.

use thiserror::Error;

/// Result type for pipeline operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur while dispatching shipment notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The invocation payload is structurally invalid.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Startup configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The mail transport rejected or failed to deliver a message.
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// The subscription store query failed.
    #[error("Subscription store error: {0}")]
    Store(String),

    /// Template rendering failed.
    #[error("Template rendering error: {0}")]
    Template(String),

    /// A document could not be fetched or was not a PDF.
    #[error("Document error: {0}")]
    Document(String),
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Transport(err.to_string())
    }
}

impl From<handlebars::RenderError> for NotifyError {
    fn from(err: handlebars::RenderError) -> Self {
        NotifyError::Template(err.to_string())
    }
}
