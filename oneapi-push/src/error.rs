//! Error types for the oneapi-push crate.

use crate::domain::NotificationDomain;

/// Errors surfaced synchronously to the application.
///
/// Decode failures and listener panics happen on the receiver's own task
/// long after any caller returned; they reach listeners as
/// [`DecodeError`](crate::DecodeError) or the log, never this type.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The domain's receiver could not bind its port
    #[error("Failed to start {domain} receiver on port {port}: {source}")]
    Bind {
        /// Domain whose receiver failed to start
        domain: NotificationDomain,
        /// Configured port
        port: u16,
        #[source]
        source: callback_server::ServerError,
    },

    /// Invalid configuration provided
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The domain's receiver is not running, so there is nothing to advertise
    #[error("No {0} receiver is running")]
    NotRunning(NotificationDomain),

    /// The notify URL could not be built
    #[error("Invalid notify URL: {0}")]
    InvalidNotifyUrl(#[from] url::ParseError),
}

/// Errors from polling retrieval of inbound messages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to retrieve inbound messages: {0}")]
pub struct RetrievalError(pub String);

/// Convenience type alias for Results using PushError.
pub type Result<T> = std::result::Result<T, PushError>;
