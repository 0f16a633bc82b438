//! Error types for the callback-server crate.

use std::net::SocketAddr;

/// Errors that can occur while starting the callback server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The socket could not be bound, usually because the port is held by
    /// another process or component
    #[error("Failed to bind callback server to {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying transport error
        #[source]
        source: warp::Error,
    },

    /// The server is already running on a different port
    #[error("Callback server already running on port {port}")]
    AlreadyRunning {
        /// Port the running server is bound to
        port: u16,
    },
}

/// Convenience type alias for Results using ServerError.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_display() {
        let error = ServerError::AlreadyRunning { port: 3001 };
        assert_eq!(error.to_string(), "Callback server already running on port 3001");
    }
}
