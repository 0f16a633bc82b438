//! Handing accepted callback bodies to the consuming crate.
//!
//! This module provides the [`CallbackHandler`] seam between the HTTP layer
//! and whatever decodes and dispatches the payloads, plus a channel-backed
//! handler for consumers that prefer to pull payloads from a queue.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

/// Generic payload for an accepted push callback.
///
/// This represents an undecoded notification received via HTTP. It carries
/// the raw body and the request line, with no domain-specific context.
#[derive(Debug, Clone)]
pub struct CallbackPayload {
    /// HTTP method the remote service used
    pub method: String,
    /// Request path, including any sub-path after the notify URL
    pub path: String,
    /// The raw request body
    pub body: Bytes,
    /// When the receiver finished reading the body
    pub received_at: DateTime<Utc>,
}

/// Receives every callback body accepted by a [`CallbackServer`].
///
/// The server awaits `handle` before acknowledging the request, so any work
/// done here completes before a graceful stop releases the port.
///
/// [`CallbackServer`]: crate::CallbackServer
#[async_trait]
pub trait CallbackHandler: Send + Sync + 'static {
    /// Process one accepted payload. Failures must be dealt with here; the
    /// remote sender always gets a success acknowledgment.
    async fn handle(&self, payload: CallbackPayload);
}

/// Forwards payloads into an unbounded channel.
///
/// # Example
///
/// ```
/// use tokio::sync::mpsc;
/// use callback_server::{CallbackPayload, ChannelHandler};
///
/// let (tx, mut rx) = mpsc::unbounded_channel::<CallbackPayload>();
/// let handler = ChannelHandler::new(tx);
/// ```
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    sender: mpsc::UnboundedSender<CallbackPayload>,
}

impl ChannelHandler {
    /// Create a handler that forwards into `sender`.
    pub fn new(sender: mpsc::UnboundedSender<CallbackPayload>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl CallbackHandler for ChannelHandler {
    async fn handle(&self, payload: CallbackPayload) {
        // Ignore errors if the receiver is dropped
        if self.sender.send(payload).is_err() {
            tracing::debug!("Callback payload dropped: channel receiver is gone");
        }
    }
}
