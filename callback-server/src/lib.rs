//! Generic HTTP callback receiver for OneAPI push notifications.
//!
//! This crate provides a lightweight embedded HTTP server that accepts the
//! out-of-band "push" calls a remote service makes to a notify URL. It is
//! generic: it has no knowledge of notification domains or payload shapes.
//!
//! # Overview
//!
//! The callback server consists of three main components:
//!
//! - [`CallbackServer`]: HTTP server that binds to a local port, reads each
//!   request body under a size limit and acknowledges it with `200 OK`.
//! - [`CallbackHandler`]: Receives every accepted request body. The HTTP
//!   acknowledgment is sent only after the handler returns, so a graceful
//!   stop drains handler work as well as the transport.
//! - [`CallbackPayload`]: The raw body plus the time it was received.
//!
//! # Architecture
//!
//! The callback server is designed to be a thin HTTP layer that:
//!
//! 1. Binds to a configured port (or an ephemeral one when the port is `0`)
//! 2. Accepts any method on any path
//! 3. Rejects bodies larger than the configured limit with `413`
//! 4. Hands every other body to the handler and acknowledges with `200`
//!
//! Decoding and listener fan-out belong to the consuming crate.
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use callback_server::{CallbackServer, ChannelHandler, CallbackPayload};
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callback_server::ServerError> {
//!     let (tx, mut rx) = mpsc::unbounded_channel::<CallbackPayload>();
//!
//!     let mut server = CallbackServer::new(
//!         "0.0.0.0".parse().unwrap(),
//!         64 * 1024,
//!         Arc::new(ChannelHandler::new(tx)),
//!     );
//!     let addr = server.start(3001).await?;
//!     println!("Callback server listening at: {addr}");
//!
//!     while let Some(payload) = rx.recv().await {
//!         println!("Received {} bytes at {}", payload.body.len(), payload.received_at);
//!     }
//!
//!     server.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Private Workspace Crate
//!
//! This crate is intended for internal use within the workspace and is not
//! published to crates.io.

mod body;
mod error;
pub mod handler;
mod server;

pub use body::BodyError;
pub use error::{Result, ServerError};
pub use handler::{CallbackHandler, CallbackPayload, ChannelHandler};
pub use server::{detect_local_ip, CallbackServer};
