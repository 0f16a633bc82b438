//! Size-bounded request body collection.

use bytes::{BufMut, Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Reasons a request body could not be collected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BodyError {
    /// The body exceeded the configured limit
    #[error("Payload exceeds limit of {limit} bytes")]
    TooLarge {
        /// The configured limit in bytes
        limit: u64,
    },

    /// The connection failed while the body was being read
    #[error("Failed to read request body: {0}")]
    Transport(String),
}

/// Collect a chunked body, failing as soon as it grows past `limit` bytes.
///
/// Reading stops at the first chunk that crosses the limit, so an oversized
/// body never gets buffered in full.
pub(crate) async fn read_body<S, B, E>(stream: S, limit: u64) -> Result<Bytes, BodyError>
where
    S: Stream<Item = Result<B, E>>,
    B: bytes::Buf,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut body = BytesMut::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| BodyError::Transport(e.to_string()))?;

        if body.len() as u64 + chunk.remaining() as u64 > limit {
            return Err(BodyError::TooLarge { limit });
        }

        body.put(chunk);
    }

    Ok(body.freeze())
}
