//! Push payload decoder - converts raw callback bodies to typed notifications
//!
//! Every domain wraps its payload under a single top-level key (see
//! [`NotificationDomain::envelope_key`]). Decoding never panics: invalid
//! JSON, a missing envelope key or an unexpected shape all come back as a
//! [`DecodeError`] naming the domain.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::NotificationDomain;
use crate::model::Notification;

/// A push body that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to decode {domain} notification: {reason}")]
pub struct DecodeError {
    /// Domain whose decoder rejected the body
    pub domain: NotificationDomain,
    /// Human-readable explanation
    pub reason: String,
}

impl DecodeError {
    pub fn new(domain: NotificationDomain, reason: impl Into<String>) -> Self {
        Self {
            domain,
            reason: reason.into(),
        }
    }
}

/// Decode a raw push body for `domain`.
pub fn decode(domain: NotificationDomain, body: &[u8]) -> Result<Notification, DecodeError> {
    match domain {
        NotificationDomain::DeliveryInfo => {
            unwrap_envelope(domain, body).map(Notification::DeliveryInfo)
        }
        NotificationDomain::InboundMessage => {
            unwrap_envelope(domain, body).map(Notification::InboundMessages)
        }
        NotificationDomain::RoamingStatus => {
            unwrap_envelope(domain, body).map(Notification::RoamingStatus)
        }
    }
}

/// Encode a notification in the envelope shape the remote service pushes.
pub fn encode(notification: &Notification) -> serde_json::Result<Vec<u8>> {
    let domain = notification.domain();
    match notification {
        Notification::DeliveryInfo(n) => wrap_envelope(domain, n),
        Notification::InboundMessages(n) => wrap_envelope(domain, n),
        Notification::RoamingStatus(n) => wrap_envelope(domain, n),
    }
}

fn unwrap_envelope<T: DeserializeOwned>(
    domain: NotificationDomain,
    body: &[u8],
) -> Result<T, DecodeError> {
    let key = domain.envelope_key();

    let root: Value = serde_json::from_slice(body)
        .map_err(|e| DecodeError::new(domain, format!("invalid JSON: {e}")))?;

    let Value::Object(mut root) = root else {
        return Err(DecodeError::new(domain, "payload is not a JSON object"));
    };

    let inner = root
        .remove(key)
        .ok_or_else(|| DecodeError::new(domain, format!("missing envelope key `{key}`")))?;

    serde_json::from_value(inner)
        .map_err(|e| DecodeError::new(domain, format!("unexpected `{key}` shape: {e}")))
}

fn wrap_envelope<T: Serialize>(
    domain: NotificationDomain,
    inner: &T,
) -> serde_json::Result<Vec<u8>> {
    let mut root = Map::new();
    root.insert(domain.envelope_key().to_string(), serde_json::to_value(inner)?);
    serde_json::to_vec(&Value::Object(root))
}
