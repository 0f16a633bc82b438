//! Correlation data threaded from an outbound request to its push.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Identifiers the remote service echoes back on push.
///
/// The outbound request layer attaches these to a subscription or query;
/// the matching notification carries them unchanged. Nothing in this crate
/// interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMetadata {
    pub client_correlator: Option<String>,
    pub callback_data: Option<String>,
}

impl CorrelationMetadata {
    /// Metadata with a freshly generated client correlator.
    pub fn generate() -> Self {
        Self {
            client_correlator: Some(Uuid::new_v4().to_string()),
            callback_data: None,
        }
    }

    pub fn with_callback_data(mut self, callback_data: impl Into<String>) -> Self {
        self.callback_data = Some(callback_data.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.client_correlator.is_none() && self.callback_data.is_none()
    }
}

/// What the outbound layer advertises when subscribing: where to push and
/// how to tag the push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub notify_url: Url,
    pub correlation: CorrelationMetadata,
}
