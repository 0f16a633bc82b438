//! Inbound SMS notifications.

use serde::{Deserialize, Serialize};

/// Payload of an inbound message push, found under `inboundSMSMessageList`.
///
/// The same shape is returned when pending messages are retrieved by
/// polling, see [`InboundMessageRetriever`](crate::InboundMessageRetriever).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessageNotification {
    #[serde(rename = "inboundSMSMessage")]
    pub messages: Vec<InboundMessage>,
    pub number_of_messages_in_this_batch: Option<u32>,
    pub total_number_of_pending_messages: Option<u32>,
    #[serde(rename = "resourceURL")]
    pub resource_url: Option<String>,
    pub callback_data: Option<String>,
}

impl InboundMessageNotification {
    /// True when the batch carries no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// A single message received on a subscribed destination address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub sender_address: String,
    pub destination_address: String,
    pub message: String,
    pub message_id: Option<String>,
    /// Receive time as sent by the remote service
    pub date_time: Option<String>,
    #[serde(rename = "resourceURL")]
    pub resource_url: Option<String>,
}
