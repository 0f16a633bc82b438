//! Delivery receipt notifications.

use serde::{Deserialize, Deserializer, Serialize};

/// Payload of a delivery receipt push, found under `deliveryInfoNotification`.
///
/// The remote service sends `deliveryInfo` either as a single object or as a
/// list; both decode to a list with one entry per message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfoNotification {
    #[serde(deserialize_with = "one_or_many")]
    pub delivery_info: Vec<DeliveryInfo>,
    pub callback_data: Option<String>,
    pub client_correlator: Option<String>,
}

/// Delivery outcome for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInfo {
    /// Destination the message was sent to
    pub address: String,
    pub delivery_status: DeliveryStatus,
    pub message_id: Option<String>,
}

/// Delivery status reported by the network.
///
/// Statuses compare and hash by their wire name, so a hand-built
/// `Other("DeliveredToTerminal")` equals `DeliveredToTerminal`. Decoding
/// normalizes known names to their variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryStatus {
    DeliveredToTerminal,
    DeliveredToNetwork,
    DeliveryUncertain,
    DeliveryImpossible,
    MessageWaiting,
    DeliveryNotificationNotSupported,
    /// A status this library does not know, kept verbatim
    Other(String),
}

impl PartialEq for DeliveryStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DeliveryStatus {}

impl std::hash::Hash for DeliveryStatus {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl DeliveryStatus {
    /// Whether the message reached the handset.
    pub fn is_delivered(&self) -> bool {
        *self == DeliveryStatus::DeliveredToTerminal
    }

    /// Whether the network has given up on the message.
    pub fn is_final_failure(&self) -> bool {
        *self == DeliveryStatus::DeliveryImpossible
    }

    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::DeliveredToTerminal => "DeliveredToTerminal",
            DeliveryStatus::DeliveredToNetwork => "DeliveredToNetwork",
            DeliveryStatus::DeliveryUncertain => "DeliveryUncertain",
            DeliveryStatus::DeliveryImpossible => "DeliveryImpossible",
            DeliveryStatus::MessageWaiting => "MessageWaiting",
            DeliveryStatus::DeliveryNotificationNotSupported => {
                "DeliveryNotificationNotSupported"
            }
            DeliveryStatus::Other(status) => status,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DeliveryStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "DeliveredToTerminal" => DeliveryStatus::DeliveredToTerminal,
            "DeliveredToNetwork" => DeliveryStatus::DeliveredToNetwork,
            "DeliveryUncertain" => DeliveryStatus::DeliveryUncertain,
            "DeliveryImpossible" => DeliveryStatus::DeliveryImpossible,
            "MessageWaiting" => DeliveryStatus::MessageWaiting,
            "DeliveryNotificationNotSupported" => {
                DeliveryStatus::DeliveryNotificationNotSupported
            }
            _ => DeliveryStatus::Other(status),
        }
    }
}

impl From<DeliveryStatus> for String {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<DeliveryInfo>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(DeliveryInfo),
        Many(Vec<DeliveryInfo>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(info) => vec![info],
        OneOrMany::Many(infos) => infos,
    })
}
