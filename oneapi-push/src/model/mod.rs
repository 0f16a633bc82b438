//! Typed push notification payloads.
//!
//! One module per notification domain. Field names follow the remote JSON
//! schema through serde renames; nullable fields are `Option`s.

pub mod correlation;
pub mod delivery;
pub mod inbound;
pub mod roaming;

pub use correlation::{CorrelationMetadata, PushTarget};
pub use delivery::{DeliveryInfo, DeliveryInfoNotification, DeliveryStatus};
pub use inbound::{InboundMessage, InboundMessageNotification};
pub use roaming::{ExtendedData, Roaming, RoamingNotification, ServingMccMnc};

use crate::domain::NotificationDomain;

/// A decoded push notification from any domain.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DeliveryInfo(DeliveryInfoNotification),
    InboundMessages(InboundMessageNotification),
    RoamingStatus(RoamingNotification),
}

impl Notification {
    /// The domain this notification belongs to.
    pub fn domain(&self) -> NotificationDomain {
        match self {
            Notification::DeliveryInfo(_) => NotificationDomain::DeliveryInfo,
            Notification::InboundMessages(_) => NotificationDomain::InboundMessage,
            Notification::RoamingStatus(_) => NotificationDomain::RoamingStatus,
        }
    }

    /// Correlation data echoed back by the remote service, if any.
    pub fn correlation(&self) -> CorrelationMetadata {
        match self {
            Notification::DeliveryInfo(n) => CorrelationMetadata {
                client_correlator: n.client_correlator.clone(),
                callback_data: n.callback_data.clone(),
            },
            Notification::InboundMessages(n) => CorrelationMetadata {
                client_correlator: None,
                callback_data: n.callback_data.clone(),
            },
            Notification::RoamingStatus(n) => CorrelationMetadata {
                client_correlator: n.roaming.client_correlator.clone(),
                callback_data: n.roaming.callback_data.clone(),
            },
        }
    }

    pub fn as_delivery_info(&self) -> Option<&DeliveryInfoNotification> {
        match self {
            Notification::DeliveryInfo(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_inbound_messages(&self) -> Option<&InboundMessageNotification> {
        match self {
            Notification::InboundMessages(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_roaming_status(&self) -> Option<&RoamingNotification> {
        match self {
            Notification::RoamingStatus(n) => Some(n),
            _ => None,
        }
    }
}
