//! Notification domains.

use std::fmt;

/// The category of a push notification.
///
/// Each domain has its own decoder, listener set and receiver port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationDomain {
    /// Delivery receipts for outbound messages
    DeliveryInfo,
    /// Messages received on a subscribed destination address
    InboundMessage,
    /// Roaming status (HLR) query results
    RoamingStatus,
}

impl NotificationDomain {
    /// All domains, in a stable order.
    pub const ALL: [NotificationDomain; 3] = [
        NotificationDomain::DeliveryInfo,
        NotificationDomain::InboundMessage,
        NotificationDomain::RoamingStatus,
    ];

    /// Receiver port used when the configuration does not override it.
    pub fn default_port(self) -> u16 {
        match self {
            NotificationDomain::DeliveryInfo => 3000,
            NotificationDomain::InboundMessage => 3001,
            NotificationDomain::RoamingStatus => 3002,
        }
    }

    /// Top-level JSON key wrapping every payload of this domain.
    pub fn envelope_key(self) -> &'static str {
        match self {
            NotificationDomain::DeliveryInfo => "deliveryInfoNotification",
            NotificationDomain::InboundMessage => "inboundSMSMessageList",
            NotificationDomain::RoamingStatus => "terminalRoamingStatusList",
        }
    }

    /// Short name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationDomain::DeliveryInfo => "deliveryInfo",
            NotificationDomain::InboundMessage => "inboundMessage",
            NotificationDomain::RoamingStatus => "roamingStatus",
        }
    }
}

impl fmt::Display for NotificationDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
