//! Configuration types for the oneapi-push crate
//!
//! This module defines the settings that control where each domain's
//! receiver binds, how large a push body may be, and which host is
//! advertised in notify URLs.

use std::net::{IpAddr, Ipv4Addr};

use crate::domain::NotificationDomain;
use crate::error::PushError;

/// Configuration for the PushDispatcher
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Receiver port for delivery receipts; `0` picks an ephemeral port
    /// Default: 3000
    pub delivery_info_port: u16,

    /// Receiver port for inbound messages; `0` picks an ephemeral port
    /// Default: 3001
    pub inbound_message_port: u16,

    /// Receiver port for roaming status; `0` picks an ephemeral port
    /// Default: 3002
    pub roaming_status_port: u16,

    /// Local address every receiver binds to
    /// Default: 0.0.0.0
    pub bind_address: IpAddr,

    /// Host advertised in notify URLs. When unset, the local outbound IP is
    /// detected, falling back to 127.0.0.1
    /// Default: None
    pub public_host: Option<String>,

    /// Largest push body accepted, in bytes
    /// Default: 1 MiB
    pub max_body_bytes: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            delivery_info_port: NotificationDomain::DeliveryInfo.default_port(),
            inbound_message_port: NotificationDomain::InboundMessage.default_port(),
            roaming_status_port: NotificationDomain::RoamingStatus.default_port(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            public_host: None,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl PushConfig {
    /// Create a new PushConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Loopback-only receivers on ephemeral ports, advertised as 127.0.0.1
    pub fn local() -> Self {
        Self {
            delivery_info_port: 0,
            inbound_message_port: 0,
            roaming_status_port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            public_host: Some("127.0.0.1".to_string()),
            ..Default::default()
        }
    }

    /// Configured port for `domain`
    pub fn port(&self, domain: NotificationDomain) -> u16 {
        match domain {
            NotificationDomain::DeliveryInfo => self.delivery_info_port,
            NotificationDomain::InboundMessage => self.inbound_message_port,
            NotificationDomain::RoamingStatus => self.roaming_status_port,
        }
    }

    /// Override the port for `domain`
    pub fn with_port(mut self, domain: NotificationDomain, port: u16) -> Self {
        match domain {
            NotificationDomain::DeliveryInfo => self.delivery_info_port = port,
            NotificationDomain::InboundMessage => self.inbound_message_port = port,
            NotificationDomain::RoamingStatus => self.roaming_status_port = port,
        }
        self
    }

    /// Override the advertised host
    pub fn with_public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    /// Override the body size limit
    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), PushError> {
        if self.max_body_bytes == 0 {
            return Err(PushError::Configuration(
                "max_body_bytes must be greater than 0".to_string(),
            ));
        }

        for (i, a) in NotificationDomain::ALL.iter().enumerate() {
            for b in &NotificationDomain::ALL[i + 1..] {
                let port = self.port(*a);
                if port != 0 && port == self.port(*b) {
                    return Err(PushError::Configuration(format!(
                        "{a} and {b} receivers cannot share port {port}"
                    )));
                }
            }
        }

        if let Some(host) = &self.public_host {
            if host.trim().is_empty() {
                return Err(PushError::Configuration(
                    "public_host must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}
