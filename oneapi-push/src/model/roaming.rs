//! Roaming status (HLR) notifications.

use serde::{Deserialize, Serialize};

/// Payload of a roaming status push, found under `terminalRoamingStatusList`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoamingNotification {
    pub roaming: Roaming,
}

/// Roaming status of one network-connected mobile device.
///
/// Every field the remote schema allows to be `null` is an `Option`, so an
/// unknown `current_roaming` stays distinguishable from a reported one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roaming {
    /// The queried mobile device number
    pub address: String,
    pub current_roaming: Option<String>,
    pub serving_mcc_mnc: Option<ServingMccMnc>,
    #[serde(rename = "resourceURL")]
    pub resource_url: Option<String>,
    pub retrieval_status: Option<String>,
    pub extended_data: Option<ExtendedData>,
    pub callback_data: Option<String>,
    pub client_correlator: Option<String>,
}

/// Mobile country and network code of the serving network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServingMccMnc {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
}

/// Extended HLR diagnostics, present when the query asked for them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedData {
    pub destination_address: Option<String>,
    pub status_id: Option<i64>,
    /// Completion time in milliseconds since the Unix epoch
    pub done_time: Option<i64>,
    pub price_per_message: Option<f64>,
    pub mcc_mnc: Option<String>,
    pub serving_msc: Option<String>,
    pub censored_serving_msc: Option<String>,
    pub gsm_error_code: Option<i64>,
    pub original_network_name: Option<String>,
    pub ported_network_name: Option<String>,
    pub serving_hlr: Option<String>,
    pub imsi: Option<String>,
    pub original_network_prefix: Option<String>,
    pub original_country_prefix: Option<String>,
    pub original_country_name: Option<String>,
    pub is_number_ported: Option<bool>,
    pub ported_network_prefix: Option<String>,
    pub ported_country_prefix: Option<String>,
    pub ported_country_name: Option<String>,
    pub number_in_roaming: Option<bool>,
}
