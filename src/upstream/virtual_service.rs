use serde::{Deserialize, Serialize};

use super::reference::OpenApiReference;

/// ALB virtual service as exchanged with `loadBalancer/virtualServices`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbVirtualService {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    pub application_profile: AlbApplicationProfile,
    #[serde(default)]
    pub pool_ref: OpenApiReference,
    #[serde(default)]
    pub gateway_ref: OpenApiReference,
    #[serde(default)]
    pub service_engine_group_ref: OpenApiReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_ref: Option<OpenApiReference>,
    #[serde(default)]
    pub service_ports: Vec<AlbServicePort>,
    pub virtual_ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_health_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbApplicationProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_defined: Option<bool>,
    #[serde(rename = "type")]
    pub profile_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbServicePort {
    pub port_start: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_end: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_udp_profile: Option<AlbTcpUdpProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbTcpUdpProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_defined: Option<bool>,
    #[serde(rename = "type")]
    pub profile_type: String,
}

/// Entry of `edgeGateways/{id}/loadBalancer/virtualServiceSummaries`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbVirtualServiceSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<OpenApiReference>,
}
