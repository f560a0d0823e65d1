use serde::{Deserialize, Serialize};

use super::reference::OpenApiReference;

/// Entry of `loadBalancer/serviceEngineGroups/assignments`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbServiceEngineGroupAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub service_engine_group_ref: OpenApiReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_ref: Option<OpenApiReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_virtual_services: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_virtual_services: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_deployed_virtual_services: Option<i32>,
}
