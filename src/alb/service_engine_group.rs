//! Service engine group reader
//!
//! SEG bindings are owned by the platform; the tenant can only list the
//! groups bound to an edge gateway and pick one by name or id.

use std::sync::Arc;
use tracing::{debug, field, instrument};

use crate::domain::{EdgeGatewayId, NameOrId, ServiceEngineGroupId};
use crate::errors::{CloudAvenueError, ErrorContext, Result};
use crate::transport::AlbApi;
use crate::upstream::AlbServiceEngineGroupAssignment;

/// A service engine group bound to an edge gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEngineGroup {
    pub id: String,
    pub name: String,
    pub edge_gateway_id: Option<String>,
    pub edge_gateway_name: Option<String>,
    pub min_virtual_services: Option<i32>,
    pub max_virtual_services: Option<i32>,
    pub num_deployed_virtual_services: Option<i32>,
}

impl ServiceEngineGroup {
    pub fn from_upstream(assignment: AlbServiceEngineGroupAssignment) -> Self {
        let (edge_gateway_id, edge_gateway_name) = match assignment.gateway_ref {
            Some(reference) => (Some(reference.id), Some(reference.name)),
            None => (None, None),
        };

        Self {
            id: assignment.service_engine_group_ref.id,
            name: assignment.service_engine_group_ref.name,
            edge_gateway_id,
            edge_gateway_name,
            min_virtual_services: assignment.min_virtual_services,
            max_virtual_services: assignment.max_virtual_services,
            num_deployed_virtual_services: assignment.num_deployed_virtual_services,
        }
    }
}

/// Lists and resolves the SEGs of an edge gateway
#[derive(Clone)]
pub struct ServiceEngineGroupManager {
    api: Arc<dyn AlbApi>,
}

impl ServiceEngineGroupManager {
    pub fn new(api: Arc<dyn AlbApi>) -> Self {
        Self { api }
    }

    /// All SEGs bound to the edge gateway.
    ///
    /// Fails with `NotFound` when the gateway has no binding, which means the
    /// load balancer is not enabled on it.
    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn list(&self, edge_gateway_id: &str) -> Result<Vec<ServiceEngineGroup>> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;

        self.api.refresh().await?;
        self.bound(&edge_gateway_id).await
    }

    /// Bindings of the gateway; the caller has already refreshed the session
    async fn bound(&self, edge_gateway_id: &EdgeGatewayId) -> Result<Vec<ServiceEngineGroup>> {
        let assignments = self
            .api
            .get_service_engine_group_assignments(edge_gateway_id.as_str())
            .await
            .context("list service engine groups")?;

        if assignments.is_empty() {
            return Err(CloudAvenueError::NotFound {
                message: format!(
                    "load balancer not enabled on edge gateway '{}'",
                    edge_gateway_id
                ),
            });
        }

        debug!(count = assignments.len(), "Service engine groups listed");
        Ok(assignments.into_iter().map(ServiceEngineGroup::from_upstream).collect())
    }

    /// SEG by URN (`serviceEngineGroup` kind) or by exact name
    #[instrument(skip(self))]
    pub async fn get(&self, edge_gateway_id: &str, name_or_id: &str) -> Result<ServiceEngineGroup> {
        let wanted = NameOrId::<ServiceEngineGroupId>::resolve(name_or_id)?;
        let groups = self.list(edge_gateway_id).await?;

        groups
            .into_iter()
            .find(|group| match &wanted {
                NameOrId::Id(id) => group.id == id.as_str(),
                NameOrId::Name(name) => &group.name == name,
            })
            .ok_or_else(|| CloudAvenueError::not_found("serviceEngineGroup", name_or_id))
    }

    /// The only SEG bound to the gateway; ambiguous when several are bound
    #[instrument(skip(self))]
    pub async fn get_first(&self, edge_gateway_id: &str) -> Result<ServiceEngineGroup> {
        let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;
        self.api.refresh().await?;
        self.only_bound(&edge_gateway_id).await
    }

    /// [`Self::get_first`] without the session refresh, for managers that already did it
    pub(crate) async fn only_bound(&self, edge_gateway_id: &EdgeGatewayId) -> Result<ServiceEngineGroup> {
        let mut groups = self.bound(edge_gateway_id).await?;

        if groups.len() > 1 {
            return Err(CloudAvenueError::validation_field(
                format!(
                    "{} service engine groups are bound to edge gateway '{}'; one must be selected explicitly",
                    groups.len(),
                    edge_gateway_id
                ),
                "service_engine_group_id",
            ));
        }

        groups
            .pop()
            .ok_or_else(|| CloudAvenueError::not_found("serviceEngineGroup", edge_gateway_id.as_str()))
    }
}
