//! ALB virtual services
//!
//! A virtual service presents a virtual IPv4 on one or more port ranges and
//! forwards to a pool. It runs on a service engine group; when the request
//! leaves the group unset the only group bound to the edge gateway is used.

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, field, info, instrument};
use validator::{Validate, ValidationError};

use super::service_engine_group::ServiceEngineGroupManager;
use crate::domain::{
    ApplicationProfileType, EdgeGatewayId, NameOrId, TransportType, VirtualServiceHealthStatus,
    VirtualServiceId,
};
use crate::errors::{ErrorContext, Result};
use crate::transport::AlbApi;
use crate::upstream::virtual_service::{AlbApplicationProfile, AlbServicePort, AlbTcpUdpProfile};
use crate::upstream::{parse_upstream, port_from_upstream, AlbVirtualService, OpenApiReference};
use crate::validation::{
    validate_certificate_urn, validate_gateway_urn, validate_ipv4, validate_pool_urn,
    validate_request, validate_service_engine_group_urn,
};

/// Port range `[start, end]`; a single port when `end` is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_port_range"))]
pub struct VirtualServicePort {
    #[validate(range(min = 1, message = "start port must be between 1 and 65535"))]
    pub start: u16,

    #[validate(range(min = 1, message = "end port must be between 1 and 65535"))]
    pub end: Option<u16>,

    pub transport_type: Option<TransportType>,

    /// Read-only; derived from the application profile on write
    pub ssl_enabled: Option<bool>,
}

fn validate_port_range(port: &VirtualServicePort) -> std::result::Result<(), ValidationError> {
    match port.end {
        Some(end) if end <= port.start => Err(ValidationError::new("gtfield").with_message(
            Cow::Owned(format!("end port {} must be greater than start port {}", end, port.start)),
        )),
        _ => Ok(()),
    }
}

impl VirtualServicePort {
    pub fn single(port: u16, transport_type: TransportType) -> Self {
        Self { start: port, end: None, transport_type: Some(transport_type), ssl_enabled: None }
    }

    pub fn range(start: u16, end: u16, transport_type: TransportType) -> Self {
        Self { start, end: Some(end), transport_type: Some(transport_type), ssl_enabled: None }
    }

    pub fn from_upstream(port: AlbServicePort) -> Result<Self> {
        Ok(Self {
            start: port_from_upstream(port.port_start)?,
            end: port.port_end.map(port_from_upstream).transpose()?,
            transport_type: port
                .tcp_udp_profile
                .map(|profile| parse_upstream(&profile.profile_type))
                .transpose()?,
            ssl_enabled: port.ssl_enabled,
        })
    }

    fn to_upstream(&self, ssl_enabled: Option<bool>) -> AlbServicePort {
        AlbServicePort {
            port_start: i32::from(self.start),
            port_end: self.end.map(i32::from),
            ssl_enabled,
            tcp_udp_profile: self.transport_type.map(|t| AlbTcpUdpProfile {
                system_defined: Some(true),
                profile_type: t.as_str().to_string(),
            }),
        }
    }
}

/// Write shape of a virtual service
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_virtual_service_request"))]
pub struct VirtualServiceModelRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_gateway_urn"))]
    pub edge_gateway_id: String,

    pub enabled: Option<bool>,

    pub application_profile: ApplicationProfileType,

    #[validate(custom(function = "validate_pool_urn"))]
    pub pool_id: String,

    /// Resolved to the gateway's only SEG when unset
    #[validate(custom(function = "validate_service_engine_group_urn"))]
    pub service_engine_group_id: Option<String>,

    #[validate(custom(function = "validate_ipv4"))]
    pub virtual_ip_address: String,

    /// Required for HTTPS and L4_TLS
    #[validate(custom(function = "validate_certificate_urn"))]
    pub certificate_id: Option<String>,

    #[validate(length(min = 1, message = "at least one service port is required"), nested)]
    pub service_ports: Vec<VirtualServicePort>,
}

fn validate_virtual_service_request(
    request: &VirtualServiceModelRequest,
) -> std::result::Result<(), ValidationError> {
    let has_certificate = request.certificate_id.as_deref().is_some_and(|id| !id.is_empty());
    if request.application_profile.requires_certificate() && !has_certificate {
        return Err(ValidationError::new("required_if").with_message(Cow::Owned(format!(
            "certificate_id is required when application profile is {}",
            request.application_profile
        ))));
    }
    Ok(())
}

impl VirtualServiceModelRequest {
    pub fn new(
        name: impl Into<String>,
        edge_gateway_id: impl Into<String>,
        application_profile: ApplicationProfileType,
        pool_id: impl Into<String>,
        virtual_ip_address: impl Into<String>,
        service_ports: Vec<VirtualServicePort>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            edge_gateway_id: edge_gateway_id.into(),
            enabled: None,
            application_profile,
            pool_id: pool_id.into(),
            service_engine_group_id: None,
            virtual_ip_address: virtual_ip_address.into(),
            certificate_id: None,
            service_ports,
        }
    }

    /// Upstream body bound to `service_engine_group_id`
    pub fn to_upstream(&self, service_engine_group_id: &str) -> AlbVirtualService {
        let ssl_enabled = self.application_profile.requires_certificate().then_some(true);

        AlbVirtualService {
            id: None,
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            application_profile: AlbApplicationProfile {
                name: None,
                system_defined: Some(true),
                profile_type: self.application_profile.as_str().to_string(),
            },
            pool_ref: OpenApiReference::from_id(&self.pool_id),
            gateway_ref: OpenApiReference::from_id(&self.edge_gateway_id),
            service_engine_group_ref: OpenApiReference::from_id(service_engine_group_id),
            certificate_ref: self.certificate_id.as_ref().map(OpenApiReference::from_id),
            service_ports: self.service_ports.iter().map(|p| p.to_upstream(ssl_enabled)).collect(),
            virtual_ip_address: self.virtual_ip_address.clone(),
            health_status: None,
            health_message: None,
            detailed_health_message: None,
        }
    }

    fn explicit_service_engine_group(&self) -> Option<&str> {
        self.service_engine_group_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Virtual service as read back from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualServiceModel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub edge_gateway_id: String,
    pub enabled: Option<bool>,
    pub application_profile: ApplicationProfileType,
    pub pool_id: String,
    pub service_engine_group_id: String,
    pub virtual_ip_address: String,
    pub certificate_id: Option<String>,
    pub service_ports: Vec<VirtualServicePort>,

    pub health_status: Option<VirtualServiceHealthStatus>,
    pub health_message: Option<String>,
    pub detailed_health_message: Option<String>,
}

impl VirtualServiceModel {
    pub fn from_upstream(virtual_service: AlbVirtualService) -> Result<Self> {
        Ok(Self {
            id: virtual_service.id.unwrap_or_default(),
            name: virtual_service.name,
            description: virtual_service.description,
            edge_gateway_id: virtual_service.gateway_ref.id,
            enabled: virtual_service.enabled,
            application_profile: parse_upstream(&virtual_service.application_profile.profile_type)?,
            pool_id: virtual_service.pool_ref.id,
            service_engine_group_id: virtual_service.service_engine_group_ref.id,
            virtual_ip_address: virtual_service.virtual_ip_address,
            certificate_id: virtual_service.certificate_ref.map(|r| r.id),
            service_ports: virtual_service
                .service_ports
                .into_iter()
                .map(VirtualServicePort::from_upstream)
                .collect::<Result<Vec<_>>>()?,
            health_status: virtual_service
                .health_status
                .map(|s| s.parse().unwrap_or(VirtualServiceHealthStatus::Unknown)),
            health_message: virtual_service.health_message,
            detailed_health_message: virtual_service.detailed_health_message,
        })
    }

    pub fn to_upstream(&self) -> AlbVirtualService {
        AlbVirtualService {
            id: (!self.id.is_empty()).then(|| self.id.clone()),
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            application_profile: AlbApplicationProfile {
                name: None,
                system_defined: Some(true),
                profile_type: self.application_profile.as_str().to_string(),
            },
            pool_ref: OpenApiReference::from_id(&self.pool_id),
            gateway_ref: OpenApiReference::from_id(&self.edge_gateway_id),
            service_engine_group_ref: OpenApiReference::from_id(&self.service_engine_group_id),
            certificate_ref: self.certificate_id.as_ref().map(OpenApiReference::from_id),
            service_ports: self.service_ports.iter().map(|p| p.to_upstream(p.ssl_enabled)).collect(),
            virtual_ip_address: self.virtual_ip_address.clone(),
            health_status: self.health_status.map(|s| s.as_str().to_string()),
            health_message: self.health_message.clone(),
            detailed_health_message: self.detailed_health_message.clone(),
        }
    }
}

/// CRUD over ALB virtual services
#[derive(Clone)]
pub struct VirtualServiceManager {
    api: Arc<dyn AlbApi>,
    service_engine_groups: ServiceEngineGroupManager,
}

impl VirtualServiceManager {
    pub fn new(api: Arc<dyn AlbApi>) -> Self {
        let service_engine_groups = ServiceEngineGroupManager::new(api.clone());
        Self { api, service_engine_groups }
    }

    /// Every virtual service of the edge gateway; one failed detail fetch aborts the batch
    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn list(&self, edge_gateway_id: &str) -> Result<Vec<VirtualServiceModel>> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;

        self.api.refresh().await?;
        let summaries =
            self.api.get_all_alb_virtual_service_summaries(edge_gateway_id.as_str()).await?;
        debug!(count = summaries.len(), "Virtual service summaries fetched");

        let services =
            try_join_all(summaries.iter().map(|s| self.api.get_alb_virtual_service_by_id(&s.id)))
                .await
                .context("list virtual services")?;

        services.into_iter().map(VirtualServiceModel::from_upstream).collect()
    }

    /// Virtual service by URN, or by name within the edge gateway
    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn get(&self, edge_gateway_id: &str, name_or_id: &str) -> Result<VirtualServiceModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));

        let virtual_service = match NameOrId::<VirtualServiceId>::resolve(name_or_id)? {
            NameOrId::Id(id) => {
                self.api.refresh().await?;
                self.api.get_alb_virtual_service_by_id(id.as_str()).await?
            }
            NameOrId::Name(name) => {
                let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;
                self.api.refresh().await?;
                self.api.get_alb_virtual_service_by_name(edge_gateway_id.as_str(), &name).await?
            }
        };

        VirtualServiceModel::from_upstream(virtual_service)
    }

    /// Explicit SEG of the request, else the gateway's only one; never refreshes
    async fn resolve_service_engine_group(&self, request: &VirtualServiceModelRequest) -> Result<String> {
        match request.explicit_service_engine_group() {
            Some(id) => Ok(id.to_string()),
            None => {
                let edge_gateway_id = EdgeGatewayId::parse(&request.edge_gateway_id)?;
                let group = self.service_engine_groups.only_bound(&edge_gateway_id).await?;
                debug!(service_engine_group = %group.name, "Using the edge gateway's only service engine group");
                Ok(group.id)
            }
        }
    }

    #[instrument(skip(self, request), fields(name = %request.name, operation_id = field::Empty))]
    pub async fn create(&self, request: VirtualServiceModelRequest) -> Result<VirtualServiceModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        validate_request(&request)?;

        self.api.refresh().await?;
        let service_engine_group_id = self.resolve_service_engine_group(&request).await?;

        let created = self
            .api
            .create_nsxt_alb_virtual_service(&request.to_upstream(&service_engine_group_id))
            .await?;

        info!(id = ?created.id, "Virtual service created");
        VirtualServiceModel::from_upstream(created)
    }

    #[instrument(skip(self, request), fields(operation_id = field::Empty))]
    pub async fn update(
        &self,
        id: &str,
        request: VirtualServiceModelRequest,
    ) -> Result<VirtualServiceModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let id = VirtualServiceId::parse(id)?;
        validate_request(&request)?;

        self.api.refresh().await?;
        self.api
            .get_alb_virtual_service_by_id(id.as_str())
            .await
            .context("update virtual service")?;
        let service_engine_group_id = self.resolve_service_engine_group(&request).await?;

        let mut body = request.to_upstream(&service_engine_group_id);
        body.id = Some(id.into_string());

        let updated = self.api.update_alb_virtual_service(&body).await?;
        info!("Virtual service updated");
        VirtualServiceModel::from_upstream(updated)
    }

    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let id = VirtualServiceId::parse(id)?;

        self.api.refresh().await?;
        let current = self
            .api
            .get_alb_virtual_service_by_id(id.as_str())
            .await
            .context("delete virtual service")?;
        let handle = current.id.unwrap_or_else(|| id.into_string());

        self.api.delete_alb_virtual_service(&handle).await?;
        info!(id = %handle, "Virtual service deleted");
        Ok(())
    }
}
