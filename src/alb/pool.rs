//! ALB pools
//!
//! A pool belongs to one edge gateway and holds either an explicit member
//! list or a reference to a member firewall group. [`PoolModelRequest`] is
//! the validated write shape; [`PoolModel`] is what reads return, including
//! the read-only counters maintained by the platform.

use futures::future::try_join_all;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, field, info, instrument};
use validator::{Validate, ValidationError};

use crate::domain::{
    EdgeGatewayId, HealthMonitorType, NameOrId, PersistenceType, PoolAlgorithm, PoolId,
    PoolMemberHealthStatus,
};
use crate::errors::{ErrorContext, Result};
use crate::transport::AlbApi;
use crate::upstream::pool::{AlbPersistenceProfile, AlbPoolHealthMonitor, AlbPoolMember};
use crate::upstream::{parse_upstream, port_from_upstream, AlbPool, OpenApiReference};
use crate::validation::{
    validate_certificate_urn, validate_firewall_group_urn, validate_gateway_urn, validate_ipv4,
    validate_request,
};

/// Backend member of a pool
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct PoolMember {
    pub enabled: bool,

    #[validate(custom(function = "validate_ipv4"))]
    pub ip_address: String,

    /// Defaults to the pool's `default_port` when absent
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: Option<u16>,

    /// Selection ratio, 1..=20
    #[validate(range(min = 1, max = 20))]
    pub ratio: Option<i32>,

    /// Read-only
    pub health_status: Option<PoolMemberHealthStatus>,
    /// Read-only
    pub marked_down_by: Option<Vec<String>>,
    /// Read-only
    pub detailed_health_message: Option<String>,
}

impl PoolMember {
    /// Enabled member with no explicit port or ratio
    pub fn new(ip_address: impl Into<String>) -> Self {
        Self {
            enabled: true,
            ip_address: ip_address.into(),
            port: None,
            ratio: None,
            health_status: None,
            marked_down_by: None,
            detailed_health_message: None,
        }
    }

    pub fn from_upstream(member: AlbPoolMember) -> Result<Self> {
        Ok(Self {
            enabled: member.enabled,
            ip_address: member.ip_address,
            port: member.port.map(port_from_upstream).transpose()?,
            ratio: member.ratio,
            health_status: member
                .health_status
                .map(|s| s.parse().unwrap_or(PoolMemberHealthStatus::Unknown)),
            marked_down_by: member.marked_down_by,
            detailed_health_message: member.detailed_health_message,
        })
    }

    pub fn to_upstream(&self) -> AlbPoolMember {
        AlbPoolMember {
            enabled: self.enabled,
            ip_address: self.ip_address.clone(),
            port: self.port.map(i32::from),
            ratio: self.ratio,
            marked_down_by: self.marked_down_by.clone(),
            health_status: self.health_status.map(|s| s.as_str().to_string()),
            detailed_health_message: self.detailed_health_message.clone(),
        }
    }
}

/// Active health monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolHealthMonitor {
    pub name: Option<String>,
    pub monitor_type: HealthMonitorType,
}

impl PoolHealthMonitor {
    pub fn new(monitor_type: HealthMonitorType) -> Self {
        Self { name: None, monitor_type }
    }

    pub fn from_upstream(monitor: AlbPoolHealthMonitor) -> Result<Self> {
        Ok(Self { name: monitor.name, monitor_type: parse_upstream(&monitor.monitor_type)? })
    }

    pub fn to_upstream(&self) -> AlbPoolHealthMonitor {
        AlbPoolHealthMonitor {
            name: self.name.clone(),
            system_defined: None,
            monitor_type: self.monitor_type.as_str().to_string(),
        }
    }
}

/// Session persistence profile
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_persistence_profile"))]
pub struct PoolPersistenceProfile {
    pub name: Option<String>,
    pub profile_type: PersistenceType,
    /// Header or cookie name, or TLS ticket key
    pub value: Option<String>,
}

fn validate_persistence_profile(
    profile: &PoolPersistenceProfile,
) -> std::result::Result<(), ValidationError> {
    let has_value = profile.value.as_deref().is_some_and(|v| !v.is_empty());
    match (profile.profile_type.requires_value(), has_value) {
        (true, false) => Err(ValidationError::new("required_if").with_message(Cow::Owned(format!(
            "value is required for persistence type {}",
            profile.profile_type
        )))),
        (false, true) => Err(ValidationError::new("excluded_if").with_message(Cow::Owned(format!(
            "value is not allowed for persistence type {}",
            profile.profile_type
        )))),
        _ => Ok(()),
    }
}

impl PoolPersistenceProfile {
    pub fn from_upstream(profile: AlbPersistenceProfile) -> Result<Self> {
        Ok(Self {
            name: profile.name,
            profile_type: parse_upstream(&profile.profile_type)?,
            value: profile.value,
        })
    }

    pub fn to_upstream(&self) -> AlbPersistenceProfile {
        AlbPersistenceProfile {
            name: self.name.clone(),
            profile_type: self.profile_type.as_str().to_string(),
            value: self.value.clone(),
        }
    }
}

fn validate_certificate_urns(ids: &Vec<String>) -> std::result::Result<(), ValidationError> {
    ids.iter().try_for_each(|id| validate_certificate_urn(id))
}

/// Write shape of a pool
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "validate_pool_request"))]
pub struct PoolModelRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    pub description: Option<String>,

    #[validate(custom(function = "validate_gateway_urn"))]
    pub edge_gateway_id: String,

    pub enabled: Option<bool>,

    pub algorithm: Option<PoolAlgorithm>,

    #[validate(range(min = 1, message = "default port must be between 1 and 65535"))]
    pub default_port: Option<u16>,

    /// Minutes; 0 = immediate, -1 = infinite
    #[validate(range(min = -1, max = 7200))]
    pub graceful_timeout_period: Option<i32>,

    pub passive_monitoring_enabled: Option<bool>,

    pub health_monitors: Option<Vec<PoolHealthMonitor>>,

    #[validate(nested)]
    pub members: Option<Vec<PoolMember>>,

    #[validate(custom(function = "validate_firewall_group_urn"))]
    pub member_group_id: Option<String>,

    #[validate(custom(function = "validate_certificate_urns"))]
    pub ca_certificate_ids: Option<Vec<String>>,

    pub common_name_check_enabled: Option<bool>,

    pub domain_names: Option<Vec<String>>,

    #[validate(nested)]
    pub persistence_profile: Option<PoolPersistenceProfile>,
}

fn validate_pool_request(request: &PoolModelRequest) -> std::result::Result<(), ValidationError> {
    if request.members.is_some() && request.member_group_id.is_some() {
        return Err(ValidationError::new("excluded_with").with_message(Cow::Borrowed(
            "members and member_group_id are mutually exclusive",
        )));
    }

    let has_ca = request.ca_certificate_ids.as_ref().is_some_and(|ids| !ids.is_empty());
    let cn_check = request.common_name_check_enabled.unwrap_or(false);

    if cn_check && !has_ca {
        return Err(ValidationError::new("required_if").with_message(Cow::Borrowed(
            "common_name_check_enabled requires ca_certificate_ids",
        )));
    }

    if !cn_check && request.domain_names.as_ref().is_some_and(|names| !names.is_empty()) {
        return Err(ValidationError::new("excluded_if").with_message(Cow::Borrowed(
            "domain_names must be empty unless common_name_check_enabled is true",
        )));
    }

    Ok(())
}

impl PoolModelRequest {
    /// Minimal request: a named pool on an edge gateway
    pub fn new(name: impl Into<String>, edge_gateway_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            edge_gateway_id: edge_gateway_id.into(),
            enabled: None,
            algorithm: None,
            default_port: None,
            graceful_timeout_period: None,
            passive_monitoring_enabled: None,
            health_monitors: None,
            members: None,
            member_group_id: None,
            ca_certificate_ids: None,
            common_name_check_enabled: None,
            domain_names: None,
            persistence_profile: None,
        }
    }

    /// Upstream body; `sslEnabled` is set whenever CA certificates are present
    pub fn to_upstream(&self) -> AlbPool {
        let ca_certificate_refs = self
            .ca_certificate_ids
            .as_ref()
            .map(|ids| ids.iter().map(OpenApiReference::from_id).collect::<Vec<_>>());
        let ssl_enabled =
            ca_certificate_refs.as_ref().and_then(|refs| (!refs.is_empty()).then_some(true));

        AlbPool {
            id: None,
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            algorithm: self.algorithm.map(|a| a.as_str().to_string()),
            default_port: self.default_port.map(i32::from),
            graceful_timeout_period: self.graceful_timeout_period,
            passive_monitoring_enabled: self.passive_monitoring_enabled,
            health_monitors: self
                .health_monitors
                .as_ref()
                .map(|monitors| monitors.iter().map(PoolHealthMonitor::to_upstream).collect()),
            members: self
                .members
                .as_ref()
                .map(|members| members.iter().map(PoolMember::to_upstream).collect()),
            member_group_ref: self.member_group_id.as_ref().map(OpenApiReference::from_id),
            ca_certificate_refs,
            common_name_check_enabled: self.common_name_check_enabled,
            domain_names: self.domain_names.clone(),
            persistence_profile: self
                .persistence_profile
                .as_ref()
                .map(PoolPersistenceProfile::to_upstream),
            ssl_enabled,
            gateway_ref: OpenApiReference::from_id(&self.edge_gateway_id),
            ..Default::default()
        }
    }
}

/// Pool as read back from the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolModel {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub edge_gateway_id: String,
    pub enabled: Option<bool>,
    pub algorithm: Option<PoolAlgorithm>,
    pub default_port: Option<u16>,
    pub graceful_timeout_period: Option<i32>,
    pub passive_monitoring_enabled: Option<bool>,
    pub health_monitors: Option<Vec<PoolHealthMonitor>>,
    pub members: Option<Vec<PoolMember>>,
    pub member_group_id: Option<String>,
    pub ca_certificate_ids: Option<Vec<String>>,
    pub common_name_check_enabled: Option<bool>,
    pub domain_names: Option<Vec<String>>,
    pub persistence_profile: Option<PoolPersistenceProfile>,
    pub ssl_enabled: Option<bool>,

    pub member_count: Option<i32>,
    pub enabled_member_count: Option<i32>,
    pub up_member_count: Option<i32>,
    pub health_message: Option<String>,
    pub virtual_service_ids: Option<Vec<String>>,
}

impl PoolModel {
    pub fn from_upstream(pool: AlbPool) -> Result<Self> {
        Ok(Self {
            id: pool.id.unwrap_or_default(),
            name: pool.name,
            description: pool.description,
            edge_gateway_id: pool.gateway_ref.id,
            enabled: pool.enabled,
            algorithm: pool.algorithm.as_deref().map(parse_upstream).transpose()?,
            default_port: pool.default_port.map(port_from_upstream).transpose()?,
            graceful_timeout_period: pool.graceful_timeout_period,
            passive_monitoring_enabled: pool.passive_monitoring_enabled,
            health_monitors: pool
                .health_monitors
                .map(|monitors| {
                    monitors.into_iter().map(PoolHealthMonitor::from_upstream).collect::<Result<Vec<_>>>()
                })
                .transpose()?,
            members: pool
                .members
                .map(|members| members.into_iter().map(PoolMember::from_upstream).collect::<Result<Vec<_>>>())
                .transpose()?,
            member_group_id: pool.member_group_ref.map(|r| r.id),
            ca_certificate_ids: pool
                .ca_certificate_refs
                .map(|refs| refs.into_iter().map(|r| r.id).collect()),
            common_name_check_enabled: pool.common_name_check_enabled,
            domain_names: pool.domain_names,
            persistence_profile: pool
                .persistence_profile
                .map(PoolPersistenceProfile::from_upstream)
                .transpose()?,
            ssl_enabled: pool.ssl_enabled,
            member_count: pool.member_count,
            enabled_member_count: pool.enabled_member_count,
            up_member_count: pool.up_member_count,
            health_message: pool.health_message,
            virtual_service_ids: pool
                .virtual_service_refs
                .map(|refs| refs.into_iter().map(|r| r.id).collect()),
        })
    }

    pub fn to_upstream(&self) -> AlbPool {
        AlbPool {
            id: (!self.id.is_empty()).then(|| self.id.clone()),
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            algorithm: self.algorithm.map(|a| a.as_str().to_string()),
            default_port: self.default_port.map(i32::from),
            graceful_timeout_period: self.graceful_timeout_period,
            passive_monitoring_enabled: self.passive_monitoring_enabled,
            health_monitors: self
                .health_monitors
                .as_ref()
                .map(|monitors| monitors.iter().map(PoolHealthMonitor::to_upstream).collect()),
            members: self
                .members
                .as_ref()
                .map(|members| members.iter().map(PoolMember::to_upstream).collect()),
            member_group_ref: self.member_group_id.as_ref().map(OpenApiReference::from_id),
            ca_certificate_refs: self
                .ca_certificate_ids
                .as_ref()
                .map(|ids| ids.iter().map(OpenApiReference::from_id).collect()),
            common_name_check_enabled: self.common_name_check_enabled,
            domain_names: self.domain_names.clone(),
            persistence_profile: self
                .persistence_profile
                .as_ref()
                .map(PoolPersistenceProfile::to_upstream),
            member_count: self.member_count,
            enabled_member_count: self.enabled_member_count,
            up_member_count: self.up_member_count,
            health_message: self.health_message.clone(),
            virtual_service_refs: self
                .virtual_service_ids
                .as_ref()
                .map(|ids| ids.iter().map(OpenApiReference::from_id).collect()),
            ssl_enabled: self.ssl_enabled,
            gateway_ref: OpenApiReference::from_id(&self.edge_gateway_id),
        }
    }
}

/// CRUD over ALB pools
#[derive(Clone)]
pub struct PoolManager {
    api: Arc<dyn AlbApi>,
}

impl PoolManager {
    pub fn new(api: Arc<dyn AlbApi>) -> Self {
        Self { api }
    }

    /// Every pool of the edge gateway; one failed detail fetch aborts the batch
    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn list(&self, edge_gateway_id: &str) -> Result<Vec<PoolModel>> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;

        self.api.refresh().await?;
        let summaries = self.api.get_all_alb_pool_summaries(edge_gateway_id.as_str()).await?;
        debug!(count = summaries.len(), "Pool summaries fetched");

        let pools = try_join_all(summaries.iter().map(|s| self.api.get_alb_pool_by_id(&s.id)))
            .await
            .context("list pools")?;

        pools.into_iter().map(PoolModel::from_upstream).collect()
    }

    /// Pool by URN, or by name within the edge gateway
    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn get(&self, edge_gateway_id: &str, name_or_id: &str) -> Result<PoolModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));

        let pool = match NameOrId::<PoolId>::resolve(name_or_id)? {
            NameOrId::Id(id) => {
                self.api.refresh().await?;
                self.api.get_alb_pool_by_id(id.as_str()).await?
            }
            NameOrId::Name(name) => {
                let edge_gateway_id = EdgeGatewayId::parse(edge_gateway_id)?;
                self.api.refresh().await?;
                self.api.get_alb_pool_by_name(edge_gateway_id.as_str(), &name).await?
            }
        };

        PoolModel::from_upstream(pool)
    }

    #[instrument(skip(self, request), fields(name = %request.name, operation_id = field::Empty))]
    pub async fn create(&self, request: PoolModelRequest) -> Result<PoolModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        validate_request(&request)?;

        self.api.refresh().await?;
        let created = self.api.create_nsxt_alb_pool(&request.to_upstream()).await?;

        info!(id = ?created.id, "Pool created");
        PoolModel::from_upstream(created)
    }

    #[instrument(skip(self, request), fields(operation_id = field::Empty))]
    pub async fn update(&self, id: &str, request: PoolModelRequest) -> Result<PoolModel> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let id = PoolId::parse(id)?;
        validate_request(&request)?;

        self.api.refresh().await?;
        let current = self.api.get_alb_pool_by_id(id.as_str()).await.context("update pool")?;

        let mut body = request.to_upstream();
        body.id = Some(id.into_string());
        if body.gateway_ref.id.is_empty() {
            body.gateway_ref = current.gateway_ref;
        }

        let updated = self.api.update_alb_pool(&body).await?;
        info!("Pool updated");
        PoolModel::from_upstream(updated)
    }

    #[instrument(skip(self), fields(operation_id = field::Empty))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        tracing::Span::current().record("operation_id", field::display(&uuid::Uuid::new_v4()));
        let id = PoolId::parse(id)?;

        self.api.refresh().await?;
        let current = self.api.get_alb_pool_by_id(id.as_str()).await.context("delete pool")?;
        let handle = current.id.unwrap_or_else(|| id.into_string());

        self.api.delete_alb_pool(&handle).await?;
        info!(id = %handle, "Pool deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GATEWAY: &str = "urn:vcloud:gateway:22222222-2222-4222-8222-222222222222";
    const CERT: &str = "urn:vcloud:certificateLibraryItem:33333333-3333-4333-8333-333333333333";

    #[test]
    fn test_request_mutual_exclusion() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        request.members = Some(vec![PoolMember::new("10.0.0.1")]);
        request.member_group_id =
            Some("urn:vcloud:firewallGroup:44444444-4444-4444-8444-444444444444".to_string());

        let err = validate_request(&request).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_common_name_check_requires_ca() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        request.common_name_check_enabled = Some(true);
        assert!(validate_request(&request).is_err());

        request.ca_certificate_ids = Some(vec![CERT.to_string()]);
        request.domain_names = Some(vec!["example.com".to_string()]);
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_domain_names_need_common_name_check() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        request.domain_names = Some(vec!["example.com".to_string()]);
        assert!(validate_request(&request).is_err());
    }

    #[test]
    fn test_persistence_value_required() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        request.persistence_profile = Some(PoolPersistenceProfile {
            name: None,
            profile_type: PersistenceType::AppCookie,
            value: None,
        });
        let err = validate_request(&request).unwrap_err();
        assert!(err.to_string().contains("persistence_profile"));

        request.persistence_profile = Some(PoolPersistenceProfile {
            name: None,
            profile_type: PersistenceType::ClientIp,
            value: None,
        });
        assert!(validate_request(&request).is_ok());
    }

    #[test]
    fn test_persistence_value_forbidden_without_key() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        for profile_type in [PersistenceType::ClientIp, PersistenceType::HttpCookie] {
            request.persistence_profile = Some(PoolPersistenceProfile {
                name: None,
                profile_type,
                value: Some("JSESSIONID".to_string()),
            });
            let err = validate_request(&request).unwrap_err().to_string();
            assert!(err.contains("not allowed"), "{}", err);
        }
    }

    #[test]
    fn test_member_address_validated() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        request.members = Some(vec![PoolMember::new("10.0.0.1"), PoolMember::new("10.0.0")]);
        let err = validate_request(&request).unwrap_err();
        assert!(err.to_string().contains("members[1].ip_address"), "{}", err);
    }

    #[test]
    fn test_ssl_enabled_follows_ca_refs() {
        let mut request = PoolModelRequest::new("web", GATEWAY);
        assert_eq!(request.to_upstream().ssl_enabled, None);

        request.ca_certificate_ids = Some(vec![CERT.to_string()]);
        let upstream = request.to_upstream();
        assert_eq!(upstream.ssl_enabled, Some(true));
        assert_eq!(upstream.gateway_ref.id, GATEWAY);
    }

    #[test]
    fn test_model_round_trip() {
        let model = PoolModel {
            id: "urn:vcloud:loadBalancerPool:11111111-1111-4111-8111-111111111111".to_string(),
            name: "web".to_string(),
            description: Some("frontends".to_string()),
            edge_gateway_id: GATEWAY.to_string(),
            enabled: Some(true),
            algorithm: Some(PoolAlgorithm::RoundRobin),
            default_port: Some(8080),
            graceful_timeout_period: Some(-1),
            passive_monitoring_enabled: Some(true),
            health_monitors: Some(vec![PoolHealthMonitor::new(HealthMonitorType::Http)]),
            members: Some(vec![PoolMember {
                port: Some(80),
                ratio: Some(2),
                health_status: Some(PoolMemberHealthStatus::Up),
                ..PoolMember::new("10.0.0.1")
            }]),
            member_group_id: None,
            ca_certificate_ids: None,
            common_name_check_enabled: None,
            domain_names: None,
            persistence_profile: Some(PoolPersistenceProfile {
                name: None,
                profile_type: PersistenceType::HttpCookie,
                value: None,
            }),
            ssl_enabled: None,
            member_count: Some(1),
            enabled_member_count: Some(1),
            up_member_count: Some(1),
            health_message: None,
            virtual_service_ids: None,
        };

        assert_eq!(PoolModel::from_upstream(model.to_upstream()).unwrap(), model);
    }

    #[test]
    fn test_unknown_upstream_algorithm() {
        let pool = AlbPool {
            name: "web".to_string(),
            algorithm: Some("SOMETHING_NEW".to_string()),
            ..Default::default()
        };
        assert_eq!(
            PoolModel::from_upstream(pool).unwrap_err().kind(),
            crate::errors::ErrorKind::Upstream
        );
    }

    #[test]
    fn test_unknown_member_health_falls_back() {
        let member = AlbPoolMember {
            ip_address: "10.0.0.1".to_string(),
            health_status: Some("WARMING".to_string()),
            ..Default::default()
        };
        assert_eq!(
            PoolMember::from_upstream(member).unwrap().health_status,
            Some(PoolMemberHealthStatus::Unknown)
        );
    }
}
