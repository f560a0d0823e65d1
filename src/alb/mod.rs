//! # Edge Load Balancer
//!
//! Managers for the ALB objects of an edge gateway. Every manager validates
//! its input before touching the transport, refreshes the session, then
//! performs the round trip and translates the answer back into the model.
//!
//! [`EdgeLoadBalancer`] bundles all of them over one [`AlbApi`].

pub mod policies;
pub mod pool;
pub mod service_engine_group;
pub mod virtual_service;

use std::sync::Arc;

use crate::config::CloudAvenueConfig;
use crate::errors::Result;
use crate::transport::{AlbApi, CloudAvenueClient};

pub use policies::{
    HttpPolicies, HttpPolicyManager, HttpRequestPolicyManager, HttpResponsePolicyManager,
    HttpSecurityPolicyManager, PolicyChain, RequestPolicy, ResponsePolicy, SecurityPolicy,
};
pub use pool::{
    PoolHealthMonitor, PoolManager, PoolMember, PoolModel, PoolModelRequest,
    PoolPersistenceProfile,
};
pub use service_engine_group::{ServiceEngineGroup, ServiceEngineGroupManager};
pub use virtual_service::{
    VirtualServiceManager, VirtualServiceModel, VirtualServiceModelRequest, VirtualServicePort,
};

/// All load balancer managers sharing one authenticated client
#[derive(Clone)]
pub struct EdgeLoadBalancer {
    pub service_engine_groups: ServiceEngineGroupManager,
    pub pools: PoolManager,
    pub virtual_services: VirtualServiceManager,
    pub request_policies: HttpRequestPolicyManager,
    pub response_policies: HttpResponsePolicyManager,
    pub security_policies: HttpSecurityPolicyManager,
}

impl EdgeLoadBalancer {
    pub fn new(api: Arc<dyn AlbApi>) -> Self {
        Self {
            service_engine_groups: ServiceEngineGroupManager::new(Arc::clone(&api)),
            pools: PoolManager::new(Arc::clone(&api)),
            virtual_services: VirtualServiceManager::new(Arc::clone(&api)),
            request_policies: HttpPolicyManager::new(Arc::clone(&api)),
            response_policies: HttpPolicyManager::new(Arc::clone(&api)),
            security_policies: HttpPolicyManager::new(api),
        }
    }

    /// Build the HTTP client for `config` and wrap it
    pub fn connect(config: &CloudAvenueConfig) -> Result<Self> {
        crate::observability::log_config_info(config);
        let client = CloudAvenueClient::new(config)?;
        Ok(Self::new(Arc::new(client)))
    }
}
