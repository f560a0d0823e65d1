//! In-memory `AlbApi` used by the manager and policy tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cloudavenue::errors::{CloudAvenueError, Result};
use cloudavenue::upstream::{
    AlbPool, AlbPoolSummary, AlbServiceEngineGroupAssignment, AlbVirtualService,
    AlbVirtualServiceSummary, HttpRequestRule, HttpResponseRule, HttpRuleList, HttpSecurityRule,
    OpenApiReference,
};
use cloudavenue::{AlbApi, EdgeLoadBalancer};

pub const GATEWAY: &str = "urn:vcloud:gateway:aaaaaaaa-aaaa-4aaa-8aaa-aaaaaaaaaaaa";
pub const OTHER_GATEWAY: &str = "urn:vcloud:gateway:bbbbbbbb-bbbb-4bbb-8bbb-bbbbbbbbbbbb";
pub const VIRTUAL_SERVICE: &str =
    "urn:vcloud:loadBalancerVirtualService:11111111-1111-4111-8111-111111111111";
pub const SEG: &str = "urn:vcloud:serviceEngineGroup:22222222-2222-4222-8222-222222222222";
pub const SEG_2: &str = "urn:vcloud:serviceEngineGroup:33333333-3333-4333-8333-333333333333";
pub const CERTIFICATE: &str =
    "urn:vcloud:certificateLibraryItem:44444444-4444-4444-8444-444444444444";

#[derive(Default)]
struct State {
    pools: BTreeMap<String, AlbPool>,
    virtual_services: BTreeMap<String, AlbVirtualService>,
    assignments: Vec<AlbServiceEngineGroupAssignment>,
    request_rules: BTreeMap<String, HttpRuleList<HttpRequestRule>>,
    response_rules: BTreeMap<String, HttpRuleList<HttpResponseRule>>,
    security_rules: BTreeMap<String, HttpRuleList<HttpSecurityRule>>,
}

/// Echoes writes and counts every call
#[derive(Default)]
pub struct FakeAlb {
    refreshes: AtomicUsize,
    calls: AtomicUsize,
    state: Mutex<State>,
}

impl FakeAlb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fake with one SEG bound to [`GATEWAY`] and one virtual service
    pub fn seeded() -> Arc<Self> {
        let fake = Self::new();
        fake.bind_service_engine_group(SEG, "seg-default");
        fake.add_virtual_service(VIRTUAL_SERVICE, "web");
        fake
    }

    pub fn manager(self: &Arc<Self>) -> EdgeLoadBalancer {
        EdgeLoadBalancer::new(self.clone())
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Transport round trips, refresh excluded
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn bind_service_engine_group(&self, id: &str, name: &str) {
        self.lock().assignments.push(AlbServiceEngineGroupAssignment {
            id: Some(format!("assignment-{}", name)),
            service_engine_group_ref: OpenApiReference { name: name.to_string(), id: id.to_string() },
            gateway_ref: Some(OpenApiReference::from_id(GATEWAY)),
            min_virtual_services: Some(0),
            max_virtual_services: Some(10),
            num_deployed_virtual_services: Some(1),
        });
    }

    pub fn add_virtual_service(&self, id: &str, name: &str) {
        self.lock().virtual_services.insert(
            id.to_string(),
            AlbVirtualService {
                id: Some(id.to_string()),
                name: name.to_string(),
                gateway_ref: OpenApiReference::from_id(GATEWAY),
                ..Default::default()
            },
        );
    }

    pub fn set_request_rules(&self, virtual_service_id: &str, rules: HttpRuleList<HttpRequestRule>) {
        self.lock().request_rules.insert(virtual_service_id.to_string(), rules);
    }

    pub fn request_rules(&self, virtual_service_id: &str) -> Option<HttpRuleList<HttpRequestRule>> {
        self.lock().request_rules.get(virtual_service_id).cloned()
    }

    pub fn stored_pool(&self, id: &str) -> Option<AlbPool> {
        self.lock().pools.get(id).cloned()
    }

    pub fn stored_virtual_service(&self, id: &str) -> Option<AlbVirtualService> {
        self.lock().virtual_services.get(id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("fake state poisoned")
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn new_id(kind: &str) -> String {
    format!("urn:vcloud:{}:{}", kind, uuid::Uuid::new_v4())
}

#[async_trait]
impl AlbApi for FakeAlb {
    async fn refresh(&self) -> Result<()> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_service_engine_group_assignments(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbServiceEngineGroupAssignment>> {
        self.touch();
        Ok(self
            .lock()
            .assignments
            .iter()
            .filter(|a| a.gateway_ref.as_ref().is_some_and(|g| g.id == edge_gateway_id))
            .cloned()
            .collect())
    }

    async fn get_all_alb_pool_summaries(&self, edge_gateway_id: &str) -> Result<Vec<AlbPoolSummary>> {
        self.touch();
        Ok(self
            .lock()
            .pools
            .values()
            .filter(|p| p.gateway_ref.id == edge_gateway_id)
            .map(|p| AlbPoolSummary {
                id: p.id.clone().unwrap_or_default(),
                name: p.name.clone(),
                enabled: p.enabled,
                gateway_ref: Some(p.gateway_ref.clone()),
            })
            .collect())
    }

    async fn get_alb_pool_by_id(&self, id: &str) -> Result<AlbPool> {
        self.touch();
        self.lock()
            .pools
            .get(id)
            .cloned()
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerPool", id))
    }

    async fn get_alb_pool_by_name(&self, edge_gateway_id: &str, name: &str) -> Result<AlbPool> {
        self.touch();
        self.lock()
            .pools
            .values()
            .find(|p| p.gateway_ref.id == edge_gateway_id && p.name == name)
            .cloned()
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerPool", name))
    }

    async fn create_nsxt_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool> {
        self.touch();
        let mut created = pool.clone();
        let id = new_id("loadBalancerPool");
        created.id = Some(id.clone());
        self.lock().pools.insert(id, created.clone());
        Ok(created)
    }

    async fn update_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool> {
        self.touch();
        let id = pool.id.clone().unwrap_or_default();
        let mut state = self.lock();
        if !state.pools.contains_key(&id) {
            return Err(CloudAvenueError::not_found("loadBalancerPool", id));
        }
        state.pools.insert(id, pool.clone());
        Ok(pool.clone())
    }

    async fn delete_alb_pool(&self, id: &str) -> Result<()> {
        self.touch();
        self.lock()
            .pools
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerPool", id))
    }

    async fn get_all_alb_virtual_service_summaries(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbVirtualServiceSummary>> {
        self.touch();
        Ok(self
            .lock()
            .virtual_services
            .values()
            .filter(|v| v.gateway_ref.id == edge_gateway_id)
            .map(|v| AlbVirtualServiceSummary {
                id: v.id.clone().unwrap_or_default(),
                name: v.name.clone(),
                gateway_ref: Some(v.gateway_ref.clone()),
            })
            .collect())
    }

    async fn get_alb_virtual_service_by_id(&self, id: &str) -> Result<AlbVirtualService> {
        self.touch();
        self.lock()
            .virtual_services
            .get(id)
            .cloned()
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerVirtualService", id))
    }

    async fn get_alb_virtual_service_by_name(
        &self,
        edge_gateway_id: &str,
        name: &str,
    ) -> Result<AlbVirtualService> {
        self.touch();
        self.lock()
            .virtual_services
            .values()
            .find(|v| v.gateway_ref.id == edge_gateway_id && v.name == name)
            .cloned()
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerVirtualService", name))
    }

    async fn create_nsxt_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService> {
        self.touch();
        let mut created = virtual_service.clone();
        let id = new_id("loadBalancerVirtualService");
        created.id = Some(id.clone());
        self.lock().virtual_services.insert(id, created.clone());
        Ok(created)
    }

    async fn update_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService> {
        self.touch();
        let id = virtual_service.id.clone().unwrap_or_default();
        let mut state = self.lock();
        if !state.virtual_services.contains_key(&id) {
            return Err(CloudAvenueError::not_found("loadBalancerVirtualService", id));
        }
        state.virtual_services.insert(id, virtual_service.clone());
        Ok(virtual_service.clone())
    }

    async fn delete_alb_virtual_service(&self, id: &str) -> Result<()> {
        self.touch();
        self.lock()
            .virtual_services
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerVirtualService", id))
    }

    async fn get_http_request_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpRequestRule>> {
        self.touch();
        Ok(self.lock().request_rules.get(virtual_service_id).cloned().unwrap_or_default())
    }

    async fn update_http_request_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpRequestRule>,
    ) -> Result<HttpRuleList<HttpRequestRule>> {
        self.touch();
        self.lock().request_rules.insert(virtual_service_id.to_string(), rules.clone());
        Ok(rules.clone())
    }

    async fn get_http_response_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpResponseRule>> {
        self.touch();
        Ok(self.lock().response_rules.get(virtual_service_id).cloned().unwrap_or_default())
    }

    async fn update_http_response_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpResponseRule>,
    ) -> Result<HttpRuleList<HttpResponseRule>> {
        self.touch();
        self.lock().response_rules.insert(virtual_service_id.to_string(), rules.clone());
        Ok(rules.clone())
    }

    async fn get_http_security_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpSecurityRule>> {
        self.touch();
        Ok(self.lock().security_rules.get(virtual_service_id).cloned().unwrap_or_default())
    }

    async fn update_http_security_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpSecurityRule>,
    ) -> Result<HttpRuleList<HttpSecurityRule>> {
        self.touch();
        self.lock().security_rules.insert(virtual_service_id.to_string(), rules.clone());
        Ok(rules.clone())
    }
}
