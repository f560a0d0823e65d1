//! ALB capability set
//!
//! [`AlbApi`] is the seam between the load balancer managers and the
//! network: managers only ever talk to this trait, so they can be exercised
//! against an in-memory fake. [`CloudAvenueClient`] implements it over the
//! cloudapi endpoints.
//!
//! Writes are answered with an asynchronous task by the remote; the HTTP
//! implementation reads the object back once the write is accepted (by name
//! after a create, by id after an update, the whole chain after a rule PUT).

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

use super::client::CloudAvenueClient;
use crate::errors::{CloudAvenueError, ErrorContext, Result};
use crate::upstream::{
    AlbPool, AlbPoolSummary, AlbServiceEngineGroupAssignment, AlbVirtualService,
    AlbVirtualServiceSummary, HttpRequestRule, HttpResponseRule, HttpRuleList, HttpSecurityRule,
};

/// Operations the load balancer managers need from the cloud fabric
#[async_trait]
pub trait AlbApi: Send + Sync {
    /// Guarantee a valid bearer; a no-op while the cached one is fresh
    async fn refresh(&self) -> Result<()>;

    /// SEG bindings of an edge gateway
    async fn get_service_engine_group_assignments(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbServiceEngineGroupAssignment>>;

    async fn get_all_alb_pool_summaries(&self, edge_gateway_id: &str) -> Result<Vec<AlbPoolSummary>>;
    async fn get_alb_pool_by_id(&self, id: &str) -> Result<AlbPool>;
    async fn get_alb_pool_by_name(&self, edge_gateway_id: &str, name: &str) -> Result<AlbPool>;
    async fn create_nsxt_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool>;
    async fn update_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool>;
    async fn delete_alb_pool(&self, id: &str) -> Result<()>;

    async fn get_all_alb_virtual_service_summaries(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbVirtualServiceSummary>>;
    async fn get_alb_virtual_service_by_id(&self, id: &str) -> Result<AlbVirtualService>;
    async fn get_alb_virtual_service_by_name(
        &self,
        edge_gateway_id: &str,
        name: &str,
    ) -> Result<AlbVirtualService>;
    async fn create_nsxt_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService>;
    async fn update_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService>;
    async fn delete_alb_virtual_service(&self, id: &str) -> Result<()>;

    async fn get_http_request_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpRequestRule>>;
    async fn update_http_request_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpRequestRule>,
    ) -> Result<HttpRuleList<HttpRequestRule>>;

    async fn get_http_response_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpResponseRule>>;
    async fn update_http_response_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpResponseRule>,
    ) -> Result<HttpRuleList<HttpResponseRule>>;

    async fn get_http_security_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpSecurityRule>>;
    async fn update_http_security_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpSecurityRule>,
    ) -> Result<HttpRuleList<HttpSecurityRule>>;
}

fn pool_path(id: &str) -> String {
    format!("loadBalancer/pools/{}", id)
}

fn virtual_service_path(id: &str) -> String {
    format!("loadBalancer/virtualServices/{}", id)
}

fn rules_path(virtual_service_id: &str, chain: &str) -> String {
    format!("loadBalancer/virtualServices/{}/{}", virtual_service_id, chain)
}

fn name_filter(name: &str) -> Vec<(&'static str, String)> {
    vec![("filter", format!("name=={}", name))]
}

fn require_id<'a>(id: &'a Option<String>, what: &str) -> Result<&'a str> {
    id.as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CloudAvenueError::empty(format!("{} identifier is required for update", what)))
}

#[async_trait]
impl AlbApi for CloudAvenueClient {
    async fn refresh(&self) -> Result<()> {
        CloudAvenueClient::refresh(self).await
    }

    async fn get_service_engine_group_assignments(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbServiceEngineGroupAssignment>> {
        self.get_all_pages(
            "loadBalancer/serviceEngineGroups/assignments",
            &[("filter", format!("gatewayRef.id=={}", edge_gateway_id))],
        )
        .await
        .context("list service engine group assignments")
    }

    async fn get_all_alb_pool_summaries(&self, edge_gateway_id: &str) -> Result<Vec<AlbPoolSummary>> {
        self.get_all_pages(&format!("edgeGateways/{}/loadBalancer/poolSummaries", edge_gateway_id), &[])
            .await
            .context("list loadBalancerPool summaries")
    }

    async fn get_alb_pool_by_id(&self, id: &str) -> Result<AlbPool> {
        self.request(Method::GET, pool_path(id)).send().await.context("get loadBalancerPool")
    }

    async fn get_alb_pool_by_name(&self, edge_gateway_id: &str, name: &str) -> Result<AlbPool> {
        let summaries: Vec<AlbPoolSummary> = self
            .get_all_pages(
                &format!("edgeGateways/{}/loadBalancer/poolSummaries", edge_gateway_id),
                &name_filter(name),
            )
            .await
            .context("find loadBalancerPool by name")?;

        let summary = summaries
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerPool", name))?;

        self.get_alb_pool_by_id(&summary.id).await
    }

    async fn create_nsxt_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool> {
        self.request(Method::POST, "loadBalancer/pools")
            .json(pool)?
            .send_empty()
            .await
            .context("create loadBalancerPool")?;

        debug!(name = %pool.name, "Pool created, reading it back");
        self.get_alb_pool_by_name(&pool.gateway_ref.id, &pool.name).await
    }

    async fn update_alb_pool(&self, pool: &AlbPool) -> Result<AlbPool> {
        let id = require_id(&pool.id, "loadBalancerPool")?;
        self.request(Method::PUT, pool_path(id))
            .json(pool)?
            .send_empty()
            .await
            .context("update loadBalancerPool")?;

        self.get_alb_pool_by_id(id).await
    }

    async fn delete_alb_pool(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, pool_path(id))
            .send_empty()
            .await
            .context("delete loadBalancerPool")
    }

    async fn get_all_alb_virtual_service_summaries(
        &self,
        edge_gateway_id: &str,
    ) -> Result<Vec<AlbVirtualServiceSummary>> {
        self.get_all_pages(
            &format!("edgeGateways/{}/loadBalancer/virtualServiceSummaries", edge_gateway_id),
            &[],
        )
        .await
        .context("list loadBalancerVirtualService summaries")
    }

    async fn get_alb_virtual_service_by_id(&self, id: &str) -> Result<AlbVirtualService> {
        self.request(Method::GET, virtual_service_path(id))
            .send()
            .await
            .context("get loadBalancerVirtualService")
    }

    async fn get_alb_virtual_service_by_name(
        &self,
        edge_gateway_id: &str,
        name: &str,
    ) -> Result<AlbVirtualService> {
        let summaries: Vec<AlbVirtualServiceSummary> = self
            .get_all_pages(
                &format!("edgeGateways/{}/loadBalancer/virtualServiceSummaries", edge_gateway_id),
                &name_filter(name),
            )
            .await
            .context("find loadBalancerVirtualService by name")?;

        let summary = summaries
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| CloudAvenueError::not_found("loadBalancerVirtualService", name))?;

        self.get_alb_virtual_service_by_id(&summary.id).await
    }

    async fn create_nsxt_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService> {
        self.request(Method::POST, "loadBalancer/virtualServices")
            .json(virtual_service)?
            .send_empty()
            .await
            .context("create loadBalancerVirtualService")?;

        debug!(name = %virtual_service.name, "Virtual service created, reading it back");
        self.get_alb_virtual_service_by_name(&virtual_service.gateway_ref.id, &virtual_service.name)
            .await
    }

    async fn update_alb_virtual_service(
        &self,
        virtual_service: &AlbVirtualService,
    ) -> Result<AlbVirtualService> {
        let id = require_id(&virtual_service.id, "loadBalancerVirtualService")?;
        self.request(Method::PUT, virtual_service_path(id))
            .json(virtual_service)?
            .send_empty()
            .await
            .context("update loadBalancerVirtualService")?;

        self.get_alb_virtual_service_by_id(id).await
    }

    async fn delete_alb_virtual_service(&self, id: &str) -> Result<()> {
        self.request(Method::DELETE, virtual_service_path(id))
            .send_empty()
            .await
            .context("delete loadBalancerVirtualService")
    }

    async fn get_http_request_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpRequestRule>> {
        self.request(Method::GET, rules_path(virtual_service_id, "httpRequestRules"))
            .send()
            .await
            .context("get httpRequestRules")
    }

    async fn update_http_request_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpRequestRule>,
    ) -> Result<HttpRuleList<HttpRequestRule>> {
        self.request(Method::PUT, rules_path(virtual_service_id, "httpRequestRules"))
            .json(rules)?
            .send_empty()
            .await
            .context("update httpRequestRules")?;

        self.get_http_request_rules(virtual_service_id).await
    }

    async fn get_http_response_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpResponseRule>> {
        self.request(Method::GET, rules_path(virtual_service_id, "httpResponseRules"))
            .send()
            .await
            .context("get httpResponseRules")
    }

    async fn update_http_response_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpResponseRule>,
    ) -> Result<HttpRuleList<HttpResponseRule>> {
        self.request(Method::PUT, rules_path(virtual_service_id, "httpResponseRules"))
            .json(rules)?
            .send_empty()
            .await
            .context("update httpResponseRules")?;

        self.get_http_response_rules(virtual_service_id).await
    }

    async fn get_http_security_rules(
        &self,
        virtual_service_id: &str,
    ) -> Result<HttpRuleList<HttpSecurityRule>> {
        self.request(Method::GET, rules_path(virtual_service_id, "httpSecurityRules"))
            .send()
            .await
            .context("get httpSecurityRules")
    }

    async fn update_http_security_rules(
        &self,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpSecurityRule>,
    ) -> Result<HttpRuleList<HttpSecurityRule>> {
        self.request(Method::PUT, rules_path(virtual_service_id, "httpSecurityRules"))
            .json(rules)?
            .send_empty()
            .await
            .context("update httpSecurityRules")?;

        self.get_http_security_rules(virtual_service_id).await
    }
}
