//! # HTTP Policy Chains
//!
//! Three ordered rule chains hang off every virtual service: request,
//! response and security. A chain is read and replaced as a whole; deleting
//! a chain replaces it with the empty list, which leaves it readable.
//!
//! The lifecycle is shared by [`HttpPolicyManager`]; what differs per chain
//! (rule shape, endpoints, translation) lives behind [`PolicyChain`].

pub mod actions;
pub mod matching;
pub mod request;
pub mod response;
pub mod security;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, Instrument};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::VirtualServiceId;
use crate::errors::{CloudAvenueError, ErrorContext, Result};
use crate::transport::AlbApi;
use crate::upstream::HttpRuleList;
use crate::validation::{nested_rule_error, push_list, validate_request, validate_virtual_service_urn};

pub use actions::{
    ConnectionAction, HeaderRewrite, HeaderRewriteAction, LocationRewriteAction, RedirectAction,
    RedirectToHttpsAction, ResponseContentType, SendResponseAction, UrlRewriteAction,
};
pub use matching::{
    ClientIpMatch, CookieMatch, CookieMatchOperator, HeaderMatch, HeaderMatchOperator, HttpMethod,
    HttpProtocol, MethodMatch, RequestMatchCriteria, ResponseMatchCriteria, ServicePortMatch,
    SetMatchOperator, StatusCodeMatch, StringMatch, StringMatchOperator,
};
pub use request::{RequestChain, RequestPolicy, RequestPolicyAction, RequestPolicyFields};
pub use response::{ResponseChain, ResponsePolicy};
pub use security::{
    RateLimitAction, RateLimitActionFields, RateLimitSubAction, SecurityChain, SecurityPolicy,
    SecurityPolicyAction, SecurityPolicyFields,
};

pub(crate) fn enabled() -> bool {
    true
}

/// Turn the failures gathered for an action into a single rule error
pub(crate) fn action_result(errors: ValidationErrors) -> std::result::Result<(), ValidationError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(nested_rule_error("action", "", &errors))
    }
}

/// Rejected flat action combinations
pub(crate) fn conflicting_actions(message: impl Into<String>) -> CloudAvenueError {
    CloudAvenueError::validation_field(message, "action")
}

/// The ordered policy chain of one virtual service.
///
/// `policies` is `None` when the remote holds no list at all, which is
/// distinct from an empty chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpPolicies<P> {
    pub virtual_service_id: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<P>>,
}

impl<P> HttpPolicies<P> {
    pub fn new(virtual_service_id: impl Into<String>, policies: Vec<P>) -> Self {
        Self { virtual_service_id: virtual_service_id.into(), policies: Some(policies) }
    }

    pub fn len(&self) -> usize {
        self.policies.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: Validate> Validate for HttpPolicies<P> {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(error) = validate_virtual_service_urn(&self.virtual_service_id) {
            errors.add("virtual_service_id", error);
        }
        if let Some(policies) = &self.policies {
            push_list(&mut errors, "policies", policies);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// What distinguishes one policy chain from another
#[async_trait]
pub trait PolicyChain: Send + Sync + 'static {
    /// Outward policy model
    type Policy: Validate + Clone + fmt::Debug + Send + Sync;
    /// Upstream rule shape
    type Rule: Send + Sync;

    /// Resource name used in logs and errors
    const RESOURCE: &'static str;

    async fn fetch(api: &dyn AlbApi, virtual_service_id: &str) -> Result<HttpRuleList<Self::Rule>>;

    async fn replace(
        api: &dyn AlbApi,
        virtual_service_id: &str,
        rules: &HttpRuleList<Self::Rule>,
    ) -> Result<HttpRuleList<Self::Rule>>;

    fn from_upstream(rule: Self::Rule) -> Result<Self::Policy>;

    fn to_upstream(policy: &Self::Policy) -> Self::Rule;
}

/// Get, replace and clear one policy chain of a virtual service
pub struct HttpPolicyManager<C: PolicyChain> {
    api: Arc<dyn AlbApi>,
    chain: PhantomData<C>,
}

impl<C: PolicyChain> Clone for HttpPolicyManager<C> {
    fn clone(&self) -> Self {
        Self { api: Arc::clone(&self.api), chain: PhantomData }
    }
}

pub type HttpRequestPolicyManager = HttpPolicyManager<RequestChain>;
pub type HttpResponsePolicyManager = HttpPolicyManager<ResponseChain>;
pub type HttpSecurityPolicyManager = HttpPolicyManager<SecurityChain>;

impl<C: PolicyChain> HttpPolicyManager<C> {
    pub fn new(api: Arc<dyn AlbApi>) -> Self {
        Self { api, chain: PhantomData }
    }

    fn translate(rules: HttpRuleList<C::Rule>) -> Result<Option<Vec<C::Policy>>> {
        rules
            .values
            .map(|rules| rules.into_iter().map(C::from_upstream).collect::<Result<Vec<_>>>())
            .transpose()
    }

    /// Refresh the session and make sure the virtual service exists
    async fn prepare(&self, virtual_service_id: &VirtualServiceId) -> Result<()> {
        self.api.refresh().await?;
        self.api
            .get_alb_virtual_service_by_id(virtual_service_id.as_str())
            .await
            .context(C::RESOURCE)?;
        Ok(())
    }

    /// Read the chain in evaluation order
    pub async fn get(&self, virtual_service_id: &str) -> Result<HttpPolicies<C::Policy>> {
        let span = crate::alb_span!("get", C::RESOURCE, virtual_service_id = %virtual_service_id);

        async move {
            let id = VirtualServiceId::parse(virtual_service_id)?;
            self.prepare(&id).await?;

            let rules = C::fetch(self.api.as_ref(), id.as_str()).await.context(C::RESOURCE)?;
            let policies = Self::translate(rules)?;

            debug!(count = policies.as_ref().map(Vec::len), "Policy chain read");
            Ok(HttpPolicies { virtual_service_id: id.into_string(), policies })
        }
        .instrument(span)
        .await
    }

    /// Replace the whole chain with `policies`, in order.
    ///
    /// `policies: None` clears the chain, like [`Self::delete`].
    pub async fn update(
        &self,
        policies: &HttpPolicies<C::Policy>,
    ) -> Result<HttpPolicies<C::Policy>> {
        let span = crate::alb_span!(
            "update",
            C::RESOURCE,
            virtual_service_id = %policies.virtual_service_id
        );

        async move {
            let id = VirtualServiceId::parse(&policies.virtual_service_id)?;
            validate_request(policies)?;
            self.prepare(&id).await?;

            // An absent chain is written as the empty list
            let rules = HttpRuleList::new(
                policies.policies.as_deref().unwrap_or_default().iter().map(C::to_upstream).collect(),
            );
            let written = C::replace(self.api.as_ref(), id.as_str(), &rules)
                .await
                .context(C::RESOURCE)?;
            let policies = Self::translate(written)?;

            info!(count = policies.as_ref().map(Vec::len), "Policy chain replaced");
            Ok(HttpPolicies { virtual_service_id: id.into_string(), policies })
        }
        .instrument(span)
        .await
    }

    /// Clear the chain by replacing it with the empty list
    pub async fn delete(&self, virtual_service_id: &str) -> Result<()> {
        let span = crate::alb_span!("delete", C::RESOURCE, virtual_service_id = %virtual_service_id);

        async move {
            let id = VirtualServiceId::parse(virtual_service_id)?;
            self.prepare(&id).await?;

            C::replace(self.api.as_ref(), id.as_str(), &HttpRuleList::empty())
                .await
                .context(C::RESOURCE)?;

            info!("Policy chain cleared");
            Ok(())
        }
        .instrument(span)
        .await
    }
}
