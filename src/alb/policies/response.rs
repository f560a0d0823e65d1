//! HTTP response policies: header rewrites and/or a Location header rewrite

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::actions::{
    header_rewrites_from_upstream, header_rewrites_to_upstream, HeaderRewrite,
    LocationRewriteAction,
};
use super::matching::ResponseMatchCriteria;
use super::{enabled, PolicyChain};
use crate::errors::Result;
use crate::transport::AlbApi;
use crate::upstream::{HttpResponseRule, HttpRuleList};
use crate::validation::rule_error;

/// One rule of the response chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_response_policy"))]
pub struct ResponsePolicy {
    #[validate(length(min = 1, message = "policy name is required"))]
    pub name: String,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    #[validate(nested)]
    pub criteria: ResponseMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub header_rewrites: Option<Vec<HeaderRewrite>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub location_rewrite: Option<LocationRewriteAction>,
}

fn validate_response_policy(policy: &ResponsePolicy) -> std::result::Result<(), ValidationError> {
    let has_headers = policy.header_rewrites.as_ref().is_some_and(|r| !r.is_empty());
    if !has_headers && policy.location_rewrite.is_none() {
        return Err(rule_error(
            "required",
            "a header rewrite or location rewrite action is required",
        ));
    }
    Ok(())
}

impl ResponsePolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            logging: false,
            criteria: ResponseMatchCriteria::default(),
            header_rewrites: None,
            location_rewrite: None,
        }
    }

    pub fn from_upstream(rule: HttpResponseRule) -> Result<Self> {
        Ok(Self {
            name: rule.name,
            active: rule.active,
            logging: rule.logging,
            criteria: ResponseMatchCriteria::from_upstream(rule.match_criteria)?,
            header_rewrites: header_rewrites_from_upstream(rule.header_actions)?,
            location_rewrite: rule
                .rewrite_location_header_action
                .map(LocationRewriteAction::from_upstream)
                .transpose()?,
        })
    }

    pub fn to_upstream(&self) -> HttpResponseRule {
        HttpResponseRule {
            name: self.name.clone(),
            active: self.active,
            logging: self.logging,
            match_criteria: self.criteria.to_upstream(),
            header_actions: self.header_rewrites.as_deref().map(header_rewrites_to_upstream),
            rewrite_location_header_action: self
                .location_rewrite
                .as_ref()
                .map(LocationRewriteAction::to_upstream),
        }
    }
}

/// `httpResponseRules` of a virtual service
pub struct ResponseChain;

#[async_trait]
impl PolicyChain for ResponseChain {
    type Policy = ResponsePolicy;
    type Rule = HttpResponseRule;

    const RESOURCE: &'static str = "httpResponsePolicies";

    async fn fetch(api: &dyn AlbApi, virtual_service_id: &str) -> Result<HttpRuleList<HttpResponseRule>> {
        api.get_http_response_rules(virtual_service_id).await
    }

    async fn replace(
        api: &dyn AlbApi,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpResponseRule>,
    ) -> Result<HttpRuleList<HttpResponseRule>> {
        api.update_http_response_rules(virtual_service_id, rules).await
    }

    fn from_upstream(rule: HttpResponseRule) -> Result<ResponsePolicy> {
        ResponsePolicy::from_upstream(rule)
    }

    fn to_upstream(policy: &ResponsePolicy) -> HttpResponseRule {
        policy.to_upstream()
    }
}
