//! HTTP request policies
//!
//! A request rule either redirects, or rewrites headers and/or the URL
//! forwarded to the pool. The two families never mix.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::actions::{
    header_rewrites_from_upstream, header_rewrites_to_upstream, HeaderRewrite, RedirectAction,
    UrlRewriteAction,
};
use super::matching::RequestMatchCriteria;
use super::{action_result, conflicting_actions, enabled, PolicyChain};
use crate::errors::{CloudAvenueError, Result};
use crate::transport::AlbApi;
use crate::upstream::{HttpRequestRule, HttpRuleList};
use crate::validation::{push_list, push_nested, rule_error};

/// Action families of a request rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPolicyAction {
    Redirect(RedirectAction),
    Rewrite {
        header_rewrites: Vec<HeaderRewrite>,
        url_rewrite: Option<UrlRewriteAction>,
    },
}

fn validate_request_action(action: &RequestPolicyAction) -> std::result::Result<(), ValidationError> {
    let mut errors = ValidationErrors::new();

    match action {
        RequestPolicyAction::Redirect(redirect) => {
            push_nested(&mut errors, "redirect_action", redirect);
        }
        RequestPolicyAction::Rewrite { header_rewrites, url_rewrite } => {
            if header_rewrites.is_empty() && url_rewrite.is_none() {
                return Err(rule_error(
                    "required",
                    "a redirect, header rewrite or URL rewrite action is required",
                ));
            }
            push_list(&mut errors, "header_rewrites", header_rewrites);
            if let Some(url_rewrite) = url_rewrite {
                push_nested(&mut errors, "url_rewrite_action", url_rewrite);
            }
        }
    }

    action_result(errors)
}

/// One rule of the request chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(try_from = "RequestPolicyFields", into = "RequestPolicyFields")]
pub struct RequestPolicy {
    #[validate(length(min = 1, message = "policy name is required"))]
    pub name: String,
    pub active: bool,
    pub logging: bool,
    #[validate(nested)]
    pub criteria: RequestMatchCriteria,
    #[validate(custom(function = "validate_request_action"))]
    pub action: RequestPolicyAction,
}

/// Flat shape of a request rule, one optional field per action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPolicyFields {
    pub name: String,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub criteria: RequestMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_action: Option<RedirectAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_rewrites: Option<Vec<HeaderRewrite>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_rewrite_action: Option<UrlRewriteAction>,
}

impl TryFrom<RequestPolicyFields> for RequestPolicy {
    type Error = CloudAvenueError;

    fn try_from(fields: RequestPolicyFields) -> Result<Self> {
        let header_rewrites = fields.header_rewrites.filter(|rewrites| !rewrites.is_empty());

        let action = match (fields.redirect_action, header_rewrites, fields.url_rewrite_action) {
            (Some(redirect), None, None) => RequestPolicyAction::Redirect(redirect),
            (Some(_), _, _) => {
                return Err(conflicting_actions(format!(
                    "policy '{}': a redirect action cannot be combined with header or URL rewrites",
                    fields.name
                )))
            }
            (None, header_rewrites, url_rewrite) => RequestPolicyAction::Rewrite {
                header_rewrites: header_rewrites.unwrap_or_default(),
                url_rewrite,
            },
        };

        Ok(Self {
            name: fields.name,
            active: fields.active,
            logging: fields.logging,
            criteria: fields.criteria,
            action,
        })
    }
}

impl From<RequestPolicy> for RequestPolicyFields {
    fn from(policy: RequestPolicy) -> Self {
        let mut fields = RequestPolicyFields {
            name: policy.name,
            active: policy.active,
            logging: policy.logging,
            criteria: policy.criteria,
            ..Default::default()
        };

        match policy.action {
            RequestPolicyAction::Redirect(redirect) => fields.redirect_action = Some(redirect),
            RequestPolicyAction::Rewrite { header_rewrites, url_rewrite } => {
                fields.header_rewrites = Some(header_rewrites).filter(|r| !r.is_empty());
                fields.url_rewrite_action = url_rewrite;
            }
        }
        fields
    }
}

impl RequestPolicy {
    /// Active rule matching every request
    pub fn new(name: impl Into<String>, action: RequestPolicyAction) -> Self {
        Self {
            name: name.into(),
            active: true,
            logging: false,
            criteria: RequestMatchCriteria::default(),
            action,
        }
    }

    pub fn with_criteria(mut self, criteria: RequestMatchCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn from_upstream(rule: HttpRequestRule) -> Result<Self> {
        let fields = RequestPolicyFields {
            name: rule.name,
            active: rule.active,
            logging: rule.logging,
            criteria: RequestMatchCriteria::from_upstream(rule.match_criteria)?,
            redirect_action: rule.redirect_action.map(RedirectAction::from_upstream).transpose()?,
            header_rewrites: header_rewrites_from_upstream(rule.header_actions)?,
            url_rewrite_action: rule.rewrite_url_action.map(UrlRewriteAction::from_upstream),
        };

        Self::try_from(fields).map_err(|e| CloudAvenueError::upstream(e.to_string(), 502))
    }

    pub fn to_upstream(&self) -> HttpRequestRule {
        let mut rule = HttpRequestRule {
            name: self.name.clone(),
            active: self.active,
            logging: self.logging,
            match_criteria: self.criteria.to_upstream(),
            ..Default::default()
        };

        match &self.action {
            RequestPolicyAction::Redirect(redirect) => {
                rule.redirect_action = Some(redirect.to_upstream());
            }
            RequestPolicyAction::Rewrite { header_rewrites, url_rewrite } => {
                if !header_rewrites.is_empty() {
                    rule.header_actions = Some(header_rewrites_to_upstream(header_rewrites));
                }
                rule.rewrite_url_action = url_rewrite.as_ref().map(UrlRewriteAction::to_upstream);
            }
        }
        rule
    }
}

/// `httpRequestRules` of a virtual service
pub struct RequestChain;

#[async_trait]
impl PolicyChain for RequestChain {
    type Policy = RequestPolicy;
    type Rule = HttpRequestRule;

    const RESOURCE: &'static str = "httpRequestPolicies";

    async fn fetch(api: &dyn AlbApi, virtual_service_id: &str) -> Result<HttpRuleList<HttpRequestRule>> {
        api.get_http_request_rules(virtual_service_id).await
    }

    async fn replace(
        api: &dyn AlbApi,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpRequestRule>,
    ) -> Result<HttpRuleList<HttpRequestRule>> {
        api.update_http_request_rules(virtual_service_id, rules).await
    }

    fn from_upstream(rule: HttpRequestRule) -> Result<RequestPolicy> {
        RequestPolicy::from_upstream(rule)
    }

    fn to_upstream(policy: &RequestPolicy) -> HttpRequestRule {
        policy.to_upstream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alb::policies::matching::HttpProtocol;
    use crate::errors::ErrorKind;
    use crate::upstream::http_rules as wire;

    #[test]
    fn test_redirect_with_url_rewrite_is_rejected() {
        let fields = RequestPolicyFields {
            name: "mixed".to_string(),
            redirect_action: Some(RedirectAction::new(HttpProtocol::Https, 443, 301)),
            url_rewrite_action: Some(UrlRewriteAction::default()),
            ..Default::default()
        };

        let err = RequestPolicy::try_from(fields).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_flat_json_shape() {
        let policy = RequestPolicy::new(
            "strip",
            RequestPolicyAction::Rewrite {
                header_rewrites: vec![HeaderRewrite::remove("Server")],
                url_rewrite: None,
            },
        );

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["header_rewrites"][0]["action"], "REMOVE");
        assert!(json.get("redirect_action").is_none());

        let back: RequestPolicy = serde_json::from_value(json).unwrap();
        assert_eq!(back, policy);
    }

    #[test]
    fn test_deserialize_rejects_both_families() {
        let json = serde_json::json!({
            "name": "mixed",
            "redirect_action": { "protocol": "HTTP", "port": 80, "status_code": 301 },
            "header_rewrites": [{ "action": "ADD", "name": "X", "value": "1" }]
        });
        assert!(serde_json::from_value::<RequestPolicy>(json).is_err());
    }

    #[test]
    fn test_missing_action_fails_validation() {
        let policy = RequestPolicy::new(
            "noop",
            RequestPolicyAction::Rewrite { header_rewrites: Vec::new(), url_rewrite: None },
        );
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_upstream_round_trip() {
        let rule = HttpRequestRule {
            name: "redirect".to_string(),
            active: true,
            logging: false,
            match_criteria: wire::RequestMatchCriteria {
                protocol: Some("HTTP".to_string()),
                ..Default::default()
            },
            redirect_action: Some(wire::RedirectAction {
                protocol: "HTTP".to_string(),
                host: Some("example.com".to_string()),
                port: Some(80),
                status_code: 301,
                path: Some("/n".to_string()),
                keep_query: true,
            }),
            ..Default::default()
        };

        let policy = RequestPolicy::from_upstream(rule.clone()).unwrap();
        assert_eq!(policy.criteria.protocol, Some(HttpProtocol::Http));
        assert!(policy.criteria.path.is_none());
        assert_eq!(policy.to_upstream(), rule);
    }

    #[test]
    fn test_unknown_upstream_method_is_upstream_error() {
        let rule = HttpRequestRule {
            name: "odd".to_string(),
            match_criteria: wire::RequestMatchCriteria {
                method_match: Some(wire::MethodMatch {
                    match_criteria: "IS_IN".to_string(),
                    methods: vec!["BREW".to_string()],
                }),
                ..Default::default()
            },
            ..Default::default()
        };

        let err = RequestPolicy::from_upstream(rule).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}
