//! HTTP security policies
//!
//! Each rule carries exactly one action: allow/close the connection, rate
//! limit, redirect to HTTPS or answer locally. A rate limit may itself
//! carry one follow-up action for the requests above the limit.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::actions::{ConnectionAction, RedirectAction, RedirectToHttpsAction, SendResponseAction};
use super::matching::RequestMatchCriteria;
use super::{action_result, conflicting_actions, enabled, PolicyChain};
use crate::errors::{CloudAvenueError, Result};
use crate::transport::AlbApi;
use crate::upstream::http_rules as wire;
use crate::upstream::{parse_upstream, HttpRuleList, HttpSecurityRule};
use crate::validation::push_nested;

const CLOSE_CONNECTION: &str = "CLOSE";

/// What happens to requests above the rate limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitSubAction {
    Redirect(RedirectAction),
    SendResponse(SendResponseAction),
    CloseConnection,
}

fn validate_sub_action(action: &RateLimitSubAction) -> std::result::Result<(), ValidationError> {
    let mut errors = ValidationErrors::new();
    match action {
        RateLimitSubAction::Redirect(redirect) => push_nested(&mut errors, "redirect_action", redirect),
        RateLimitSubAction::SendResponse(response) => {
            push_nested(&mut errors, "send_response_action", response)
        }
        RateLimitSubAction::CloseConnection => {}
    }
    action_result(errors)
}

/// Allow `count` requests per `period` seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(try_from = "RateLimitActionFields", into = "RateLimitActionFields")]
pub struct RateLimitAction {
    #[validate(range(min = 1, max = 2147483647, message = "count must be between 1 and 2147483647"))]
    pub count: u32,
    #[validate(range(
        min = 1,
        max = 2147483647,
        message = "period must be between 1 and 2147483647 seconds"
    ))]
    pub period: u32,
    #[validate(custom(function = "validate_sub_action"))]
    pub action: Option<RateLimitSubAction>,
}

/// Flat shape of a rate limit action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitActionFields {
    pub count: u32,
    pub period: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_action: Option<RedirectAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_response_action: Option<SendResponseAction>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub close_connection: bool,
}

impl TryFrom<RateLimitActionFields> for RateLimitAction {
    type Error = CloudAvenueError;

    fn try_from(fields: RateLimitActionFields) -> Result<Self> {
        let action = match (fields.redirect_action, fields.send_response_action, fields.close_connection) {
            (None, None, false) => None,
            (Some(redirect), None, false) => Some(RateLimitSubAction::Redirect(redirect)),
            (None, Some(response), false) => Some(RateLimitSubAction::SendResponse(response)),
            (None, None, true) => Some(RateLimitSubAction::CloseConnection),
            _ => {
                return Err(conflicting_actions(
                    "a rate limit carries at most one of redirect, send response or close connection",
                ))
            }
        };
        Ok(Self { count: fields.count, period: fields.period, action })
    }
}

impl From<RateLimitAction> for RateLimitActionFields {
    fn from(action: RateLimitAction) -> Self {
        let mut fields =
            RateLimitActionFields { count: action.count, period: action.period, ..Default::default() };
        match action.action {
            Some(RateLimitSubAction::Redirect(redirect)) => fields.redirect_action = Some(redirect),
            Some(RateLimitSubAction::SendResponse(response)) => {
                fields.send_response_action = Some(response)
            }
            Some(RateLimitSubAction::CloseConnection) => fields.close_connection = true,
            None => {}
        }
        fields
    }
}

fn counter_from_upstream(value: i32, name: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| CloudAvenueError::upstream(format!("negative rate limit {}: {}", name, value), 502))
}

impl RateLimitAction {
    pub fn new(count: u32, period: u32) -> Self {
        Self { count, period, action: None }
    }

    pub fn from_upstream(action: wire::RateLimitingAction) -> Result<Self> {
        let fields = RateLimitActionFields {
            count: counter_from_upstream(action.count, "count")?,
            period: counter_from_upstream(action.period, "period")?,
            redirect_action: action.redirect_action.map(RedirectAction::from_upstream).transpose()?,
            send_response_action: action
                .local_response_action
                .map(SendResponseAction::from_upstream)
                .transpose()?,
            close_connection: action.close_connection_action.is_some(),
        };
        Self::try_from(fields).map_err(|e| CloudAvenueError::upstream(e.to_string(), 502))
    }

    pub fn to_upstream(&self) -> wire::RateLimitingAction {
        let mut action = wire::RateLimitingAction {
            count: i32::try_from(self.count).unwrap_or(i32::MAX),
            period: i32::try_from(self.period).unwrap_or(i32::MAX),
            ..Default::default()
        };
        match &self.action {
            Some(RateLimitSubAction::Redirect(redirect)) => {
                action.redirect_action = Some(redirect.to_upstream())
            }
            Some(RateLimitSubAction::SendResponse(response)) => {
                action.local_response_action = Some(response.to_upstream())
            }
            Some(RateLimitSubAction::CloseConnection) => {
                action.close_connection_action = Some(CLOSE_CONNECTION.to_string())
            }
            None => {}
        }
        action
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicyAction {
    Connection(ConnectionAction),
    RateLimit(RateLimitAction),
    RedirectToHttps(RedirectToHttpsAction),
    SendResponse(SendResponseAction),
}

fn validate_security_action(action: &SecurityPolicyAction) -> std::result::Result<(), ValidationError> {
    let mut errors = ValidationErrors::new();
    match action {
        SecurityPolicyAction::Connection(_) => {}
        SecurityPolicyAction::RateLimit(limit) => push_nested(&mut errors, "rate_limit_action", limit),
        SecurityPolicyAction::RedirectToHttps(redirect) => {
            push_nested(&mut errors, "redirect_to_https_action", redirect)
        }
        SecurityPolicyAction::SendResponse(response) => {
            push_nested(&mut errors, "send_response_action", response)
        }
    }
    action_result(errors)
}

/// One rule of the security chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(try_from = "SecurityPolicyFields", into = "SecurityPolicyFields")]
pub struct SecurityPolicy {
    #[validate(length(min = 1, message = "policy name is required"))]
    pub name: String,
    pub active: bool,
    pub logging: bool,
    #[validate(nested)]
    pub criteria: RequestMatchCriteria,
    #[validate(custom(function = "validate_security_action"))]
    pub action: SecurityPolicyAction,
}

/// Flat shape of a security rule, one optional field per action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicyFields {
    pub name: String,
    #[serde(default = "enabled")]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub criteria: RequestMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_action: Option<ConnectionAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_action: Option<RateLimitAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to_https_action: Option<RedirectToHttpsAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_response_action: Option<SendResponseAction>,
}

impl TryFrom<SecurityPolicyFields> for SecurityPolicy {
    type Error = CloudAvenueError;

    fn try_from(fields: SecurityPolicyFields) -> Result<Self> {
        let mut actions = Vec::with_capacity(1);
        if let Some(connection) = fields.connection_action {
            actions.push(SecurityPolicyAction::Connection(connection));
        }
        if let Some(limit) = fields.rate_limit_action {
            actions.push(SecurityPolicyAction::RateLimit(limit));
        }
        if let Some(redirect) = fields.redirect_to_https_action {
            actions.push(SecurityPolicyAction::RedirectToHttps(redirect));
        }
        if let Some(response) = fields.send_response_action {
            actions.push(SecurityPolicyAction::SendResponse(response));
        }

        if actions.len() != 1 {
            return Err(conflicting_actions(format!(
                "policy '{}': exactly one security action is required, found {}",
                fields.name,
                actions.len()
            )));
        }

        Ok(Self {
            name: fields.name,
            active: fields.active,
            logging: fields.logging,
            criteria: fields.criteria,
            action: actions.remove(0),
        })
    }
}

impl From<SecurityPolicy> for SecurityPolicyFields {
    fn from(policy: SecurityPolicy) -> Self {
        let mut fields = SecurityPolicyFields {
            name: policy.name,
            active: policy.active,
            logging: policy.logging,
            criteria: policy.criteria,
            ..Default::default()
        };
        match policy.action {
            SecurityPolicyAction::Connection(connection) => fields.connection_action = Some(connection),
            SecurityPolicyAction::RateLimit(limit) => fields.rate_limit_action = Some(limit),
            SecurityPolicyAction::RedirectToHttps(redirect) => {
                fields.redirect_to_https_action = Some(redirect)
            }
            SecurityPolicyAction::SendResponse(response) => fields.send_response_action = Some(response),
        }
        fields
    }
}

impl SecurityPolicy {
    /// Active rule matching every request
    pub fn new(name: impl Into<String>, action: SecurityPolicyAction) -> Self {
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

    pub fn from_upstream(rule: HttpSecurityRule) -> Result<Self> {
        let fields = SecurityPolicyFields {
            name: rule.name,
            active: rule.active,
            logging: rule.logging,
            criteria: RequestMatchCriteria::from_upstream(rule.match_criteria)?,
            connection_action: rule
                .allow_or_close_connection_action
                .as_deref()
                .map(parse_upstream)
                .transpose()?,
            rate_limit_action: rule.rate_limiting_action.map(RateLimitAction::from_upstream).transpose()?,
            redirect_to_https_action: rule
                .redirect_to_https_action
                .map(RedirectToHttpsAction::from_upstream)
                .transpose()?,
            send_response_action: rule
                .local_response_action
                .map(SendResponseAction::from_upstream)
                .transpose()?,
        };

        Self::try_from(fields).map_err(|e| CloudAvenueError::upstream(e.to_string(), 502))
    }

    pub fn to_upstream(&self) -> HttpSecurityRule {
        let mut rule = HttpSecurityRule {
            name: self.name.clone(),
            active: self.active,
            logging: self.logging,
            match_criteria: self.criteria.to_upstream(),
            ..Default::default()
        };
        match &self.action {
            SecurityPolicyAction::Connection(connection) => {
                rule.allow_or_close_connection_action = Some(connection.as_str().to_string())
            }
            SecurityPolicyAction::RateLimit(limit) => rule.rate_limiting_action = Some(limit.to_upstream()),
            SecurityPolicyAction::RedirectToHttps(redirect) => {
                rule.redirect_to_https_action = Some(redirect.to_upstream())
            }
            SecurityPolicyAction::SendResponse(response) => {
                rule.local_response_action = Some(response.to_upstream())
            }
        }
        rule
    }
}

/// `httpSecurityRules` of a virtual service
pub struct SecurityChain;

#[async_trait]
impl PolicyChain for SecurityChain {
    type Policy = SecurityPolicy;
    type Rule = HttpSecurityRule;

    const RESOURCE: &'static str = "httpSecurityPolicies";

    async fn fetch(api: &dyn AlbApi, virtual_service_id: &str) -> Result<HttpRuleList<HttpSecurityRule>> {
        api.get_http_security_rules(virtual_service_id).await
    }

    async fn replace(
        api: &dyn AlbApi,
        virtual_service_id: &str,
        rules: &HttpRuleList<HttpSecurityRule>,
    ) -> Result<HttpRuleList<HttpSecurityRule>> {
        api.update_http_security_rules(virtual_service_id, rules).await
    }

    fn from_upstream(rule: HttpSecurityRule) -> Result<SecurityPolicy> {
        SecurityPolicy::from_upstream(rule)
    }

    fn to_upstream(policy: &SecurityPolicy) -> HttpSecurityRule {
        policy.to_upstream()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alb::policies::actions::ResponseContentType;
    use crate::alb::policies::matching::HttpProtocol;
    use crate::errors::ErrorKind;
    use crate::validation::validate_request;

    #[test]
    fn test_connection_and_rate_limit_rejected() {
        let fields = SecurityPolicyFields {
            name: "both".to_string(),
            connection_action: Some(ConnectionAction::Close),
            rate_limit_action: Some(RateLimitAction::new(100, 60)),
            ..Default::default()
        };
        let err = SecurityPolicy::try_from(fields).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_no_action_rejected() {
        let fields = SecurityPolicyFields { name: "none".to_string(), ..Default::default() };
        assert!(SecurityPolicy::try_from(fields).unwrap_err().is_validation());
    }

    #[test]
    fn test_rate_limit_sub_actions() {
        let mut limit = RateLimitAction::new(100, 60);
        limit.action = Some(RateLimitSubAction::Redirect(RedirectAction::new(HttpProtocol::Https, 443, 302)));
        let policy = SecurityPolicy::new("limit", SecurityPolicyAction::RateLimit(limit.clone()));
        assert!(validate_request(&policy).is_ok());
        assert_eq!(SecurityPolicy::from_upstream(policy.to_upstream()).unwrap(), policy);

        limit.action = Some(RateLimitSubAction::SendResponse(SendResponseAction {
            status_code: 404,
            content_type: Some(ResponseContentType::Json),
            content: Some(r#"{"k":"v"}"#.to_string()),
        }));
        let policy = SecurityPolicy::new("limit", SecurityPolicyAction::RateLimit(limit));
        assert!(validate_request(&policy).is_ok());
        assert_eq!(SecurityPolicy::from_upstream(policy.to_upstream()).unwrap(), policy);
    }

    #[test]
    fn test_rate_limit_close_connection_wire() {
        let mut limit = RateLimitAction::new(10, 1);
        limit.action = Some(RateLimitSubAction::CloseConnection);
        let upstream = limit.to_upstream();
        assert_eq!(upstream.close_connection_action.as_deref(), Some("CLOSE"));
        assert_eq!(RateLimitAction::from_upstream(upstream).unwrap(), limit);
    }

    #[test]
    fn test_rate_limit_two_sub_actions_rejected() {
        let fields = RateLimitActionFields {
            count: 1,
            period: 1,
            send_response_action: Some(SendResponseAction::new(429)),
            close_connection: true,
            ..Default::default()
        };
        assert!(RateLimitAction::try_from(fields).unwrap_err().is_validation());
    }

    #[test]
    fn test_rate_limit_beyond_upstream_range_rejected() {
        assert!(RateLimitAction::new(i32::MAX as u32, 1).validate().is_ok());
        assert!(RateLimitAction::new(u32::MAX, 1).validate().is_err());

        let policy = SecurityPolicy::new(
            "limit",
            SecurityPolicyAction::RateLimit(RateLimitAction::new(100, i32::MAX as u32 + 1)),
        );
        let err = validate_request(&policy).unwrap_err().to_string();
        assert!(err.contains("rate_limit_action"), "{}", err);
    }

    #[test]
    fn test_send_response_code_validated() {
        let policy = SecurityPolicy::new(
            "deny",
            SecurityPolicyAction::SendResponse(SendResponseAction::new(418)),
        );
        let err = validate_request(&policy).unwrap_err().to_string();
        assert!(err.contains("send_response_action"), "{}", err);
    }

    #[test]
    fn test_flat_json_shape() {
        let policy = SecurityPolicy::new(
            "https",
            SecurityPolicyAction::RedirectToHttps(RedirectToHttpsAction { port: 443 }),
        );
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["redirect_to_https_action"]["port"], 443);
        assert!(json.get("connection_action").is_none());
        assert_eq!(serde_json::from_value::<SecurityPolicy>(json).unwrap(), policy);
    }
}
