//! HTTP policy rules of a virtual service
//!
//! `GET|PUT loadBalancer/virtualServices/{id}/httpRequestRules` (and the
//! response and security siblings) exchange a `{ "values": [...] }` envelope.
//! A PUT replaces the whole ordered chain.

use serde::{Deserialize, Serialize};

/// `{ "values": [...] }` envelope; `None` when the remote sends no list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRuleList<T> {
    #[serde(default)]
    pub values: Option<Vec<T>>,
}

impl<T> HttpRuleList<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values: Some(values) }
    }

    pub fn empty() -> Self {
        Self { values: Some(Vec::new()) }
    }
}

impl<T> Default for HttpRuleList<T> {
    fn default() -> Self {
        Self { values: None }
    }
}

// ---------------------------------------------------------------------------
// Match criteria
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIpMatch {
    pub match_criteria: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePortMatch {
    pub match_criteria: String,
    #[serde(default)]
    pub ports: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMatch {
    pub match_criteria: String,
    #[serde(default)]
    pub methods: Vec<String>,
}

/// Path and location header matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringMatch {
    pub match_criteria: String,
    #[serde(default)]
    pub match_strings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderMatch {
    pub match_criteria: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieMatch {
    pub match_criteria: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCodeMatch {
    pub match_criteria: String,
    #[serde(default)]
    pub status_codes: Vec<String>,
}

/// Match criteria shared by request and security rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip_match: Option<ClientIpMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port_match: Option<ServicePortMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_match: Option<MethodMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_match: Option<StringMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_match: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_match: Option<Vec<HeaderMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_match: Option<CookieMatch>,
}

/// Match criteria of response rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip_match: Option<ClientIpMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_port_match: Option<ServicePortMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_match: Option<MethodMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_match: Option<StringMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_match: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_header_match: Option<Vec<HeaderMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie_match: Option<CookieMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_match: Option<StringMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_header_match: Option<Vec<HeaderMatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_match: Option<StatusCodeMatch>,
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectAction {
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    pub status_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderAction {
    pub action: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteUrlAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_path: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteLocationHeaderAction {
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectToHttpsAction {
    pub port: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalResponseAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub status_code: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitingAction {
    pub count: i32,
    pub period: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_connection_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_action: Option<RedirectAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_response_action: Option<LocalResponseAction>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequestRule {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub match_criteria: RequestMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_action: Option<RedirectAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_actions: Option<Vec<HeaderAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_url_action: Option<RewriteUrlAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponseRule {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub match_criteria: ResponseMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_actions: Option<Vec<HeaderAction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewrite_location_header_action: Option<RewriteLocationHeaderAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSecurityRule {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub logging: bool,
    #[serde(default)]
    pub match_criteria: RequestMatchCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "redirectToHTTPSAction")]
    pub redirect_to_https_action: Option<RedirectToHttpsAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_or_close_connection_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limiting_action: Option<RateLimitingAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_response_action: Option<LocalResponseAction>,
}
