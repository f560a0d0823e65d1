//! Policy actions shared across chains

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::alb::policies::matching::HttpProtocol;
use crate::domain::enums::wire_enum;
use crate::errors::{CloudAvenueError, Result};
use crate::upstream::http_rules as wire;
use crate::upstream::{parse_upstream, port_from_upstream};
use crate::validation::rule_error;

wire_enum! {
    /// Header rewrite operation
    HeaderRewriteAction {
        Add => "ADD",
        Remove => "REMOVE",
        Replace => "REPLACE",
    }
}

wire_enum! {
    ConnectionAction {
        Allow => "ALLOW",
        Close => "CLOSE",
    }
}

wire_enum! {
    /// Content type of a locally generated response
    ResponseContentType {
        Json => "application/json",
        Text => "text/plain",
        Html => "text/html",
    }
}

const REDIRECT_STATUS_CODES: &[u16] = &[301, 302, 307];
const SEND_RESPONSE_STATUS_CODES: &[u16] = &[200, 204, 403, 404, 429, 501];

fn status_code_from_upstream(code: i32) -> Result<u16> {
    u16::try_from(code)
        .map_err(|_| CloudAvenueError::upstream(format!("status code {} out of range", code), 502))
}

fn one_of(code: u16, allowed: &[u16]) -> std::result::Result<(), ValidationError> {
    if allowed.contains(&code) {
        return Ok(());
    }
    let allowed = allowed.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ");
    Err(rule_error("oneof", format!("status code {} is not one of [{}]", code, allowed)))
}

/// Add, remove or replace one header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_header_rewrite"))]
pub struct HeaderRewrite {
    pub action: HeaderRewriteAction,
    #[validate(length(min = 1, message = "header name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn validate_header_rewrite(rewrite: &HeaderRewrite) -> std::result::Result<(), ValidationError> {
    let has_value = rewrite.value.as_deref().is_some_and(|v| !v.is_empty());
    match (rewrite.action, has_value) {
        (HeaderRewriteAction::Remove, true) => {
            Err(rule_error("excluded_if", "value is not allowed when action is REMOVE"))
        }
        (HeaderRewriteAction::Add | HeaderRewriteAction::Replace, false) => Err(rule_error(
            "required_if",
            format!("value is required when action is {}", rewrite.action),
        )),
        _ => Ok(()),
    }
}

impl HeaderRewrite {
    pub fn add(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { action: HeaderRewriteAction::Add, name: name.into(), value: Some(value.into()) }
    }

    pub fn replace(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { action: HeaderRewriteAction::Replace, name: name.into(), value: Some(value.into()) }
    }

    pub fn remove(name: impl Into<String>) -> Self {
        Self { action: HeaderRewriteAction::Remove, name: name.into(), value: None }
    }

    pub fn from_upstream(action: wire::HeaderAction) -> Result<Self> {
        Ok(Self { action: parse_upstream(&action.action)?, name: action.name, value: action.value })
    }

    pub fn to_upstream(&self) -> wire::HeaderAction {
        wire::HeaderAction {
            action: self.action.as_str().to_string(),
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

pub(crate) fn header_rewrites_from_upstream(
    actions: Option<Vec<wire::HeaderAction>>,
) -> Result<Option<Vec<HeaderRewrite>>> {
    actions
        .map(|actions| actions.into_iter().map(HeaderRewrite::from_upstream).collect())
        .transpose()
}

pub(crate) fn header_rewrites_to_upstream(rewrites: &[HeaderRewrite]) -> Vec<wire::HeaderAction> {
    rewrites.iter().map(HeaderRewrite::to_upstream).collect()
}

/// HTTP redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_redirect_action"))]
pub struct RedirectAction {
    pub protocol: HttpProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[validate(required(message = "redirect port is required"), range(min = 1))]
    pub port: Option<u16>,
    /// 301, 302 or 307
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
}

fn validate_redirect_action(action: &RedirectAction) -> std::result::Result<(), ValidationError> {
    one_of(action.status_code, REDIRECT_STATUS_CODES)
}

impl RedirectAction {
    pub fn new(protocol: HttpProtocol, port: u16, status_code: u16) -> Self {
        Self { protocol, host: None, port: Some(port), status_code, path: None, keep_query: false }
    }

    pub fn from_upstream(action: wire::RedirectAction) -> Result<Self> {
        Ok(Self {
            protocol: parse_upstream(&action.protocol)?,
            host: action.host,
            port: action.port.map(port_from_upstream).transpose()?,
            status_code: status_code_from_upstream(action.status_code)?,
            path: action.path,
            keep_query: action.keep_query,
        })
    }

    pub fn to_upstream(&self) -> wire::RedirectAction {
        wire::RedirectAction {
            protocol: self.protocol.as_str().to_string(),
            host: self.host.clone(),
            port: self.port.map(i32::from),
            status_code: i32::from(self.status_code),
            path: self.path.clone(),
            keep_query: self.keep_query,
        }
    }
}

/// Rewrite of the URL forwarded to the pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UrlRewriteAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
}

impl UrlRewriteAction {
    pub fn from_upstream(action: wire::RewriteUrlAction) -> Self {
        Self {
            host_header: action.host_header,
            path: action.existing_path,
            query: action.query,
            keep_query: action.keep_query,
        }
    }

    pub fn to_upstream(&self) -> wire::RewriteUrlAction {
        wire::RewriteUrlAction {
            host_header: self.host_header.clone(),
            existing_path: self.path.clone(),
            keep_query: self.keep_query,
            query: self.query.clone(),
        }
    }
}

/// Rewrite of the Location response header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct LocationRewriteAction {
    pub protocol: HttpProtocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub keep_query: bool,
}

impl LocationRewriteAction {
    pub fn from_upstream(action: wire::RewriteLocationHeaderAction) -> Result<Self> {
        Ok(Self {
            protocol: parse_upstream(&action.protocol)?,
            host: action.host,
            port: action.port.map(port_from_upstream).transpose()?,
            path: action.path,
            keep_query: action.keep_query,
        })
    }

    pub fn to_upstream(&self) -> wire::RewriteLocationHeaderAction {
        wire::RewriteLocationHeaderAction {
            protocol: self.protocol.as_str().to_string(),
            host: self.host.clone(),
            port: self.port.map(i32::from),
            path: self.path.clone(),
            keep_query: self.keep_query,
        }
    }
}

/// Redirect plain HTTP traffic to HTTPS on `port`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RedirectToHttpsAction {
    #[validate(range(min = 1, message = "port must be between 1 and 65535"))]
    pub port: u16,
}

impl RedirectToHttpsAction {
    pub fn from_upstream(action: wire::RedirectToHttpsAction) -> Result<Self> {
        Ok(Self { port: port_from_upstream(action.port)? })
    }

    pub fn to_upstream(&self) -> wire::RedirectToHttpsAction {
        wire::RedirectToHttpsAction { port: i32::from(self.port) }
    }
}

/// Locally generated response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_send_response"))]
pub struct SendResponseAction {
    /// 200, 204, 403, 404, 429 or 501
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ResponseContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

fn validate_send_response(action: &SendResponseAction) -> std::result::Result<(), ValidationError> {
    one_of(action.status_code, SEND_RESPONSE_STATUS_CODES)
}

impl SendResponseAction {
    pub fn new(status_code: u16) -> Self {
        Self { status_code, content_type: None, content: None }
    }

    pub fn from_upstream(action: wire::LocalResponseAction) -> Result<Self> {
        Ok(Self {
            status_code: status_code_from_upstream(action.status_code)?,
            content_type: action.content_type.as_deref().map(parse_upstream).transpose()?,
            content: action.content,
        })
    }

    pub fn to_upstream(&self) -> wire::LocalResponseAction {
        wire::LocalResponseAction {
            content: self.content.clone(),
            content_type: self.content_type.map(|t| t.as_str().to_string()),
            status_code: i32::from(self.status_code),
        }
    }
}
