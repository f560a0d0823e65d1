//! Match criteria shared by the three policy chains
//!
//! Each criterion pairs an operator with an operand. Operators are typed per
//! attribute, so an equality operator can never reach a path match; the
//! remaining rules (operand shape, EXISTS forbidding a value) are validated.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::domain::enums::wire_enum;
use crate::errors::Result;
use crate::upstream::http_rules as wire;
use crate::upstream::{parse_upstream, port_from_upstream};
use crate::validation::{
    validate_client_ip_addresses, validate_match_strings, validate_query_strings,
    validate_status_codes, validate_tcp_udp_ports,
};

wire_enum! {
    /// Membership operator for IP, port, method and status code matches
    SetMatchOperator {
        IsIn => "IS_IN",
        IsNotIn => "IS_NOT_IN",
    }
}

wire_enum! {
    /// Operators for path and location header matches
    StringMatchOperator {
        BeginsWith => "BEGINS_WITH",
        DoesNotBeginWith => "DOES_NOT_BEGIN_WITH",
        Contains => "CONTAINS",
        DoesNotContain => "DOES_NOT_CONTAIN",
        EndsWith => "ENDS_WITH",
        DoesNotEndWith => "DOES_NOT_END_WITH",
        Equals => "EQUALS",
        DoesNotEqual => "DOES_NOT_EQUAL",
        RegexMatch => "REGEX_MATCH",
        RegexDoesNotMatch => "REGEX_DOES_NOT_MATCH",
    }
}

wire_enum! {
    /// Operators for header matches
    HeaderMatchOperator {
        BeginsWith => "BEGINS_WITH",
        DoesNotBeginWith => "DOES_NOT_BEGIN_WITH",
        Contains => "CONTAINS",
        DoesNotContain => "DOES_NOT_CONTAIN",
        EndsWith => "ENDS_WITH",
        DoesNotEndWith => "DOES_NOT_END_WITH",
        Equals => "EQUALS",
        DoesNotEqual => "DOES_NOT_EQUAL",
        RegexMatch => "REGEX_MATCH",
        RegexDoesNotMatch => "REGEX_DOES_NOT_MATCH",
        Exists => "EXISTS",
        DoesNotExist => "DOES_NOT_EXIST",
    }
}

impl HeaderMatchOperator {
    /// EXISTS and DOES_NOT_EXIST take no value
    pub fn takes_value(&self) -> bool {
        !matches!(self, HeaderMatchOperator::Exists | HeaderMatchOperator::DoesNotExist)
    }
}

wire_enum! {
    /// Operators for cookie matches
    CookieMatchOperator {
        BeginsWith => "BEGINS_WITH",
        DoesNotBeginWith => "DOES_NOT_BEGIN_WITH",
        Contains => "CONTAINS",
        DoesNotContain => "DOES_NOT_CONTAIN",
        EndsWith => "ENDS_WITH",
        DoesNotEndWith => "DOES_NOT_END_WITH",
        Equals => "EQUALS",
        DoesNotEqual => "DOES_NOT_EQUAL",
        Exists => "EXISTS",
        DoesNotExist => "DOES_NOT_EXIST",
    }
}

impl CookieMatchOperator {
    pub fn takes_value(&self) -> bool {
        !matches!(self, CookieMatchOperator::Exists | CookieMatchOperator::DoesNotExist)
    }
}

wire_enum! {
    HttpMethod {
        Get => "GET",
        Post => "POST",
        Put => "PUT",
        Delete => "DELETE",
        Patch => "PATCH",
        Options => "OPTIONS",
        Trace => "TRACE",
        Connect => "CONNECT",
        Propfind => "PROPFIND",
        Proppatch => "PROPPATCH",
        Mkcol => "MKCOL",
        Copy => "COPY",
        Move => "MOVE",
        Lock => "LOCK",
        Unlock => "UNLOCK",
    }
}

wire_enum! {
    HttpProtocol {
        Http => "HTTP",
        Https => "HTTPS",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ClientIpMatch {
    pub operator: SetMatchOperator,
    /// IPv4 addresses, CIDR blocks or `a-b` ranges
    #[validate(custom(function = "validate_client_ip_addresses"))]
    pub addresses: Vec<String>,
}

impl ClientIpMatch {
    pub fn from_upstream(m: wire::ClientIpMatch) -> Result<Self> {
        Ok(Self { operator: parse_upstream(&m.match_criteria)?, addresses: m.addresses })
    }

    pub fn to_upstream(&self) -> wire::ClientIpMatch {
        wire::ClientIpMatch {
            match_criteria: self.operator.as_str().to_string(),
            addresses: self.addresses.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ServicePortMatch {
    pub operator: SetMatchOperator,
    #[validate(custom(function = "validate_tcp_udp_ports"))]
    pub ports: Vec<u16>,
}

impl ServicePortMatch {
    pub fn from_upstream(m: wire::ServicePortMatch) -> Result<Self> {
        Ok(Self {
            operator: parse_upstream(&m.match_criteria)?,
            ports: m.ports.into_iter().map(port_from_upstream).collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn to_upstream(&self) -> wire::ServicePortMatch {
        wire::ServicePortMatch {
            match_criteria: self.operator.as_str().to_string(),
            ports: self.ports.iter().map(|p| i32::from(*p)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MethodMatch {
    pub operator: SetMatchOperator,
    #[validate(length(min = 1, message = "at least one method is required"))]
    pub methods: Vec<HttpMethod>,
}

impl MethodMatch {
    pub fn from_upstream(m: wire::MethodMatch) -> Result<Self> {
        Ok(Self {
            operator: parse_upstream(&m.match_criteria)?,
            methods: m.methods.iter().map(|s| parse_upstream(s)).collect::<Result<Vec<_>>>()?,
        })
    }

    pub fn to_upstream(&self) -> wire::MethodMatch {
        wire::MethodMatch {
            match_criteria: self.operator.as_str().to_string(),
            methods: self.methods.iter().map(|m| m.as_str().to_string()).collect(),
        }
    }
}

/// Path or location header match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StringMatch {
    pub operator: StringMatchOperator,
    #[validate(custom(function = "validate_match_strings"))]
    pub values: Vec<String>,
}

impl StringMatch {
    pub fn from_upstream(m: wire::StringMatch) -> Result<Self> {
        Ok(Self { operator: parse_upstream(&m.match_criteria)?, values: m.match_strings })
    }

    pub fn to_upstream(&self) -> wire::StringMatch {
        wire::StringMatch {
            match_criteria: self.operator.as_str().to_string(),
            match_strings: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_header_match"))]
pub struct HeaderMatch {
    pub operator: HeaderMatchOperator,
    #[validate(length(min = 1, message = "header name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

fn validate_header_match(m: &HeaderMatch) -> std::result::Result<(), ValidationError> {
    let has_values = m.values.as_ref().is_some_and(|v| v.iter().any(|s| !s.is_empty()));
    check_value_presence(m.operator.takes_value(), has_values, m.operator.as_str())
}

impl HeaderMatch {
    pub fn from_upstream(m: wire::HeaderMatch) -> Result<Self> {
        Ok(Self { operator: parse_upstream(&m.match_criteria)?, name: m.key, values: m.value })
    }

    pub fn to_upstream(&self) -> wire::HeaderMatch {
        wire::HeaderMatch {
            match_criteria: self.operator.as_str().to_string(),
            key: self.name.clone(),
            value: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_cookie_match"))]
pub struct CookieMatch {
    pub operator: CookieMatchOperator,
    #[validate(length(min = 1, message = "cookie name is required"))]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

fn validate_cookie_match(m: &CookieMatch) -> std::result::Result<(), ValidationError> {
    let has_value = m.value.as_deref().is_some_and(|v| !v.is_empty());
    check_value_presence(m.operator.takes_value(), has_value, m.operator.as_str())
}

impl CookieMatch {
    pub fn from_upstream(m: wire::CookieMatch) -> Result<Self> {
        Ok(Self { operator: parse_upstream(&m.match_criteria)?, name: m.key, value: m.value })
    }

    pub fn to_upstream(&self) -> wire::CookieMatch {
        wire::CookieMatch {
            match_criteria: self.operator.as_str().to_string(),
            key: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

fn check_value_presence(
    takes_value: bool,
    has_value: bool,
    operator: &str,
) -> std::result::Result<(), ValidationError> {
    match (takes_value, has_value) {
        (true, false) => Err(ValidationError::new("required_if")
            .with_message(Cow::Owned(format!("a value is required with operator {}", operator)))),
        (false, true) => Err(ValidationError::new("excluded_if")
            .with_message(Cow::Owned(format!("no value is allowed with operator {}", operator)))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct StatusCodeMatch {
    pub operator: SetMatchOperator,
    /// Single codes (`"200"`) or ranges (`"301-303"`)
    #[validate(custom(function = "validate_status_codes"))]
    pub status_codes: Vec<String>,
}

impl StatusCodeMatch {
    pub fn from_upstream(m: wire::StatusCodeMatch) -> Result<Self> {
        Ok(Self { operator: parse_upstream(&m.match_criteria)?, status_codes: m.status_codes })
    }

    pub fn to_upstream(&self) -> wire::StatusCodeMatch {
        wire::StatusCodeMatch {
            match_criteria: self.operator.as_str().to_string(),
            status_codes: self.status_codes.clone(),
        }
    }
}

fn map_opt<U, M>(value: Option<U>, f: impl FnOnce(U) -> Result<M>) -> Result<Option<M>> {
    value.map(f).transpose()
}

fn map_vec<U, M>(values: Option<Vec<U>>, f: impl Fn(U) -> Result<M>) -> Result<Option<Vec<M>>> {
    values.map(|values| values.into_iter().map(f).collect::<Result<Vec<_>>>()).transpose()
}

/// Match criteria of request and security rules; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RequestMatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub client_ip: Option<ClientIpMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub service_port: Option<ServicePortMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub method: Option<MethodMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<HttpProtocol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub path: Option<StringMatch>,

    /// `key=value` strings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_query_strings"))]
    pub query: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub headers: Option<Vec<HeaderMatch>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub cookie: Option<CookieMatch>,
}

impl RequestMatchCriteria {
    pub fn from_upstream(m: wire::RequestMatchCriteria) -> Result<Self> {
        Ok(Self {
            client_ip: map_opt(m.client_ip_match, ClientIpMatch::from_upstream)?,
            service_port: map_opt(m.service_port_match, ServicePortMatch::from_upstream)?,
            method: map_opt(m.method_match, MethodMatch::from_upstream)?,
            protocol: m.protocol.as_deref().map(parse_upstream).transpose()?,
            path: map_opt(m.path_match, StringMatch::from_upstream)?,
            query: m.query_match,
            headers: map_vec(m.header_match, HeaderMatch::from_upstream)?,
            cookie: map_opt(m.cookie_match, CookieMatch::from_upstream)?,
        })
    }

    pub fn to_upstream(&self) -> wire::RequestMatchCriteria {
        wire::RequestMatchCriteria {
            client_ip_match: self.client_ip.as_ref().map(ClientIpMatch::to_upstream),
            service_port_match: self.service_port.as_ref().map(ServicePortMatch::to_upstream),
            method_match: self.method.as_ref().map(MethodMatch::to_upstream),
            protocol: self.protocol.map(|p| p.as_str().to_string()),
            path_match: self.path.as_ref().map(StringMatch::to_upstream),
            query_match: self.query.clone(),
            header_match: self
                .headers
                .as_ref()
                .map(|headers| headers.iter().map(HeaderMatch::to_upstream).collect()),
            cookie_match: self.cookie.as_ref().map(CookieMatch::to_upstream),
        }
    }
}

/// Match criteria of response rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ResponseMatchCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub client_ip: Option<ClientIpMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub service_port: Option<ServicePortMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub method: Option<MethodMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<HttpProtocol>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub path: Option<StringMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_query_strings"))]
    pub query: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub request_headers: Option<Vec<HeaderMatch>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub cookie: Option<CookieMatch>,

    /// Location response header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub location: Option<StringMatch>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub response_headers: Option<Vec<HeaderMatch>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub status_code: Option<StatusCodeMatch>,
}

impl ResponseMatchCriteria {
    pub fn from_upstream(m: wire::ResponseMatchCriteria) -> Result<Self> {
        Ok(Self {
            client_ip: map_opt(m.client_ip_match, ClientIpMatch::from_upstream)?,
            service_port: map_opt(m.service_port_match, ServicePortMatch::from_upstream)?,
            method: map_opt(m.method_match, MethodMatch::from_upstream)?,
            protocol: m.protocol.as_deref().map(parse_upstream).transpose()?,
            path: map_opt(m.path_match, StringMatch::from_upstream)?,
            query: m.query_match,
            request_headers: map_vec(m.request_header_match, HeaderMatch::from_upstream)?,
            cookie: map_opt(m.cookie_match, CookieMatch::from_upstream)?,
            location: map_opt(m.location_match, StringMatch::from_upstream)?,
            response_headers: map_vec(m.response_header_match, HeaderMatch::from_upstream)?,
            status_code: map_opt(m.status_code_match, StatusCodeMatch::from_upstream)?,
        })
    }

    pub fn to_upstream(&self) -> wire::ResponseMatchCriteria {
        let headers = |headers: &Vec<HeaderMatch>| headers.iter().map(HeaderMatch::to_upstream).collect();

        wire::ResponseMatchCriteria {
            client_ip_match: self.client_ip.as_ref().map(ClientIpMatch::to_upstream),
            service_port_match: self.service_port.as_ref().map(ServicePortMatch::to_upstream),
            method_match: self.method.as_ref().map(MethodMatch::to_upstream),
            protocol: self.protocol.map(|p| p.as_str().to_string()),
            path_match: self.path.as_ref().map(StringMatch::to_upstream),
            query_match: self.query.clone(),
            request_header_match: self.request_headers.as_ref().map(headers),
            cookie_match: self.cookie.as_ref().map(CookieMatch::to_upstream),
            location_match: self.location.as_ref().map(StringMatch::to_upstream),
            response_header_match: self.response_headers.as_ref().map(headers),
            status_code_match: self.status_code.as_ref().map(StatusCodeMatch::to_upstream),
        }
    }
}
