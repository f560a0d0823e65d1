//! # Validation Module
//!
//! Field-level validation for every request the client sends upstream.
//!
//! Request and model structures derive [`validator::Validate`]; this module
//! holds the custom rules they reference (IPv4/CIDR/range addresses, ports,
//! HTTP status codes and ranges, `key=value` strings, URNs) and the folding of
//! nested [`ValidationErrors`] into a single [`CloudAvenueError::Validation`]
//! that names every offending path, e.g. `policies[0].action`.
//!
//! Validation is pure: it never touches the transport and may be re-run.

use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::domain::urn::{self, UrnKind};
use crate::errors::{CloudAvenueError, Result};

lazy_static! {
    /// RFC 2141 syntax: `urn:<NID>:<NSS>`
    static ref URN_RFC2141_REGEX: Regex =
        Regex::new(r"^urn:[a-zA-Z0-9][a-zA-Z0-9-]{0,31}:[a-zA-Z0-9()+,\-.:=@;$_!*'%/?#]+$")
            .expect("URN_RFC2141_REGEX should be a valid regex pattern");
}

/// Build a validation error with a human-readable message
pub(crate) fn rule_error(code: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Owned(message.into()))
}

/// Validate an IPv4 address
pub fn validate_ipv4(address: &str) -> std::result::Result<(), ValidationError> {
    address
        .parse::<Ipv4Addr>()
        .map(|_| ())
        .map_err(|_| rule_error("ip4_addr", format!("'{}' is not an IPv4 address", address)))
}

fn is_cidr(value: &str) -> bool {
    match value.split_once('/') {
        Some((address, prefix)) => {
            address.parse::<Ipv4Addr>().is_ok()
                && prefix.parse::<u8>().map(|bits| bits <= 32).unwrap_or(false)
        }
        None => false,
    }
}

fn is_ipv4_range(value: &str) -> bool {
    match value.split_once('-') {
        Some((start, end)) => match (start.parse::<Ipv4Addr>(), end.parse::<Ipv4Addr>()) {
            (Ok(start), Ok(end)) => u32::from(start) <= u32::from(end),
            _ => false,
        },
        None => false,
    }
}

/// Validate an IPv4 address, a CIDR block or an `a-b` address range
pub fn validate_ipv4_cidr_or_range(value: &str) -> std::result::Result<(), ValidationError> {
    if value.parse::<Ipv4Addr>().is_ok() || is_cidr(value) || is_ipv4_range(value) {
        return Ok(());
    }
    Err(rule_error(
        "ipv4|cidr|ipv4_range",
        format!("'{}' is not an IPv4 address, CIDR or IPv4 range", value),
    ))
}

/// Validate every entry of a client IP match
pub fn validate_client_ip_addresses(addresses: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if addresses.is_empty() {
        return Err(rule_error("required", "at least one address is required"));
    }
    for address in addresses {
        validate_ipv4_cidr_or_range(address)?;
    }
    Ok(())
}

/// Validate a TCP/UDP port
pub fn validate_tcp_udp_port(port: u16) -> std::result::Result<(), ValidationError> {
    if port == 0 {
        return Err(rule_error("tcp_udp_port", "port must be between 1 and 65535"));
    }
    Ok(())
}

/// Validate a non-empty list of TCP/UDP ports
pub fn validate_tcp_udp_ports(ports: &Vec<u16>) -> std::result::Result<(), ValidationError> {
    if ports.is_empty() {
        return Err(rule_error("required", "at least one port is required"));
    }
    for port in ports {
        validate_tcp_udp_port(*port)?;
    }
    Ok(())
}

/// Validate an HTTP status code (100..=599)
pub fn validate_http_status_code(code: u16) -> std::result::Result<(), ValidationError> {
    if (100..=599).contains(&code) {
        return Ok(());
    }
    Err(rule_error("http_status_code", format!("{} is not an HTTP status code", code)))
}

fn parse_status_code(value: &str) -> Option<u16> {
    value.trim().parse::<u16>().ok().filter(|code| (100..=599).contains(code))
}

/// Validate an `a-b` status code range where both ends are valid and a < b
pub fn validate_http_status_code_range(value: &str) -> std::result::Result<(), ValidationError> {
    let invalid = || {
        rule_error("http_status_code_range", format!("'{}' is not a status code range", value))
    };
    let (start, end) = value.split_once('-').ok_or_else(invalid)?;
    match (parse_status_code(start), parse_status_code(end)) {
        (Some(start), Some(end)) if start < end => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validate a single status code or an `a-b` range
pub fn validate_status_code_or_range(value: &str) -> std::result::Result<(), ValidationError> {
    if value.contains('-') {
        return validate_http_status_code_range(value);
    }
    match parse_status_code(value) {
        Some(_) => Ok(()),
        None => Err(rule_error(
            "http_status_code",
            format!("'{}' is not an HTTP status code", value),
        )),
    }
}

/// Validate a non-empty list of status codes or ranges
pub fn validate_status_codes(values: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if values.is_empty() {
        return Err(rule_error("required", "at least one status code is required"));
    }
    for value in values {
        validate_status_code_or_range(value)?;
    }
    Ok(())
}

/// Validate a `key=value` string: exactly one `=`, non-empty on both sides
pub fn validate_str_key_value(value: &str) -> std::result::Result<(), ValidationError> {
    let mut parts = value.split('=');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(val), None) if !key.is_empty() && !val.is_empty() => Ok(()),
        _ => Err(rule_error("str_key_value", format!("'{}' is not a key=value pair", value))),
    }
}

/// Validate a list of `key=value` query strings
pub fn validate_query_strings(values: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if values.is_empty() {
        return Err(rule_error("required", "at least one query string is required"));
    }
    for value in values {
        validate_str_key_value(value)?;
    }
    Ok(())
}

/// Validate a list of match strings: non-empty list of non-empty strings
pub fn validate_match_strings(values: &Vec<String>) -> std::result::Result<(), ValidationError> {
    if values.is_empty() || values.iter().any(|v| v.is_empty()) {
        return Err(rule_error("required", "at least one non-empty value is required"));
    }
    Ok(())
}

/// Syntactic URN check (RFC 2141)
pub fn validate_urn_rfc2141(value: &str) -> std::result::Result<(), ValidationError> {
    if URN_RFC2141_REGEX.is_match(value) {
        return Ok(());
    }
    Err(rule_error("urn_rfc2141", format!("'{}' is not a URN", value)))
}

/// Semantic URN check: registered prefix of `kind` followed by a UUID
pub fn validate_urn_kind(value: &str, kind: UrnKind) -> std::result::Result<(), ValidationError> {
    validate_urn_rfc2141(value)?;
    if urn::is_kind(value, kind) {
        return Ok(());
    }
    Err(rule_error("urn", format!("'{}' is not a valid {} URN", value, kind.name())))
}

macro_rules! urn_validator {
    ($fn_name:ident, $kind:expr) => {
        #[doc = concat!("Validate a URN of kind `", stringify!($kind), "`")]
        pub fn $fn_name(value: &str) -> std::result::Result<(), ValidationError> {
            validate_urn_kind(value, $kind)
        }
    };
}

urn_validator!(validate_gateway_urn, UrnKind::Gateway);
urn_validator!(validate_pool_urn, UrnKind::LoadBalancerPool);
urn_validator!(validate_virtual_service_urn, UrnKind::LoadBalancerVirtualService);
urn_validator!(validate_service_engine_group_urn, UrnKind::ServiceEngineGroup);
urn_validator!(validate_certificate_urn, UrnKind::CertificateLibraryItem);
urn_validator!(validate_firewall_group_urn, UrnKind::FirewallGroup);

fn key_str<K: AsRef<str>>(key: &K) -> &str {
    key.as_ref()
}

fn render((path, message): &(String, String)) -> String {
    if path.is_empty() {
        message.clone()
    } else {
        format!("{}: {}", path, message)
    }
}

fn describe(error: &ValidationError) -> String {
    error.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| error.code.to_string())
}

/// Flatten nested validator errors into `(path, message)` pairs, sorted by path
pub fn flatten_validation_errors(errors: &ValidationErrors) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into("", errors, &mut out);
    out.sort();
    out
}

fn flatten_into(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let field = key_str(field);
        let path = match (prefix.is_empty(), field) {
            (_, "__all__") => prefix.to_string(),
            (true, _) => field.to_string(),
            (false, _) => format!("{}.{}", prefix, field),
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.push((path.clone(), describe(error)));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_into(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_into(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Fold a nested error set into one message usable by a custom rule,
/// naming each failure under `prefix`
pub(crate) fn nested_rule_error(
    code: &'static str,
    prefix: &str,
    errors: &ValidationErrors,
) -> ValidationError {
    let mut flattened = Vec::new();
    flatten_into(prefix, errors, &mut flattened);
    flattened.sort();
    let message = flattened.iter().map(render).collect::<Vec<_>>().join("; ");
    rule_error(code, message)
}

/// Validate `item` and record its failures under `field`
pub(crate) fn push_nested<T: Validate>(errors: &mut ValidationErrors, field: &'static str, item: &T) {
    if let Err(inner) = item.validate() {
        errors.errors_mut().insert(field.into(), ValidationErrorsKind::Struct(Box::new(inner)));
    }
}

/// Validate every element of `items` and record failures as `field[i]`
pub(crate) fn push_list<T: Validate>(errors: &mut ValidationErrors, field: &'static str, items: &[T]) {
    let failed: BTreeMap<usize, Box<ValidationErrors>> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| item.validate().err().map(|inner| (index, Box::new(inner))))
        .collect();

    if !failed.is_empty() {
        errors.errors_mut().insert(field.into(), ValidationErrorsKind::List(failed));
    }
}

/// Convert validation errors to a CloudAvenueError
pub fn validation_errors_to_error(errors: &ValidationErrors) -> CloudAvenueError {
    let flattened = flatten_validation_errors(errors);
    let field = flattened.first().map(|(path, _)| path.clone()).filter(|path| !path.is_empty());
    let message = flattened.iter().map(render).collect::<Vec<_>>().join("; ");

    CloudAvenueError::Validation { message: format!("Validation failed: {}", message), field }
}

/// Validate any structure that implements Validate trait
pub fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|errors| validation_errors_to_error(&errors))
}
