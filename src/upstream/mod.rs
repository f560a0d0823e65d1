//! # Upstream wire types
//!
//! Shape mirrors of the cloud fabric's ALB schema. Everything here is plain
//! serde data: enumerations stay strings, every field the remote may omit is
//! an `Option` that is skipped when absent, so an absent numeric round-trips
//! as absent instead of zero.
//!
//! Typed models live in [`crate::alb`] and convert to and from these types.

pub mod http_rules;
pub mod pool;
pub mod reference;
pub mod service_engine_group;
pub mod virtual_service;

pub use http_rules::{
    HttpRequestRule, HttpResponseRule, HttpRuleList, HttpSecurityRule,
};
pub use pool::{AlbPool, AlbPoolSummary};
pub use reference::{OpenApiReference, Page};
pub use service_engine_group::AlbServiceEngineGroupAssignment;
pub use virtual_service::{AlbVirtualService, AlbVirtualServiceSummary};

use crate::errors::{CloudAvenueError, Result};

/// Parse an upstream enumeration spelling, reporting an unknown one as an
/// upstream inconsistency
pub(crate) fn parse_upstream<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = CloudAvenueError>,
{
    value.parse().map_err(|e: CloudAvenueError| {
        CloudAvenueError::upstream(format!("unexpected value from upstream: {}", e), 502)
    })
}

pub(crate) fn port_from_upstream(port: i32) -> Result<u16> {
    u16::try_from(port)
        .map_err(|_| CloudAvenueError::upstream(format!("port {} out of range", port), 502))
}
