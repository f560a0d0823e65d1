//! Domain ID Types with NewType Pattern
//!
//! Type-safe wrappers for the URNs the load balancer subsystem accepts.
//! Parsing rejects an empty string with `Empty` and anything that is not a URN
//! of the expected kind with `InvalidFormat`, before any network call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::urn::{self, UrnKind};
use crate::errors::{CloudAvenueError, Result};

/// Macro to generate NewType URN wrappers with all required traits
macro_rules! urn_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// URN kind carried by this identifier
            pub const KIND: UrnKind = $kind;

            /// Parse and validate a URN string
            pub fn parse(s: &str) -> Result<Self> {
                if s.is_empty() {
                    return Err(CloudAvenueError::empty(format!(
                        "{} identifier is empty",
                        Self::KIND.name()
                    )));
                }
                if !urn::is_kind(s, Self::KIND) {
                    return Err(CloudAvenueError::invalid_format(format!(
                        "'{}' is not a valid {} URN",
                        s,
                        Self::KIND.name()
                    )));
                }
                Ok(Self(s.to_string()))
            }

            /// Build an identifier from a bare UUID or an existing URN
            pub fn from_uuid(uuid: &str) -> Result<Self> {
                Self::parse(&Self::KIND.normalize(uuid))
            }

            /// Get the inner string value
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert to inner string value
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = CloudAvenueError;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

urn_id!(
    /// Identifier of an edge gateway
    EdgeGatewayId,
    UrnKind::Gateway
);

urn_id!(
    /// Identifier of an ALB pool
    PoolId,
    UrnKind::LoadBalancerPool
);

urn_id!(
    /// Identifier of an ALB virtual service
    VirtualServiceId,
    UrnKind::LoadBalancerVirtualService
);

urn_id!(
    /// Identifier of a service engine group
    ServiceEngineGroupId,
    UrnKind::ServiceEngineGroup
);

urn_id!(
    /// Identifier of a certificate library item
    CertificateId,
    UrnKind::CertificateLibraryItem
);

/// A name or a URN, as accepted by `get` operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameOrId<T> {
    Id(T),
    Name(String),
}

macro_rules! name_or_id {
    ($name:ident) => {
        impl NameOrId<$name> {
            /// Classify `value`: a URN of the expected kind is an id, anything
            /// else non-empty is a name.
            pub fn resolve(value: &str) -> Result<Self> {
                if value.is_empty() {
                    return Err(CloudAvenueError::empty(format!(
                        "{} name or identifier is empty",
                        $name::KIND.name()
                    )));
                }
                if urn::is_kind(value, $name::KIND) {
                    return Ok(NameOrId::Id($name(value.to_string())));
                }
                Ok(NameOrId::Name(value.to_string()))
            }
        }
    };
}

name_or_id!(PoolId);
name_or_id!(VirtualServiceId);
name_or_id!(ServiceEngineGroupId);
