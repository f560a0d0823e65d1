//! Domain layer
//!
//! Identifiers and enumerations shared by every load balancer resource.
//! Nothing in here touches the network.
//!
//! ## Module Organization
//!
//! - `urn`: URN recognition, classification and normalisation
//! - `id`: Type-safe URN identifiers with NewType pattern
//! - `enums`: Wire enumerations of the pool and virtual service model

pub mod enums;
pub mod id;
pub mod urn;

pub use enums::{
    ApplicationProfileType, HealthMonitorType, PersistenceType, PoolAlgorithm,
    PoolMemberHealthStatus, TransportType, VirtualServiceHealthStatus,
};
pub use id::{CertificateId, EdgeGatewayId, NameOrId, PoolId, ServiceEngineGroupId, VirtualServiceId};
pub use urn::UrnKind;
