//! # Cloud Avenue
//!
//! Client library for the edge load balancer of the Cloud Avenue cloud
//! fabric: ALB pools, virtual services, service engine group bindings and
//! the three HTTP policy chains of a virtual service, plus a small NetBackup
//! surface for inventory refresh jobs.
//!
//! ## Architecture
//!
//! ```text
//! alb managers → AlbApi (transport) → Session (bearer) → cloudapi
//!      ↓              ↓
//!  validation     upstream wire types
//! ```
//!
//! Every operation validates its input locally and fails before touching
//! the network when the input is malformed.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cloudavenue::{CloudAvenueConfig, EdgeLoadBalancer, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = CloudAvenueConfig::from_env()?;
//!     let alb = EdgeLoadBalancer::connect(&config)?;
//!     let policies = alb
//!         .request_policies
//!         .get("urn:vcloud:loadBalancerVirtualService:11111111-1111-4111-8111-111111111111")
//!         .await?;
//!     println!("{} request policies", policies.len());
//!     Ok(())
//! }
//! ```

pub mod alb;
pub mod config;
pub mod domain;
pub mod errors;
pub mod netbackup;
pub mod observability;
pub mod transport;
pub mod upstream;
pub mod validation;

// Re-export commonly used types and traits
pub use alb::EdgeLoadBalancer;
pub use config::{CloudAvenueConfig, LoggingConfig, NetBackupConfig};
pub use errors::{CloudAvenueError, ErrorKind, Result};
pub use netbackup::{Job, JobStatus, NetBackupClient, Pollable};
pub use observability::init_logging;
pub use transport::{cancellable, AlbApi, CloudAvenueClient, Session};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
