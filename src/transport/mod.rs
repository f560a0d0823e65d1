//! # Session Transport
//!
//! Authenticated HTTP access to the Cloud Avenue cloud fabric:
//!
//! - [`Session`]: credentials and the cached bearer, refreshed single-flight
//! - [`CloudAvenueClient`]: request builder bound to the session and the cloudapi base URL
//! - [`AlbApi`]: the ALB capability set consumed by [`crate::alb`]
//! - [`cancellable`]: ties an operation to a `CancellationToken`

pub mod alb;
pub mod cancel;
pub mod client;
pub mod session;

pub use alb::AlbApi;
pub use cancel::cancellable;
pub use client::{fold_error, ApiRequest, CloudAvenueClient, API_VERSION};
pub use session::{Bearer, Credentials, Session};
