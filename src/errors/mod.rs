//! # Error Handling
//!
//! Error kinds surfaced by the client. Every public operation returns
//! [`Result`]; no error is swallowed and no operation retries.

pub mod types;

pub use types::{CloudAvenueError, ErrorContext, ErrorKind, Result};
