//! Caller-driven cancellation
//!
//! Every operation is a future: dropping it abandons the in-flight round
//! trip. [`cancellable`] ties an operation to a `CancellationToken` so a
//! caller can cancel from elsewhere and get a typed error back.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{CloudAvenueError, Result};

/// Run `operation` until it completes or `token` is cancelled.
///
/// On cancellation the operation future is dropped and the call resolves to
/// [`CloudAvenueError::Cancelled`]. No compensating action is attempted.
pub async fn cancellable<T, F>(token: &CancellationToken, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            debug!("Operation cancelled by caller");
            Err(CloudAvenueError::cancelled("cancelled by caller"))
        }
        result = operation => result,
    }
}
