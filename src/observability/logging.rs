//! # Structured Logging
//!
//! Span macros used by the load balancer managers and the NetBackup client.

/// Create a tracing span for a load balancer operation.
///
/// ```rust,ignore
/// let span = alb_span!("update", "httpRequestPolicies", virtual_service_id = %id);
/// ```
#[macro_export]
macro_rules! alb_span {
    ($operation:expr, $resource:expr) => {
        tracing::info_span!(
            "alb_operation",
            operation = %$operation,
            resource = %$resource,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $resource:expr, $($field:tt)*) => {
        tracing::info_span!(
            "alb_operation",
            operation = %$operation,
            resource = %$resource,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Create a tracing span for a NetBackup job operation
#[macro_export]
macro_rules! job_span {
    ($operation:expr, $job_id:expr) => {
        tracing::debug_span!(
            "job_operation",
            operation = %$operation,
            job_id = %$job_id,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
}

/// Log session configuration at startup
pub fn log_config_info(config: &crate::config::CloudAvenueConfig) {
    tracing::info!(
        url = %config.url,
        org = %config.org,
        username = %config.username,
        debug = %config.debug,
        "Cloud Avenue session configuration"
    );
}
