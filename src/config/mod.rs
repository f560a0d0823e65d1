//! # Configuration Management
//!
//! Session configuration for the Cloud Avenue fabric and the NetBackup plane,
//! read from the process environment with the `config` crate:
//!
//! | Variable | Default |
//! |---|---|
//! | `CLOUDAVENUE_URL` | `https://console1.cloudavenue.orange-business.com` |
//! | `CLOUDAVENUE_ORG`, `CLOUDAVENUE_USERNAME`, `CLOUDAVENUE_PASSWORD` | required |
//! | `CLOUDAVENUE_DEBUG` | `false` |
//! | `NETBACKUP_ENDPOINT` | `https://backup1.cloudavenue.orange-business.com/NetBackupSelfServiceNetBackupPanels/Api` |
//! | `NETBACKUP_USERNAME`, `NETBACKUP_PASSWORD` | required |
//! | `NETBACKUP_DEBUG` | `false` |

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use validator::Validate;

use crate::errors::{CloudAvenueError, Result};
use crate::validation::validation_errors_to_error;

/// Default Cloud Avenue console endpoint
pub const DEFAULT_CLOUDAVENUE_URL: &str = "https://console1.cloudavenue.orange-business.com";

/// Default NetBackup self-service endpoint
pub const DEFAULT_NETBACKUP_ENDPOINT: &str =
    "https://backup1.cloudavenue.orange-business.com/NetBackupSelfServiceNetBackupPanels/Api";

lazy_static! {
    /// Organization names look like `cav01ev01ocb0001234`
    static ref ORGANIZATION_REGEX: Regex = Regex::new(r"^cav\d{2}[a-z]{2}\d{2}ocb\d{7}$")
        .expect("ORGANIZATION_REGEX should be a valid regex pattern");
}

fn default_cloudavenue_url() -> String {
    DEFAULT_CLOUDAVENUE_URL.to_string()
}

fn default_netbackup_endpoint() -> String {
    DEFAULT_NETBACKUP_ENDPOINT.to_string()
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(CloudAvenueError::empty(format!("{} is required", what)));
    }
    Ok(())
}

fn check_url(config: &impl Validate) -> Result<()> {
    Validate::validate(config)
        .map_err(|errors| CloudAvenueError::invalid_format(validation_errors_to_error(&errors).to_string()))
}

/// Cloud Avenue session configuration
#[derive(Clone, Deserialize, Validate)]
pub struct CloudAvenueConfig {
    /// Console endpoint
    #[serde(default = "default_cloudavenue_url")]
    #[validate(url(message = "URL must be an absolute http(s) URL"))]
    pub url: String,

    /// Organization name (`cavNNxxNNocbNNNNNNN`)
    #[serde(default)]
    pub org: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Log request and response bodies at trace level
    #[serde(default)]
    pub debug: bool,
}

impl fmt::Debug for CloudAvenueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudAvenueConfig")
            .field("url", &self.url)
            .field("org", &self.org)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("debug", &self.debug)
            .finish()
    }
}

impl CloudAvenueConfig {
    /// Build a configuration programmatically
    pub fn new(
        url: impl Into<String>,
        org: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            url: url.into(),
            org: org.into(),
            username: username.into(),
            password: password.into(),
            debug: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `CLOUDAVENUE_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix("CLOUDAVENUE"))
    }

    pub(crate) fn load(source: config::Environment) -> Result<Self> {
        let config: Self = config::Config::builder()
            .set_default("url", DEFAULT_CLOUDAVENUE_URL)?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        require(&self.username, "Cloud Avenue username")?;
        require(&self.password, "Cloud Avenue password")?;
        require(&self.org, "Cloud Avenue organization")?;

        if !ORGANIZATION_REGEX.is_match(&self.org) {
            return Err(CloudAvenueError::organization_format(format!(
                "'{}' does not match cavNNxxNNocbNNNNNNN",
                self.org
            )));
        }

        check_url(self)
    }

    /// Login sent to the token endpoint (`user@org`)
    pub fn login(&self) -> String {
        format!("{}@{}", self.username, self.org)
    }
}

/// NetBackup session configuration
#[derive(Clone, Deserialize, Validate)]
pub struct NetBackupConfig {
    #[serde(default = "default_netbackup_endpoint")]
    #[validate(url(message = "endpoint must be an absolute http(s) URL"))]
    pub endpoint: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub debug: bool,
}

impl fmt::Debug for NetBackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetBackupConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("debug", &self.debug)
            .finish()
    }
}

impl NetBackupConfig {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let config = Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
            debug: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `NETBACKUP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix("NETBACKUP"))
    }

    pub(crate) fn load(source: config::Environment) -> Result<Self> {
        let config: Self = config::Config::builder()
            .set_default("endpoint", DEFAULT_NETBACKUP_ENDPOINT)?
            .add_source(source)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        require(&self.username, "NetBackup username")?;
        require(&self.password, "NetBackup password")?;
        check_url(self)
    }
}

/// Logging configuration consumed by [`crate::observability::init_logging`]
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines instead of the human format
    #[serde(default)]
    pub json: bool,

    /// Raise the default level to `debug`
    #[serde(default)]
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: None, json: false, debug: false }
    }
}

impl LoggingConfig {
    /// Filter directive used when neither `RUST_LOG` nor `filter` is set
    pub fn default_directive(&self) -> String {
        match (&self.filter, self.debug) {
            (Some(filter), _) => filter.clone(),
            (None, true) => "cloudavenue=debug".to_string(),
            (None, false) => "cloudavenue=info".to_string(),
        }
    }
}
