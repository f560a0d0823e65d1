//! Bearer session
//!
//! A [`Session`] owns the credentials of one tenant and the bearer issued for
//! them. [`Session::refresh`] is the only writer: it holds the state lock for
//! the whole password grant, so N callers racing on an expired bearer produce
//! exactly one grant and all observe the same new bearer.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{CloudAvenueError, Result};

/// User agent sent with every round trip
pub const USER_AGENT: &str = concat!("cloudavenue-rs/", env!("CARGO_PKG_VERSION"));

/// Endpoint and password-grant credentials
#[derive(Clone)]
pub struct Credentials {
    endpoint: String,
    username: String,
    password: String,
}

impl Credentials {
    /// Build credentials; `endpoint` must be an absolute URL
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let username = username.into();
        let password = password.into();

        if username.is_empty() {
            return Err(CloudAvenueError::empty("username is required"));
        }
        if password.is_empty() {
            return Err(CloudAvenueError::empty("password is required"));
        }
        url::Url::parse(&endpoint).map_err(|e| {
            CloudAvenueError::invalid_format(format!("endpoint '{}': {}", endpoint, e))
        })?;

        Ok(Self { endpoint: endpoint.trim_end_matches('/').to_string(), username, password })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Bearer issued by the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub struct Bearer {
    token: String,
    token_type: String,
    expires_at: DateTime<Utc>,
}

impl Bearer {
    pub fn new(token: impl Into<String>, token_type: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { token: token.into(), token_type: token_type.into(), expires_at }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once `now` has reached the recorded expiry
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Bearer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bearer")
            .field("token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
}

/// Authenticated session shared by every client of one tenant
pub struct Session {
    credentials: Credentials,
    http: Client,
    state: Mutex<Option<Bearer>>,
    debug: bool,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Create a session with its own HTTP client
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CloudAvenueError::transport("Failed to build HTTP client", e))?;

        Ok(Self::with_client(credentials, http))
    }

    /// Create a session over an existing HTTP client
    pub fn with_client(credentials: Credentials, http: Client) -> Self {
        Self { credentials, http, state: Mutex::new(None), debug: false }
    }

    /// Log request and response bodies at trace level
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.credentials.endpoint()
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Current bearer, if one has been issued
    pub async fn bearer(&self) -> Option<Bearer> {
        self.state.lock().await.clone()
    }

    /// Guarantee a valid bearer on return.
    ///
    /// A no-op when the cached bearer has not expired; otherwise performs
    /// the password grant while holding the state lock.
    pub async fn refresh(&self) -> Result<Bearer> {
        let mut state = self.state.lock().await;

        if let Some(bearer) = state.as_ref() {
            if !bearer.is_expired() {
                return Ok(bearer.clone());
            }
            debug!(expired_at = %bearer.expires_at(), "Bearer expired, requesting a new one");
        }

        let bearer = self.password_grant().await?;
        *state = Some(bearer.clone());
        Ok(bearer)
    }

    async fn password_grant(&self) -> Result<Bearer> {
        let url = format!("{}/auth/token", self.credentials.endpoint);
        debug!(url = %url, username = %self.credentials.username, "POST password grant");

        let form = [
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ];

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| CloudAvenueError::transport("Failed to send password grant", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CloudAvenueError::transport("Failed to read token response", e))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<TokenErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or(body);
            warn!(status = status.as_u16(), "Password grant refused");
            return Err(CloudAvenueError::auth(
                format!("{}: {}", status.as_u16(), reason),
                Some(status.as_u16()),
            ));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            CloudAvenueError::Serialization { source: e, context: "Invalid token response".to_string() }
        })?;

        let expires_at = bearer_expiry(Utc::now(), token.expires_in)?;
        info!(expires_at = %expires_at, "Bearer issued");

        Ok(Bearer::new(
            token.access_token,
            token.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at,
        ))
    }

    #[cfg(test)]
    pub(crate) async fn install(&self, bearer: Bearer) {
        *self.state.lock().await = Some(bearer);
    }
}

/// Expiry of a bearer issued at `now` for `expires_in` seconds
fn bearer_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    if expires_in <= 0 {
        return Err(CloudAvenueError::auth(
            format!("token response has non-positive expires_in {}", expires_in),
            None,
        ));
    }
    ChronoDuration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            CloudAvenueError::auth(format!("token response expires_in {} is out of range", expires_in), None)
        })
}
