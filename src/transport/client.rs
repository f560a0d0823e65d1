//! HTTP client for the Cloud Avenue cloud fabric
//!
//! [`CloudAvenueClient`] binds a [`Session`] to the `cloudapi` base URL and
//! produces [`ApiRequest`] builders. Each builder performs one authenticated
//! round trip: the bearer expiry is consulted first, then the request is sent
//! with the API version header, and non-2xx answers are folded into a typed
//! error.

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};

use super::session::{Credentials, Session};
use crate::config::CloudAvenueConfig;
use crate::errors::{CloudAvenueError, Result};
use crate::upstream::Page;

/// cloudapi revision requested through the `Accept` header
pub const API_VERSION: &str = "38.1";

/// Page size requested from paged list endpoints
pub const PAGE_SIZE: u32 = 128;

/// Authenticated client for `{url}/cloudapi/1.0.0/`
#[derive(Debug, Clone)]
pub struct CloudAvenueClient {
    session: Arc<Session>,
    base_url: String,
    accept: String,
}

impl CloudAvenueClient {
    /// Build a client and its session from configuration
    pub fn new(config: &CloudAvenueConfig) -> Result<Self> {
        config.validate()?;
        let credentials = Credentials::new(&config.url, config.login(), &config.password)?;
        let session = Session::new(credentials)?.with_debug(config.debug);
        Ok(Self::with_session(Arc::new(session)))
    }

    /// Build a client over an existing session
    pub fn with_session(session: Arc<Session>) -> Self {
        let base_url = format!("{}/cloudapi/1.0.0", session.endpoint());
        let accept = format!("application/json;version={}", API_VERSION);
        Self { session, base_url, accept }
    }

    /// Client rooted directly at the session endpoint, for APIs outside cloudapi
    pub(crate) fn at_endpoint(session: Arc<Session>) -> Self {
        let base_url = session.endpoint().to_string();
        Self { session, base_url, accept: "application/json".to_string() }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ensure the bearer is valid (no-op while the cached one is fresh)
    pub async fn refresh(&self) -> Result<()> {
        self.session.refresh().await.map(|_| ())
    }

    /// Start a request against `path`, relative to the cloudapi base
    pub fn request(&self, method: Method, path: impl Into<String>) -> ApiRequest<'_> {
        ApiRequest { client: self, method, path: path.into(), query: Vec::new(), body: None }
    }

    /// Follow every page of a paged list endpoint
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let mut page = 1;

        loop {
            let mut request = self
                .request(Method::GET, path)
                .query("page", page.to_string())
                .query("pageSize", PAGE_SIZE.to_string());
            for (key, value) in query {
                request = request.query(key, value.clone());
            }

            let response: Page<T> = request.send().await?;
            values.extend(response.values);

            if page >= response.page_count {
                break;
            }
            page += 1;
        }

        debug!(path = %path, count = values.len(), "Fetched paged list");
        Ok(values)
    }
}

/// Single authenticated round trip
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest<'a> {
    client: &'a CloudAvenueClient,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
}

impl<'a> ApiRequest<'a> {
    /// Append a query parameter
    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_value(body).map_err(|e| CloudAvenueError::Serialization {
            source: e,
            context: format!("Failed to serialize body for {} {}", self.method, self.path),
        })?);
        Ok(self)
    }

    /// Send and return the raw body of a 2xx answer
    pub async fn send_text(self) -> Result<String> {
        let session = &self.client.session;
        let bearer = session.refresh().await?;

        let url = format!("{}/{}", self.client.base_url, self.path.trim_start_matches('/'));
        debug!(method = %self.method, url = %url, "Sending request");

        let mut builder = session
            .http()
            .request(self.method.clone(), &url)
            .bearer_auth(bearer.token())
            .header(reqwest::header::ACCEPT, self.client.accept.as_str());

        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }

        if let Some(body) = &self.body {
            if session.debug() {
                trace!(body = %body, "Request body");
            }
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            CloudAvenueError::transport(format!("Failed to send {} {}", self.method, self.path), e)
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "Response status");

        let text = response.text().await.map_err(|e| {
            CloudAvenueError::transport(format!("Failed to read response of {}", self.path), e)
        })?;

        if session.debug() {
            trace!(body = %text, "Response body");
        }

        if !status.is_success() {
            return Err(fold_error(status, &text));
        }

        Ok(text)
    }

    /// Send and decode a JSON answer
    pub async fn send<T: DeserializeOwned>(self) -> Result<T> {
        let path = self.path.clone();
        let text = self.send_text().await?;
        serde_json::from_str(&text).map_err(|e| CloudAvenueError::Serialization {
            source: e,
            context: format!("Failed to deserialize response of {}", path),
        })
    }

    /// Send and discard the answer
    pub async fn send_empty(self) -> Result<()> {
        self.send_text().await.map(|_| ())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PropertyError {
    #[serde(default)]
    property_name: Option<String>,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageError {
    message: String,
    #[serde(default)]
    minor_error_code: Option<String>,
}

/// Fold an upstream error body into a typed error.
///
/// The body is a `[{PropertyName, Message}]` array, a `{message}` object or
/// free text; the resulting kind follows the status code.
pub fn fold_error(status: StatusCode, body: &str) -> CloudAvenueError {
    let message = match serde_json::from_str::<Vec<PropertyError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .iter()
            .map(|e| match &e.property_name {
                Some(property) if !property.is_empty() => format!("{}: {}", property, e.message),
                _ => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ => match serde_json::from_str::<MessageError>(body) {
            Ok(MessageError { message, minor_error_code: Some(code) }) => {
                format!("{} ({})", message, code)
            }
            Ok(MessageError { message, .. }) => message,
            Err(_) if body.trim().is_empty() => {
                status.canonical_reason().unwrap_or("no response body").to_string()
            }
            Err(_) => body.trim().to_string(),
        },
    };

    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            CloudAvenueError::auth(message, Some(code))
        }
        StatusCode::NOT_FOUND => CloudAvenueError::NotFound { message },
        StatusCode::CONFLICT => CloudAvenueError::conflict(message),
        _ => CloudAvenueError::upstream(message, code),
    }
}
