//! # NetBackup
//!
//! Thin client for the NetBackup self-service API: an inventory refresh that
//! starts an asynchronous job, and job status reads. It keeps its own
//! session since NetBackup issues its own bearer.

pub mod job;

use reqwest::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::config::NetBackupConfig;
use crate::errors::{ErrorContext, Result};
use crate::transport::{CloudAvenueClient, Credentials, Session};

pub use job::{Job, JobStatus, Pollable};
use job::JobResponse;

#[derive(Debug, Serialize)]
struct EmptyBody {}

/// Authenticated NetBackup client
#[derive(Debug, Clone)]
pub struct NetBackupClient {
    http: CloudAvenueClient,
}

impl NetBackupClient {
    pub fn new(config: &NetBackupConfig) -> Result<Self> {
        config.validate()?;
        let credentials = Credentials::new(&config.endpoint, &config.username, &config.password)?;
        let session = Session::new(credentials)?.with_debug(config.debug);
        Ok(Self::with_session(Arc::new(session)))
    }

    pub fn with_session(session: Arc<Session>) -> Self {
        Self { http: CloudAvenueClient::at_endpoint(session) }
    }

    pub fn endpoint(&self) -> &str {
        self.http.base_url()
    }

    pub async fn refresh(&self) -> Result<()> {
        self.http.refresh().await
    }

    /// Import the vCloud tenant inventory; returns the job doing it
    #[instrument(skip(self))]
    pub async fn refresh_inventory(&self) -> Result<Job> {
        self.refresh().await?;
        let response: JobResponse = self
            .http
            .request(Method::POST, "v6/assetimport/vcloud/tenants/import")
            .json(&EmptyBody {})?
            .send()
            .await
            .context("refresh NetBackup inventory")?;

        info!(job_id = response.id, "Inventory refresh started");
        Job::from_response(self.clone(), response)
    }

    /// Current state of job `id`
    #[instrument(skip(self))]
    pub async fn job(&self, id: i64) -> Result<Job> {
        let response = self.activity(id).await?;
        Job::from_response(self.clone(), response)
    }

    pub(crate) async fn activity(&self, id: i64) -> Result<JobResponse> {
        self.refresh().await?;
        self.http
            .request(Method::GET, format!("v6/activities/{}", id))
            .send()
            .await
            .context("get NetBackup activity")
    }
}
