//! Asynchronous NetBackup jobs and the polling contract

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, Instrument};

use super::NetBackupClient;
use crate::domain::enums::wire_enum;
use crate::errors::{CloudAvenueError, Result};
use crate::upstream::parse_upstream;

wire_enum! {
    JobStatus {
        Pending => "Pending",
        Running => "Running",
        Completed => "Completed",
        Failed => "Failed",
    }
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Activity body returned by the NetBackup API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct JobResponse {
    pub id: i64,
    #[serde(default)]
    pub status: Option<String>,
}

/// Anything whose completion is observed by polling
#[async_trait]
pub trait Pollable: Send {
    /// Re-read the remote status
    async fn refresh(&mut self) -> Result<()>;

    /// True on terminal success only
    fn is_done(&self) -> bool;

    /// True on terminal failure
    fn is_failed(&self) -> bool {
        false
    }

    /// Label used in errors and logs
    fn describe(&self) -> String;

    /// Poll every `interval` until done, failed, or `timeout` has elapsed.
    ///
    /// Transport errors from `refresh` surface immediately; nothing is retried.
    async fn wait(&mut self, interval: Duration, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            self.refresh().await?;

            if self.is_done() {
                return Ok(());
            }
            if self.is_failed() {
                return Err(CloudAvenueError::upstream(format!("{} failed", self.describe()), 502));
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(CloudAvenueError::timeout(
                    format!("waiting for {}", self.describe()),
                    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                ));
            }
            tokio::time::sleep(interval.min(deadline - now)).await;
        }
    }
}

/// Handle on one NetBackup job
#[derive(Debug, Clone)]
pub struct Job {
    id: i64,
    status: JobStatus,
    client: NetBackupClient,
}

impl Job {
    pub(crate) fn from_response(client: NetBackupClient, response: JobResponse) -> Result<Self> {
        let status = match response.status.as_deref() {
            Some(status) => parse_upstream(status)?,
            None => JobStatus::Pending,
        };
        Ok(Self { id: response.id, status, client })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// [`Pollable::wait`] inside a job span
    pub async fn wait_for_completion(&mut self, interval: Duration, timeout: Duration) -> Result<()> {
        let span = crate::job_span!("wait", self.id);
        self.wait(interval, timeout).instrument(span).await
    }
}

#[async_trait]
impl Pollable for Job {
    async fn refresh(&mut self) -> Result<()> {
        let response = self.client.activity(self.id).await?;
        self.status = match response.status.as_deref() {
            Some(status) => parse_upstream(status)?,
            None => JobStatus::Pending,
        };
        debug!(job_id = self.id, status = %self.status, "Job status refreshed");
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.status == JobStatus::Completed
    }

    fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    fn describe(&self) -> String {
        format!("job {}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    struct Scripted {
        statuses: Vec<JobStatus>,
        current: JobStatus,
        refreshes: usize,
    }

    #[async_trait]
    impl Pollable for Scripted {
        async fn refresh(&mut self) -> Result<()> {
            if !self.statuses.is_empty() {
                self.current = self.statuses.remove(0);
            }
            self.refreshes += 1;
            Ok(())
        }

        fn is_done(&self) -> bool {
            self.current == JobStatus::Completed
        }

        fn is_failed(&self) -> bool {
            self.current == JobStatus::Failed
        }

        fn describe(&self) -> String {
            "scripted job".to_string()
        }
    }

    fn scripted(statuses: Vec<JobStatus>) -> Scripted {
        Scripted { statuses, current: JobStatus::Pending, refreshes: 0 }
    }

    #[tokio::test]
    async fn test_wait_until_completed() {
        let mut job = scripted(vec![JobStatus::Pending, JobStatus::Running, JobStatus::Completed]);
        job.wait(Duration::from_millis(1), Duration::from_secs(5)).await.unwrap();
        assert_eq!(job.refreshes, 3);
    }

    #[tokio::test]
    async fn test_wait_stops_on_failure() {
        let mut job = scripted(vec![JobStatus::Running, JobStatus::Failed]);
        let err = job.wait(Duration::from_millis(1), Duration::from_secs(5)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(job.refreshes, 2);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mut job = scripted(Vec::new());
        let err = job.wait(Duration::from_millis(5), Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(job.refreshes >= 2);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!("Queued".parse::<JobStatus>().is_err());
    }
}
