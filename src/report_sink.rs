// Report sinks: append-only JSON-lines log on disk and authenticated POST to the remote API.
// The two are independent: a failed delivery never removes the local record.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::instrument;

use crate::error::DeliveryError;
use crate::models::AggregatedReport;
use crate::version;

/// Result of a delivery attempt that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16 },
    Disabled,
}

pub trait ReportSink {
    /// Durable local write. An error here is treated as fatal by the scheduler.
    fn persist(&self, report: &AggregatedReport)
    -> impl Future<Output = anyhow::Result<()>> + Send;

    fn deliver(
        &self,
        report: &AggregatedReport,
    ) -> impl Future<Output = Result<DeliveryOutcome, DeliveryError>> + Send;
}

/// Append-only file with one JSON report per line.
pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("creating {}: {}", parent.display(), e))?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self, report), fields(operation = "persist_report", path = %self.path.display()))]
    pub async fn append(&self, report: &AggregatedReport) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(report)?;
        line.push(b'\n');
        // Reopened per write so external rotation of the file is picked up.
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.sync_data().await?;
        tracing::debug!(bytes = line.len(), "report appended");
        Ok(())
    }
}

/// Bearer-authenticated JSON POST of each report.
pub struct HttpDelivery {
    client: reqwest::Client,
    url: String,
    bearer_token: String,
}

impl HttpDelivery {
    pub fn new(
        url: impl Into<String>,
        bearer_token: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("{}/{}", version::NAME, version::VERSION))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build delivery HTTP client: {e}"))?;
        Ok(Self {
            client,
            url: url.into(),
            bearer_token: bearer_token.into(),
        })
    }

    #[instrument(skip(self, report), fields(operation = "deliver_report", url = %self.url))]
    pub async fn post(&self, report: &AggregatedReport) -> Result<u16, DeliveryError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.bearer_token)
            .json(report)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
            });
        }
        Ok(status.as_u16())
    }
}

/// The production sink pair. `delivery` is `None` when remote delivery is disabled.
pub struct Reporter {
    log: ReportLog,
    delivery: Option<HttpDelivery>,
}

impl Reporter {
    pub fn new(log: ReportLog, delivery: Option<HttpDelivery>) -> Self {
        Self { log, delivery }
    }
}

impl ReportSink for Reporter {
    async fn persist(&self, report: &AggregatedReport) -> anyhow::Result<()> {
        self.log.append(report).await
    }

    async fn deliver(&self, report: &AggregatedReport) -> Result<DeliveryOutcome, DeliveryError> {
        match &self.delivery {
            Some(delivery) => delivery
                .post(report)
                .await
                .map(|status| DeliveryOutcome::Delivered { status }),
            None => Ok(DeliveryOutcome::Disabled),
        }
    }
}
