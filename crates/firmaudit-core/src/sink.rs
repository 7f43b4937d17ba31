//! Persistence of finalized reports.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use firmaudit_types::PipelineReport;
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Receives every finalized report, whatever the outcome.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Store the report; returns where it went, if it has a location.
    async fn persist(&self, report: &PipelineReport) -> Result<Option<PathBuf>, SinkError>;
}

/// Writes `pipeline_results_YYYYMMDD_HHMMSS.json` into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the report file without overwriting anything.
    ///
    /// The plain timestamped name is tried first; if another run already
    /// holds it, the first eight characters of the run id are appended.
    async fn create_target(&self, report: &PipelineReport) -> Result<(PathBuf, File), SinkError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let plain = self.dir.join(format!("pipeline_results_{stamp}.json"));
        match create_new(&plain).await {
            Ok(file) => return Ok((plain, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(source) => return Err(SinkError::Io { path: plain, source }),
        }

        let id = report.run_id().simple().to_string();
        let suffixed = self
            .dir
            .join(format!("pipeline_results_{stamp}_{}.json", &id[..8]));
        match create_new(&suffixed).await {
            Ok(file) => Ok((suffixed, file)),
            Err(source) => Err(SinkError::Io {
                path: suffixed,
                source,
            }),
        }
    }
}

async fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path).await
}

#[async_trait]
impl ReportSink for JsonFileSink {
    async fn persist(&self, report: &PipelineReport) -> Result<Option<PathBuf>, SinkError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SinkError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let json = serde_json::to_string_pretty(report)?;
        let (path, mut file) = self.create_target(report).await?;
        let written = async {
            file.write_all(json.as_bytes()).await?;
            file.flush().await
        };
        if let Err(source) = written.await {
            return Err(SinkError::Io { path, source });
        }

        info!(path = %path.display(), run_id = %report.run_id(), "report saved");
        Ok(Some(path))
    }
}
