//! Data types for the upload flow.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use promethium_protocol::{DEFAULT_CHUNK_SIZE, DatasetFormat, DatasetRecord, MAX_IN_FLIGHT_CHUNKS};
use promethium_transfer::{
    ByteSource, COMPLETE_PERCENTAGE, FileSource, TransferError, validate_file_name,
};
use serde::{Deserialize, Serialize};

use crate::error::{UploadError, ValidationError};
use crate::retry::RetryPolicy;

/// One validated upload attempt's input. Never mutated after construction.
#[derive(Clone)]
pub struct UploadRequest {
    source: Arc<dyn ByteSource>,
    name: String,
    format: DatasetFormat,
}

impl UploadRequest {
    /// Validates and builds a request from an already opened source.
    ///
    /// `format` is parsed case-insensitively (`SEGY`, `SAC`, `MINISEED`).
    pub fn new(
        source: Arc<dyn ByteSource>,
        name: impl Into<String>,
        format: &str,
    ) -> Result<Self, ValidationError> {
        let format = format.parse::<DatasetFormat>()?;
        Self::with_format(source, name, format)
    }

    /// Like [`UploadRequest::new`] with an already typed format.
    pub fn with_format(
        source: Arc<dyn ByteSource>,
        name: impl Into<String>,
        format: DatasetFormat,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        validate_file_name(source.file_name()).map_err(ValidationError::InvalidFileName)?;
        if source.size() == 0 {
            return Err(ValidationError::EmptyFile);
        }

        Ok(Self {
            source,
            name,
            format,
        })
    }

    /// Opens the file at `path` and validates the request.
    pub async fn from_path(
        path: impl AsRef<Path>,
        name: impl Into<String>,
        format: &str,
    ) -> Result<Self, ValidationError> {
        let format = format.parse::<DatasetFormat>()?;
        let source = FileSource::open(path).await.map_err(|e| match e {
            TransferError::InvalidFileName(_) => ValidationError::InvalidFileName(e),
            other => ValidationError::MissingFile(other),
        })?;
        Self::with_format(Arc::new(source), name, format)
    }

    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    /// Display name registered with the dataset.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> DatasetFormat {
        self.format
    }

    /// File name announced in the init exchange.
    pub fn file_name(&self) -> &str {
        self.source.file_name()
    }

    pub fn total_size(&self) -> u64 {
        self.source.size()
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("file_name", &self.file_name())
            .field("total_size", &self.total_size())
            .field("name", &self.name)
            .field("format", &self.format)
            .finish()
    }
}

/// Server-issued context for one upload attempt. Kept in memory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub upload_id: String,
    /// Authoritative chunk size confirmed by the server.
    pub chunk_size: u64,
    pub total_chunks: usize,
}

/// Event emitted on an attempt's progress channel.
///
/// Zero or more `Progress` events are followed by exactly one terminal
/// `Complete` or `Error`, after which the channel closes.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A chunk was acknowledged. `percentage` never exceeds 99.
    Progress {
        percentage: u8,
        acknowledged: usize,
        total_chunks: usize,
    },
    /// The server registered the assembled dataset.
    Complete { dataset: DatasetRecord },
    /// The attempt failed; restart from file selection.
    Error { error: Arc<UploadError> },
}

/// Discriminant of [`UploadEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Progress,
    Complete,
    Error,
}

impl UploadEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Progress { .. } => EventKind::Progress,
            Self::Complete { .. } => EventKind::Complete,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Percentage carried by the event: 0–99 for progress, 100 for
    /// completion, 0 for errors.
    pub fn percentage(&self) -> u8 {
        match self {
            Self::Progress { percentage, .. } => *percentage,
            Self::Complete { .. } => COMPLETE_PERCENTAGE,
            Self::Error { .. } => 0,
        }
    }

    /// Returns `true` for `Complete` and `Error`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// Terminal value of an upload attempt, produced exactly once.
pub type UploadOutcome = Result<DatasetRecord, Arc<UploadError>>;

/// Tunables for the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Preferred chunk size sent in the init exchange, capped at 5 MiB.
    pub chunk_size: u64,
    /// Concurrent chunk transfers. Values above 3 are clamped to 3.
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_in_flight: MAX_IN_FLIGHT_CHUNKS,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promethium_transfer::MemorySource;

    fn source(name: &str, len: usize) -> Arc<dyn ByteSource> {
        Arc::new(MemorySource::new(name, vec![7u8; len]))
    }

    #[test]
    fn request_validates_inputs() {
        let req = UploadRequest::new(source("line.sgy", 10), "Line 1", "segy").unwrap();
        assert_eq!(req.format(), DatasetFormat::Segy);
        assert_eq!(req.file_name(), "line.sgy");
        assert_eq!(req.total_size(), 10);

        assert!(matches!(
            UploadRequest::new(source("line.sgy", 10), "  ", "SEGY"),
            Err(ValidationError::EmptyName)
        ));
        assert!(matches!(
            UploadRequest::new(source("line.sgy", 10), "Line 1", "netcdf"),
            Err(ValidationError::UnknownFormat(_))
        ));
        assert!(matches!(
            UploadRequest::new(source("line.sgy", 0), "Line 1", "SEGY"),
            Err(ValidationError::EmptyFile)
        ));
        assert!(matches!(
            UploadRequest::new(source("../line.sgy", 10), "Line 1", "SEGY"),
            Err(ValidationError::InvalidFileName(_))
        ));
    }

    #[tokio::test]
    async fn request_from_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = UploadRequest::from_path(dir.path().join("nope.sac"), "x", "SAC").await;
        assert!(matches!(result, Err(ValidationError::MissingFile(_))));
    }

    #[tokio::test]
    async fn request_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sta.mseed");
        std::fs::write(&path, b"MSEED").unwrap();

        let req = UploadRequest::from_path(&path, "Station", "MINISEED").await.unwrap();
        assert_eq!(req.file_name(), "sta.mseed");
        assert_eq!(req.total_size(), 5);
        assert_eq!(req.format(), DatasetFormat::Miniseed);
    }

    #[test]
    fn event_percentages() {
        let progress = UploadEvent::Progress {
            percentage: 42,
            acknowledged: 5,
            total_chunks: 12,
        };
        assert_eq!(progress.percentage(), 42);
        assert!(!progress.is_terminal());

        let error = UploadEvent::Error {
            error: Arc::new(UploadError::Cancelled),
        };
        assert_eq!(error.kind(), EventKind::Error);
        assert_eq!(error.percentage(), 0);
        assert!(error.is_terminal());
    }

    #[test]
    fn config_defaults_and_partial_json() {
        let config = UploadConfig::default();
        assert_eq!(config.chunk_size, 5 * 1024 * 1024);
        assert_eq!(config.max_in_flight, 3);
        assert_eq!(config.retry.max_attempts(), 4);

        let parsed: UploadConfig = serde_json::from_str(r#"{"chunk_size": 1048576}"#).unwrap();
        assert_eq!(parsed.chunk_size, 1024 * 1024);
        assert_eq!(parsed.max_in_flight, 3);
    }
}
