//! Upload error types.

use promethium_protocol::UnknownFormatError;
use promethium_transfer::TransferError;

/// Input rejected before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("file not found or unreadable: {0}")]
    MissingFile(#[source] TransferError),

    #[error("file is empty")]
    EmptyFile,

    #[error("dataset name must not be empty")]
    EmptyName,

    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormatError),

    #[error(transparent)]
    InvalidFileName(TransferError),
}

/// A single HTTP exchange failed.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connect, timeout or body failure inside the HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected payload.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The task driving a chunk transfer panicked or was aborted.
    #[error("chunk task failed: {0}")]
    Task(String),
}

impl TransportError {
    /// Returns the HTTP status for [`TransportError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// The init exchange did not produce a usable session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server returned an empty upload id")]
    EmptyUploadId,

    #[error("server confirmed chunk size {confirmed}, requested at most {requested}")]
    InvalidChunkSize { requested: u64, confirmed: u64 },

    #[error("confirmed chunk size splits the file into {total_chunks} chunks, limit is {limit}")]
    TooManyChunks { total_chunks: usize, limit: usize },
}

/// Why a single chunk could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum ChunkFailure {
    #[error("failed to read chunk bytes: {0}")]
    Read(#[from] TransferError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Terminal failure of an upload attempt.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid upload request: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to open upload session: {0}")]
    Session(#[from] SessionError),

    #[error("chunk {index} failed after {attempts} attempts: {source}")]
    ChunkTransfer {
        index: usize,
        attempts: u32,
        #[source]
        source: ChunkFailure,
    },

    #[error("failed to finalize upload {upload_id}: {source}")]
    Finalize {
        upload_id: String,
        #[source]
        source: TransportError,
    },

    #[error("upload cancelled")]
    Cancelled,
}

/// Discriminant of [`UploadError`], convenient for matching on events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Session,
    ChunkTransfer,
    Finalize,
    Cancelled,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Session(_) => ErrorKind::Session,
            Self::ChunkTransfer { .. } => ErrorKind::ChunkTransfer,
            Self::Finalize { .. } => ErrorKind::Finalize,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Index of the failed chunk, for [`UploadError::ChunkTransfer`].
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::ChunkTransfer { index, .. } => Some(*index),
            _ => None,
        }
    }
}
