//! Chunked dataset upload: session, bounded-concurrency chunk transfer,
//! per-chunk retry, finalize, and a progress event stream.
//!
//! The orchestrator is transport-agnostic: it talks to the server through
//! the [`UploadApi`] trait, implemented for the REST backend by
//! [`HttpClient`].
//!
//! # Pipeline
//!
//! 1. **Validate**: reject missing files, empty names and unknown formats
//! 2. **Init**: open a session and adopt the server's chunk size
//! 3. **Transfer**: send chunks, at most 3 in flight, each retried on its own
//! 4. **Finalize**: assemble the chunks into a dataset record

pub mod api;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod retry;
mod scheduler;
pub mod session;
pub mod types;

pub use api::UploadApi;
pub use error::{
    ChunkFailure, ErrorKind, SessionError, TransportError, UploadError, ValidationError,
};
pub use http::{HttpClient, HttpClientBuilder};
pub use orchestrator::{UploadHandle, UploadOrchestrator};
pub use retry::{MAX_RETRIES, RetryExhausted, RetryPolicy};
pub use session::{MAX_TOTAL_CHUNKS, open_session};
pub use types::{EventKind, UploadConfig, UploadEvent, UploadOutcome, UploadRequest, UploadSession};
