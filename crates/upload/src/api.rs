//! Upload API seam.
//!
//! `UploadApi` is implemented by [`crate::HttpClient`] for the real REST
//! backend. Keeping the orchestrator behind a trait keeps it decoupled from
//! transport and testable with mocks.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use promethium_protocol::{
    DatasetRecord, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse,
};

use crate::error::TransportError;

/// The three exchanges of the chunked upload protocol.
pub trait UploadApi: Send + Sync {
    /// `POST datasets/upload/init`: opens a session and confirms the chunk size.
    fn init_upload<'a>(
        &'a self,
        request: &'a InitUploadRequest,
    ) -> BoxFuture<'a, Result<InitUploadResponse, TransportError>>;

    /// `POST datasets/upload/chunk`: transfers one chunk's bytes.
    ///
    /// A successful return is the chunk acknowledgement.
    fn upload_chunk<'a>(
        &'a self,
        upload_id: &'a str,
        chunk_index: usize,
        data: Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>>;

    /// `POST datasets/upload/finalize`: assembles the chunks into a dataset.
    fn finalize_upload<'a>(
        &'a self,
        request: &'a FinalizeUploadRequest,
    ) -> BoxFuture<'a, Result<DatasetRecord, TransportError>>;
}
