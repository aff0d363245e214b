//! Session establishment.

use promethium_protocol::{DEFAULT_CHUNK_SIZE, InitUploadRequest, InitUploadResponse};
use promethium_transfer::total_chunks;
use tracing::{debug, info, warn};

use crate::api::UploadApi;
use crate::error::SessionError;
use crate::types::{UploadRequest, UploadSession};

/// Upper bound on the chunk count of one attempt.
pub const MAX_TOTAL_CHUNKS: usize = 100_000;

/// Runs the init exchange once and validates the server's answer.
///
/// The init exchange is not retried. The preferred chunk size is capped at
/// [`DEFAULT_CHUNK_SIZE`]; the confirmed size must be non-zero and no larger
/// than the size sent.
pub async fn open_session(
    api: &dyn UploadApi,
    request: &UploadRequest,
    preferred_chunk_size: u64,
) -> Result<UploadSession, SessionError> {
    let chunk_size = preferred_chunk_size.min(DEFAULT_CHUNK_SIZE);
    if chunk_size < preferred_chunk_size {
        warn!(
            preferred = preferred_chunk_size,
            chunk_size, "preferred chunk size above the 5 MiB ceiling, capping"
        );
    }
    let init = InitUploadRequest {
        filename: request.file_name().to_string(),
        total_size: request.total_size(),
        chunk_size,
    };
    debug!(
        filename = %init.filename,
        total_size = init.total_size,
        chunk_size = init.chunk_size,
        "opening upload session"
    );

    let response = api.init_upload(&init).await?;
    let session = validate_response(response, chunk_size, request.total_size())?;

    info!(
        upload_id = %session.upload_id,
        chunk_size = session.chunk_size,
        total_chunks = session.total_chunks,
        "upload session opened"
    );
    Ok(session)
}

fn validate_response(
    response: InitUploadResponse,
    requested: u64,
    total_size: u64,
) -> Result<UploadSession, SessionError> {
    if response.upload_id.trim().is_empty() {
        return Err(SessionError::EmptyUploadId);
    }
    if response.chunk_size == 0 || response.chunk_size > requested {
        return Err(SessionError::InvalidChunkSize {
            requested,
            confirmed: response.chunk_size,
        });
    }

    let total_chunks = total_chunks(total_size, response.chunk_size);
    if total_chunks > MAX_TOTAL_CHUNKS {
        return Err(SessionError::TooManyChunks {
            total_chunks,
            limit: MAX_TOTAL_CHUNKS,
        });
    }

    Ok(UploadSession {
        total_chunks,
        upload_id: response.upload_id,
        chunk_size: response.chunk_size,
    })
}
