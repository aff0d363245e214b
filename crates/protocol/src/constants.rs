/// Base URL of the Promethium API when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Preferred chunk size sent in the init exchange: 5 MiB.
///
/// The server may confirm a smaller size, never a larger one.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum number of chunk transfers in flight for one upload attempt.
pub const MAX_IN_FLIGHT_CHUNKS: usize = 3;

/// Opens an upload session.
pub const UPLOAD_INIT_PATH: &str = "datasets/upload/init";

/// Receives one chunk as a multipart form.
pub const UPLOAD_CHUNK_PATH: &str = "datasets/upload/chunk";

/// Assembles the acknowledged chunks into a dataset record.
pub const UPLOAD_FINALIZE_PATH: &str = "datasets/upload/finalize";

/// Lists and fetches registered datasets.
pub const DATASETS_PATH: &str = "datasets";

// Multipart field names of the chunk exchange.
pub const FIELD_UPLOAD_ID: &str = "upload_id";
pub const FIELD_CHUNK_INDEX: &str = "chunk_index";
pub const FIELD_FILE: &str = "file";

/// File name attached to the binary part of chunk `index`.
pub fn chunk_file_name(index: usize) -> String {
    format!("chunk_{index}")
}
