//! Wire protocol types for the Promethium dataset upload API.
//!
//! Covers the three upload exchanges (`init`, `chunk`, `finalize`) and the
//! dataset records returned by the server. This crate performs no I/O.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{DEFAULT_BASE_URL, DEFAULT_CHUNK_SIZE, MAX_IN_FLIGHT_CHUNKS};
pub use messages::{ErrorResponse, FinalizeUploadRequest, InitUploadRequest, InitUploadResponse};
pub use types::{DatasetFormat, DatasetRecord, UnknownFormatError};
