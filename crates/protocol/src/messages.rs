//! Request and response payloads of the upload exchanges.

use serde::{Deserialize, Serialize};

use crate::types::DatasetFormat;

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Opens an upload session (`POST /datasets/upload/init`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitUploadRequest {
    pub filename: String,
    pub total_size: u64,
    /// Client preference; the server answers with the authoritative size.
    pub chunk_size: u64,
}

/// Assembles the uploaded chunks (`POST /datasets/upload/finalize`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeUploadRequest {
    pub upload_id: String,
    pub name: String,
    pub format: DatasetFormat,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Session issued by the init exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitUploadResponse {
    pub upload_id: String,
    pub chunk_size: u64,
}

/// Error body returned by the API for non-2xx responses.
///
/// `detail` is usually a string but validation failures carry a list of
/// objects, so it is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Human-readable rendering of `detail`.
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_request_uses_snake_case_fields() {
        let req = InitUploadRequest {
            filename: "shot.sgy".into(),
            total_size: 12 * 1024 * 1024,
            chunk_size: 5 * 1024 * 1024,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["filename"], "shot.sgy");
        assert_eq!(json["total_size"], 12_582_912);
        assert_eq!(json["chunk_size"], 5_242_880);
    }

    #[test]
    fn finalize_request_carries_canonical_format() {
        let req = FinalizeUploadRequest {
            upload_id: "abc".into(),
            name: "Line 12".into(),
            format: DatasetFormat::Sac,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"upload_id":"abc","name":"Line 12","format":"SAC"}"#);
    }

    #[test]
    fn error_detail_string_and_list() {
        let plain: ErrorResponse =
            serde_json::from_str(r#"{"detail": "Upload session not found"}"#).unwrap();
        assert_eq!(plain.message(), "Upload session not found");

        let list: ErrorResponse =
            serde_json::from_str(r#"{"detail": [{"loc": ["body", "name"]}]}"#).unwrap();
        assert!(list.message().contains("loc"));
    }
}
