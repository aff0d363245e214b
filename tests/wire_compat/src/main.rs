fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{Datelike, Timelike};
    use promethium_protocol::{
        DatasetFormat, DatasetRecord, ErrorResponse, FinalizeUploadRequest, InitUploadRequest,
        InitUploadResponse,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON values so that integer-valued floats compare equal.
    ///
    /// The server may emit `2000` or `2000.0` for the same metadata value.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent, float-normalized comparison).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
        parsed
    }

    // --- Upload exchange ---

    #[test]
    fn fixture_init_upload_request() {
        let req = roundtrip_test::<InitUploadRequest>("init_upload_request.json");
        assert_eq!(req.total_size, 12 * 1024 * 1024);
        assert_eq!(req.chunk_size, 5 * 1024 * 1024);
    }

    #[test]
    fn fixture_init_upload_response() {
        let resp = roundtrip_test::<InitUploadResponse>("init_upload_response.json");
        assert_eq!(resp.chunk_size, 5 * 1024 * 1024);
    }

    #[test]
    fn fixture_finalize_upload_request() {
        let req = roundtrip_test::<FinalizeUploadRequest>("finalize_upload_request.json");
        assert_eq!(req.format, DatasetFormat::Segy);
    }

    // --- Dataset records ---

    #[test]
    fn fixture_dataset_record() {
        let record = roundtrip_test::<DatasetRecord>("dataset_record.json");
        assert_eq!(record.id, 17);
        assert_eq!(record.declared_format(), Some(DatasetFormat::Segy));
        assert_eq!(record.metadata_json["traces"], 4800);
    }

    #[test]
    fn fixture_dataset_list() {
        let records = roundtrip_test::<Vec<DatasetRecord>>("dataset_list.json");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].declared_format(), Some(DatasetFormat::Miniseed));
        assert_eq!(records[1].upload_time.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn fixture_dataset_record_naive_time() {
        // Naive timestamps are interpreted as UTC.
        let fixture = load_fixture("dataset_record_naive_time.json");
        let record: DatasetRecord = serde_json::from_value(fixture).unwrap();
        assert_eq!(record.declared_format(), Some(DatasetFormat::Sac));
        assert_eq!(record.upload_time.year(), 2023);
        assert_eq!(record.upload_time.hour(), 19);
        assert_eq!(record.upload_time.timestamp_subsec_micros(), 123_456);
    }

    // --- Errors ---

    #[test]
    fn fixture_error_response() {
        let err = roundtrip_test::<ErrorResponse>("error_response.json");
        assert_eq!(err.message(), "Upload session not found");
    }

    #[test]
    fn fixture_validation_error_response() {
        let err = roundtrip_test::<ErrorResponse>("validation_error_response.json");
        assert!(err.message().contains("not a valid enumeration member"));
    }
}
