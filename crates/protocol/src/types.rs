use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Seismic data format declared by the uploader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetFormat {
    #[serde(rename = "SEGY")]
    Segy,
    #[serde(rename = "SAC")]
    Sac,
    #[serde(rename = "MINISEED")]
    Miniseed,
}

impl DatasetFormat {
    /// All formats accepted at the upload boundary.
    pub const ALL: [DatasetFormat; 3] = [Self::Segy, Self::Sac, Self::Miniseed];

    /// Canonical wire spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Segy => "SEGY",
            Self::Sac => "SAC",
            Self::Miniseed => "MINISEED",
        }
    }
}

impl fmt::Display for DatasetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`DatasetFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized dataset format: {0:?} (expected SEGY, SAC or MINISEED)")]
pub struct UnknownFormatError(pub String);

impl FromStr for DatasetFormat {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SEGY" | "SEG-Y" => Ok(Self::Segy),
            "SAC" => Ok(Self::Sac),
            "MINISEED" | "MSEED" => Ok(Self::Miniseed),
            _ => Err(UnknownFormatError(s.to_string())),
        }
    }
}

/// A registered dataset, as returned by finalize and the listing endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: i64,
    pub name: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_path: String,
    #[serde(default, alias = "metadata")]
    pub metadata_json: serde_json::Map<String, serde_json::Value>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub upload_time: DateTime<Utc>,
}

impl DatasetRecord {
    /// Parses the stored format string, if it names a known format.
    pub fn declared_format(&self) -> Option<DatasetFormat> {
        self.format.parse().ok()
    }
}

/// Accepts RFC 3339 timestamps as well as naive ISO 8601 ones, which the
/// server emits for timezone-less columns. Naive values are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("segy".parse::<DatasetFormat>().unwrap(), DatasetFormat::Segy);
        assert_eq!("SEG-Y".parse::<DatasetFormat>().unwrap(), DatasetFormat::Segy);
        assert_eq!(" Sac ".parse::<DatasetFormat>().unwrap(), DatasetFormat::Sac);
        assert_eq!("mseed".parse::<DatasetFormat>().unwrap(), DatasetFormat::Miniseed);
    }

    #[test]
    fn unknown_format_is_rejected() {
        let err = "hdf5".parse::<DatasetFormat>().unwrap_err();
        assert_eq!(err, UnknownFormatError("hdf5".into()));
    }

    #[test]
    fn format_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&DatasetFormat::Miniseed).unwrap(),
            "\"MINISEED\""
        );
        assert_eq!(DatasetFormat::Segy.to_string(), "SEGY");
    }

    #[test]
    fn record_accepts_naive_timestamp() {
        let json = r#"{
            "id": 7,
            "name": "line-12",
            "format": "SEGY",
            "file_path": "/data/line-12.sgy",
            "metadata_json": {"traces": 480},
            "upload_time": "2024-03-01T10:15:30.250000"
        }"#;
        let record: DatasetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, 7);
        assert_eq!(record.declared_format(), Some(DatasetFormat::Segy));
        assert_eq!(record.metadata_json["traces"], 480);
        assert_eq!(record.upload_time.to_rfc3339(), "2024-03-01T10:15:30.250+00:00");
    }

    #[test]
    fn record_accepts_rfc3339_and_missing_optionals() {
        let json = r#"{
            "id": 1,
            "name": "n",
            "format": "sac",
            "upload_time": "2024-03-01T10:15:30+02:00"
        }"#;
        let record: DatasetRecord = serde_json::from_str(json).unwrap();
        assert!(record.metadata_json.is_empty());
        assert!(record.file_path.is_empty());
        assert_eq!(record.upload_time.to_rfc3339(), "2024-03-01T08:15:30+00:00");
    }

    #[test]
    fn record_accepts_metadata_key() {
        let json = r#"{
            "id": 3,
            "name": "n",
            "format": "MSEED",
            "metadata": {"stations": 12},
            "upload_time": "2024-03-01T10:15:30"
        }"#;
        let record: DatasetRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.metadata_json["stations"], 12);
    }

    #[test]
    fn record_rejects_garbage_timestamp() {
        let json = r#"{"id": 1, "name": "n", "format": "SAC", "upload_time": "yesterday"}"#;
        assert!(serde_json::from_str::<DatasetRecord>(json).is_err());
    }
}
