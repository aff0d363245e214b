use std::path::{Component, Path};

use crate::TransferError;

/// Validates the file name announced in the init exchange.
///
/// The server derives storage paths from it, so it must be a single plain
/// path component.
///
/// Rejects:
/// - Empty or whitespace-only names
/// - Anything containing a separator (`/` or `\`)
/// - `.` and `..`
/// - Absolute paths and Windows prefixes (`C:`)
pub fn validate_file_name(file_name: &str) -> Result<(), TransferError> {
    if file_name.trim().is_empty() {
        return Err(TransferError::InvalidFileName("empty file name".into()));
    }

    if file_name.contains(['/', '\\']) {
        return Err(TransferError::InvalidFileName(format!(
            "path separators not allowed: {file_name}"
        )));
    }

    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir | Component::CurDir), _) => Err(
            TransferError::InvalidFileName(format!("relative reference not allowed: {file_name}")),
        ),
        _ => Err(TransferError::InvalidFileName(format!(
            "not a plain file name: {file_name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_name() {
        assert!(validate_file_name("").is_err());
        assert!(validate_file_name("   ").is_err());
    }

    #[test]
    fn rejects_parent_dir() {
        assert!(validate_file_name("..").is_err());
    }

    #[test]
    fn rejects_current_dir() {
        assert!(validate_file_name(".").is_err());
    }

    #[test]
    fn rejects_paths() {
        assert!(validate_file_name("../../etc/passwd").is_err());
        assert!(validate_file_name("/tmp/shot.sgy").is_err());
        assert!(validate_file_name("data/shot.sgy").is_err());
        assert!(validate_file_name("C:\\data\\shot.sgy").is_err());
    }

    #[test]
    fn accepts_plain_names() {
        assert!(validate_file_name("shot_0042.sgy").is_ok());
        assert!(validate_file_name("station.BHZ.mseed").is_ok());
        assert!(validate_file_name(".hidden.sac").is_ok());
    }
}
