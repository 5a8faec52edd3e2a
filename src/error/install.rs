//! Archive verification and package store errors

use std::path::Path;

use super::BpmError;

/// Creates a corrupt archive error
pub fn corrupt_archive(
    name: impl Into<String>,
    version: impl Into<String>,
    reason: impl Into<String>,
) -> BpmError {
    BpmError::CorruptArchive {
        name: name.into(),
        version: version.into(),
        reason: reason.into(),
    }
}

/// Maps an IO failure inside the package store, keeping permission problems distinct
pub fn store_io(path: &Path, err: &std::io::Error) -> BpmError {
    if err.kind() == std::io::ErrorKind::PermissionDenied {
        BpmError::InstallPermissionDenied {
            path: path.display().to_string(),
        }
    } else {
        BpmError::FileWriteFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }
}

/// Creates a not-installed error
pub fn not_installed(name: impl Into<String>) -> BpmError {
    BpmError::PackageNotInstalled { name: name.into() }
}
