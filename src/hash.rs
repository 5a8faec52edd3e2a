//! BLAKE3 hashing for archive checksums and asset change detection

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use blake3::Hasher;

use crate::error::{BpmError, Result};

/// Hash prefix for BLAKE3 hashes
pub const HASH_PREFIX: &str = "blake3:";

/// Calculate BLAKE3 hash of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{}{}", HASH_PREFIX, blake3::hash(data).to_hex())
}

/// Calculate BLAKE3 hash of a file
pub fn hash_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| BpmError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut reader = BufReader::new(file);
    let mut hasher = Hasher::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| BpmError::FileReadFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{}{}", HASH_PREFIX, hasher.finalize().to_hex()))
}

/// Hash of an existing file, or `None` when it does not exist yet
pub fn hash_file_if_exists(path: &Path) -> Result<Option<String>> {
    match File::open(path) {
        Ok(_) => hash_file(path).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BpmError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Verify a hash matches the expected value
pub fn verify_hash(expected: &str, actual: &str) -> bool {
    let normalize = |h: &str| {
        if h.starts_with(HASH_PREFIX) {
            h.to_ascii_lowercase()
        } else {
            format!("{}{}", HASH_PREFIX, h.to_ascii_lowercase())
        }
    };

    normalize(expected) == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_bytes_matches_file() {
        let temp = TempDir::new().unwrap();
        let file_path = temp.path().join("bundle.js");
        std::fs::write(&file_path, "var a = 1;\n").unwrap();

        assert_eq!(hash_file(&file_path).unwrap(), hash_bytes(b"var a = 1;\n"));
    }

    #[test]
    fn test_hash_file_not_found() {
        let result = hash_file(Path::new("/nonexistent/file.txt"));
        assert!(result.is_err());
    }

    #[test]
    fn test_hash_file_if_exists() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.css");
        assert_eq!(hash_file_if_exists(&missing).unwrap(), None);

        std::fs::write(&missing, "body {}").unwrap();
        assert!(hash_file_if_exists(&missing).unwrap().is_some());
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_bytes(b"aaa"), hash_bytes(b"aaa"));
        assert_ne!(hash_bytes(b"aaa"), hash_bytes(b"bbb"));
    }

    #[test]
    fn test_verify_hash() {
        let hash1 = format!("{}abc123", HASH_PREFIX);
        let hash2 = hash1.clone();
        assert!(verify_hash(&hash1, &hash2));

        assert!(verify_hash(&hash1, "abc123"));
        assert!(verify_hash(&hash1, "ABC123"));

        let hash3 = format!("{}def456", HASH_PREFIX);
        assert!(!verify_hash(&hash1, &hash3));
    }
}
