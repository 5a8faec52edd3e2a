//! Directory-backed registry
//!
//! Layout:
//!
//! ```text
//! <root>/index/<name>.json              {"versions": [...]}
//! <root>/archives/<name>-<version>.tgz
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{PackageIndex, Registry, RegistryEntry, archive_file_name};
use crate::error::{Result, resolve};
use crate::manifest::is_valid_package_name;
use crate::version::PackageVersion;

#[derive(Debug, Clone)]
pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self, name: &str) -> PathBuf {
        self.root.join("index").join(format!("{name}.json"))
    }

    pub fn archive_path(&self, name: &str, version: &PackageVersion) -> PathBuf {
        self.root
            .join("archives")
            .join(archive_file_name(name, version))
    }
}

impl Registry for LocalRegistry {
    fn versions(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        if !is_valid_package_name(name) {
            return Err(resolve::package_not_found(name, ""));
        }

        let path = self.index_path(name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(PackageIndex::parse(name, &content)?.versions),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(resolve::package_not_found(name, ""))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(resolve::rejected(
                name,
                format!("{}: {e}", path.display()),
            )),
            Err(e) => Err(resolve::transport(name, format!("{}: {e}", path.display()))),
        }
    }

    fn fetch_archive(&self, name: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        let path = self.archive_path(name, version);
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(resolve::package_not_found(name, format!("= {version}")))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(resolve::rejected(
                name,
                format!("{}: {e}", path.display()),
            )),
            Err(e) => Err(resolve::transport(name, format!("{}: {e}", path.display()))),
        }
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BpmError;
    use tempfile::TempDir;

    fn registry_with_index(name: &str, json: &str) -> (TempDir, LocalRegistry) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("index")).unwrap();
        fs::write(temp.path().join("index").join(format!("{name}.json")), json).unwrap();
        let registry = LocalRegistry::new(temp.path());
        (temp, registry)
    }

    #[test]
    fn test_versions_listed() {
        let (_temp, registry) = registry_with_index(
            "rake",
            r#"{"versions": [{"version": "0.8.6"}, {"version": "0.8.7"}]}"#,
        );
        let versions = registry.versions("rake").unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[1].version.to_string(), "0.8.7");
    }

    #[test]
    fn test_missing_package_is_not_found() {
        let (_temp, registry) = registry_with_index("rake", r#"{"versions": []}"#);
        let err = registry.versions("fake").unwrap_err();
        assert!(matches!(err, BpmError::PackageNotFound { .. }));
        assert_eq!(err.to_string(), "Can't find package fake");
    }

    #[test]
    fn test_traversal_name_is_not_found() {
        let (_temp, registry) = registry_with_index("rake", r#"{"versions": []}"#);
        assert!(matches!(
            registry.versions("../rake"),
            Err(BpmError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_missing_archive_is_not_found() {
        let (_temp, registry) = registry_with_index("rake", r#"{"versions": []}"#);
        let version = PackageVersion::parse("0.8.7").unwrap();
        assert!(matches!(
            registry.fetch_archive("rake", &version),
            Err(BpmError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_archive_bytes_returned() {
        let (temp, registry) = registry_with_index("rake", r#"{"versions": []}"#);
        let version = PackageVersion::parse("0.8.7").unwrap();
        fs::create_dir_all(temp.path().join("archives")).unwrap();
        fs::write(registry.archive_path("rake", &version), b"bytes").unwrap();
        assert_eq!(registry.fetch_archive("rake", &version).unwrap(), b"bytes");
    }
}
