//! Test fixtures and utilities for reducing test setup duplication.
//!
//! Provides temp directories, an in-memory registry that counts the calls it
//! receives, package archive builders and on-disk package writers.
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_fixtures::{MemoryRegistry, create_temp_dir};
//!
//! #[test]
//! fn my_test() {
//!     let temp = create_temp_dir();
//!     let registry = MemoryRegistry::new()
//!         .with_package("rake", "0.8.6", &[])
//!         .with_package("rake", "0.8.7", &[]);
//! }
//! ```

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use crate::error::{Result, resolve};
use crate::registry::{Registry, RegistryEntry};
use crate::version::{Constraint, PackageVersion};

/// Create a temp directory in the system temp location.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Build a package.json body
#[must_use]
pub fn manifest_json(name: &str, version: &str, deps: &[(&str, &str)]) -> String {
    let deps: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|(n, c)| ((*n).to_string(), serde_json::Value::String((*c).to_string())))
        .collect();
    serde_json::json!({ "name": name, "version": version, "dependencies": deps }).to_string()
}

/// Gzip-compressed tar containing the given files
#[must_use]
pub fn archive_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .expect("append tar entry");
    }

    let encoder = builder.into_inner().expect("finish tar");
    encoder.finish().expect("finish gzip")
}

/// Archive of a package whose manifest declares `deps` plus any extra files
#[must_use]
pub fn package_archive(
    name: &str,
    version: &str,
    deps: &[(&str, &str)],
    files: &[(&str, &str)],
) -> Vec<u8> {
    let manifest = manifest_json(name, version, deps);
    let mut all: Vec<(&str, &str)> = vec![("package.json", manifest.as_str())];
    all.extend_from_slice(files);
    archive_bytes(&all)
}

/// Write a package directory: `package.json` plus files
pub fn write_package(dir: &Path, manifest: &str, files: &[(&str, &str)]) -> PathBuf {
    fs::create_dir_all(dir).expect("create package dir");
    fs::write(dir.join("package.json"), manifest).expect("write manifest");
    for (path, content) in files {
        let target = dir.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = fs::File::create(&target).expect("create file");
        file.write_all(content.as_bytes()).expect("write file");
    }
    dir.to_path_buf()
}

/// In-memory registry that counts how often it is queried
#[derive(Default)]
pub struct MemoryRegistry {
    entries: HashMap<String, Vec<RegistryEntry>>,
    archives: HashMap<(String, String), Vec<u8>>,
    version_calls: AtomicUsize,
    archive_calls: AtomicUsize,
}

impl MemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a version with required dependencies and a matching archive
    #[must_use]
    pub fn with_package(mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        self.publish(name, version, deps, &[]);
        self
    }

    /// Publish a version that also declares optional dependencies
    #[must_use]
    pub fn with_optional(
        mut self,
        name: &str,
        version: &str,
        deps: &[(&str, &str)],
        optional: &[(&str, &str)],
    ) -> Self {
        self.publish(name, version, deps, optional);
        self
    }

    /// Replace the archive served for a version
    #[must_use]
    pub fn with_archive(mut self, name: &str, version: &str, bytes: Vec<u8>) -> Self {
        self.archives
            .insert((name.to_string(), version.to_string()), bytes);
        self
    }

    /// Set the published checksum of a version
    #[must_use]
    pub fn with_checksum(mut self, name: &str, version: &str, checksum: &str) -> Self {
        if let Some(entry) = self
            .entries
            .get_mut(name)
            .and_then(|list| list.iter_mut().find(|e| e.version.as_str() == version))
        {
            entry.checksum = Some(checksum.to_string());
        }
        self
    }

    fn publish(
        &mut self,
        name: &str,
        version: &str,
        deps: &[(&str, &str)],
        optional: &[(&str, &str)],
    ) {
        let mut entry = RegistryEntry {
            version: PackageVersion::parse(version).expect("version"),
            dependencies: BTreeMap::new(),
            optional_dependencies: BTreeMap::new(),
            checksum: None,
        };
        for (dep, constraint) in deps {
            entry.dependencies.insert(
                (*dep).to_string(),
                Constraint::parse(constraint).expect("constraint"),
            );
        }
        for (dep, constraint) in optional {
            entry.optional_dependencies.insert(
                (*dep).to_string(),
                Constraint::parse(constraint).expect("constraint"),
            );
        }
        self.entries.entry(name.to_string()).or_default().push(entry);
        self.archives.insert(
            (name.to_string(), version.to_string()),
            package_archive(name, version, deps, &[("lib/main.js", "// main\n")]),
        );
    }

    pub fn version_calls(&self) -> usize {
        self.version_calls.load(Ordering::SeqCst)
    }

    pub fn archive_calls(&self) -> usize {
        self.archive_calls.load(Ordering::SeqCst)
    }
}

impl Registry for MemoryRegistry {
    fn versions(&self, name: &str) -> Result<Vec<RegistryEntry>> {
        self.version_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| resolve::package_not_found(name, ""))
    }

    fn fetch_archive(&self, name: &str, version: &PackageVersion) -> Result<Vec<u8>> {
        self.archive_calls.fetch_add(1, Ordering::SeqCst);
        self.archives
            .get(&(name.to_string(), version.to_string()))
            .cloned()
            .ok_or_else(|| resolve::package_not_found(name, format!("= {version}")))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
