//! Package archive verification and unpacking
//!
//! Archives are gzip-compressed tarballs with `package.json` at the root.
//! The whole archive is decoded and checked in memory before anything is
//! written, so a corrupt archive never leaves files behind.

use std::fs;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::{Result, install};
use crate::hash;
use crate::manifest::{MANIFEST_FILE, PackageDescriptor};
use crate::version::PackageVersion;

#[derive(Debug)]
enum Entry {
    Dir(PathBuf),
    File(PathBuf, Vec<u8>),
}

/// Verified contents of a package archive
#[derive(Debug)]
pub struct VerifiedArchive {
    entries: Vec<Entry>,
}

impl VerifiedArchive {
    /// Decode and verify an archive for `name` at `version`
    pub fn verify(
        bytes: &[u8],
        name: &str,
        version: &PackageVersion,
        checksum: Option<&str>,
    ) -> Result<Self> {
        let corrupt = |reason: String| install::corrupt_archive(name, version.as_str(), reason);

        if let Some(expected) = checksum {
            let actual = hash::hash_bytes(bytes);
            if !hash::verify_hash(expected, &actual) {
                return Err(corrupt(format!(
                    "checksum mismatch (expected {expected}, got {actual})"
                )));
            }
        }

        let mut archive = Archive::new(GzDecoder::new(bytes));
        let mut entries = Vec::new();
        let mut manifest: Option<String> = None;

        let iter = archive
            .entries()
            .map_err(|e| corrupt(format!("invalid tarball: {e}")))?;
        for entry in iter {
            let mut entry = entry.map_err(|e| corrupt(format!("invalid tarball entry: {e}")))?;
            let raw_path = entry
                .path()
                .map_err(|e| corrupt(format!("invalid entry path: {e}")))?
                .into_owned();
            let path = confined_path(&raw_path)
                .ok_or_else(|| corrupt(format!("entry escapes package: {}", raw_path.display())))?;

            let kind = entry.header().entry_type();
            if kind.is_dir() {
                if !path.as_os_str().is_empty() {
                    entries.push(Entry::Dir(path));
                }
            } else if kind.is_file() {
                let mut data = Vec::new();
                entry
                    .read_to_end(&mut data)
                    .map_err(|e| corrupt(format!("truncated entry {}: {e}", path.display())))?;
                if path == Path::new(MANIFEST_FILE) {
                    manifest = Some(String::from_utf8(data.clone()).map_err(|_| {
                        corrupt(format!("{MANIFEST_FILE} is not valid UTF-8"))
                    })?);
                }
                entries.push(Entry::File(path, data));
            } else {
                return Err(corrupt(format!(
                    "unsupported entry type for {}",
                    path.display()
                )));
            }
        }

        let manifest = manifest.ok_or_else(|| corrupt(format!("missing {MANIFEST_FILE}")))?;
        let descriptor = PackageDescriptor::from_json(&manifest, MANIFEST_FILE)
            .map_err(|e| corrupt(e.to_string()))?;

        if descriptor.name != name || descriptor.version != *version {
            return Err(corrupt(format!(
                "archive contains {} ({}) instead",
                descriptor.name, descriptor.version
            )));
        }

        Ok(Self { entries })
    }

    /// Write every entry under `dest`
    pub fn unpack(&self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest).map_err(|e| install::store_io(dest, &e))?;

        for entry in &self.entries {
            match entry {
                Entry::Dir(path) => {
                    let target = dest.join(path);
                    fs::create_dir_all(&target).map_err(|e| install::store_io(&target, &e))?;
                }
                Entry::File(path, data) => {
                    let target = dest.join(path);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent).map_err(|e| install::store_io(parent, &e))?;
                    }
                    fs::write(&target, data).map_err(|e| install::store_io(&target, &e))?;
                }
            }
        }
        Ok(())
    }
}

/// Relative path made of normal components only; `./` segments are dropped
fn confined_path(path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(clean)
}
