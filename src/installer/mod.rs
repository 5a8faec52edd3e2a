//! Fetching and installing packages into the project store
//!
//! Store layout under the project root:
//!
//! ```text
//! .bpm/packages/<name>/    unpacked package (one version per name)
//! .bpm/staging/            in-flight unpacks
//! .bpm/locks/<name>.lock   advisory per-name lock
//! ```
//!
//! Installs are idempotent: a package whose store copy already carries the
//! requested name and version is not fetched again.

pub mod archive;
pub mod locks;
pub mod transaction;

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{BpmError, Result, install};
use crate::manifest::{MANIFEST_FILE, PackageDescriptor};
use crate::registry::Registry;
use crate::resolver::ResolvedVersion;
use crate::ui::Reporter;
use crate::version::PackageVersion;

pub use archive::VerifiedArchive;
pub use locks::NameLocks;
pub use transaction::InstallTransaction;

/// Name of the hidden store directory in a project root
pub const STORE_DIR: &str = ".bpm";

/// Paths of the package store of one project
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn for_project(project_root: &Path) -> Self {
        Self {
            root: project_root.join(STORE_DIR),
        }
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join("locks")
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }

    /// Version recorded in the store copy of `name`, if one exists and parses
    pub fn installed_version(&self, name: &str) -> Option<PackageVersion> {
        let dir = self.package_dir(name);
        if !dir.join(MANIFEST_FILE).is_file() {
            return None;
        }
        PackageDescriptor::load(&dir)
            .ok()
            .filter(|descriptor| descriptor.name == name)
            .map(|descriptor| descriptor.version)
    }
}

/// A package present in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: PackageVersion,
    pub path: PathBuf,
    /// False when the store already held this exact version
    pub fetched: bool,
}

/// Installs resolved packages from a registry into a project store
pub struct FetchInstaller<'a> {
    registry: &'a dyn Registry,
    layout: StoreLayout,
    locks: NameLocks,
}

impl<'a> FetchInstaller<'a> {
    pub fn new(registry: &'a dyn Registry, layout: StoreLayout) -> Self {
        let locks = NameLocks::new(layout.locks_dir());
        Self {
            registry,
            layout,
            locks,
        }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Install one exact version; a no-op when it is already in the store
    pub fn install(&self, package: &ResolvedVersion) -> Result<InstalledPackage> {
        self.locks
            .with_lock(&package.name, || self.install_locked(package))
    }

    fn install_locked(&self, package: &ResolvedVersion) -> Result<InstalledPackage> {
        let name = package.name.as_str();
        let target = self.layout.package_dir(name);

        if self.layout.installed_version(name).as_ref() == Some(&package.version) {
            return Ok(InstalledPackage {
                name: name.to_string(),
                version: package.version.clone(),
                path: target,
                fetched: false,
            });
        }

        let bytes = self.registry.fetch_archive(name, &package.version)?;
        let archive =
            VerifiedArchive::verify(&bytes, name, &package.version, package.checksum.as_deref())?;

        let staging_root = self.layout.staging_dir();
        fs::create_dir_all(&staging_root).map_err(|e| install::store_io(&staging_root, &e))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("{name}-"))
            .tempdir_in(&staging_root)
            .map_err(|e| install::store_io(&staging_root, &e))?;

        let staged = staging.path().join("package");
        archive.unpack(&staged)?;

        let backup = staging.path().join("previous");
        let mut transaction = InstallTransaction::new(&target, &backup);
        transaction.displace_existing()?;
        transaction.move_into_place(&staged)?;
        transaction.commit();

        Ok(InstalledPackage {
            name: name.to_string(),
            version: package.version.clone(),
            path: target,
            fetched: true,
        })
    }

    /// Install several packages on a bounded worker pool.
    ///
    /// Returns one result per package in input order; a failure never
    /// cancels its siblings.
    pub fn install_all(
        &self,
        packages: &[&ResolvedVersion],
        jobs: usize,
        reporter: &dyn Reporter,
    ) -> Result<Vec<Result<InstalledPackage>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|index| format!("bpm-fetch-{index}"))
            .build()
            .map_err(|e| BpmError::IoError {
                message: format!("failed to start fetch workers: {e}"),
            })?;

        reporter.start_fetch(packages.len());
        let results = pool.install(|| {
            packages
                .par_iter()
                .map(|package| {
                    let result = self.install(package);
                    reporter.package_done(&package.name);
                    result
                })
                .collect()
        });
        reporter.finish_fetch();

        Ok(results)
    }

    /// Delete the store copy of `name`; returns whether one existed
    pub fn remove(&self, name: &str) -> Result<bool> {
        self.locks.with_lock(name, || {
            let target = self.layout.package_dir(name);
            if !target.exists() {
                return Ok(false);
            }
            fs::remove_dir_all(&target).map_err(|e| install::store_io(&target, &e))?;
            Ok(true)
        })
    }
}
