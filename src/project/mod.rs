//! Project on-disk layout
//!
//! A project is a directory holding a `package.json`. Its own sources live in
//! the directories named by that manifest, vendored packages live under
//! `packages/<name>/`, fetched packages under `.bpm/packages/<name>/`, and
//! built bundles are written to `assets/`.

pub mod graph;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BpmError, Result};
use crate::installer::StoreLayout;
use crate::manifest::{MANIFEST_FILE, PackageDescriptor};
use crate::resolver::RootRequest;

pub use graph::{PackageGraph, ResolvedPackage};

/// Directory of vendored packages inside a project
pub const LOCAL_PACKAGES_DIR: &str = "packages";

/// Directory receiving built bundles
pub const ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    descriptor: PackageDescriptor,
    layout: StoreLayout,
}

/// Find the nearest ancestor of `start` (inclusive) holding a manifest
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}

impl Project {
    /// Open the project containing `start`
    pub fn discover(start: &Path) -> Result<Self> {
        let start = dunce::canonicalize(start).map_err(|_| BpmError::ProjectNotFound {
            path: start.display().to_string(),
        })?;
        let root = find_root(&start).ok_or_else(|| BpmError::ProjectNotFound {
            path: start.display().to_string(),
        })?;
        Self::open(&root)
    }

    /// Open the project rooted exactly at `root`
    pub fn open(root: &Path) -> Result<Self> {
        if !root.join(MANIFEST_FILE).is_file() {
            return Err(BpmError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }
        let root = dunce::canonicalize(root).map_err(|e| BpmError::FileReadFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;
        let descriptor = PackageDescriptor::load(&root)?;
        let layout = StoreLayout::for_project(&root);

        Ok(Self {
            root,
            descriptor,
            layout,
        })
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn descriptor_mut(&mut self) -> &mut PackageDescriptor {
        &mut self.descriptor
    }

    /// Persist the (possibly edited) manifest
    pub fn save(&self) -> Result<()> {
        self.descriptor.save(&self.root)
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join(ASSETS_DIR)
    }

    pub fn local_package_dir(&self, name: &str) -> PathBuf {
        self.root.join(LOCAL_PACKAGES_DIR).join(name)
    }

    /// Where the package `name` lives: vendored copy first, then the store
    pub fn package_root(&self, name: &str) -> Option<PathBuf> {
        let local = self.local_package_dir(name);
        if local.join(MANIFEST_FILE).is_file() {
            return Some(local);
        }
        let fetched = self.layout.package_dir(name);
        fetched.join(MANIFEST_FILE).is_file().then_some(fetched)
    }

    pub fn is_vendored(&self, name: &str) -> bool {
        self.local_package_dir(name).join(MANIFEST_FILE).is_file()
    }

    /// Every package present on disk, sorted by name; a vendored copy
    /// shadows the store copy of the same name
    pub fn installed_packages(&self) -> Result<Vec<ResolvedPackage>> {
        let mut found: BTreeMap<String, ResolvedPackage> = BTreeMap::new();
        for dir in [self.layout.packages_dir(), self.root.join(LOCAL_PACKAGES_DIR)] {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries {
                let path = entry?.path();
                if !path.join(MANIFEST_FILE).is_file() {
                    continue;
                }
                let descriptor = PackageDescriptor::load(&path)?;
                found.insert(
                    descriptor.name.clone(),
                    ResolvedPackage {
                        descriptor,
                        root: path,
                    },
                );
            }
        }
        Ok(found.into_values().collect())
    }

    /// Registry requests needed to satisfy the project's dependencies.
    ///
    /// Vendored packages are not requested themselves; their own
    /// dependencies are requested in their place.
    pub fn root_requests(&self) -> Result<Vec<RootRequest>> {
        let mut requests = Vec::new();
        let mut visited = BTreeSet::new();
        self.collect_requests(&self.descriptor, &mut visited, &mut requests)?;
        Ok(requests)
    }

    fn collect_requests(
        &self,
        descriptor: &PackageDescriptor,
        visited: &mut BTreeSet<String>,
        requests: &mut Vec<RootRequest>,
    ) -> Result<()> {
        let deps = descriptor
            .dependencies
            .iter()
            .map(|dep| (dep, false))
            .chain(descriptor.optional_dependencies.iter().map(|dep| (dep, true)));

        for ((name, constraint), optional) in deps {
            if self.is_vendored(name) {
                if visited.insert(name.clone()) {
                    let vendored = PackageDescriptor::load(&self.local_package_dir(name))?;
                    self.collect_requests(&vendored, visited, requests)?;
                }
                continue;
            }
            requests.push(RootRequest::new(name.clone(), constraint.clone()).optional(optional));
        }
        Ok(())
    }
}
