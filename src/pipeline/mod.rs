//! Asset pipeline
//!
//! Turns the sources of a project and its installed packages into the four
//! generated bundles under `assets/`:
//!
//! - [`directives`]: require headers of a module
//! - [`asset`]: logical path resolution
//! - [`bundle`]: require walk, header, plugins

pub mod asset;
pub mod bundle;
pub mod directives;

use std::fs;
use std::path::Path;

use rayon::prelude::*;

use crate::error::{BpmError, Result};
use crate::plugin::PluginStage;
use crate::project::{PackageGraph, Project};

pub use bundle::{Bundle, BundleBuilder, BundleTarget};

/// Whether script bundles go through the minifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BuildMode {
    Debug,
    #[default]
    Production,
}

/// What happened to one bundle's output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Written,
    /// The file on disk already had the same digest
    Unchanged,
}

/// Per-bundle result of a build run
#[derive(Debug)]
pub struct BundleOutcome {
    pub name: String,
    pub result: Result<WriteStatus>,
}

/// Build `targets` concurrently and write the changed ones to disk.
///
/// A failing bundle is reported in its outcome and never affects the
/// others.
pub fn build_all(
    project: &Project,
    graph: &PackageGraph,
    plugins: &PluginStage<'_>,
    mode: BuildMode,
    targets: &[BundleTarget],
    jobs: usize,
) -> Result<Vec<BundleOutcome>> {
    let builder = BundleBuilder::new(project, graph, plugins, mode);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .thread_name(|index| format!("bpm-build-{index}"))
        .build()
        .map_err(|e| BpmError::IoError {
            message: format!("failed to start build workers: {e}"),
        })?;

    let outcomes = pool.install(|| {
        targets
            .par_iter()
            .map(|target| {
                let path = target.output_path(project);
                let result = builder
                    .build(*target)
                    .and_then(|bundle| write_bundle(&path, &bundle));
                BundleOutcome {
                    name: target.file_name(project.name()),
                    result,
                }
            })
            .collect()
    });

    Ok(outcomes)
}

/// Write a bundle unless the file already holds the same content
pub fn write_bundle(path: &Path, bundle: &Bundle) -> Result<WriteStatus> {
    if bundle::is_current(path, &bundle.digest)? {
        return Ok(WriteStatus::Unchanged);
    }

    let write_failed = |path: &Path, e: std::io::Error| BpmError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| write_failed(parent, e))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &bundle.text).map_err(|e| write_failed(&tmp_path, e))?;
    fs::rename(&tmp_path, path).map_err(|e| write_failed(path, e))?;
    Ok(WriteStatus::Written)
}
