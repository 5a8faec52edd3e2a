//! Error types and handling for bpm
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! This module is organized into sub-modules by error domain:
//! - [`resolve`]: Registry and version resolution errors
//! - [`install`]: Archive verification and package store errors
//! - [`build`]: Asset pipeline and plugin errors

#![allow(unused_assignments)]

pub mod build;
pub mod install;
pub mod resolve;


use miette::Diagnostic;
use thiserror::Error;

/// Main error type for bpm operations
#[derive(Error, Diagnostic, Debug)]
pub enum BpmError {
    // Registry and resolution errors
    #[error("Can't find package {name}{}", fmt_constraint(.constraint))]
    #[diagnostic(
        code(bpm::resolve::package_not_found),
        help("Check the package name, the requested version and whether --pre is needed")
    )]
    PackageNotFound { name: String, constraint: String },

    #[error("No version of '{name}' satisfies all requirements: {requirements}")]
    #[diagnostic(
        code(bpm::resolve::constraint_conflict),
        help("Relax one of the conflicting version constraints")
    )]
    ConstraintConflict { name: String, requirements: String },

    #[error("Failed to reach registry for '{name}': {reason}")]
    #[diagnostic(
        code(bpm::registry::transport),
        help("Check the network connection and the configured registry, then retry")
    )]
    FetchTransportError { name: String, reason: String },

    #[error("Registry rejected request for '{name}': {reason}")]
    #[diagnostic(
        code(bpm::registry::rejected),
        help("Check your credentials for this registry")
    )]
    RegistryRejected { name: String, reason: String },

    #[error("Invalid version: {input}")]
    #[diagnostic(code(bpm::version::invalid))]
    InvalidVersion { input: String },

    #[error("Invalid version constraint: {input}")]
    #[diagnostic(
        code(bpm::version::invalid_constraint),
        help("Valid forms: '*', '= 1.0', '>= 1.0', '~> 1.2', '>= 1.0, < 2.0'")
    )]
    InvalidConstraint { input: String },

    // Install errors
    #[error("Corrupt archive for {name} ({version}): {reason}")]
    #[diagnostic(code(bpm::install::corrupt_archive))]
    CorruptArchive {
        name: String,
        version: String,
        reason: String,
    },

    #[error("Permission denied while installing into {path}")]
    #[diagnostic(
        code(bpm::install::permission_denied),
        help("Make sure the project's .bpm directory is writable")
    )]
    InstallPermissionDenied { path: String },

    #[error("Package '{name}' is not installed")]
    #[diagnostic(
        code(bpm::install::not_installed),
        help("Run 'bpm fetch' to install the project's dependencies")
    )]
    PackageNotInstalled { name: String },

    #[error("Failed to fetch {count} package(s): {failed}")]
    #[diagnostic(code(bpm::install::fetch_failed))]
    FetchFailed { count: usize, failed: String },

    // Manifest and project errors
    #[error("Invalid package manifest {path}: {reason}")]
    #[diagnostic(code(bpm::manifest::invalid))]
    InvalidManifest { path: String, reason: String },

    #[error("No bpm project found at: {path}")]
    #[diagnostic(
        code(bpm::project::not_found),
        help("Run bpm inside a directory containing package.json, or pass --project")
    )]
    ProjectNotFound { path: String },

    // Build errors
    #[error("Asset not found: {logical_path}")]
    #[diagnostic(code(bpm::build::asset_not_found))]
    AssetNotFound { logical_path: String },

    #[error("Cyclic require detected at {path}")]
    #[diagnostic(
        code(bpm::build::cyclic_require),
        help("Remove the require cycle from the package sources")
    )]
    CyclicRequire { path: String },

    #[error("Path escapes its package root: {path}")]
    #[diagnostic(code(bpm::build::path_escapes_root))]
    PathEscapesRoot { path: String },

    #[error("Unknown bundle: {name}")]
    #[diagnostic(
        code(bpm::build::unknown_bundle),
        help("Buildable bundles: bpm_packages.js, bpm_styles.css, <project>/app_package.js, <project>/app_styles.css")
    )]
    UnknownBundle { name: String },

    // Plugin errors
    #[error("{package} depends on {count} packages that define transport plugins")]
    #[diagnostic(
        code(bpm::plugin::multiple_transports),
        help("Keep exactly one transport plugin among the package's dependencies")
    )]
    MultipleTransportPlugins { package: String, count: usize },

    #[error("Project depends on {count} packages that define minifier plugins")]
    #[diagnostic(
        code(bpm::plugin::multiple_minifiers),
        help("Keep exactly one minifier plugin among the project's dependencies")
    )]
    MultipleMinifierPlugins { count: usize },

    #[error("Failed to build {count} bundle(s): {failed}")]
    #[diagnostic(code(bpm::build::failed))]
    BuildFailed { count: usize, failed: String },

    #[error("Plugin '{plugin}' failed: {reason}")]
    #[diagnostic(code(bpm::plugin::failed))]
    PluginFailed { plugin: String, reason: String },

    #[error("Plugin '{plugin}' did not finish within {seconds}s")]
    #[diagnostic(
        code(bpm::plugin::timeout),
        help("Raise plugin_timeout_secs in the bpm configuration")
    )]
    PluginTimeout { plugin: String, seconds: u64 },

    // Usage errors
    #[error("bpm {command} called incorrectly: {message}")]
    #[diagnostic(code(bpm::cli::usage), help("Run the command with --help for usage"))]
    InvalidUsage { command: String, message: String },

    // Configuration errors
    #[error("Failed to parse configuration file: {path}: {reason}")]
    #[diagnostic(code(bpm::config::parse_failed))]
    ConfigParseFailed { path: String, reason: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(bpm::config::invalid))]
    ConfigInvalid { message: String },

    // File system errors
    #[error("Failed to read file: {path}: {reason}")]
    #[diagnostic(code(bpm::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}: {reason}")]
    #[diagnostic(code(bpm::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(bpm::fs::io_error))]
    IoError { message: String },
}

fn fmt_constraint(constraint: &str) -> String {
    if constraint.is_empty() || constraint == "*" {
        String::new()
    } else {
        format!(" ({constraint})")
    }
}

impl BpmError {
    /// Whether this error belongs to a single package unit (resolve or install)
    /// and should be reported without aborting sibling units.
    pub fn is_per_package(&self) -> bool {
        matches!(
            self,
            BpmError::PackageNotFound { .. }
                | BpmError::ConstraintConflict { .. }
                | BpmError::FetchTransportError { .. }
                | BpmError::RegistryRejected { .. }
                | BpmError::CorruptArchive { .. }
                | BpmError::InstallPermissionDenied { .. }
        )
    }
}

impl From<std::io::Error> for BpmError {
    fn from(err: std::io::Error) -> Self {
        BpmError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for BpmError {
    fn from(err: serde_yaml::Error) -> Self {
        BpmError::ConfigParseFailed {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BpmError {
    fn from(err: serde_json::Error) -> Self {
        BpmError::InvalidManifest {
            path: "unknown".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, BpmError>;
