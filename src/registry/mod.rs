//! Package registries
//!
//! A registry answers two questions: which versions of a package exist (with
//! their dependency constraints), and what the archive bytes of one exact
//! version are. Not-found, rejection and transport failures are reported as
//! distinct [`BpmError`] variants so callers can tell them apart.

pub mod http;
pub mod local;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::BpmConfig;
use crate::error::{BpmError, Result};
use crate::version::{Constraint, PackageVersion};

pub use http::HttpRegistry;
pub use local::LocalRegistry;

/// One published version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub version: PackageVersion,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Constraint>,
    #[serde(
        default,
        rename = "optionalDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub optional_dependencies: BTreeMap<String, Constraint>,
    /// `blake3:<hex>` of the archive, when the registry publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// JSON document listing every version of one package
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageIndex {
    pub versions: Vec<RegistryEntry>,
}

impl PackageIndex {
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| BpmError::FetchTransportError {
            name: name.to_string(),
            reason: format!("malformed registry index: {e}"),
        })
    }
}

/// Registry query capability used by the resolver and the installer
pub trait Registry: Send + Sync {
    /// All published versions of `name`.
    ///
    /// Returns `PackageNotFound` when the registry does not know the name.
    fn versions(&self, name: &str) -> Result<Vec<RegistryEntry>>;

    /// Archive bytes (gzip-compressed tar) for an exact version
    fn fetch_archive(&self, name: &str, version: &PackageVersion) -> Result<Vec<u8>>;

    /// Human-readable location, used in verbose output
    fn describe(&self) -> String;
}

/// Open the registry named by the configuration
pub fn open(config: &BpmConfig) -> Box<dyn Registry> {
    if config.registry_is_remote() {
        Box::new(HttpRegistry::new(&config.registry, config.network_timeout()))
    } else {
        Box::new(LocalRegistry::new(PathBuf::from(&config.registry)))
    }
}

/// File name of a package archive, shared by both registry layouts
pub fn archive_file_name(name: &str, version: &PackageVersion) -> String {
    format!("{name}-{version}.tgz")
}
