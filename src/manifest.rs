//! Package manifest (package.json)
//!
//! Every package, and the project itself, describes itself with a
//! `package.json`:
//!
//! ```json
//! {
//!   "name": "core-test",
//!   "version": "0.4.9",
//!   "dependencies": { "spade": ">= 0.5.0" },
//!   "optionalDependencies": { "ivory": "0.0.1" },
//!   "directories": { "lib": "lib", "css": "resources" },
//!   "pipeline": ["lib"],
//!   "plugin": "transport"
//! }
//! ```
//!
//! Unknown keys are preserved and handed to plugins as package info.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BpmError, Result};
use crate::version::{Constraint, PackageVersion};

/// Manifest file name inside every package and project root
pub const MANIFEST_FILE: &str = "package.json";

/// Role a plugin package plays in the build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginRole {
    Transport,
    Minifier,
}

impl std::fmt::Display for PluginRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PluginRole::Transport => f.write_str("transport"),
            PluginRole::Minifier => f.write_str("minifier"),
        }
    }
}

/// Plugin declaration of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSpec {
    pub role: PluginRole,
    /// Extra script loaded after the pipeline libs
    pub main: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PluginField {
    Role(PluginRole),
    Detailed {
        role: PluginRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        main: Option<String>,
    },
}

/// On-disk shape of package.json
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestData {
    name: String,
    version: PackageVersion,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    dependencies: BTreeMap<String, Constraint>,
    #[serde(
        default,
        rename = "optionalDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    optional_dependencies: BTreeMap<String, Constraint>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    directories: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pipeline: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plugin: Option<PluginField>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Parsed and validated package metadata
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub name: String,
    pub version: PackageVersion,
    pub dependencies: BTreeMap<String, Constraint>,
    /// Soft dependencies: installed when available, skipped otherwise
    pub optional_dependencies: BTreeMap<String, Constraint>,
    /// Explicit directory roles; see [`PackageDescriptor::directory`] for defaults
    pub directories: BTreeMap<String, String>,
    /// Directory roles whose files are require-able source, in order
    pub pipeline_libs: Vec<String>,
    pub plugin: Option<PluginSpec>,
    pub extra: Map<String, Value>,
}

const DEFAULT_DIRECTORIES: [(&str, &str); 3] = [("assets", "assets"), ("css", "css"), ("lib", "lib")];

impl PackageDescriptor {
    /// Load `package.json` from a package or project directory
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| BpmError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&content, &path.display().to_string())
    }

    /// Parse manifest JSON; `origin` names the source in error messages
    pub fn from_json(content: &str, origin: &str) -> Result<Self> {
        let data: ManifestData =
            serde_json::from_str(content).map_err(|e| BpmError::InvalidManifest {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;
        let descriptor = Self::from_data(data);
        descriptor.validate(origin)?;
        Ok(descriptor)
    }

    fn from_data(data: ManifestData) -> Self {
        let plugin = data.plugin.map(|field| match field {
            PluginField::Role(role) => PluginSpec { role, main: None },
            PluginField::Detailed { role, main } => PluginSpec { role, main },
        });

        Self {
            name: data.name,
            version: data.version,
            dependencies: data.dependencies,
            optional_dependencies: data.optional_dependencies,
            directories: data.directories,
            pipeline_libs: data.pipeline.unwrap_or_else(|| vec!["lib".to_string()]),
            plugin,
            extra: data.extra,
        }
    }

    fn to_data(&self) -> ManifestData {
        let plugin = self.plugin.as_ref().map(|spec| match &spec.main {
            None => PluginField::Role(spec.role),
            Some(main) => PluginField::Detailed {
                role: spec.role,
                main: Some(main.clone()),
            },
        });

        ManifestData {
            name: self.name.clone(),
            version: self.version.clone(),
            dependencies: self.dependencies.clone(),
            optional_dependencies: self.optional_dependencies.clone(),
            directories: self.directories.clone(),
            pipeline: if self.pipeline_libs == ["lib"] {
                None
            } else {
                Some(self.pipeline_libs.clone())
            },
            plugin,
            extra: self.extra.clone(),
        }
    }

    /// Validate names and directory confinement
    pub fn validate(&self, origin: &str) -> Result<()> {
        let invalid = |reason: String| BpmError::InvalidManifest {
            path: origin.to_string(),
            reason,
        };

        if !is_valid_package_name(&self.name) {
            return Err(invalid(format!("invalid package name '{}'", self.name)));
        }

        for name in self
            .dependencies
            .keys()
            .chain(self.optional_dependencies.keys())
        {
            if !is_valid_package_name(name) {
                return Err(invalid(format!("invalid dependency name '{name}'")));
            }
        }

        for (role, dir) in &self.directories {
            if !is_confined_relative(dir) {
                return Err(invalid(format!(
                    "directory '{role}' must be a relative path inside the package: '{dir}'"
                )));
            }
        }

        for role in &self.pipeline_libs {
            if !is_confined_relative(role) || !is_confined_relative(&self.directory(role)) {
                return Err(invalid(format!(
                    "pipeline role '{role}' must resolve to a directory inside the package"
                )));
            }
        }

        if let Some(main) = self.plugin.as_ref().and_then(|p| p.main.as_ref()) {
            if !is_confined_relative(main) {
                return Err(invalid(format!(
                    "plugin main must be a relative path inside the package: '{main}'"
                )));
            }
        }

        Ok(())
    }

    /// Relative directory for a role, falling back to the conventional default
    pub fn directory(&self, role: &str) -> String {
        if let Some(dir) = self.directories.get(role) {
            return dir.clone();
        }
        DEFAULT_DIRECTORIES
            .iter()
            .find(|(r, _)| *r == role)
            .map_or_else(|| role.to_string(), |(_, dir)| (*dir).to_string())
    }

    /// Directory roles in search order: pipeline libs first (declared order),
    /// then every other known role alphabetically
    pub fn directory_roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for role in &self.pipeline_libs {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }

        let mut others: Vec<&str> = self
            .directories
            .keys()
            .map(String::as_str)
            .chain(DEFAULT_DIRECTORIES.iter().map(|(role, _)| *role))
            .filter(|role| !roles.iter().any(|r| r == role))
            .collect();
        others.sort_unstable();
        others.dedup();

        roles.extend(others.into_iter().map(str::to_string));
        roles
    }

    pub fn plugin_role(&self) -> Option<PluginRole> {
        self.plugin.as_ref().map(|p| p.role)
    }

    /// Required and optional dependency names, sorted and unique
    pub fn dependency_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .dependencies
            .keys()
            .chain(self.optional_dependencies.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// The full manifest as JSON, as handed to plugins
    pub fn package_info(&self) -> Value {
        serde_json::to_value(self.to_data()).unwrap_or(Value::Null)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.to_data())?;
        json.push('\n');
        Ok(json)
    }

    /// Write the manifest back to `dir/package.json`
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let content = self.to_json_pretty()?;
        let tmp_path = dir.join(format!("{MANIFEST_FILE}.tmp"));

        fs::write(&tmp_path, content).map_err(|e| BpmError::FileWriteFailed {
            path: tmp_path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| BpmError::FileWriteFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Package names double as directory names and logical path segments
pub fn is_valid_package_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
}

/// Relative path made only of normal segments (no root, no `..`)
pub fn is_confined_relative(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
