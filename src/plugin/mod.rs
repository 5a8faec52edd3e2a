//! Build plugins
//!
//! A package becomes a plugin by declaring `"plugin": "transport"` or
//! `"plugin": "minifier"` in its manifest. Transports rewrite each script
//! module of the packages that depend on them; the minifier rewrites whole
//! script bundles in production builds.

pub mod engine;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use walkdir::WalkDir;

use crate::error::{BpmError, Result};
use crate::manifest::PackageDescriptor;
use crate::pipeline::asset::{canonical_root, confine};
use crate::project::{PackageGraph, ResolvedPackage};

pub use engine::{PluginScript, ProcessEngine, ScriptEngine};

/// Entry point every transport plugin defines
pub const TRANSPORT_ENTRY: &str = "compileTransport";

/// Entry point every minifier plugin defines
pub const MINIFY_ENTRY: &str = "minify";

/// One module handed to a transport
#[derive(Debug, Clone, Copy)]
pub struct TransportInput<'a> {
    /// Owning package, `None` for the project's own modules
    pub owner: Option<&'a str>,
    pub owner_descriptor: &'a PackageDescriptor,
    pub module_id: &'a str,
    pub path: &'a Path,
    /// Digest of the module source; together with the path it keys the
    /// memo of transported bodies
    pub digest: &'a str,
    pub body: &'a str,
}

/// Applies transport and minifier plugins during a build.
///
/// Plugin sources are read once per plugin and shared by every call.
pub struct PluginStage<'a> {
    engine: &'a dyn ScriptEngine,
    scripts: Mutex<HashMap<String, Arc<PluginScript>>>,
    /// `(plugin, module path, source digest)` to transported body
    transported: Mutex<HashMap<(String, PathBuf, String), String>>,
}

impl<'a> PluginStage<'a> {
    pub fn new(engine: &'a dyn ScriptEngine) -> Self {
        Self {
            engine,
            scripts: Mutex::new(HashMap::new()),
            transported: Mutex::new(HashMap::new()),
        }
    }

    /// Sources of `plugin`: pipeline-lib `.js` files in sorted path order,
    /// then its `main` file if it names one
    pub fn load_script(&self, plugin: &ResolvedPackage) -> Result<Arc<PluginScript>> {
        if let Some(script) = self.cached(plugin.name()) {
            return Ok(script);
        }

        let descriptor = &plugin.descriptor;
        let root = canonical_root(&plugin.root)?;
        let mut files = Vec::new();
        for role in &descriptor.pipeline_libs {
            let relative = descriptor.directory(role);
            let dir = plugin.root.join(&relative);
            if !dir.is_dir() {
                continue;
            }
            let dir = confine(&root, &dir, &format!("{}/{relative}", plugin.name()))?;
            let mut role_files: Vec<_> = WalkDir::new(&dir)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| {
                    e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "js")
                })
                .map(walkdir::DirEntry::into_path)
                .collect();
            role_files.sort();
            files.extend(role_files);
        }
        if let Some(main) = descriptor.plugin.as_ref().and_then(|p| p.main.as_ref()) {
            let main = confine(
                &root,
                &plugin.root.join(main),
                &format!("{}/{main}", plugin.name()),
            )?;
            if !files.contains(&main) {
                files.push(main);
            }
        }

        let sources = files
            .into_iter()
            .map(|path| {
                let source = fs::read_to_string(&path).map_err(|e| BpmError::FileReadFailed {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                Ok((path, source))
            })
            .collect::<Result<Vec<_>>>()?;

        let script = Arc::new(PluginScript {
            plugin: plugin.name().to_string(),
            sources,
        });
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts
                .entry(plugin.name().to_string())
                .or_insert_with(|| Arc::clone(&script));
        }
        Ok(script)
    }

    fn cached(&self, name: &str) -> Option<Arc<PluginScript>> {
        self.scripts
            .lock()
            .ok()
            .and_then(|scripts| scripts.get(name).cloned())
    }

    /// Run the owner's transport over one script module.
    ///
    /// Returns the body unchanged when the owner depends on no transport. A
    /// module with an unchanged source is transported once per stage.
    pub fn transport(&self, graph: &PackageGraph, input: TransportInput<'_>) -> Result<String> {
        let Some(plugin) = graph.transport_plugin(input.owner)? else {
            return Ok(input.body.to_string());
        };

        let key = (
            plugin.name().to_string(),
            input.path.to_path_buf(),
            input.digest.to_string(),
        );
        if let Some(body) = self
            .transported
            .lock()
            .ok()
            .and_then(|memo| memo.get(&key).cloned())
        {
            return Ok(body);
        }

        let script = self.load_script(plugin)?;
        let args = [
            Value::String(input.body.to_string()),
            input.owner_descriptor.package_info(),
            Value::String(input.module_id.to_string()),
            Value::String(input.path.display().to_string()),
        ];
        let mut out = self.engine.invoke(&script, TRANSPORT_ENTRY, &args)?;
        out.push_str("\n\n");
        if let Ok(mut memo) = self.transported.lock() {
            memo.insert(key, out.clone());
        }
        Ok(out)
    }

    /// Minify a finished script bundle, keeping the original text between
    /// the markers
    pub fn minify(&self, graph: &PackageGraph, project_info: &Value, text: &str) -> Result<String> {
        let Some(plugin) = graph.minifier_plugin()? else {
            return Ok(text.to_string());
        };

        let script = self.load_script(plugin)?;
        let args = [Value::String(text.to_string()), project_info.clone()];
        let minified = self.engine.invoke(&script, MINIFY_ENTRY, &args)?;
        Ok(format!(
            "//MINIFIED START\n{}\n{text}\n//MINIFIED END\n",
            minified.trim_end_matches('\n')
        ))
    }
}
