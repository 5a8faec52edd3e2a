//! Common test utilities for bpm integration tests
//!
//! Every test gets its own temp directory holding a directory registry, a
//! user config location and whatever project the test needs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use tempfile::TempDir;

/// A scratch area with a registry and room for projects
pub struct TestEnv {
    pub temp: TempDir,
    /// Directory registry served to bpm via `--registry`
    pub registry: PathBuf,
    /// Where projects live
    pub home: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let registry = temp.path().join("registry");
        let home = temp.path().join("home");
        std::fs::create_dir_all(registry.join("index")).expect("Failed to create registry");
        std::fs::create_dir_all(registry.join("archives")).expect("Failed to create registry");
        std::fs::create_dir_all(&home).expect("Failed to create home");
        Self {
            temp,
            registry,
            home,
        }
    }

    /// The registry every original fixture test expects
    pub fn with_standard_registry() -> Self {
        let env = Self::new();
        env.publish(&Package::new("rake", "0.8.6"));
        env.publish(&Package::new("rake", "0.8.7"));
        env.publish(&Package::new("builder", "3.0.0"));
        env.publish(&Package::new("bundler", "1.1.pre"));
        env.publish(&Package::new("spade", "0.5.0"));
        env.publish(&Package::new("optparse", "1.0.1"));
        env.publish(&Package::new("ivory", "0.0.1"));
        env.publish(
            &Package::new("core-test", "0.4.9")
                .dependency("spade", ">= 0.5.0")
                .dependency("optparse", "1.0.1")
                .optional("ivory", "0.0.1")
                .manifest_field("directories", json!({"css": "resources"}))
                .file("resources/runner.css", ".runner { color: red; }\n"),
        );
        env
    }

    /// Add one version to the registry index and store its archive
    pub fn publish(&self, package: &Package) {
        let index_path = self.registry.join("index").join(format!("{}.json", package.name));
        let mut index: Value = std::fs::read_to_string(&index_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_else(|| json!({"versions": []}));

        let mut entry = json!({"version": package.version});
        if !package.dependencies.is_empty() {
            entry["dependencies"] = Value::Object(package.dependencies.clone());
        }
        if !package.optional.is_empty() {
            entry["optionalDependencies"] = Value::Object(package.optional.clone());
        }
        index["versions"]
            .as_array_mut()
            .expect("versions array")
            .push(entry);
        std::fs::write(&index_path, index.to_string()).expect("Failed to write index");

        let archive = self
            .registry
            .join("archives")
            .join(format!("{}-{}.tgz", package.name, package.version));
        std::fs::write(archive, package.archive()).expect("Failed to write archive");
    }

    /// Create a project directory under `home`
    pub fn project(&self, name: &str, manifest: &Value) -> PathBuf {
        let root = self.home.join(name);
        write_file(&root.join("package.json"), &manifest.to_string());
        root
    }

    /// The hello_world fixture project: one fetched and one vendored dependency
    pub fn hello_world(&self) -> PathBuf {
        let root = self.project(
            "hello_world",
            &json!({
                "name": "hello_world",
                "version": "2.0.0",
                "dependencies": {"core-test": "0.4.9", "custom_package": "2.0.0"}
            }),
        );
        write_file(&root.join("lib/main.js"), "hello_world();\n");
        write_file(&root.join("css/dummy.css"), ".dummy { }\n");
        write_file(&root.join("assets/papa-smurf.jpg"), "not really a jpeg");

        let custom = root.join("packages/custom_package");
        write_file(
            &custom.join("package.json"),
            &json!({
                "name": "custom_package",
                "version": "2.0.0",
                "directories": {"custom": "custom_dir"},
                "pipeline": ["lib", "custom"]
            })
            .to_string(),
        );
        write_file(
            &custom.join("lib/main.js"),
            "//= require custom_package/basic-module\ncustom_package();\n",
        );
        write_file(&custom.join("custom_dir/basic-module.js"), "basic_module();\n");
        write_file(&custom.join("css/sample_styles.css"), ".sample { }\n");
        write_file(&custom.join("assets/dummy.txt"), "dummy\n");
        root
    }

    /// `bpm` isolated from the developer's config and environment
    #[allow(deprecated)]
    pub fn bpm(&self) -> Command {
        let mut cmd = Command::cargo_bin("bpm").expect("bpm binary");
        cmd.env("BPM_CONFIG", self.temp.path().join("no-config.yaml"));
        cmd.env_remove("BPM_REGISTRY");
        cmd.env_remove("BPM_JOBS");
        cmd.env_remove("BPM_PROJECT");
        cmd.env_remove("BPM_SCRIPT_ENGINE");
        cmd.arg("--registry").arg(&self.registry);
        cmd
    }

    /// Whether `<dir>/.bpm/packages/<name>` holds `version`
    pub fn is_installed(dir: &Path, name: &str, version: &str) -> bool {
        let manifest = dir.join(".bpm/packages").join(name).join("package.json");
        std::fs::read_to_string(manifest)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .is_some_and(|value| value["version"] == version)
    }
}

/// A package version to publish
pub struct Package {
    pub name: String,
    pub version: String,
    dependencies: serde_json::Map<String, Value>,
    optional: serde_json::Map<String, Value>,
    extra: serde_json::Map<String, Value>,
    files: Vec<(String, String)>,
}

impl Package {
    /// A package with a single `lib/main.js`
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            dependencies: serde_json::Map::new(),
            optional: serde_json::Map::new(),
            extra: serde_json::Map::new(),
            files: vec![("lib/main.js".to_string(), format!("{}();\n", name.replace('-', "_")))],
        }
    }

    pub fn dependency(mut self, name: &str, constraint: &str) -> Self {
        self.dependencies
            .insert(name.to_string(), Value::String(constraint.to_string()));
        self
    }

    pub fn optional(mut self, name: &str, constraint: &str) -> Self {
        self.optional
            .insert(name.to_string(), Value::String(constraint.to_string()));
        self
    }

    pub fn manifest_field(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    fn manifest(&self) -> String {
        let mut manifest = json!({"name": self.name, "version": self.version});
        if !self.dependencies.is_empty() {
            manifest["dependencies"] = Value::Object(self.dependencies.clone());
        }
        if !self.optional.is_empty() {
            manifest["optionalDependencies"] = Value::Object(self.optional.clone());
        }
        for (key, value) in &self.extra {
            manifest[key] = value.clone();
        }
        manifest.to_string()
    }

    /// Gzip-compressed tar of the manifest and files
    fn archive(&self) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let manifest = self.manifest();
        let entries = std::iter::once(("package.json", manifest.as_str()))
            .chain(self.files.iter().map(|(p, c)| (p.as_str(), c.as_str())));

        for (path, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder
                .append_data(&mut header, path, content.as_bytes())
                .expect("append tar entry");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip")
    }
}

pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    std::fs::write(path, content).expect("Failed to write file");
}

pub fn read_file(path: &Path) -> String {
    std::fs::read_to_string(path).expect("Failed to read file")
}
