//! Bundle assembly
//!
//! A bundle is the concatenation of its root modules and everything they
//! require, dependencies first, under a generated header naming every
//! package that contributed a file.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use super::asset::{Asset, AssetKind, AssetResolver, join_logical};
use super::directives::{self, Directive};
use super::BuildMode;
use crate::error::{BpmError, Result, build};
use crate::plugin::{PluginStage, TransportInput};
use crate::project::{PackageGraph, Project};

const PACKAGES_BUNDLE: &str = "bpm_packages";
const STYLES_BUNDLE: &str = "bpm_styles";
const APP_PACKAGE_BUNDLE: &str = "app_package";
const APP_STYLES_BUNDLE: &str = "app_styles";

/// The generated bundles a project can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BundleTarget {
    /// Pipeline libs of every installed package
    Packages,
    /// Styles of every installed package
    Styles,
    /// The project's own pipeline libs
    AppPackage,
    /// The project's own styles
    AppStyles,
}

impl BundleTarget {
    pub fn all() -> [BundleTarget; 4] {
        [
            BundleTarget::Packages,
            BundleTarget::Styles,
            BundleTarget::AppPackage,
            BundleTarget::AppStyles,
        ]
    }

    /// Look a bundle up by name; the extension is optional
    pub fn parse(name: &str, project_name: &str) -> Result<Self> {
        let trimmed = name.strip_prefix("assets/").unwrap_or(name);
        Self::all()
            .into_iter()
            .find(|target| {
                let file = target.file_name(project_name);
                let stem = file
                    .strip_suffix(&format!(".{}", target.kind().extension()))
                    .unwrap_or(&file);
                trimmed == file || trimmed == stem
            })
            .ok_or_else(|| BpmError::UnknownBundle {
                name: name.to_string(),
            })
    }

    pub fn kind(self) -> AssetKind {
        match self {
            BundleTarget::Packages | BundleTarget::AppPackage => AssetKind::Script,
            BundleTarget::Styles | BundleTarget::AppStyles => AssetKind::Style,
        }
    }

    /// Name relative to the assets directory, e.g. `hello_world/app_package.js`
    pub fn file_name(self, project_name: &str) -> String {
        let ext = self.kind().extension();
        match self {
            BundleTarget::Packages => format!("{PACKAGES_BUNDLE}.{ext}"),
            BundleTarget::Styles => format!("{STYLES_BUNDLE}.{ext}"),
            BundleTarget::AppPackage => format!("{project_name}/{APP_PACKAGE_BUNDLE}.{ext}"),
            BundleTarget::AppStyles => format!("{project_name}/{APP_STYLES_BUNDLE}.{ext}"),
        }
    }

    pub fn output_path(self, project: &Project) -> PathBuf {
        project.assets_dir().join(self.file_name(project.name()))
    }

    /// Directory roles whose files seed the bundle, per owner
    fn roots(self, project: &Project, graph: &PackageGraph) -> Vec<(Option<String>, String)> {
        match self {
            BundleTarget::Packages => graph
                .packages()
                .flat_map(|package| {
                    package
                        .descriptor
                        .pipeline_libs
                        .iter()
                        .map(|role| (Some(package.name().to_string()), role.clone()))
                })
                .collect(),
            BundleTarget::Styles => graph
                .packages()
                .map(|package| (Some(package.name().to_string()), "css".to_string()))
                .collect(),
            BundleTarget::AppPackage => project
                .descriptor()
                .pipeline_libs
                .iter()
                .map(|role| (None, role.clone()))
                .collect(),
            BundleTarget::AppStyles => vec![(None, "css".to_string())],
        }
    }
}

/// A rendered bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub text: String,
    pub digest: String,
}

/// Header placed above every bundle body
pub fn header(manifest: &str) -> String {
    format!(
        concat!(
            "/* ===========================================================================\n",
            "   BPM Static Dependencies\n",
            "   MANIFEST: {}\n",
            "   This file is generated automatically by bpm.\n",
            "   To use this file, load this file in your HTML head.\n",
            "   =========================================================================*/\n",
        ),
        manifest
    )
}

/// One module in emit order
struct Emitted {
    asset: Asset,
    body: String,
}

/// A module whose requires are still being walked
struct Frame {
    asset: Asset,
    body: String,
    directives: std::vec::IntoIter<Directive>,
    pending: VecDeque<Asset>,
}

/// Depth-first require walk over one bundle
///
/// Uses an explicit stack so long require chains cannot exhaust the thread stack.
struct Walk<'r, 'a> {
    resolver: &'r AssetResolver<'a>,
    kind: AssetKind,
    visited: HashSet<PathBuf>,
    in_progress: HashSet<PathBuf>,
    stack: Vec<Frame>,
    output: Vec<Emitted>,
}

impl<'r, 'a> Walk<'r, 'a> {
    fn new(resolver: &'r AssetResolver<'a>, kind: AssetKind) -> Self {
        Self {
            resolver,
            kind,
            visited: HashSet::new(),
            in_progress: HashSet::new(),
            stack: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Emit `root` after everything it transitively requires
    fn visit(&mut self, root: Asset) -> Result<()> {
        self.enter(root)?;
        while let Some(frame) = self.stack.last_mut() {
            if let Some(dependency) = frame.pending.pop_front() {
                self.enter(dependency)?;
                continue;
            }
            if let Some(directive) = frame.directives.next() {
                let base = frame.asset.logical_dir().to_string();
                let dependencies = self.dependencies(&base, &directive)?;
                if let Some(frame) = self.stack.last_mut() {
                    frame.pending.extend(dependencies);
                }
                continue;
            }
            if let Some(frame) = self.stack.pop() {
                self.in_progress.remove(&frame.asset.path);
                self.visited.insert(frame.asset.path.clone());
                self.output.push(Emitted {
                    asset: frame.asset,
                    body: frame.body,
                });
            }
        }
        Ok(())
    }

    fn enter(&mut self, asset: Asset) -> Result<()> {
        if self.visited.contains(&asset.path) {
            return Ok(());
        }
        if self.in_progress.contains(&asset.path) {
            return Err(build::cyclic_require(asset.logical_path));
        }
        self.in_progress.insert(asset.path.clone());

        let parsed = directives::parse(&asset.content);
        self.stack.push(Frame {
            asset,
            body: parsed.body,
            directives: parsed.directives.into_iter(),
            pending: VecDeque::new(),
        });
        Ok(())
    }

    fn dependencies(&self, base: &str, directive: &Directive) -> Result<Vec<Asset>> {
        match directive {
            Directive::Require(path) => {
                let logical = join_logical(base, path)?;
                Ok(vec![self.resolver.resolve(&logical, self.kind)?])
            }
            Directive::RequireTree(dir) => {
                let logical = join_logical(base, dir)?;
                self.resolver.resolve_tree(&logical, self.kind)
            }
        }
    }
}

/// Builds bundles for one project
pub struct BundleBuilder<'a> {
    project: &'a Project,
    graph: &'a PackageGraph,
    resolver: AssetResolver<'a>,
    plugins: &'a PluginStage<'a>,
    mode: BuildMode,
}

impl<'a> BundleBuilder<'a> {
    pub fn new(
        project: &'a Project,
        graph: &'a PackageGraph,
        plugins: &'a PluginStage<'a>,
        mode: BuildMode,
    ) -> Self {
        Self {
            project,
            graph,
            resolver: AssetResolver::new(project, graph),
            plugins,
            mode,
        }
    }

    /// Assemble one bundle in memory
    pub fn build(&self, target: BundleTarget) -> Result<Bundle> {
        let kind = target.kind();
        let mut walk = Walk::new(&self.resolver, kind);
        for (owner, role) in target.roots(self.project, self.graph) {
            for asset in self.resolver.role_files(owner.as_deref(), &role, kind)? {
                walk.visit(asset)?;
            }
        }

        let mut text = header(&self.manifest_line(&walk.output));
        text.push('\n');
        for emitted in &walk.output {
            let body = self.transform(&emitted.asset, &emitted.body, kind)?;
            text.push_str(&body);
            if !body.ends_with('\n') {
                text.push('\n');
            }
        }

        if kind == AssetKind::Script && self.mode == BuildMode::Production {
            text = self
                .plugins
                .minify(self.graph, &self.project.descriptor().package_info(), &text)?;
        }

        let digest = crate::hash::hash_bytes(text.as_bytes());
        Ok(Bundle { text, digest })
    }

    fn transform(&self, asset: &Asset, body: &str, kind: AssetKind) -> Result<String> {
        if kind != AssetKind::Script {
            return Ok(body.to_string());
        }
        let owner_descriptor = match asset.owner.as_deref() {
            None => self.project.descriptor(),
            Some(name) => match self.graph.package_named(name) {
                Some(package) => &package.descriptor,
                None => return Ok(body.to_string()),
            },
        };
        self.plugins.transport(
            self.graph,
            TransportInput {
                owner: asset.owner.as_deref(),
                owner_descriptor,
                module_id: &asset.module_id,
                path: &asset.path,
                digest: asset.digest(),
                body,
            },
        )
    }

    /// `name (version)` of every contributing owner, sorted by name
    fn manifest_line(&self, output: &[Emitted]) -> String {
        let mut contributors: BTreeMap<&str, String> = BTreeMap::new();
        for emitted in output {
            match emitted.asset.owner.as_deref() {
                None => {
                    let descriptor = self.project.descriptor();
                    contributors.insert(&descriptor.name, descriptor.version.to_string());
                }
                Some(name) => {
                    if let Some(package) = self.graph.package_named(name) {
                        contributors.insert(package.name(), package.descriptor.version.to_string());
                    }
                }
            }
        }
        contributors
            .iter()
            .map(|(name, version)| format!("{name} ({version})"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Whether `path` already holds exactly `digest`
pub fn is_current(path: &Path, digest: &str) -> Result<bool> {
    Ok(crate::hash::hash_file_if_exists(path)?.is_some_and(|existing| existing == digest))
}
