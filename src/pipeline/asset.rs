//! Logical asset paths and their resolution to files
//!
//! A logical path is slash-separated and package-qualified:
//! `rake/tasks/main.js` names `tasks/main.js` inside package `rake`. Paths
//! whose first segment is neither the project nor an installed package are
//! looked up in the project itself.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use walkdir::WalkDir;

use crate::error::{BpmError, Result, build};
use crate::hash;
use crate::manifest::PackageDescriptor;
use crate::project::{PackageGraph, Project, ResolvedPackage};

/// Bundle flavour: decides the default extension of extensionless paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Script,
    Style,
}

impl AssetKind {
    pub fn extension(self) -> &'static str {
        match self {
            AssetKind::Script => "js",
            AssetKind::Style => "css",
        }
    }

    fn matches(self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension())
    }
}

/// One resolved source file; immutable once read
#[derive(Debug)]
pub struct Asset {
    /// `<owner>/<path under the owner root>`
    pub logical_path: String,
    /// Owning package, `None` for the project's own files
    pub owner: Option<String>,
    /// Path under its directory role, extension stripped
    pub module_id: String,
    pub path: PathBuf,
    pub content: String,
    digest: OnceLock<String>,
}

impl Asset {
    /// BLAKE3 digest of the content, computed on first use
    pub fn digest(&self) -> &str {
        self.digest
            .get_or_init(|| hash::hash_bytes(self.content.as_bytes()))
    }

    /// Logical directory used to resolve `./` and `../` requires
    pub fn logical_dir(&self) -> &str {
        self.logical_path
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir)
    }
}

/// Normalise a requested path relative to `base_dir`.
///
/// Only paths starting with `./` or `../` are relative; `..` may not climb
/// above the top of the logical namespace.
pub fn join_logical(base_dir: &str, requested: &str) -> Result<String> {
    let relative = requested.starts_with("./") || requested.starts_with("../");
    let mut segments: Vec<&str> = if relative {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    } else {
        Vec::new()
    };

    for segment in requested.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(BpmError::PathEscapesRoot {
                        path: requested.to_string(),
                    });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(build::asset_not_found(requested));
    }
    Ok(segments.join("/"))
}

/// Maps logical paths onto files of the project and its installed packages
pub struct AssetResolver<'a> {
    project: &'a Project,
    graph: &'a PackageGraph,
    project_root: PathBuf,
}

/// Where a logical path is looked up
struct Scope<'a> {
    owner: Option<&'a str>,
    owner_name: &'a str,
    root: &'a Path,
    descriptor: &'a PackageDescriptor,
}

fn scope_of(package: &ResolvedPackage) -> Scope<'_> {
    Scope {
        owner: Some(package.name()),
        owner_name: package.name(),
        root: &package.root,
        descriptor: &package.descriptor,
    }
}

impl<'a> AssetResolver<'a> {
    pub fn new(project: &'a Project, graph: &'a PackageGraph) -> Self {
        Self {
            project,
            graph,
            project_root: project.root().to_path_buf(),
        }
    }

    fn project_scope(&self) -> Scope<'_> {
        Scope {
            owner: None,
            owner_name: self.project.name(),
            root: &self.project_root,
            descriptor: self.project.descriptor(),
        }
    }

    fn package_scope(&self, name: &str) -> Option<Scope<'_>> {
        self.graph.package_named(name).map(scope_of)
    }

    /// Split a logical path into its scope and the remainder
    fn scope_for<'p>(&self, logical_path: &'p str) -> (Scope<'_>, &'p str) {
        if let Some(rest) = logical_path
            .strip_prefix(self.project.name())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return (self.project_scope(), rest);
        }
        match self.graph.package_for_module_path(logical_path) {
            Some((package, rest)) => (scope_of(package), rest),
            None => (self.project_scope(), logical_path),
        }
    }

    /// Resolve one logical path to an asset
    pub fn resolve(&self, logical_path: &str, kind: AssetKind) -> Result<Asset> {
        let (scope, rest) = self.scope_for(logical_path);
        let root = canonical_root(scope.root)?;

        let mut candidates: Vec<(PathBuf, Option<PathBuf>)> = Vec::new();
        for role in scope.descriptor.directory_roles() {
            let role_dir = scope.root.join(scope.descriptor.directory(&role));
            candidates.push((role_dir.join(rest), Some(role_dir)));
        }
        candidates.push((scope.root.join(rest), None));

        for (candidate, role_dir) in candidates {
            for path in with_extension_fallback(&candidate, kind) {
                if !path.is_file() {
                    continue;
                }
                let canonical = confine(&root, &path, logical_path)?;
                let module_base = role_dir
                    .map(|dir| canonical_root(&dir))
                    .transpose()?
                    .unwrap_or_else(|| root.clone());
                return load_asset(&scope, &root, &module_base, canonical);
            }
        }

        Err(build::asset_not_found(logical_path))
    }

    /// Every file of `kind` under a logical directory, in sorted path order
    pub fn resolve_tree(&self, logical_dir: &str, kind: AssetKind) -> Result<Vec<Asset>> {
        let (scope, rest) = self.scope_for(logical_dir);
        let root = canonical_root(scope.root)?;

        let mut candidates: Vec<(PathBuf, PathBuf)> = Vec::new();
        for role in scope.descriptor.directory_roles() {
            let role_dir = scope.root.join(scope.descriptor.directory(&role));
            candidates.push((role_dir.join(rest), role_dir));
        }
        candidates.push((scope.root.join(rest), scope.root.to_path_buf()));

        for (dir, role_dir) in candidates {
            if !dir.is_dir() {
                continue;
            }
            let canonical_dir = confine(&root, &dir, logical_dir)?;
            let module_base = canonical_root(&role_dir)?;
            return files_under(&scope, &root, &module_base, &canonical_dir, kind);
        }

        Err(build::asset_not_found(logical_dir))
    }

    /// Files of `kind` under the directory role `role` of `owner`
    /// (`None` = the project), in sorted path order
    pub fn role_files(&self, owner: Option<&str>, role: &str, kind: AssetKind) -> Result<Vec<Asset>> {
        let scope = match owner {
            None => self.project_scope(),
            Some(name) => self
                .package_scope(name)
                .ok_or_else(|| crate::error::install::not_installed(name))?,
        };
        let root = canonical_root(scope.root)?;
        let dir = scope.root.join(scope.descriptor.directory(role));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let canonical_dir = confine(&root, &dir, &format!("{}/{role}", scope.owner_name))?;
        files_under(&scope, &root, &canonical_dir, &canonical_dir, kind)
    }
}

fn files_under(
    scope: &Scope<'_>,
    root: &Path,
    module_base: &Path,
    dir: &Path,
    kind: AssetKind,
) -> Result<Vec<Asset>> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file() && kind.matches(e.path()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    files.sort();

    files
        .into_iter()
        .map(|path| {
            let logical = format!("{}/{}", scope.owner_name, relative_slash(root, &path));
            let canonical = confine(root, &path, &logical)?;
            load_asset(scope, root, module_base, canonical)
        })
        .collect()
}

fn load_asset(
    scope: &Scope<'_>,
    root: &Path,
    module_base: &Path,
    path: PathBuf,
) -> Result<Asset> {
    let content = fs::read_to_string(&path).map_err(|e| BpmError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let under_role = if path.starts_with(module_base) {
        relative_slash(module_base, &path)
    } else {
        relative_slash(root, &path)
    };
    let module_id = strip_extension(&under_role);

    Ok(Asset {
        logical_path: format!("{}/{}", scope.owner_name, relative_slash(root, &path)),
        owner: scope.owner.map(str::to_string),
        module_id,
        path,
        content,
        digest: OnceLock::new(),
    })
}

pub(crate) fn canonical_root(root: &Path) -> Result<PathBuf> {
    dunce::canonicalize(root).map_err(|e| BpmError::FileReadFailed {
        path: root.display().to_string(),
        reason: e.to_string(),
    })
}

/// Canonicalise `path` and require it to stay inside `root`
pub(crate) fn confine(root: &Path, path: &Path, logical: &str) -> Result<PathBuf> {
    let canonical = dunce::canonicalize(path).map_err(|e| BpmError::FileReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        Err(BpmError::PathEscapesRoot {
            path: logical.to_string(),
        })
    }
}

fn with_extension_fallback(candidate: &Path, kind: AssetKind) -> Vec<PathBuf> {
    let mut paths = vec![candidate.to_path_buf()];
    if candidate.extension().is_none() {
        paths.push(candidate.with_extension(kind.extension()));
    }
    paths
}

fn relative_slash(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn strip_extension(path: &str) -> String {
    match path.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !stem.ends_with('/') && !ext.contains('/') => {
            stem.to_string()
        }
        _ => path.to_string(),
    }
}
