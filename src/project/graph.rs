//! The installed package graph of a project
//!
//! Built once per command from the project's manifest and the packages on
//! disk; immutable afterwards.

use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

use super::Project;
use crate::error::{BpmError, Result, install};
use crate::manifest::{PackageDescriptor, PluginRole};

/// A package descriptor bound to its on-disk location
#[derive(Debug, Clone)]
pub struct ResolvedPackage {
    pub descriptor: PackageDescriptor,
    pub root: PathBuf,
}

impl ResolvedPackage {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn plugin_role(&self) -> Option<PluginRole> {
        self.descriptor.plugin_role()
    }
}

#[derive(Debug, Clone)]
pub struct PackageGraph {
    project_name: String,
    project_deps: Vec<String>,
    packages: BTreeMap<String, ResolvedPackage>,
    /// Direct dependencies of each package that are present in the graph
    edges: BTreeMap<String, Vec<String>>,
}

impl PackageGraph {
    /// Walk the project's dependencies transitively over installed packages
    pub fn load(project: &Project) -> Result<Self> {
        let mut packages: BTreeMap<String, ResolvedPackage> = BTreeMap::new();
        let mut declared: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut queue: VecDeque<(String, bool)> = VecDeque::new();

        let project_descriptor = project.descriptor();
        enqueue_dependencies(project_descriptor, &mut queue);
        let project_declared = project_descriptor.dependency_names();

        while let Some((name, optional)) = queue.pop_front() {
            if packages.contains_key(&name) {
                continue;
            }
            let Some(root) = project.package_root(&name) else {
                if optional {
                    continue;
                }
                return Err(install::not_installed(&name));
            };

            let descriptor = PackageDescriptor::load(&root)?;
            if descriptor.name != name {
                return Err(BpmError::InvalidManifest {
                    path: root.join("package.json").display().to_string(),
                    reason: format!("expected package '{name}', found '{}'", descriptor.name),
                });
            }

            enqueue_dependencies(&descriptor, &mut queue);
            declared.insert(name.clone(), descriptor.dependency_names());
            packages.insert(name, ResolvedPackage { descriptor, root });
        }

        let present = |names: Vec<String>| -> Vec<String> {
            names
                .into_iter()
                .filter(|n| packages.contains_key(n))
                .collect()
        };
        let project_deps = present(project_declared);
        let edges = declared
            .into_iter()
            .map(|(name, deps)| (name, present(deps)))
            .collect();

        Ok(Self {
            project_name: project.name().to_string(),
            project_deps,
            packages,
            edges,
        })
    }

    pub fn package_named(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.get(name)
    }

    /// All packages sorted by name
    pub fn packages(&self) -> impl Iterator<Item = &ResolvedPackage> {
        self.packages.values()
    }

    /// Split `pkg/sub/path` into the package and the remaining module id
    pub fn package_for_module_path<'p>(
        &self,
        logical_path: &'p str,
    ) -> Option<(&ResolvedPackage, &'p str)> {
        let (first, rest) = logical_path.split_once('/')?;
        self.packages.get(first).map(|package| (package, rest))
    }

    /// Direct dependencies of `owner` (`None` = the project) present in the graph
    pub fn dependencies_of(&self, owner: Option<&str>) -> Vec<&ResolvedPackage> {
        let names = match owner {
            None => Some(&self.project_deps),
            Some(name) => self.edges.get(name),
        };
        names
            .into_iter()
            .flatten()
            .filter_map(|name| self.packages.get(name))
            .collect()
    }

    /// The single transport plugin among `owner`'s direct dependencies
    pub fn transport_plugin(&self, owner: Option<&str>) -> Result<Option<&ResolvedPackage>> {
        let candidates: Vec<&ResolvedPackage> = self
            .dependencies_of(owner)
            .into_iter()
            .filter(|p| p.plugin_role() == Some(PluginRole::Transport))
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(BpmError::MultipleTransportPlugins {
                package: owner.unwrap_or(&self.project_name).to_string(),
                count: many.len(),
            }),
        }
    }

    /// The single minifier plugin anywhere in the graph
    pub fn minifier_plugin(&self) -> Result<Option<&ResolvedPackage>> {
        let candidates: Vec<&ResolvedPackage> = self
            .packages
            .values()
            .filter(|p| p.plugin_role() == Some(PluginRole::Minifier))
            .collect();

        match candidates.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(BpmError::MultipleMinifierPlugins { count: many.len() }),
        }
    }
}

fn enqueue_dependencies(descriptor: &PackageDescriptor, queue: &mut VecDeque<(String, bool)>) {
    for name in descriptor.dependencies.keys() {
        queue.push_back((name.clone(), false));
    }
    for name in descriptor.optional_dependencies.keys() {
        if !descriptor.dependencies.contains_key(name) {
            queue.push_back((name.clone(), true));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{create_temp_dir, manifest_json, write_package};
    use std::path::Path;

    fn plugin_package(dir: &Path, name: &str, role: &str) {
        write_package(
            dir,
            &format!(r#"{{"name": "{name}", "version": "1.0.0", "plugin": "{role}"}}"#),
            &[],
        );
    }

    fn store(root: &Path, name: &str) -> PathBuf {
        root.join(".bpm/packages").join(name)
    }

    #[test]
    fn test_load_walks_transitive_dependencies() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("a", "*")]), &[]);
        write_package(
            &store(temp.path(), "a"),
            &manifest_json("a", "1.0.0", &[("b", "*")]),
            &[],
        );
        write_package(&store(temp.path(), "b"), &manifest_json("b", "2.0.0", &[]), &[]);

        let project = Project::open(temp.path()).unwrap();
        let graph = PackageGraph::load(&project).unwrap();
        assert_eq!(graph.packages().count(), 2);
        assert_eq!(
            graph.package_named("b").unwrap().descriptor.version.to_string(),
            "2.0.0"
        );
        let deps: Vec<&str> = graph.dependencies_of(Some("a")).iter().map(|p| p.name()).collect();
        assert_eq!(deps, vec!["b"]);
        let project_deps: Vec<&str> = graph.dependencies_of(None).iter().map(|p| p.name()).collect();
        assert_eq!(project_deps, vec!["a"]);
    }

    #[test]
    fn test_missing_required_package_fails() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("rake", "*")]), &[]);
        let project = Project::open(temp.path()).unwrap();
        let err = PackageGraph::load(&project).unwrap_err();
        assert!(matches!(err, BpmError::PackageNotInstalled { .. }));
    }

    #[test]
    fn test_missing_optional_package_skipped() {
        let temp = create_temp_dir();
        write_package(
            temp.path(),
            r#"{"name": "app", "version": "1.0.0", "optionalDependencies": {"ivory": "*"}}"#,
            &[],
        );
        let project = Project::open(temp.path()).unwrap();
        let graph = PackageGraph::load(&project).unwrap();
        assert!(graph.packages().next().is_none());
    }

    #[test]
    fn test_package_for_module_path() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("rake", "*")]), &[]);
        write_package(&store(temp.path(), "rake"), &manifest_json("rake", "0.8.7", &[]), &[]);
        let graph = PackageGraph::load(&Project::open(temp.path()).unwrap()).unwrap();

        let (package, module_id) = graph.package_for_module_path("rake/tasks/main").unwrap();
        assert_eq!(package.name(), "rake");
        assert_eq!(module_id, "tasks/main");
        assert!(graph.package_for_module_path("other/main").is_none());
    }

    #[test]
    fn test_transport_plugin_selection() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("lib1", "*")]), &[]);
        write_package(
            &store(temp.path(), "lib1"),
            &manifest_json("lib1", "1.0.0", &[("transport", "*")]),
            &[],
        );
        plugin_package(&store(temp.path(), "transport"), "transport", "transport");

        let graph = PackageGraph::load(&Project::open(temp.path()).unwrap()).unwrap();
        assert_eq!(
            graph.transport_plugin(Some("lib1")).unwrap().unwrap().name(),
            "transport"
        );
        assert!(graph.transport_plugin(None).unwrap().is_none());
        assert!(graph.transport_plugin(Some("transport")).unwrap().is_none());
    }

    #[test]
    fn test_two_transport_plugins_fail() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("lib1", "*")]), &[]);
        write_package(
            &store(temp.path(), "lib1"),
            &manifest_json("lib1", "1.0.0", &[("t1", "*"), ("t2", "*")]),
            &[],
        );
        plugin_package(&store(temp.path(), "t1"), "t1", "transport");
        plugin_package(&store(temp.path(), "t2"), "t2", "transport");

        let graph = PackageGraph::load(&Project::open(temp.path()).unwrap()).unwrap();
        let err = graph.transport_plugin(Some("lib1")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "lib1 depends on 2 packages that define transport plugins"
        );
    }

    #[test]
    fn test_minifier_plugin_scans_whole_graph() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("app", "1.0.0", &[("a", "*")]), &[]);
        write_package(
            &store(temp.path(), "a"),
            &manifest_json("a", "1.0.0", &[("uglify-js", "*")]),
            &[],
        );
        plugin_package(&store(temp.path(), "uglify-js"), "uglify-js", "minifier");

        let graph = PackageGraph::load(&Project::open(temp.path()).unwrap()).unwrap();
        assert_eq!(graph.minifier_plugin().unwrap().unwrap().name(), "uglify-js");
    }

    #[test]
    fn test_two_minifiers_fail() {
        let temp = create_temp_dir();
        write_package(
            temp.path(),
            &manifest_json("app", "1.0.0", &[("m1", "*"), ("m2", "*")]),
            &[],
        );
        plugin_package(&store(temp.path(), "m1"), "m1", "minifier");
        plugin_package(&store(temp.path(), "m2"), "m2", "minifier");

        let graph = PackageGraph::load(&Project::open(temp.path()).unwrap()).unwrap();
        assert!(matches!(
            graph.minifier_plugin(),
            Err(BpmError::MultipleMinifierPlugins { count: 2 })
        ));
    }
}
