//! Version resolution
//!
//! Computes one concrete version per package name satisfying every
//! transitive constraint, or fails.
//!
//! ## Algorithm
//!
//! Resolution is a fixpoint over the requirement set:
//!
//! 1. Collect the root requirements plus the dependency requirements of every
//!    package selected in the previous round that is reachable from the roots.
//! 2. For every collected name pick the highest version that satisfies all of
//!    its requirements.
//! 3. Repeat until the selection stops changing. A name nothing satisfies
//!    only fails the resolve if it is still required at that point.
//!
//! Each round depends only on the requirement *set*, so the result does not
//! depend on the order in which roots were requested.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::error::{BpmError, Result, resolve};
use crate::registry::{Registry, RegistryEntry};
use crate::version::{Constraint, PackageVersion};

/// Rounds after which a still-changing selection is reported as a conflict
const MAX_ROUNDS: usize = 64;

const ROOT_REQUESTER: &str = "(requested)";

/// A package the user asked for directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRequest {
    pub name: String,
    pub constraint: Constraint,
    /// Consider prerelease versions only
    pub prerelease: bool,
    /// Omit instead of failing when unavailable
    pub optional: bool,
}

impl RootRequest {
    pub fn new(name: impl Into<String>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
            prerelease: false,
            optional: false,
        }
    }

    #[must_use]
    pub fn prerelease(mut self, prerelease: bool) -> Self {
        self.prerelease = prerelease;
        self
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }
}

#[derive(Debug, Clone)]
struct Requirement {
    constraint: Constraint,
    prerelease: bool,
    optional: bool,
    requester: String,
}

impl Requirement {
    fn describe(&self) -> String {
        format!("{} requires {}", self.requester, self.constraint)
    }
}

/// Selected version of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub name: String,
    pub version: PackageVersion,
    pub checksum: Option<String>,
    /// Direct dependencies present in the resolution, sorted
    pub dependencies: Vec<String>,
}

/// Outcome of a successful resolve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub packages: BTreeMap<String, ResolvedVersion>,
}

impl Resolution {
    pub fn get(&self, name: &str) -> Option<&ResolvedVersion> {
        self.packages.get(name)
    }

    /// Packages in dependency order: dependencies before their dependents
    pub fn install_order(&self) -> Vec<&ResolvedVersion> {
        let mut order = Vec::with_capacity(self.packages.len());
        let mut visited = BTreeSet::new();
        for name in self.packages.keys() {
            self.visit(name, &mut visited, &mut order);
        }
        order
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        visited: &mut BTreeSet<String>,
        order: &mut Vec<&'a ResolvedVersion>,
    ) {
        if !visited.insert(name.to_string()) {
            return;
        }
        if let Some(package) = self.packages.get(name) {
            for dep in &package.dependencies {
                self.visit(dep, visited, order);
            }
            order.push(package);
        }
    }
}

type Selection = BTreeMap<String, RegistryEntry>;

/// Resolver over a registry snapshot; registry answers are memoised per name
pub struct Resolver<'a> {
    registry: &'a dyn Registry,
    cache: HashMap<String, Vec<RegistryEntry>>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Resolve all roots jointly
    pub fn resolve(&mut self, roots: &[RootRequest]) -> Result<Resolution> {
        let mut selection = Selection::new();
        let mut previous = Selection::new();

        for _ in 0..MAX_ROUNDS {
            let requirements = collect_requirements(roots, &selection);
            let (next, mut failures) = self.select(&requirements)?;
            if next == selection {
                // The first failing name, once no further round can drop its requester
                if let Some((_, e)) = failures.pop_first() {
                    return Err(e);
                }
                return Ok(build_resolution(&selection));
            }
            previous = std::mem::replace(&mut selection, next);
        }

        let oscillating = selection
            .iter()
            .find(|(name, entry)| previous.get(*name) != Some(*entry))
            .map_or_else(
                || roots.first().map(|r| r.name.clone()).unwrap_or_default(),
                |(name, _)| name.clone(),
            );
        Err(resolve::constraint_conflict(
            oscillating,
            &["dependency constraints never settle on one version".to_string()],
        ))
    }

    /// Resolve each root as an independent unit, then the survivors jointly.
    ///
    /// Per-package failures are returned alongside the joint resolution
    /// instead of aborting it.
    pub fn resolve_each(
        &mut self,
        roots: &[RootRequest],
    ) -> Result<(Resolution, Vec<(String, BpmError)>)> {
        let mut survivors = Vec::new();
        let mut failures = Vec::new();

        for root in roots {
            match self.resolve(std::slice::from_ref(root)) {
                Ok(_) => survivors.push(root.clone()),
                Err(e) if e.is_per_package() => failures.push((root.name.clone(), e)),
                Err(e) => return Err(e),
            }
        }

        let resolution = self.resolve(&survivors)?;
        Ok((resolution, failures))
    }

    fn entries(&mut self, name: &str) -> Result<Vec<RegistryEntry>> {
        if let Some(entries) = self.cache.get(name) {
            return Ok(entries.clone());
        }
        let entries = match self.registry.versions(name) {
            Ok(entries) => entries,
            Err(BpmError::PackageNotFound { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };
        self.cache.insert(name.to_string(), entries.clone());
        Ok(entries)
    }

    /// Pick a version per name. Unsatisfiable names are left out of the
    /// selection and reported separately, since a requirement may come from a
    /// version the next round drops.
    fn select(
        &mut self,
        requirements: &BTreeMap<String, Vec<Requirement>>,
    ) -> Result<(Selection, BTreeMap<String, BpmError>)> {
        let mut selection = Selection::new();
        let mut failures = BTreeMap::new();
        for (name, reqs) in requirements {
            let entries = self.entries(name)?;
            match choose(name, reqs, &entries) {
                Ok(Some(entry)) => {
                    selection.insert(name.clone(), entry);
                }
                Ok(None) => {}
                Err(e) => {
                    failures.insert(name.clone(), e);
                }
            }
        }
        Ok((selection, failures))
    }
}

/// Root requirements plus the dependencies of every selected package
/// reachable from the roots, breadth-first
fn collect_requirements(
    roots: &[RootRequest],
    selection: &Selection,
) -> BTreeMap<String, Vec<Requirement>> {
    let mut requirements: BTreeMap<String, Vec<Requirement>> = BTreeMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();

    let mut root_names: Vec<&RootRequest> = roots.iter().collect();
    root_names.sort_by(|a, b| a.name.cmp(&b.name));

    for root in root_names {
        requirements
            .entry(root.name.clone())
            .or_default()
            .push(Requirement {
                constraint: root.constraint.clone(),
                prerelease: root.prerelease,
                optional: root.optional,
                requester: ROOT_REQUESTER.to_string(),
            });
        if seen.insert(root.name.clone()) {
            queue.push_back(root.name.clone());
        }
    }

    while let Some(name) = queue.pop_front() {
        let Some(entry) = selection.get(&name) else {
            continue;
        };
        let requester = format!("{name} ({})", entry.version);

        let deps = entry
            .dependencies
            .iter()
            .map(|dep| (dep, false))
            .chain(entry.optional_dependencies.iter().map(|dep| (dep, true)));

        for ((dep, constraint), optional) in deps {
            requirements.entry(dep.clone()).or_default().push(Requirement {
                constraint: constraint.clone(),
                prerelease: false,
                optional,
                requester: requester.clone(),
            });
            if seen.insert(dep.clone()) {
                queue.push_back(dep.clone());
            }
        }
    }

    requirements
}

/// Versions a set of requirements may consider at all
fn eligible<'e>(reqs: &[&Requirement], entries: &'e [RegistryEntry]) -> Vec<&'e RegistryEntry> {
    let prerelease_only = reqs.iter().any(|r| r.prerelease);
    let prerelease_allowed = reqs.iter().any(|r| r.constraint.mentions_prerelease());

    entries
        .iter()
        .filter(|e| {
            if prerelease_only {
                e.version.is_prerelease()
            } else {
                prerelease_allowed || !e.version.is_prerelease()
            }
        })
        .collect()
}

fn choose(
    name: &str,
    reqs: &[Requirement],
    entries: &[RegistryEntry],
) -> Result<Option<RegistryEntry>> {
    let all: Vec<&Requirement> = reqs.iter().collect();
    let best = eligible(&all, entries)
        .into_iter()
        .filter(|e| all.iter().all(|r| r.constraint.matches(&e.version)))
        .max_by(|a, b| a.version.cmp(&b.version));

    if let Some(entry) = best {
        return Ok(Some(entry.clone()));
    }
    if reqs.iter().all(|r| r.optional) {
        return Ok(None);
    }
    Err(classify_failure(name, reqs, entries))
}

fn classify_failure(name: &str, reqs: &[Requirement], entries: &[RegistryEntry]) -> BpmError {
    let required: Vec<&Requirement> = reqs.iter().filter(|r| !r.optional).collect();

    if entries.is_empty() {
        let constraint = required
            .first()
            .map(|r| r.constraint.to_string())
            .unwrap_or_default();
        return resolve::package_not_found(name, constraint);
    }

    for req in &required {
        let alone = [*req];
        let satisfiable = eligible(&alone, entries)
            .iter()
            .any(|e| req.constraint.matches(&e.version));
        if !satisfiable {
            return resolve::package_not_found(name, req.constraint.to_string());
        }
    }

    let mut described: Vec<String> = reqs.iter().map(Requirement::describe).collect();
    described.sort();
    resolve::constraint_conflict(name, &described)
}

fn build_resolution(selection: &Selection) -> Resolution {
    let packages = selection
        .iter()
        .map(|(name, entry)| {
            let mut dependencies: Vec<String> = entry
                .dependencies
                .keys()
                .chain(entry.optional_dependencies.keys())
                .filter(|dep| selection.contains_key(*dep))
                .cloned()
                .collect();
            dependencies.sort();
            dependencies.dedup();

            let resolved = ResolvedVersion {
                name: name.clone(),
                version: entry.version.clone(),
                checksum: entry.checksum.clone(),
                dependencies,
            };
            (name.clone(), resolved)
        })
        .collect();
    Resolution { packages }
}
