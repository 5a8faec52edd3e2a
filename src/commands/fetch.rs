//! Fetch command implementation
//!
//! Without names, installs every dependency of the current project. With
//! names, resolves each package as its own unit so one unknown name does not
//! stop the others; any failed unit still makes the command fail.

use std::path::Path;

use crate::cli::{FetchArgs, GlobalArgs};
use crate::commands::helpers::{self, FetchReport, install_resolution};
use crate::error::{BpmError, Result};
use crate::installer::{FetchInstaller, StoreLayout};
use crate::project::Project;
use crate::registry::{self, Registry};
use crate::resolver::{Resolver, RootRequest};
use crate::ui::Reporter;
use crate::version::Constraint;

/// Run fetch command
pub fn run(global: &GlobalArgs, args: FetchArgs) -> Result<()> {
    let config = helpers::load_config(global)?;
    let registry = registry::open(&config);
    let reporter = helpers::reporter(global);
    reporter.detail(&format!("Using registry {}", registry.describe()));

    let dir = helpers::working_dir(global)?;

    if args.names.is_empty() {
        let project = Project::discover(&dir).map_err(|_| BpmError::InvalidUsage {
            command: "fetch".to_string(),
            message: "name at least one package when not inside a project".to_string(),
        })?;
        return fetch_project(&project, registry.as_ref(), config.jobs, &reporter)?
            .into_result()
            .map(|_| ());
    }

    let constraint = match &args.version {
        Some(input) => Constraint::parse(input)?,
        None => Constraint::any(),
    };
    let roots: Vec<RootRequest> = args
        .names
        .iter()
        .map(|name| RootRequest::new(name.clone(), constraint.clone()).prerelease(args.pre))
        .collect();

    let layout = store_layout_for(&dir);
    fetch_named(&layout, registry.as_ref(), &roots, config.jobs, &reporter)?
        .into_result()
        .map(|_| ())
}

/// The store of the enclosing project, or `<dir>/.bpm` outside a project
fn store_layout_for(dir: &Path) -> StoreLayout {
    match Project::discover(dir) {
        Ok(project) => project.layout().clone(),
        Err(_) => StoreLayout::for_project(dir),
    }
}

/// Resolve the project's dependencies jointly and install them
pub fn fetch_project(
    project: &Project,
    registry: &dyn Registry,
    jobs: usize,
    reporter: &dyn Reporter,
) -> Result<FetchReport> {
    let roots = project.root_requests()?;
    let resolution = Resolver::new(registry).resolve(&roots)?;

    let installer = FetchInstaller::new(registry, project.layout().clone());
    let mut report = FetchReport::default();
    install_resolution(&installer, &resolution, jobs, reporter, &mut report)?;

    if report.failures.is_empty() {
        reporter.success(&format!(
            "Fetched dependent packages for {}",
            project.name()
        ));
    }
    Ok(report)
}

/// Resolve each named root independently, then install the survivors
pub fn fetch_named(
    layout: &StoreLayout,
    registry: &dyn Registry,
    roots: &[RootRequest],
    jobs: usize,
    reporter: &dyn Reporter,
) -> Result<FetchReport> {
    let (resolution, failures) = Resolver::new(registry).resolve_each(roots)?;

    let mut report = FetchReport::default();
    for (name, e) in failures {
        reporter.error(&e.to_string());
        report.failures.push((name, e));
    }

    let installer = FetchInstaller::new(registry, layout.clone());
    install_resolution(&installer, &resolution, jobs, reporter, &mut report)?;
    Ok(report)
}
