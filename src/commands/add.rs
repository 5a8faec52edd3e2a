//! Add command implementation
//!
//! Fetches a package together with the rest of the project's dependencies,
//! so the new one is resolved against everything already required, then
//! records it in the project's package.json.

use crate::cli::{AddArgs, GlobalArgs};
use crate::commands::helpers::{self, FetchReport, install_resolution};
use crate::error::{Result, resolve};
use crate::installer::FetchInstaller;
use crate::project::Project;
use crate::registry::{self, Registry};
use crate::resolver::{Resolver, RootRequest};
use crate::ui::Reporter;
use crate::version::{Constraint, PackageVersion};

/// Run add command
pub fn run(global: &GlobalArgs, args: AddArgs) -> Result<()> {
    let config = helpers::load_config(global)?;
    let registry = registry::open(&config);
    let reporter = helpers::reporter(global);
    let mut project = helpers::open_project(global)?;

    let constraint = args.version.as_deref().map(Constraint::parse).transpose()?;
    add_package(
        &mut project,
        registry.as_ref(),
        &args.name,
        constraint,
        args.pre,
        config.jobs,
        &reporter,
    )?;
    Ok(())
}

/// Install `name` and record it as a dependency; returns the installed version
pub fn add_package(
    project: &mut Project,
    registry: &dyn Registry,
    name: &str,
    constraint: Option<Constraint>,
    pre: bool,
    jobs: usize,
    reporter: &dyn Reporter,
) -> Result<PackageVersion> {
    let requested = constraint.clone().unwrap_or_default();
    let mut roots: Vec<RootRequest> = project
        .root_requests()?
        .into_iter()
        .filter(|root| root.name != name)
        .collect();
    roots.push(RootRequest::new(name, requested.clone()).prerelease(pre));

    let resolution = Resolver::new(registry).resolve(&roots)?;
    let version = resolution
        .get(name)
        .map(|resolved| resolved.version.clone())
        .ok_or_else(|| resolve::package_not_found(name, requested.to_string()))?;

    let installer = FetchInstaller::new(registry, project.layout().clone());
    let mut report = FetchReport::default();
    install_resolution(&installer, &resolution, jobs, reporter, &mut report)?;
    report.into_result()?;

    let recorded = constraint.unwrap_or_else(|| Constraint::at_least(version.clone()));
    let descriptor = project.descriptor_mut();
    descriptor.optional_dependencies.remove(name);
    descriptor.dependencies.insert(name.to_string(), recorded);
    project.save()?;

    reporter.success(&format!("Added {name} ({version})"));
    Ok(version)
}
