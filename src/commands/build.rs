//! Build command implementation
//!
//! Builds the requested bundles (all four by default) concurrently and
//! writes the ones whose content changed into `assets/`.

use crate::cli::{BuildArgs, GlobalArgs};
use crate::commands::helpers;
use crate::error::{BpmError, Result};
use crate::pipeline::{self, BuildMode, BundleTarget, WriteStatus};
use crate::plugin::{PluginStage, ProcessEngine};
use crate::project::{PackageGraph, Project};
use crate::ui::Reporter;

/// Run build command
pub fn run(global: &GlobalArgs, args: BuildArgs) -> Result<()> {
    let config = helpers::load_config(global)?;
    let reporter = helpers::reporter(global);
    let project = helpers::open_project(global)?;
    let graph = PackageGraph::load(&project)?;

    let targets = select_targets(&project, &args.bundles)?;
    let engine = ProcessEngine::new(config.script_engine.clone(), config.plugin_timeout());
    let plugins = PluginStage::new(&engine);

    build_project(
        &project,
        &graph,
        &plugins,
        args.mode,
        &targets,
        config.jobs,
        &reporter,
    )
}

/// Bundle targets named on the command line, or every target
pub fn select_targets(project: &Project, names: &[String]) -> Result<Vec<BundleTarget>> {
    if names.is_empty() {
        return Ok(BundleTarget::all().to_vec());
    }
    let mut targets = names
        .iter()
        .map(|name| BundleTarget::parse(name, project.name()))
        .collect::<Result<Vec<_>>>()?;
    targets.sort();
    targets.dedup();
    Ok(targets)
}

pub fn build_project(
    project: &Project,
    graph: &PackageGraph,
    plugins: &PluginStage<'_>,
    mode: BuildMode,
    targets: &[BundleTarget],
    jobs: usize,
    reporter: &dyn Reporter,
) -> Result<()> {
    let outcomes = pipeline::build_all(project, graph, plugins, mode, targets, jobs)?;

    let mut failed = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            Ok(WriteStatus::Written) => {
                reporter.success(&format!("Built assets/{}", outcome.name));
            }
            Ok(WriteStatus::Unchanged) => {
                reporter.detail(&format!("assets/{} is up to date", outcome.name));
            }
            Err(e) => {
                reporter.error(&format!("{}: {e}", outcome.name));
                failed.push(outcome.name);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(BpmError::BuildFailed {
            count: failed.len(),
            failed: failed.join(", "),
        })
    }
}
