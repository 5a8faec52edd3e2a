//! Command helper utilities

use std::path::PathBuf;

use crate::cli::GlobalArgs;
use crate::config::{BpmConfig, ConfigOverrides};
use crate::error::{BpmError, Result};
use crate::installer::{FetchInstaller, InstalledPackage};
use crate::project::Project;
use crate::resolver::Resolution;
use crate::ui::{ConsoleReporter, Reporter};

/// Directory commands operate from: `--project`, else the current directory
pub fn working_dir(global: &GlobalArgs) -> Result<PathBuf> {
    match &global.project {
        Some(path) => Ok(path.clone()),
        None => std::env::current_dir().map_err(|e| BpmError::IoError {
            message: format!("Failed to get current directory: {e}"),
        }),
    }
}

pub fn load_config(global: &GlobalArgs) -> Result<BpmConfig> {
    let overrides = ConfigOverrides {
        registry: global.registry.clone(),
        jobs: global.jobs.map(usize::from),
    };
    BpmConfig::load(&overrides)
}

pub fn reporter(global: &GlobalArgs) -> ConsoleReporter {
    ConsoleReporter::new(global.verbose).quiet(global.quiet)
}

pub fn open_project(global: &GlobalArgs) -> Result<Project> {
    Project::discover(&working_dir(global)?)
}

/// Packages installed by one fetch, plus the units that failed
#[derive(Debug, Default)]
pub struct FetchReport {
    pub installed: Vec<InstalledPackage>,
    pub failures: Vec<(String, BpmError)>,
}

impl FetchReport {
    /// Turn reported failures into the command's exit status
    pub fn into_result(self) -> Result<Vec<InstalledPackage>> {
        if self.failures.is_empty() {
            return Ok(self.installed);
        }
        let names: Vec<&str> = self.failures.iter().map(|(name, _)| name.as_str()).collect();
        Err(BpmError::FetchFailed {
            count: self.failures.len(),
            failed: names.join(", "),
        })
    }
}

/// Install every package of a resolution, dependencies first, reporting
/// each outcome
pub fn install_resolution(
    installer: &FetchInstaller<'_>,
    resolution: &Resolution,
    jobs: usize,
    reporter: &dyn Reporter,
    report: &mut FetchReport,
) -> Result<()> {
    let order = resolution.install_order();
    let results = installer.install_all(&order, jobs, reporter)?;

    for (package, result) in order.into_iter().zip(results) {
        match result {
            Ok(installed) => {
                if installed.fetched {
                    reporter.success(&format!(
                        "Successfully fetched {} ({})",
                        installed.name, installed.version
                    ));
                } else {
                    reporter.detail(&format!(
                        "{} ({}) is already installed in {}",
                        installed.name,
                        installed.version,
                        installed.path.display()
                    ));
                }
                report.installed.push(installed);
            }
            Err(e) => {
                reporter.error(&e.to_string());
                report.failures.push((package.name.clone(), e));
            }
        }
    }
    Ok(())
}
