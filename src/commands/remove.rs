//! Remove command implementation

use crate::cli::{GlobalArgs, RemoveArgs};
use crate::commands::helpers;
use crate::error::{Result, install};
use crate::installer::FetchInstaller;
use crate::project::Project;
use crate::registry::{self, Registry};
use crate::ui::Reporter;

/// Run remove command
pub fn run(global: &GlobalArgs, args: RemoveArgs) -> Result<()> {
    let config = helpers::load_config(global)?;
    let registry = registry::open(&config);
    let reporter = helpers::reporter(global);
    let mut project = helpers::open_project(global)?;

    remove_package(&mut project, registry.as_ref(), &args.name, &reporter)
}

/// Drop `name` from the project's dependencies and delete its store copy.
///
/// Vendored copies under `packages/` are left alone.
pub fn remove_package(
    project: &mut Project,
    registry: &dyn Registry,
    name: &str,
    reporter: &dyn Reporter,
) -> Result<()> {
    let descriptor = project.descriptor_mut();
    let declared = descriptor.dependencies.remove(name).is_some()
        | descriptor.optional_dependencies.remove(name).is_some();

    let installer = FetchInstaller::new(registry, project.layout().clone());
    let stored = installer.layout().package_dir(name).exists();
    if !declared && !stored {
        return Err(install::not_installed(name));
    }

    if declared {
        project.save()?;
    }
    if stored {
        installer.remove(name)?;
    }
    if project.is_vendored(name) {
        reporter.warn(&format!(
            "{name} is vendored under packages/ and was left in place"
        ));
    }

    reporter.success(&format!("Removed {name}"));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BpmError;
    use crate::manifest::PackageDescriptor;
    use crate::test_fixtures::{MemoryRegistry, create_temp_dir, manifest_json, write_package};
    use crate::ui::SilentReporter;

    #[test]
    fn test_remove_drops_dependency_and_store_copy() {
        let temp = create_temp_dir();
        write_package(
            temp.path(),
            &manifest_json("hello_world", "2.0.0", &[("rake", "*"), ("spade", "*")]),
            &[],
        );
        write_package(
            &temp.path().join(".bpm/packages/rake"),
            &manifest_json("rake", "0.8.7", &[]),
            &[],
        );
        let mut project = Project::open(temp.path()).unwrap();

        remove_package(&mut project, &MemoryRegistry::new(), "rake", &SilentReporter).unwrap();

        let saved = PackageDescriptor::load(temp.path()).unwrap();
        assert!(!saved.dependencies.contains_key("rake"));
        assert!(saved.dependencies.contains_key("spade"));
        assert!(!temp.path().join(".bpm/packages/rake").exists());
    }

    #[test]
    fn test_remove_unknown_package_fails() {
        let temp = create_temp_dir();
        write_package(temp.path(), &manifest_json("hello_world", "2.0.0", &[]), &[]);
        let mut project = Project::open(temp.path()).unwrap();

        let err = remove_package(&mut project, &MemoryRegistry::new(), "rake", &SilentReporter)
            .unwrap_err();
        assert!(matches!(err, BpmError::PackageNotInstalled { .. }));
    }
}
