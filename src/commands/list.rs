//! List command implementation
//!
//! Lists every package present in the project, vendored or fetched, with
//! its version and plugin role.

use console::Style;

use crate::cli::{GlobalArgs, ListArgs};
use crate::commands::helpers;
use crate::error::Result;
use crate::project::{Project, ResolvedPackage};

/// Run list command
pub fn run(global: &GlobalArgs, args: ListArgs) -> Result<()> {
    let project = helpers::open_project(global)?;
    let packages = project.installed_packages()?;
    for line in render(&project, &packages, args.detailed) {
        println!("{line}");
    }
    Ok(())
}

/// Output lines, one package per line (two with `detailed`)
pub fn render(project: &Project, packages: &[ResolvedPackage], detailed: bool) -> Vec<String> {
    if packages.is_empty() {
        return vec!["No packages installed.".to_string()];
    }

    let mut lines = vec![format!("Installed packages ({}):", packages.len())];
    for package in packages {
        let mut line = format!(
            "  {} ({})",
            Style::new().bold().yellow().apply_to(package.name()),
            package.descriptor.version
        );
        if let Some(role) = package.plugin_role() {
            line.push_str(&format!(" [{role}]"));
        }
        if project.is_vendored(package.name()) {
            line.push_str(" (vendored)");
        }
        lines.push(line);

        if detailed {
            let location = package
                .root
                .strip_prefix(project.root())
                .unwrap_or(&package.root);
            lines.push(format!(
                "    {} {}",
                Style::new().bold().apply_to("Path:"),
                location.display()
            ));
        }
    }
    lines
}
