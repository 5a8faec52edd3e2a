//! CLI definitions using clap derive API
//!
//! This module is organized into submodules for each command's argument types:
//! - fetch: Fetch command arguments
//! - add: Add command arguments
//! - remove: Remove command arguments
//! - build: Build command arguments
//! - list: List command arguments
//! - completions: Completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod add;
pub mod build;
pub mod completions;
pub mod fetch;
pub mod list;
pub mod remove;

pub use add::AddArgs;
pub use build::BuildArgs;
pub use completions::CompletionsArgs;
pub use fetch::FetchArgs;
pub use list::ListArgs;
pub use remove::RemoveArgs;

/// bpm - browser package manager
///
/// Fetch client-side script and style packages and bundle them for the browser.
#[derive(Parser, Debug)]
#[command(
    name = "bpm",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Browser package manager and asset builder",
    long_about = "bpm resolves package versions against a registry, installs them into the \
                  project's .bpm directory and concatenates their sources into ready-to-load \
                  script and style bundles.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  bpm fetch                        \x1b[90m# Install the project's dependencies\x1b[0m\n   \
                  bpm fetch rake -v 0.8.6          \x1b[90m# Install one exact version\x1b[0m\n   \
                  bpm add spade                    \x1b[90m# Install and record a dependency\x1b[0m\n   \
                  bpm build --mode debug           \x1b[90m# Build every bundle without minifying\x1b[0m\n   \
                  bpm list                         \x1b[90m# List installed packages\x1b[0m\n\n\
                  "
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Project directory (defaults to the nearest directory with a package.json)
    #[arg(long, short = 'p', global = true, env = "BPM_PROJECT")]
    pub project: Option<PathBuf>,

    /// Registry URL or directory, overriding the configuration
    #[arg(long, global = true)]
    pub registry: Option<String>,

    /// Number of concurrent fetch and build workers
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: Option<u16>,

    /// Enable verbose output
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch packages into the project
    Fetch(FetchArgs),

    /// Fetch a package and record it as a project dependency
    Add(AddArgs),

    /// Remove a project dependency
    Remove(RemoveArgs),

    /// Build bundles into the assets directory
    Build(BuildArgs),

    /// List installed packages
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_list() {
        let cli = Cli::try_parse_from(["bpm", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List(_)));
    }

    #[test]
    fn test_cli_global_options() {
        let cli = Cli::try_parse_from([
            "bpm",
            "--verbose",
            "-p",
            "/tmp/project",
            "--registry",
            "/tmp/registry",
            "--jobs",
            "8",
            "list",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        assert_eq!(cli.global.project, Some(PathBuf::from("/tmp/project")));
        assert_eq!(cli.global.registry.as_deref(), Some("/tmp/registry"));
        assert_eq!(cli.global.jobs, Some(8));
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["bpm", "fetch", "rake", "-q"]).unwrap();
        assert!(cli.global.quiet);
    }

    #[test]
    fn test_zero_jobs_rejected() {
        assert!(Cli::try_parse_from(["bpm", "--jobs", "0", "list"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["bpm", "--verbose", "-q", "list"]).is_err());
    }

    #[test]
    fn test_cli_parsing_completions() {
        let cli = Cli::try_parse_from(["bpm", "completions", "bash"]).unwrap();
        match cli.command {
            Commands::Completions(args) => {
                assert_eq!(args.shell, "bash");
            }
            _ => panic!("Expected Completions command"),
        }
    }
}
