//! bpm - browser package manager
//!
//! Resolves client-side packages against a registry, installs them into the
//! project's `.bpm` store and assembles their scripts and styles into
//! bundles ready to load from an HTML page.

use clap::Parser;

mod cli;
mod commands;
mod config;
mod error;
mod hash;
mod installer;
mod manifest;
mod pipeline;
mod plugin;
mod project;
mod registry;
mod resolver;
mod ui;
mod version;

#[cfg(test)]
mod test_fixtures;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let global = cli.global;

    let result = match cli.command {
        Commands::Fetch(args) => commands::fetch::run(&global, args),
        Commands::Add(args) => commands::add::run(&global, args),
        Commands::Remove(args) => commands::remove::run(&global, args),
        Commands::Build(args) => commands::build::run(&global, args),
        Commands::List(args) => commands::list::run(&global, args),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
