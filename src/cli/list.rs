use clap::Parser;

/// Arguments for the list command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  List installed packages:\n    bpm list\n\n\
                  Include install locations:\n    bpm list --detailed")]
pub struct ListArgs {
    /// Show where each package is installed
    #[arg(long)]
    pub detailed: bool,
}
