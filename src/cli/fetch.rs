use clap::Parser;

/// Arguments for the fetch command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Fetch every dependency of the current project:\n    bpm fetch\n\n\
                  Fetch packages by name:\n    bpm fetch rake builder\n\n\
                  Fetch an exact version:\n    bpm fetch rake -v 0.8.6\n\n\
                  Fetch a prerelease:\n    bpm fetch bundler --pre")]
pub struct FetchArgs {
    /// Packages to fetch (if omitted, fetches the project's dependencies)
    pub names: Vec<String>,

    /// Version constraint applied to every named package (e.g. '0.8.6', '>= 1.0')
    #[arg(long = "version", short = 'v', value_name = "CONSTRAINT")]
    pub version: Option<String>,

    /// Consider only prerelease versions of the named packages
    #[arg(long)]
    pub pre: bool,
}
