use clap::Parser;

/// Arguments for the add command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Add the newest version:\n    bpm add spade\n\n\
                  Add with a constraint:\n    bpm add spade -v '~> 0.5'")]
pub struct AddArgs {
    /// Package to add
    pub name: String,

    /// Version constraint to record (defaults to '>= <fetched version>')
    #[arg(long = "version", short = 'v', value_name = "CONSTRAINT")]
    pub version: Option<String>,

    /// Consider only prerelease versions
    #[arg(long)]
    pub pre: bool,
}
