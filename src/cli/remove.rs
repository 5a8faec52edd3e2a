use clap::Parser;

/// Arguments for the remove command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Remove a dependency:\n    bpm remove spade")]
pub struct RemoveArgs {
    /// Package to remove from the project
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn test_cli_parsing_remove() {
        let cli = Cli::try_parse_from(["bpm", "remove", "spade"]).unwrap();
        match cli.command {
            Commands::Remove(args) => assert_eq!(args.name, "spade"),
            _ => panic!("Expected Remove command"),
        }
    }
}
