use clap::Parser;

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    bpm completions bash > ~/.bash_completion.d/bpm\n\n\
                  Generate zsh completions:\n    bpm completions zsh > ~/.zfunc/_bpm\n\n\
                  Generate fish completions:\n    bpm completions fish > ~/.config/fish/completions/bpm.fish\n\n\
                  Generate PowerShell completions:\n    bpm completions powershell")]
pub struct CompletionsArgs {
    /// Shell type (bash, elvish, fish, powershell, zsh)
    pub shell: String,
}
