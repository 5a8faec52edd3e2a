use clap::Parser;

use crate::pipeline::BuildMode;

/// Arguments for the build command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Build every bundle:\n    bpm build\n\n\
                  Build without minifying:\n    bpm build --mode debug\n\n\
                  Build one bundle:\n    bpm build bpm_packages.js")]
pub struct BuildArgs {
    /// Bundles to build (bpm_packages.js, bpm_styles.css, <project>/app_package.js,
    /// <project>/app_styles.css); all of them when omitted
    pub bundles: Vec<String>,

    /// Build mode; production runs the minifier over script bundles
    #[arg(long, value_enum, default_value_t = BuildMode::Production)]
    pub mode: BuildMode,
}
