use std::path::PathBuf;

use clap::Parser;

/// Architecture-conformance checker for C/C++ codebases. Reports every
/// source-level dependency that isn't permitted by a component diagram.
#[derive(Debug, Parser)]
#[command(name = "architector", version, about)]
pub struct Cli {
    /// Path to the architecture-diagram text (PlantUML-style component diagram).
    #[arg(long)]
    pub puml: PathBuf,

    /// Path to a directory containing a compile_commands.json compilation database.
    #[arg(long)]
    pub compdb: PathBuf,

    /// Root of the source tree. Defaults to the current directory.
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Directory reports are written to.
    #[arg(long, default_value = "reports")]
    pub reports_dir: PathBuf,

    /// Increase log verbosity. Repeat for more detail (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write a heatmap render of the violation matrix to this path.
    #[cfg(feature = "heatmap")]
    #[arg(long)]
    pub heatmap: Option<PathBuf>,
}
