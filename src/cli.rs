use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;
use crate::config::DEFAULT_COMPLETION_CATEGORY;

/// File-backed task board with configurable workflow categories.
/// Storage defaults to ~/.tb/board.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "tb", version, about = "Taxonomy-driven task board CLI")]
pub struct Cli {
    /// Path to the JSON board file.
    #[arg(long, global = true, env = "TB_DB")]
    pub db: Option<PathBuf>,

    /// Workflow category that marks a task as finished (matched case-insensitively).
    #[arg(
        long,
        global = true,
        env = "TB_COMPLETION_CATEGORY",
        default_value = DEFAULT_COMPLETION_CATEGORY
    )]
    pub completion_category: String,

    /// Emit debug logs on stderr (otherwise TB_LOG, default "warn").
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
