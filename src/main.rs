//! # TB - Taxonomy-driven Task Board
//!
//! A command-line task board whose workflow columns, sub-statuses, importance
//! levels and task origins are user-defined data rather than fixed enums.
//!
//! ## Key Features
//!
//! - **Editable Taxonomy**: add, rename, recolour and remove categories, sub-categories,
//!   importance levels and bid origins; tasks keep the names they were given
//! - **Completion Tracking**: moving a task into the completion category stamps a
//!   completion date, moving it out clears it
//! - **Views**: board columns, due-today / this-week / overdue filters, search and sort
//! - **Dashboard**: counts per category, importance and origin plus a weekly completion trend
//! - **Import**: canonical exports load verbatim, loose JSON from other tools is normalized
//!
//! ## Quick Start
//!
//! ```bash
//! # Add a task
//! tb add "Quote for harbour crane" --taskid B-1042 --due "in 5d" --importance High
//!
//! # See the board
//! tb board
//!
//! # Finish it
//! tb move B-1042 Done
//!
//! # Weekly throughput
//! tb trend
//! ```
//!
//! Data is stored in `~/.tb/board.json` unless `--db` or `TB_DB` says otherwise.
//! Logging goes to stderr and is controlled by `TB_LOG` (e.g. `TB_LOG=debug`).

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod cmd;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod fields;
pub mod filters;
pub mod import;
pub mod task;
pub mod taxonomy;

use cli::Cli;
use cmd::*;
use config::CompletionCategory;
use db::Database;
use error::BoardResult;

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TB_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".tb").join("board.json")
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Completions { shell } = cli.command {
        cmd_completions(shell);
        return;
    }

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> BoardResult<()> {
    let db_path = cli.db.unwrap_or_else(default_db_path);
    let mut db = Database::load(&db_path)?;
    let completion = CompletionCategory::resolve(&db.settings, &cli.completion_category);
    tracing::debug!(
        path = %db_path.display(),
        completion = completion.name(),
        tasks = db.tasks.len(),
        "board loaded"
    );

    match cli.command {
        Commands::Add { title, fields } => cmd_add(&mut db, &db_path, &completion, title, fields),

        Commands::List { search, all, status, due, sort, desc, limit } => {
            cmd_list(&db, &completion, search, all, status, due, sort, desc, limit);
            Ok(())
        }

        Commands::View { id } => cmd_view(&db, &completion, id),

        Commands::Update { id, title, fields } => {
            cmd_update(&mut db, &db_path, &completion, id, title, fields)
        }

        Commands::Move { id, status } => cmd_move(&mut db, &db_path, &completion, id, status),

        Commands::Delete { id } => cmd_delete(&mut db, &db_path, id),

        Commands::Clear { no_backup } => cmd_clear(&mut db, &db_path, no_backup),

        Commands::Board { all } => {
            cmd_board(&db, &completion, all);
            Ok(())
        }

        Commands::Stats { json } => cmd_stats(&db, &completion, json),

        Commands::Trend => {
            cmd_trend(&db);
            Ok(())
        }

        Commands::Taxonomy { action } => cmd_taxonomy(&mut db, &db_path, action),

        Commands::Export { output } => cmd_export(&db, output),

        Commands::Import { input, no_backup } => {
            cmd_import(&mut db, &db_path, &completion, input, no_backup)
        }

        Commands::Accept { input } => cmd_accept(&mut db, &db_path, &completion, input),

        Commands::Backup => cmd_backup(&db_path),

        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}
