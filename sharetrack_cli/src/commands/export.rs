//! The `export` subcommand: writes a whole table to a dated CSV file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use sharetrack_lib::export::{export_csv, write_export};
use sharetrack_lib::{ExportOutcome, ExportTable};

use super::AppState;

/// Arguments for the `export` subcommand (admin only).
#[derive(Args)]
pub struct ExportArgs {
    /// Table to export: people, entries (all_people / all_entries also accepted)
    pub table: String,

    /// Output directory (overrides the config file)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Print the CSV to stdout instead of writing a file
    #[arg(long)]
    pub stdout: bool,
}

pub fn run(args: &ExportArgs, state: &AppState) -> Result<()> {
    let table: ExportTable = args.table.parse()?;

    if args.stdout {
        match export_csv(state.store.as_ref(), &state.auth, table)? {
            Some((text, _)) => println!("{}", text),
            None => eprintln!("No data found in {}", table.table_name()),
        }
        return Ok(());
    }

    let dir = args.dir.as_ref().unwrap_or(&state.config.export.dir);
    match write_export(state.store.as_ref(), &state.auth, table, dir, state.today)? {
        ExportOutcome::Written { path, rows } => {
            eprintln!("Exported {} rows to {}", rows, path.display())
        }
        ExportOutcome::Empty { message } => eprintln!("{}", message),
    }
    Ok(())
}
