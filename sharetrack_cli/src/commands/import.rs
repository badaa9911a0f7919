//! The `import` subcommand: previews a CSV file, then imports it row by row.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sharetrack_lib::export::write_failed_rows;
use sharetrack_lib::{import_csv, preview, ImportKind, ImportOptions};

use super::AppState;
use crate::output::{print_json, render_preview, OutputFormat};

/// Arguments for the `import` subcommand (admin only).
///
/// People rows are upserted by email. Entry rows are matched to people by
/// email; rows that fail are written to `failed_import_<date>.csv` in the
/// export directory so they can be corrected and re-imported.
#[derive(Args)]
pub struct ImportArgs {
    /// CSV file to import
    pub file: PathBuf,

    /// What the file holds: people or entries
    #[arg(long = "type", default_value = "entries")]
    pub kind: String,

    /// Show the preview and stop without importing
    #[arg(long)]
    pub dry_run: bool,

    /// Rows written at once (overrides the config file)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

pub async fn run(args: &ImportArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let kind: ImportKind = args.kind.parse()?;
    state.auth.require_admin()?;

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let settings = &state.config.import;
    let preview = preview(&text, settings.preview_rows)?;

    eprintln!(
        "Preview of {} ({} rows):",
        args.file.display(),
        preview.total_rows
    );
    eprintln!("{}", render_preview(&preview));
    let missing: Vec<&str> = kind
        .required_headers()
        .iter()
        .copied()
        .filter(|h| !preview.headers.iter().any(|p| p == h))
        .collect();
    if !missing.is_empty() {
        eprintln!("Warning: missing column(s): {}", missing.join(", "));
    }
    if args.dry_run {
        return Ok(());
    }

    let pb = ProgressBar::new(preview.total_rows as u64);
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} ({eta}) {msg}",
    )?);
    pb.set_message(format!("importing {}...", kind));

    let ticker = pb.clone();
    let options = ImportOptions {
        concurrency: args.concurrency.unwrap_or(settings.concurrency).max(1),
        progress: Some(Arc::new(move |done: usize, _total: usize| {
            ticker.set_position(done as u64)
        })),
    };
    let result = import_csv(Arc::clone(&state.store), &state.auth, kind, &text, &options).await;
    pb.finish_and_clear();

    match format {
        OutputFormat::Json => print_json(&result),
        _ => {
            println!("{}", result.summary());
            for line in result.displayed_errors(settings.error_display_limit) {
                println!("  {}", line);
            }
        }
    }

    if !result.failed_rows.is_empty() {
        let path = write_failed_rows(
            &preview.headers,
            &result.failed_rows,
            &state.config.export.dir,
            state.today,
        )?;
        eprintln!(
            "{} failed rows written to {}",
            result.failed_rows.len(),
            path.display()
        );
    }
    Ok(())
}
