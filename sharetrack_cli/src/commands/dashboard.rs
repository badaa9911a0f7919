//! The `dashboard` subcommand: totals, daily chart and recent entries for one person.

use anyhow::Result;
use clap::Args;
use sharetrack_lib::{date_range, personal_dashboard, RangeKey};

use super::AppState;
use crate::output::{
    build_chart_rows, build_entry_rows, build_totals_rows, print_heading, print_json, print_rows,
    OutputFormat,
};

/// Arguments for the `dashboard` subcommand.
///
/// With `--output csv` only the daily chart series is printed.
#[derive(Args)]
pub struct DashboardArgs {
    /// Show another person's dashboard by person ID
    #[arg(long)]
    pub person: Option<String>,

    /// Date range: all, this_week, last_week, this_month, last_month, this_year
    #[arg(long, default_value = "this_week")]
    pub range: String,
}

pub fn run(args: &DashboardArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let key: RangeKey = args.range.parse()?;
    let dash = personal_dashboard(
        state.store.as_ref(),
        &state.auth,
        args.person.as_deref(),
        date_range(key, state.today),
    )?;

    match format {
        OutputFormat::Json => print_json(&dash),
        OutputFormat::Csv => print_rows(&build_chart_rows(&dash.chart), format)?,
        _ => {
            print_heading(
                &format!("{} - {}", dash.person.full_name, dash.range.label),
                format,
            );
            print_rows(&build_totals_rows(&dash.totals), format)?;
            print_heading("Daily", format);
            if dash.chart.is_empty() {
                println!("No entries in this range.");
            } else {
                print_rows(&build_chart_rows(&dash.chart), format)?;
            }
            print_heading("Recent entries", format);
            print_rows(&build_entry_rows(&dash.recent), format)?;
        }
    }
    Ok(())
}
