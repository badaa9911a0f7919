//! The `leaderboard` subcommand: organization-wide totals and per-person ranking.

use anyhow::Result;
use clap::Args;
use sharetrack_lib::validation::{validate_page, validate_page_size};
use sharetrack_lib::{
    admin_dashboard, date_range, RangeKey, SortDirection, SortState, UserAggColumn,
    PAGE_SIZE_CHOICES,
};

use super::AppState;
use crate::output::{
    build_chart_rows, build_leader_rows, build_overall_rows, print_heading, print_json,
    print_rows, OutputFormat,
};

/// Arguments for the `leaderboard` subcommand (admin only).
///
/// With `--output csv` only the leaderboard page is printed.
#[derive(Args)]
pub struct LeaderboardArgs {
    /// Date range: all, this_week, last_week, this_month, last_month, this_year
    #[arg(long, default_value = "this_week")]
    pub range: String,

    /// Sort column: display_name, entries, total_reached, total_responses,
    /// invites_reached, conversations_reached, story_share_reached,
    /// gospel_share_reached, user_id
    #[arg(long, default_value = "total_reached")]
    pub sort: String,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    pub direction: String,

    /// Page number
    #[arg(long, default_value = "1")]
    pub page: i64,

    /// Results per page: 10, 25 or 50 offered, any 1..=100 accepted
    #[arg(long, default_value_t = PAGE_SIZE_CHOICES[0])]
    pub page_size: i64,
}

pub fn run(args: &LeaderboardArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let key: RangeKey = args.range.parse()?;
    let column: UserAggColumn = args.sort.parse()?;
    let direction: SortDirection = args.direction.parse()?;
    let page = validate_page(args.page)?;
    let page_size = validate_page_size(args.page_size)?;

    let dash = admin_dashboard(
        state.store.as_ref(),
        &state.auth,
        date_range(key, state.today),
        SortState::new(column, direction),
        page,
        page_size,
    )?;

    match format {
        OutputFormat::Json => print_json(&dash),
        OutputFormat::Csv => print_rows(&build_leader_rows(&dash.leaderboard.items), format)?,
        _ => {
            print_heading(&format!("Overall - {}", dash.range.label), format);
            print_rows(&build_overall_rows(&dash.overall), format)?;
            print_heading("Daily", format);
            if dash.chart.is_empty() {
                println!("No entries in this range.");
            } else {
                print_rows(&build_chart_rows(&dash.chart), format)?;
            }
            print_heading(
                &format!("Leaderboard (by {} {})", dash.sort_column, dash.sort_direction),
                format,
            );
            print_rows(&build_leader_rows(&dash.leaderboard.items), format)?;
            eprintln!(
                "Page {} of {} ({} people)",
                dash.leaderboard.page,
                dash.leaderboard.total_pages(),
                dash.leaderboard.total
            );
        }
    }
    Ok(())
}
