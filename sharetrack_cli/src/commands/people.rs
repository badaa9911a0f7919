//! People administration subcommands: `people`, `person`, `toggle-role`, `edit-person`.

use anyhow::Result;
use clap::Args;
use sharetrack_lib::people::{edit_person, list_people, person_detail, toggle_role};
use sharetrack_lib::validation::{
    validate_page, validate_page_size, validate_people_sort, validate_person_edit,
    validate_search,
};
use sharetrack_lib::{PeopleQuery, SortDirection, PAGE_SIZE_CHOICES};

use super::AppState;
use crate::output::{
    build_entry_rows, build_person_rows, print_heading, print_json, print_rows, OutputFormat,
};

/// Arguments for the `people` subcommand (admin only).
#[derive(Args)]
pub struct PeopleArgs {
    /// Search by name (case-insensitive substring)
    #[arg(long)]
    pub search: Option<String>,

    /// Sort field: full_name, email, created_at
    #[arg(long, default_value = "created_at")]
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

/// Arguments for the `person` subcommand (admin only).
#[derive(Args)]
pub struct PersonArgs {
    /// Person ID
    pub id: String,

    /// Page number of the entry list
    #[arg(long, default_value = "1")]
    pub page: i64,

    /// Entries per page: 10, 25 or 50 offered, any 1..=100 accepted
    #[arg(long, default_value_t = PAGE_SIZE_CHOICES[0])]
    pub page_size: i64,
}

#[derive(Args)]
pub struct ToggleRoleArgs {
    /// Person ID
    pub id: String,
}

/// Arguments for the `edit-person` subcommand. Omitted fields stay unchanged.
#[derive(Args)]
pub struct EditPersonArgs {
    /// Person ID
    pub id: String,

    /// New full name
    #[arg(long)]
    pub name: Option<String>,

    /// New email address
    #[arg(long)]
    pub email: Option<String>,
}

pub fn run_list(args: &PeopleArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let search = match args.search.as_deref() {
        Some(s) if !s.trim().is_empty() => Some(validate_search(s)?),
        _ => None,
    };
    let query = PeopleQuery {
        search,
        sort: validate_people_sort(&args.sort)?,
        direction: args.direction.parse::<SortDirection>()?,
        page: validate_page(args.page)?,
        page_size: validate_page_size(args.page_size)?,
    };

    let page = list_people(state.store.as_ref(), &state.auth, &query)?;
    match format {
        OutputFormat::Json => print_json(&page),
        _ => {
            print_rows(&build_person_rows(&page.items), format)?;
            eprintln!(
                "Page {} of {} ({} people)",
                page.page,
                page.total_pages(),
                page.total
            );
        }
    }
    Ok(())
}

pub fn run_detail(args: &PersonArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let detail = person_detail(
        state.store.as_ref(),
        &state.auth,
        &args.id,
        validate_page(args.page)?,
        validate_page_size(args.page_size)?,
    )?;

    match format {
        OutputFormat::Json => print_json(&detail),
        OutputFormat::Csv => print_rows(&build_entry_rows(&detail.entries.items), format)?,
        _ => {
            print_rows(&build_person_rows(std::slice::from_ref(&detail.person)), format)?;
            print_heading("Entries", format);
            print_rows(&build_entry_rows(&detail.entries.items), format)?;
            eprintln!(
                "Page {} of {} ({} entries)",
                detail.entries.page,
                detail.entries.total_pages(),
                detail.entries.total
            );
        }
    }
    Ok(())
}

pub fn run_toggle_role(args: &ToggleRoleArgs, state: &AppState) -> Result<()> {
    let person = toggle_role(state.store.as_ref(), &state.auth, &args.id)?;
    eprintln!("{} is now {}", person.email, person.role);
    Ok(())
}

pub fn run_edit(args: &EditPersonArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let update = validate_person_edit(args.name.as_deref(), args.email.as_deref())?;
    let person = edit_person(state.store.as_ref(), &state.auth, &args.id, &update)?;
    eprintln!("Updated {}", person.id);
    match format {
        OutputFormat::Json => print_json(&person),
        _ => print_rows(&build_person_rows(std::slice::from_ref(&person)), format)?,
    }
    Ok(())
}
