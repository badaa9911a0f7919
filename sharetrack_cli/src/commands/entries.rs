//! Entry subcommands: `add`, `edit`, `delete`.

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use sharetrack_lib::entries::{add_entry, delete_entry, edit_entry};
use sharetrack_lib::validation::{validate_date, ShareForm};

use super::AppState;
use crate::output::{build_entry_rows, print_json, print_rows, OutputFormat};

/// Fields of the share entry form.
#[derive(Args)]
pub struct ShareArgs {
    /// Date of the share (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub date: Option<String>,

    /// Number of people reached
    #[arg(long, allow_negative_numbers = true)]
    pub reached: i64,

    /// Invited someone to church
    #[arg(long)]
    pub invite: bool,

    /// Had a spiritual conversation
    #[arg(long)]
    pub conversation: bool,

    /// Shared a personal story
    #[arg(long)]
    pub story: bool,

    /// Presented the gospel
    #[arg(long)]
    pub gospel: bool,

    /// Someone responded to the gospel
    #[arg(long)]
    pub response: bool,

    /// How many responded (ignored without --response)
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub responses: i64,

    /// Free-text notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl ShareArgs {
    fn to_form(&self, today: NaiveDate) -> Result<ShareForm> {
        let entry_date = match self.date.as_deref() {
            Some(d) => validate_date(d)?,
            None => today,
        };
        Ok(ShareForm {
            entry_date,
            number_reached: self.reached,
            church_invite: self.invite,
            spiritual_conversation: self.conversation,
            story_share: self.story,
            gospel_presentation: self.gospel,
            gospel_response: self.response,
            number_response: self.responses,
            notes: self.notes.clone(),
        })
    }
}

/// Arguments for the `add` subcommand.
#[derive(Args)]
pub struct AddArgs {
    /// Record the entry for another person (admin only)
    #[arg(long)]
    pub person: Option<String>,

    #[command(flatten)]
    pub form: ShareArgs,
}

/// Arguments for the `edit` subcommand. Every form field is resubmitted.
#[derive(Args)]
pub struct EditArgs {
    /// Entry ID
    pub id: String,

    #[command(flatten)]
    pub form: ShareArgs,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Entry ID
    pub id: String,
}

pub fn run_add(args: &AddArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let form = args.form.to_form(state.today)?;
    let entry = add_entry(
        state.store.as_ref(),
        &state.auth,
        args.person.as_deref(),
        &form,
    )?;
    eprintln!("Entry saved");
    match format {
        OutputFormat::Json => print_json(&entry),
        _ => print_rows(&build_entry_rows(std::slice::from_ref(&entry)), format)?,
    }
    Ok(())
}

pub fn run_edit(args: &EditArgs, state: &AppState, format: &OutputFormat) -> Result<()> {
    let form = args.form.to_form(state.today)?;
    let entry = edit_entry(state.store.as_ref(), &state.auth, &args.id, &form)?;
    eprintln!("Entry updated");
    match format {
        OutputFormat::Json => print_json(&entry),
        _ => print_rows(&build_entry_rows(std::slice::from_ref(&entry)), format)?,
    }
    Ok(())
}

pub fn run_delete(args: &DeleteArgs, state: &AppState) -> Result<()> {
    delete_entry(state.store.as_ref(), &state.auth, &args.id)?;
    eprintln!("Entry {} deleted", args.id);
    Ok(())
}
