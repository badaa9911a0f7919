//! The `whoami` subcommand: shows the resolved person behind the session.

use anyhow::Result;
use serde::Serialize;
use sharetrack_lib::Person;

use super::AppState;
use crate::output::{build_person_rows, print_json, print_rows, OutputFormat};

#[derive(Serialize)]
struct WhoAmI<'a> {
    person: &'a Person,
    is_admin: bool,
}

pub fn run(state: &AppState, format: &OutputFormat) -> Result<()> {
    let auth = &state.auth;
    match format {
        OutputFormat::Json => print_json(&WhoAmI {
            person: &auth.person,
            is_admin: auth.is_admin,
        }),
        _ => {
            print_rows(&build_person_rows(std::slice::from_ref(&auth.person)), format)?;
            if !matches!(format, OutputFormat::Csv) {
                println!("Admin: {}", if auth.is_admin { "yes" } else { "no" });
            }
        }
    }
    Ok(())
}
