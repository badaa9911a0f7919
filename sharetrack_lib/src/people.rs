//! People administration: listing, role changes, edits and person detail.

use serde::Serialize;

use crate::auth::AuthContext;
use crate::error::SharetrackError;
use crate::paging::{paginate, Page, SortDirection};
use crate::store::{EntryFilter, PeopleQuery, RecordStore};
use crate::types::{Entry, Person, PersonUpdate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonDetail {
    pub person: Person,
    /// The person's entries, newest first.
    pub entries: Page<Entry>,
}

fn require_person<S: RecordStore + ?Sized>(store: &S, id: &str) -> Result<Person, SharetrackError> {
    store
        .get_person(id)?
        .ok_or_else(|| SharetrackError::NotFound(format!("person '{}'", id)))
}

pub fn list_people<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    query: &PeopleQuery,
) -> Result<Page<Person>, SharetrackError> {
    ctx.require_admin()?;
    Ok(store.search_people(query)?)
}

/// Flip a person between admin and user.
pub fn toggle_role<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: &str,
) -> Result<Person, SharetrackError> {
    ctx.require_admin()?;
    let person = require_person(store, id)?;
    let role = person.role.toggled();
    tracing::info!("Changing role of {} to {}", person.email, role);
    Ok(store.update_person(
        id,
        &PersonUpdate {
            role: Some(role),
            ..Default::default()
        },
    )?)
}

pub fn edit_person<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: &str,
    update: &PersonUpdate,
) -> Result<Person, SharetrackError> {
    ctx.require_admin()?;
    require_person(store, id)?;
    Ok(store.update_person(id, update)?)
}

pub fn person_detail<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: &str,
    page: usize,
    page_size: usize,
) -> Result<PersonDetail, SharetrackError> {
    ctx.require_admin()?;
    let person = require_person(store, id)?;
    let entries = store.query_entries(&EntryFilter {
        person_id: Some(person.id.clone()),
        direction: SortDirection::Desc,
        ..Default::default()
    })?;
    Ok(PersonDetail {
        person,
        entries: paginate(&entries, page, page_size),
    })
}
