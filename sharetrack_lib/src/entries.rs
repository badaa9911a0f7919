//! Adding, editing and deleting share entries.
//!
//! Anyone may record entries for themselves; changing another person's
//! entries requires admin.

use crate::auth::AuthContext;
use crate::error::SharetrackError;
use crate::store::RecordStore;
use crate::types::{Entry, EntryUpdate};
use crate::validation::{validate_share_form, ShareForm};

fn check_owner(ctx: &AuthContext, owner: Option<&str>) -> Result<(), SharetrackError> {
    if owner == Some(ctx.person_id()) {
        return Ok(());
    }
    ctx.require_admin()
}

/// Record an entry for the caller, or for `person_id` when an admin enters it
/// on someone's behalf.
pub fn add_entry<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    person_id: Option<&str>,
    form: &ShareForm,
) -> Result<Entry, SharetrackError> {
    let target = person_id.unwrap_or(ctx.person_id());
    check_owner(ctx, Some(target))?;
    if store.get_person(target)?.is_none() {
        return Err(SharetrackError::NotFound(format!("person '{}'", target)));
    }
    let new_entry = validate_share_form(target, form)?;
    let entry = store.insert_entry(&new_entry)?;
    tracing::debug!("Recorded entry {} for {}", entry.id, target);
    Ok(entry)
}

pub fn edit_entry<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: &str,
    form: &ShareForm,
) -> Result<Entry, SharetrackError> {
    let existing = store
        .get_entry(id)?
        .ok_or_else(|| SharetrackError::NotFound(format!("entry '{}'", id)))?;
    check_owner(ctx, existing.person_id.as_deref())?;
    let owner = existing.person_id.as_deref().unwrap_or(ctx.person_id());
    let update: EntryUpdate = validate_share_form(owner, form)?.into();
    Ok(store.update_entry(id, &update)?)
}

pub fn delete_entry<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    id: &str,
) -> Result<(), SharetrackError> {
    let existing = store
        .get_entry(id)?
        .ok_or_else(|| SharetrackError::NotFound(format!("entry '{}'", id)))?;
    check_owner(ctx, existing.person_id.as_deref())?;
    store.delete_entry(id)?;
    tracing::info!("Deleted entry {}", id);
    Ok(())
}
