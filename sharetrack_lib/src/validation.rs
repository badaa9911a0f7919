use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::SharetrackError;
use crate::store::PeopleSort;
use crate::types::{normalize_email, NewEntry, PersonUpdate, Role};

pub const MAX_SEARCH_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 200;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NOTES_LENGTH: usize = 2000;

pub const NO_SHARE_TYPE_MSG: &str = "Please select at least one way the gospel was shared.";
pub const NEGATIVE_REACHED_MSG: &str = "Number Reached must be 0 or greater.";
pub const BAD_RESPONSE_MSG: &str =
    "If someone responded, enter 1+ and it cannot exceed Number Reached.";

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, SharetrackError> {
    if input.len() > max_len {
        return Err(SharetrackError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(SharetrackError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate a people search string: enforce length, strip control chars, trim.
pub fn validate_search(input: &str) -> Result<String, SharetrackError> {
    sanitize_text(input, MAX_SEARCH_LENGTH)
}

pub fn validate_full_name(input: &str) -> Result<String, SharetrackError> {
    sanitize_text(input, MAX_NAME_LENGTH)
}

static EMAIL_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

/// Validate an email address and normalize it to lowercase.
pub fn validate_email(input: &str) -> Result<String, SharetrackError> {
    let trimmed = input.trim();
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(SharetrackError::InvalidInput(format!(
            "email exceeds maximum length of {} bytes",
            MAX_EMAIL_LENGTH
        )));
    }
    let re = EMAIL_RE.as_ref().map_err(|e| {
        SharetrackError::InvalidInput(format!("email pattern failed to compile: {}", e))
    })?;
    if !re.is_match(trimmed) {
        return Err(SharetrackError::InvalidInput(format!(
            "invalid email '{}'",
            trimmed
        )));
    }
    Ok(normalize_email(trimmed))
}

/// Validate page number (must be >= 1).
pub fn validate_page(page: i64) -> Result<usize, SharetrackError> {
    if page < 1 {
        return Err(SharetrackError::InvalidInput(
            "page must be >= 1".to_string(),
        ));
    }
    Ok(page as usize)
}

/// Validate page size (must be 1..=100).
pub fn validate_page_size(page_size: i64) -> Result<usize, SharetrackError> {
    if !(1..=100).contains(&page_size) {
        return Err(SharetrackError::InvalidInput(
            "page_size must be between 1 and 100".to_string(),
        ));
    }
    Ok(page_size as usize)
}

pub fn validate_role(input: &str) -> Result<Role, SharetrackError> {
    input.parse()
}

pub fn validate_people_sort(input: &str) -> Result<PeopleSort, SharetrackError> {
    input.parse()
}

/// Validate a YYYY-MM-DD date string.
pub fn validate_date(input: &str) -> Result<NaiveDate, SharetrackError> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        SharetrackError::InvalidInput(format!(
            "invalid date '{}'. Expected format: YYYY-MM-DD (e.g., 2024-06-01)",
            trimmed
        ))
    })
}

/// Raw values of the share entry form.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareForm {
    pub entry_date: NaiveDate,
    pub number_reached: i64,
    pub church_invite: bool,
    pub spiritual_conversation: bool,
    pub story_share: bool,
    pub gospel_presentation: bool,
    pub gospel_response: bool,
    pub number_response: i64,
    pub notes: Option<String>,
}

impl ShareForm {
    fn any_share_type(&self) -> bool {
        self.church_invite
            || self.spiritual_conversation
            || self.story_share
            || self.gospel_presentation
    }
}

/// Check the form rules and build the insertion payload.
///
/// The error text is the message shown to the person filling in the form.
pub fn validate_share_form(person_id: &str, form: &ShareForm) -> Result<NewEntry, SharetrackError> {
    if !form.any_share_type() {
        return Err(SharetrackError::InvalidInput(NO_SHARE_TYPE_MSG.to_string()));
    }
    if form.number_reached < 0 {
        return Err(SharetrackError::InvalidInput(NEGATIVE_REACHED_MSG.to_string()));
    }
    if form.gospel_response
        && (form.number_response <= 0 || form.number_response > form.number_reached)
    {
        return Err(SharetrackError::InvalidInput(BAD_RESPONSE_MSG.to_string()));
    }

    let notes = match form.notes.as_deref().map(str::trim) {
        Some(text) if text.len() > MAX_NOTES_LENGTH => {
            return Err(SharetrackError::InvalidInput(format!(
                "notes exceed maximum length of {} bytes",
                MAX_NOTES_LENGTH
            )))
        }
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => None,
    };

    Ok(NewEntry {
        person_id: person_id.to_string(),
        entry_date: form.entry_date.format("%Y-%m-%d").to_string(),
        number_reached: form.number_reached,
        church_invite: form.church_invite,
        spiritual_conversation: form.spiritual_conversation,
        story_share: form.story_share,
        gospel_presentation: form.gospel_presentation,
        gospel_response: form.gospel_response,
        number_response: if form.gospel_response {
            form.number_response
        } else {
            0
        },
        notes,
    })
}

/// Validate the person edit form. Blank fields are left unchanged.
pub fn validate_person_edit(
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<PersonUpdate, SharetrackError> {
    let full_name = full_name.map(validate_full_name).transpose()?;
    let email = email.map(validate_email).transpose()?;
    if full_name.is_none() && email.is_none() {
        return Err(SharetrackError::InvalidInput(
            "nothing to update: provide a name or an email".to_string(),
        ));
    }
    Ok(PersonUpdate {
        email,
        full_name,
        role: None,
    })
}
