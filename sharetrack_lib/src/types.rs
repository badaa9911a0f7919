//! Domain records shared by the store, the aggregation engine, and the CSV pipeline.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SharetrackError;

/// A CSV data row keyed by header name.
pub type CsvRow = HashMap<String, String>;

/// Access level of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    /// The other role, used by the admin toggle.
    pub fn toggled(self) -> Self {
        match self {
            Self::Admin => Self::User,
            Self::User => Self::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            _ => Err(SharetrackError::InvalidInput(format!(
                "unknown role '{}'. Valid values: admin, user",
                s
            ))),
        }
    }
}

/// A person on mission. `id` is durable but may be reassigned once when an
/// imported record is linked to a login identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub created_at: String,
    #[serde(default)]
    pub role: Role,
}

/// A gospel-share record.
///
/// `person_id` is nullable for legacy rows; `user_id` holds the login identity
/// those rows were written under before people and logins were unified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub person_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub entry_date: String,
    pub number_reached: i64,
    pub church_invite: bool,
    pub spiritual_conversation: bool,
    pub story_share: bool,
    pub gospel_presentation: bool,
    pub gospel_response: bool,
    pub number_response: i64,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Entry {
    /// Responses that count toward totals: zero unless `gospel_response` is set.
    pub fn effective_responses(&self) -> i64 {
        if self.gospel_response {
            self.number_response
        } else {
            0
        }
    }
}

/// Insertion payload for a person.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPerson {
    /// Explicit id, used when creating the record for a login identity.
    pub id: Option<String>,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Field changes for a person. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

/// Insertion payload for an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEntry {
    pub person_id: String,
    pub entry_date: String,
    pub number_reached: i64,
    pub church_invite: bool,
    pub spiritual_conversation: bool,
    pub story_share: bool,
    pub gospel_presentation: bool,
    pub gospel_response: bool,
    pub number_response: i64,
    pub notes: Option<String>,
}

/// Replacement values for an existing entry (all form fields are rewritten).
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate {
    pub entry_date: String,
    pub number_reached: i64,
    pub church_invite: bool,
    pub spiritual_conversation: bool,
    pub story_share: bool,
    pub gospel_presentation: bool,
    pub gospel_response: bool,
    pub number_response: i64,
    pub notes: Option<String>,
}

impl From<NewEntry> for EntryUpdate {
    fn from(e: NewEntry) -> Self {
        Self {
            entry_date: e.entry_date,
            number_reached: e.number_reached,
            church_invite: e.church_invite,
            spiritual_conversation: e.spiritual_conversation,
            story_share: e.story_share,
            gospel_presentation: e.gospel_presentation,
            gospel_response: e.gospel_response,
            number_response: e.number_response,
            notes: e.notes,
        }
    }
}

/// Canonical stored form of an email: trimmed, Unicode lowercase.
///
/// Every write and lookup goes through this so non-ASCII case variants
/// collapse onto one person.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Title-case every space-separated word: first character upper, rest lower.
pub fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut out: String = first.to_uppercase().collect();
                    out.push_str(&chars.as_str().to_lowercase());
                    out
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Truncate notes for list views: 20 characters then "...", "-" when absent.
pub fn truncate_notes(notes: Option<&str>) -> String {
    match notes {
        None | Some("") => "-".to_string(),
        Some(text) if text.chars().count() > 20 => {
            let head: String = text.chars().take(20).collect();
            format!("{}...", head)
        }
        Some(text) => text.to_string(),
    }
}
