//! The record-store capability the rest of the library is written against.
//!
//! The store is an external collaborator: a queryable, mutable collection of
//! people and entries. [`crate::db::Db`] is the SQLite implementation.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::NaiveDate;

use crate::error::SharetrackError;
use crate::paging::{Page, SortDirection};
use crate::types::{Entry, EntryUpdate, NewEntry, NewPerson, Person, PersonUpdate};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the operation; the message is the backend's own.
    #[error("{0}")]
    Backend(#[from] rusqlite::Error),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("store lock poisoned")]
    Poisoned,
}

/// Columns the people listing may be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeopleSort {
    FullName,
    Email,
    #[default]
    CreatedAt,
}

impl PeopleSort {
    pub fn column(&self) -> &'static str {
        match self {
            Self::FullName => "full_name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
        }
    }
}

impl fmt::Display for PeopleSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for PeopleSort {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "full_name" | "name" => Ok(Self::FullName),
            "email" => Ok(Self::Email),
            "created_at" | "created" => Ok(Self::CreatedAt),
            _ => Err(SharetrackError::InvalidInput(format!(
                "unknown people sort column '{}'. Valid values: full_name, email, created_at",
                s
            ))),
        }
    }
}

/// Range-paginated people search.
#[derive(Debug, Clone)]
pub struct PeopleQuery {
    /// Case-insensitive substring match on `full_name`.
    pub search: Option<String>,
    pub sort: PeopleSort,
    pub direction: SortDirection,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for PeopleQuery {
    fn default() -> Self {
        Self {
            search: None,
            sort: PeopleSort::CreatedAt,
            direction: SortDirection::Desc,
            page: 1,
            page_size: 10,
        }
    }
}

/// Filter for entry selection. Date bounds are inclusive; `None` leaves that end open.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub person_id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub direction: SortDirection,
    pub limit: Option<usize>,
}

/// Operations the library needs from the backing store.
pub trait RecordStore {
    fn list_people(&self) -> Result<Vec<Person>, StoreError>;
    fn get_person(&self, id: &str) -> Result<Option<Person>, StoreError>;
    /// Exact match on the normalized email, so any case variant finds the person.
    fn find_person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError>;
    fn search_people(&self, query: &PeopleQuery) -> Result<Page<Person>, StoreError>;
    fn insert_person(&self, person: &NewPerson) -> Result<Person, StoreError>;
    /// Insert, or overwrite `full_name` of the person with the same email.
    fn upsert_person_by_email(&self, person: &NewPerson) -> Result<Person, StoreError>;
    fn update_person(&self, id: &str, update: &PersonUpdate) -> Result<Person, StoreError>;
    /// Reassign a person's id; their entries follow.
    fn relink_person(&self, old_id: &str, new_id: &str) -> Result<(), StoreError>;

    fn insert_entry(&self, entry: &NewEntry) -> Result<Entry, StoreError>;
    fn get_entry(&self, id: &str) -> Result<Option<Entry>, StoreError>;
    fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<Entry, StoreError>;
    fn delete_entry(&self, id: &str) -> Result<(), StoreError>;
    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError>;
}

/// Lets one store be shared by the import worker pool.
impl<S: RecordStore> RecordStore for Mutex<S> {
    fn list_people(&self) -> Result<Vec<Person>, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.list_people()
    }

    fn get_person(&self, id: &str) -> Result<Option<Person>, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.get_person(id)
    }

    fn find_person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .find_person_by_email(email)
    }

    fn search_people(&self, query: &PeopleQuery) -> Result<Page<Person>, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.search_people(query)
    }

    fn insert_person(&self, person: &NewPerson) -> Result<Person, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.insert_person(person)
    }

    fn upsert_person_by_email(&self, person: &NewPerson) -> Result<Person, StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .upsert_person_by_email(person)
    }

    fn update_person(&self, id: &str, update: &PersonUpdate) -> Result<Person, StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .update_person(id, update)
    }

    fn relink_person(&self, old_id: &str, new_id: &str) -> Result<(), StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .relink_person(old_id, new_id)
    }

    fn insert_entry(&self, entry: &NewEntry) -> Result<Entry, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.insert_entry(entry)
    }

    fn get_entry(&self, id: &str) -> Result<Option<Entry>, StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.get_entry(id)
    }

    fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<Entry, StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .update_entry(id, update)
    }

    fn delete_entry(&self, id: &str) -> Result<(), StoreError> {
        self.lock().map_err(|_| StoreError::Poisoned)?.delete_entry(id)
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError> {
        self.lock()
            .map_err(|_| StoreError::Poisoned)?
            .query_entries(filter)
    }
}
