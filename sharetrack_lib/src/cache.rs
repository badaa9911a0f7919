//! Email to person-id lookups shared by the import workers, backed by `DashMap`.

use dashmap::DashMap;

use crate::types::normalize_email;

/// Thread-safe memo of email lookups for one import run.
///
/// Keys go through [`normalize_email`], the same fold the store applies.
/// Misses are cached too: a file naming the same unknown email
/// many times hits the store once.
#[derive(Default)]
pub struct EmailLookupCache {
    store: DashMap<String, Option<String>>,
}

impl EmailLookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(Some(id))` for a cached hit, `Some(None)` for a cached miss,
    /// `None` when the email has not been looked up yet.
    pub fn get(&self, email: &str) -> Option<Option<String>> {
        self.store
            .get(&normalize_email(email))
            .map(|entry| entry.value().clone())
    }

    pub fn set(&self, email: &str, person_id: Option<String>) {
        self.store.insert(normalize_email(email), person_id);
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}
