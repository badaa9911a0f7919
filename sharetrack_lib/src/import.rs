//! Bulk CSV import of people and entries.
//!
//! Rows are validated up front; valid rows are written through a bounded
//! worker pool (Semaphore + JoinSet + mpsc). Every row commits on its own, so a
//! failed row never undoes or blocks the others. Outcomes are collected by
//! row index and reported in input order whatever the pool size.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::auth::AuthContext;
use crate::cache::EmailLookupCache;
use crate::csv_io::{parse_csv, CsvError};
use crate::error::SharetrackError;
use crate::store::RecordStore;
use crate::types::{normalize_email, CsvRow, NewEntry, NewPerson, Role};

/// Errors listed before the "...and N more errors" notice.
pub const DEFAULT_ERROR_DISPLAY_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    People,
    Entries,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Entries => "entries",
        }
    }

    /// Headers the file must supply.
    pub fn required_headers(&self) -> &'static [&'static str] {
        match self {
            Self::People => &["email", "full_name"],
            Self::Entries => &["email", "entry_date", "number_reached"],
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "people" | "person" => Ok(Self::People),
            "entries" | "entry" => Ok(Self::Entries),
            _ => Err(SharetrackError::InvalidInput(format!(
                "unknown import type '{}'. Valid values: people, entries",
                s
            ))),
        }
    }
}

/// Failures that abort a whole import.
#[derive(thiserror::Error, Debug)]
pub enum ImportError {
    #[error("{0}")]
    Csv(#[from] CsvError),
    #[error("{0}")]
    Denied(#[from] SharetrackError),
    #[error("import worker failed: {0}")]
    Worker(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportResult {
    pub success: bool,
    pub imported: usize,
    pub errors: Vec<String>,
    /// The original rows that failed, re-exportable under the file's headers.
    pub failed_rows: Vec<CsvRow>,
}

impl ImportResult {
    /// A top-level failure: nothing imported, one error.
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            imported: 0,
            errors: vec![message.into()],
            failed_rows: Vec::new(),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows imported successfully; {} errors",
            self.imported,
            self.errors.len()
        )
    }

    /// The first `limit` errors, followed by a "...and N more errors" line
    /// when some were cut.
    pub fn displayed_errors(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self.errors.iter().take(limit).cloned().collect();
        if self.errors.len() > limit {
            lines.push(format!("...and {} more errors", self.errors.len() - limit));
        }
        lines
    }
}

/// Called with `(processed, total)` after every row.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

#[derive(Clone)]
pub struct ImportOptions {
    /// Rows in flight at once; 1 writes strictly in sequence. Each write runs
    /// on the blocking pool, and the SQLite store still serializes them
    /// behind its connection lock.
    pub concurrency: usize,
    pub progress: Option<ProgressFn>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress: None,
        }
    }
}

fn field<'a>(row: &'a CsvRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

pub fn validate_person_row(row: &CsvRow) -> Result<NewPerson, String> {
    let email = field(row, "email");
    if email.is_empty() {
        return Err("Missing email".to_string());
    }
    let full_name = field(row, "full_name");
    if full_name.is_empty() {
        return Err("Missing full_name".to_string());
    }
    Ok(NewPerson {
        id: None,
        email: normalize_email(email),
        full_name: full_name.to_string(),
        role: Role::User,
    })
}

/// Presence checks only; values are coerced when the payload is built.
pub fn validate_entry_row(row: &CsvRow) -> Result<(), String> {
    if field(row, "entry_date").is_empty() {
        return Err("Missing entry_date".to_string());
    }
    if field(row, "number_reached").is_empty() {
        return Err("Missing number_reached".to_string());
    }
    Ok(())
}

/// Only the exact lowercase literal `true` is true.
pub fn parse_flag(value: &str) -> bool {
    value == "true"
}

/// Leading-integer parse: optional sign and decimal digits after leading
/// whitespace, anything after the digits ignored, 0 when there are none.
pub fn parse_int_prefix(value: &str) -> i64 {
    let s = value.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut n: i64 = 0;
    let mut seen = false;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        seen = true;
        n = n.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    match (seen, negative) {
        (false, _) => 0,
        (true, true) => -n,
        (true, false) => n,
    }
}

/// Insertion payload for an entry row already matched to a person.
pub fn entry_payload(row: &CsvRow, person_id: &str) -> NewEntry {
    let gospel_response = parse_flag(field(row, "gospel_response"));
    let notes = field(row, "notes");
    NewEntry {
        person_id: person_id.to_string(),
        entry_date: field(row, "entry_date").to_string(),
        number_reached: parse_int_prefix(field(row, "number_reached")),
        church_invite: parse_flag(field(row, "church_invite")),
        spiritual_conversation: parse_flag(field(row, "spiritual_conversation")),
        story_share: parse_flag(field(row, "story_share")),
        gospel_presentation: parse_flag(field(row, "gospel_presentation")),
        gospel_response,
        number_response: if gospel_response {
            parse_int_prefix(field(row, "number_response"))
        } else {
            0
        },
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.to_string())
        },
    }
}

fn lookup_person<S: RecordStore + ?Sized>(
    store: &S,
    cache: &EmailLookupCache,
    email: &str,
) -> Result<Option<String>, String> {
    if let Some(hit) = cache.get(email) {
        return Ok(hit);
    }
    let found = store
        .find_person_by_email(email)
        .map_err(|e| e.to_string())?
        .map(|p| p.id);
    cache.set(email, found.clone());
    Ok(found)
}

/// Write one validated row. The error string is the per-row reason.
fn write_row<S: RecordStore + ?Sized>(
    store: &S,
    cache: &EmailLookupCache,
    kind: ImportKind,
    row: &CsvRow,
) -> Result<(), String> {
    match kind {
        ImportKind::People => {
            let person = validate_person_row(row)?;
            store
                .upsert_person_by_email(&person)
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        ImportKind::Entries => {
            let email = field(row, "email");
            let person_id = lookup_person(store, cache, email)?
                .ok_or_else(|| format!("Person not found for email \"{}\"", email))?;
            store
                .insert_entry(&entry_payload(row, &person_id))
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
    }
}

struct RowOutcome {
    index: usize,
    result: Result<(), String>,
}

/// Import parsed rows. Row-level problems are collected, never returned as `Err`.
pub async fn import_rows<S>(
    store: Arc<S>,
    kind: ImportKind,
    rows: Vec<CsvRow>,
    options: &ImportOptions,
) -> Result<ImportResult, ImportError>
where
    S: RecordStore + Send + Sync + 'static,
{
    let total = rows.len();
    let concurrency = options.concurrency.max(1);
    let cache = Arc::new(EmailLookupCache::new());
    let mut outcomes: Vec<Option<Result<(), String>>> = vec![None; total];
    let mut processed = 0usize;

    let report = |processed: usize| {
        if let Some(ref progress) = options.progress {
            progress(processed, total);
        }
    };

    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<RowOutcome>(concurrency * 2);
    let mut join_set = JoinSet::new();

    for (index, row) in rows.iter().enumerate() {
        let checked = match kind {
            ImportKind::People => validate_person_row(row).map(|_| ()),
            ImportKind::Entries => validate_entry_row(row),
        };
        if let Err(reason) = checked {
            tracing::debug!("Row {} failed validation: {}", index + 1, reason);
            outcomes[index] = Some(Err(reason));
            processed += 1;
            report(processed);
            continue;
        }

        let sem = Arc::clone(&semaphore);
        let sender = tx.clone();
        let store = Arc::clone(&store);
        let cache = Arc::clone(&cache);
        let row = row.clone();

        join_set.spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            // Store calls block on SQLite I/O and the connection lock.
            let result = tokio::task::spawn_blocking(move || {
                write_row(store.as_ref(), &cache, kind, &row)
            })
            .await
            .unwrap_or_else(|e| Err(format!("row writer failed: {}", e)));
            let _ = sender.send(RowOutcome { index, result }).await;
        });
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        outcomes[outcome.index] = Some(outcome.result);
        processed += 1;
        report(processed);
    }

    while let Some(joined) = join_set.join_next().await {
        if let Err(e) = joined {
            return Err(ImportError::Worker(e.to_string()));
        }
    }

    let mut result = ImportResult::default();
    for (index, (outcome, row)) in outcomes.into_iter().zip(rows).enumerate() {
        match outcome {
            Some(Ok(())) => result.imported += 1,
            Some(Err(reason)) => {
                tracing::warn!("Row {}: {}", index + 1, reason);
                result.errors.push(format!("Row {}: {}", index + 1, reason));
                result.failed_rows.push(row);
            }
            None => {
                result
                    .errors
                    .push(format!("Row {}: row was not processed", index + 1));
                result.failed_rows.push(row);
            }
        }
    }
    result.success = result.errors.is_empty();

    tracing::info!(
        "Imported {} {} rows, {} failed",
        result.imported,
        kind,
        result.errors.len()
    );
    Ok(result)
}

async fn run_import<S>(
    store: Arc<S>,
    ctx: &AuthContext,
    kind: ImportKind,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportResult, ImportError>
where
    S: RecordStore + Send + Sync + 'static,
{
    ctx.require_admin()?;
    let parsed = parse_csv(text)?;
    import_rows(store, kind, parsed.rows, options).await
}

/// Parse and import CSV text. Anything that stops the whole batch (no
/// header row, a non-admin caller, a crashed worker) comes back as an
/// aborted result with a single error.
pub async fn import_csv<S>(
    store: Arc<S>,
    ctx: &AuthContext,
    kind: ImportKind,
    text: &str,
    options: &ImportOptions,
) -> ImportResult
where
    S: RecordStore + Send + Sync + 'static,
{
    match run_import(store, ctx, kind, text, options).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Import aborted: {}", e);
            ImportResult::aborted(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn person_row_validation_messages() {
        assert_eq!(
            validate_person_row(&row(&[("full_name", "Ann")])).unwrap_err(),
            "Missing email"
        );
        assert_eq!(
            validate_person_row(&row(&[("email", "a@b.com"), ("full_name", "")])).unwrap_err(),
            "Missing full_name"
        );
        let p = validate_person_row(&row(&[("email", "A@B.com"), ("full_name", "Ann")])).unwrap();
        assert_eq!(p.email, "a@b.com");
    }

    #[test]
    fn entry_row_validation_messages() {
        assert_eq!(
            validate_entry_row(&row(&[("number_reached", "3")])).unwrap_err(),
            "Missing entry_date"
        );
        assert_eq!(
            validate_entry_row(&row(&[("entry_date", "2024-01-05")])).unwrap_err(),
            "Missing number_reached"
        );
        assert!(validate_entry_row(&row(&[
            ("entry_date", "2024-01-05"),
            ("number_reached", "x")
        ]))
        .is_ok());
    }

    #[test]
    fn flags_need_exact_lowercase_true() {
        assert!(parse_flag("true"));
        assert!(!parse_flag("True"));
        assert!(!parse_flag("1"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn int_prefix_parsing() {
        assert_eq!(parse_int_prefix("10"), 10);
        assert_eq!(parse_int_prefix("  7 people"), 7);
        assert_eq!(parse_int_prefix("12.9"), 12);
        assert_eq!(parse_int_prefix("-4"), -4);
        assert_eq!(parse_int_prefix("+5"), 5);
        assert_eq!(parse_int_prefix("abc"), 0);
        assert_eq!(parse_int_prefix(""), 0);
        assert_eq!(parse_int_prefix("-"), 0);
    }

    #[test]
    fn payload_forces_zero_responses_without_flag() {
        let r = row(&[
            ("entry_date", "2024-01-05"),
            ("number_reached", "10"),
            ("gospel_response", "TRUE"),
            ("number_response", "3"),
            ("notes", ""),
        ]);
        let payload = entry_payload(&r, "p1");
        assert!(!payload.gospel_response);
        assert_eq!(payload.number_response, 0);
        assert_eq!(payload.notes, None);
    }

    #[test]
    fn payload_keeps_responses_with_flag() {
        let r = row(&[
            ("entry_date", "2024-01-05"),
            ("number_reached", "10"),
            ("church_invite", "true"),
            ("gospel_response", "true"),
            ("number_response", "3"),
            ("notes", "follow up"),
        ]);
        let payload = entry_payload(&r, "p1");
        assert!(payload.church_invite);
        assert!(!payload.story_share);
        assert_eq!(payload.number_reached, 10);
        assert_eq!(payload.number_response, 3);
        assert_eq!(payload.notes.as_deref(), Some("follow up"));
    }

    #[test]
    fn error_display_is_capped() {
        let result = ImportResult {
            success: false,
            imported: 2,
            errors: (1..=23).map(|i| format!("Row {}: Missing email", i)).collect(),
            failed_rows: Vec::new(),
        };
        let lines = result.displayed_errors(DEFAULT_ERROR_DISPLAY_LIMIT);
        assert_eq!(lines.len(), 21);
        assert_eq!(lines[20], "...and 3 more errors");
        assert_eq!(result.summary(), "2 rows imported successfully; 23 errors");
        assert_eq!(result.displayed_errors(50).len(), 23);
    }

    #[test]
    fn aborted_result_has_single_error() {
        let r = ImportResult::aborted("CSV has no header row");
        assert!(!r.success);
        assert_eq!(r.imported, 0);
        assert_eq!(r.errors, vec!["CSV has no header row".to_string()]);
    }

    #[test]
    fn kind_parse() {
        assert_eq!("People".parse::<ImportKind>().unwrap(), ImportKind::People);
        assert_eq!("entries".parse::<ImportKind>().unwrap(), ImportKind::Entries);
        assert!("trades".parse::<ImportKind>().is_err());
    }
}
