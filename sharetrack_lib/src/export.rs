//! Table exports and failed-row files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;

use crate::auth::AuthContext;
use crate::csv_io::{rows_to_csv, to_csv, ENTRY_COLUMNS, PEOPLE_COLUMNS};
use crate::error::SharetrackError;
use crate::paging::SortDirection;
use crate::store::{EntryFilter, RecordStore};
use crate::types::CsvRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportTable {
    People,
    Entries,
}

impl ExportTable {
    /// Base of the export file name.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Entries => "entries",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::People => "people",
            Self::Entries => "gospel_share_entries",
        }
    }
}

impl fmt::Display for ExportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

impl FromStr for ExportTable {
    type Err = SharetrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "people" | "all_people" => Ok(Self::People),
            "entries" | "all_entries" | "gospel_share_entries" => Ok(Self::Entries),
            _ => Err(SharetrackError::InvalidInput(format!(
                "unknown export '{}'. Valid values: people, entries, all_people, all_entries",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Written { path: PathBuf, rows: usize },
    /// Nothing to export; no file was written.
    Empty { message: String },
}

/// `<name>_<YYYY-MM-DD>.csv`
pub fn export_file_name(name: &str, date: NaiveDate) -> String {
    format!("{}_{}.csv", name, date.format("%Y-%m-%d"))
}

/// Render a whole table as CSV text. `None` when the table is empty.
pub fn export_csv<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    table: ExportTable,
) -> Result<Option<(String, usize)>, SharetrackError> {
    ctx.require_admin()?;
    let (text, rows) = match table {
        ExportTable::People => {
            let people = store.list_people()?;
            if people.is_empty() {
                return Ok(None);
            }
            (to_csv(&people, PEOPLE_COLUMNS)?, people.len())
        }
        ExportTable::Entries => {
            let entries = store.query_entries(&EntryFilter {
                direction: SortDirection::Asc,
                ..Default::default()
            })?;
            if entries.is_empty() {
                return Ok(None);
            }
            (to_csv(&entries, ENTRY_COLUMNS)?, entries.len())
        }
    };
    Ok(Some((text, rows)))
}

/// Export a table to `<dir>/<name>_<date>.csv`.
pub fn write_export<S: RecordStore + ?Sized>(
    store: &S,
    ctx: &AuthContext,
    table: ExportTable,
    dir: &Path,
    date: NaiveDate,
) -> Result<ExportOutcome, SharetrackError> {
    match export_csv(store, ctx, table)? {
        None => Ok(ExportOutcome::Empty {
            message: format!("No data found in {}", table.table_name()),
        }),
        Some((text, rows)) => {
            let path = dir.join(export_file_name(table.file_stem(), date));
            std::fs::write(&path, text)?;
            tracing::info!("Exported {} rows to {}", rows, path.display());
            Ok(ExportOutcome::Written { path, rows })
        }
    }
}

/// Write failed import rows to `<dir>/failed_import_<date>.csv` for correction.
pub fn write_failed_rows(
    headers: &[String],
    rows: &[CsvRow],
    dir: &Path,
    date: NaiveDate,
) -> Result<PathBuf, SharetrackError> {
    let path = dir.join(export_file_name("failed_import", date));
    std::fs::write(&path, rows_to_csv(headers, rows)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{resolve_session, Session};
    use crate::db::Db;
    use crate::types::Role;
    use std::collections::HashMap;

    fn setup(role: Option<Role>) -> (Db, AuthContext) {
        let db = Db::open_in_memory().expect("open in-memory db");
        db.init().expect("init schema");
        let ctx = resolve_session(
            &db,
            Session {
                user_id: "u-1".into(),
                email: "ann@example.com".into(),
                full_name: Some("Ann Lee".into()),
                role_claim: role,
            },
        )
        .unwrap();
        (db, ctx)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_write_people_export() {
        let (db, ctx) = setup(Some(Role::Admin));
        let dir = tempfile::tempdir().unwrap();

        let outcome = write_export(&db, &ctx, ExportTable::People, dir.path(), day()).unwrap();
        let expected = dir.path().join("people_2024-03-09.csv");
        assert_eq!(
            outcome,
            ExportOutcome::Written {
                path: expected.clone(),
                rows: 1
            }
        );
        let text = std::fs::read_to_string(expected).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), "id,email,full_name,created_at,role");
        assert!(lines.next().unwrap().starts_with("u-1,ann@example.com,Ann Lee,"));
    }

    #[test]
    fn test_empty_table_writes_nothing() {
        let (db, ctx) = setup(Some(Role::Admin));
        let dir = tempfile::tempdir().unwrap();

        let outcome = write_export(&db, &ctx, ExportTable::Entries, dir.path(), day()).unwrap();
        assert_eq!(
            outcome,
            ExportOutcome::Empty {
                message: "No data found in gospel_share_entries".into()
            }
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_requires_admin() {
        let (db, ctx) = setup(None);
        assert!(matches!(
            export_csv(&db, &ctx, ExportTable::People),
            Err(SharetrackError::Forbidden(_))
        ));
    }

    #[test]
    fn test_failed_rows_file() {
        let dir = tempfile::tempdir().unwrap();
        let headers = vec!["email".to_string(), "notes".to_string()];
        let rows = vec![HashMap::from([
            ("email".to_string(), "ghost@x.com".to_string()),
            ("notes".to_string(), "said \"hi\", left".to_string()),
        ])];

        let path = write_failed_rows(&headers, &rows, dir.path(), day()).unwrap();
        assert!(path.ends_with("failed_import_2024-03-09.csv"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "email,notes\nghost@x.com,\"said \"\"hi\"\", left\""
        );
    }

    #[test]
    fn file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(export_file_name("people", date), "people_2024-03-09.csv");
        assert_eq!(
            export_file_name("failed_import", date),
            "failed_import_2024-03-09.csv"
        );
    }

    #[test]
    fn table_names_parse() {
        assert_eq!("all_people".parse::<ExportTable>().unwrap(), ExportTable::People);
        assert_eq!("ENTRIES".parse::<ExportTable>().unwrap(), ExportTable::Entries);
        assert!("trades".parse::<ExportTable>().is_err());
    }
}
