//! Library layer for Sharetrack: gospel-share records, reporting rollups,
//! and the CSV import/export pipeline.
//!
//! Storage is reached through the [`RecordStore`] trait; [`Db`] is the SQLite
//! implementation. Callers resolve a [`Session`] once into an [`AuthContext`]
//! and pass it to every operation that needs to know who is asking.

pub mod aggregate;
pub mod auth;
pub mod cache;
pub mod config;
pub mod csv_io;
pub mod dashboard;
pub mod date_range;
pub mod db;
pub mod entries;
pub mod error;
pub mod export;
pub mod import;
pub mod paging;
pub mod people;
pub mod store;
pub mod types;
pub mod validation;

pub use aggregate::{
    aggregate_entries, format_display_name, Aggregates, ChartPoint, OverallAgg, Totals, UserAgg,
    UserAggColumn,
};
pub use auth::{resolve_session, AuthContext, Session};
pub use config::{Config, ConfigError};
pub use csv_io::{parse_csv, preview, to_csv, CsvError, CsvPreview, ParsedCsv};
pub use dashboard::{admin_dashboard, personal_dashboard, AdminDashboard, PersonalDashboard};
pub use date_range::{date_range, DateRange, RangeKey};
pub use db::{Db, DbError};
pub use error::SharetrackError;
pub use export::{ExportOutcome, ExportTable};
pub use import::{import_csv, ImportError, ImportKind, ImportOptions, ImportResult};
pub use paging::{Page, SortDirection, SortState, PAGE_SIZE_CHOICES};
pub use store::{EntryFilter, PeopleQuery, PeopleSort, RecordStore, StoreError};
pub use types::{CsvRow, Entry, NewEntry, NewPerson, Person, PersonUpdate, Role};
