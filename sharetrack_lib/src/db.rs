//! SQLite storage for people and gospel-share entries.

use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::paging::{page_bounds, Page};
use crate::store::{EntryFilter, PeopleQuery, RecordStore, StoreError};
use crate::types::{
    normalize_email, Entry, EntryUpdate, NewEntry, NewPerson, Person, PersonUpdate, Role,
};

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

const PERSON_COLUMNS: &str = "id, email, full_name, created_at, role";

const ENTRY_COLUMNS: &str = "id, person_id, user_id, entry_date, number_reached,
    church_invite, spiritual_conversation, story_share, gospel_presentation,
    gospel_response, number_response, notes, created_at";

pub struct Db {
    conn: Connection,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection (for tests and fixtures).
    #[doc(hidden)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn init(&self) -> Result<(), DbError> {
        // Migrations run before the DDL so an older people table gains the
        // role column before anything references it.
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.migrate_v1()?;
            self.conn.pragma_update(None, "user_version", 1)?;
        }
        if version < 2 {
            self.migrate_v2()?;
            self.conn.pragma_update(None, "user_version", 2)?;
        }

        let schema = include_str!("../../schema/sqlite.sql");
        self.conn.execute_batch(schema)?;

        Ok(())
    }

    fn migrate_v1(&self) -> Result<(), DbError> {
        match self.conn.execute(
            "ALTER TABLE people ADD COLUMN role TEXT NOT NULL DEFAULT 'user'",
            [],
        ) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(_, Some(ref msg)))
                if msg.contains("duplicate column name") || msg.contains("no such table") => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Rewrite stored emails into their normalized form.
    fn migrate_v2(&self) -> Result<(), DbError> {
        let has_people: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'people')",
            [],
            |row| row.get(0),
        )?;
        if !has_people {
            return Ok(());
        }

        let mut stmt = self.conn.prepare("SELECT id, email FROM people")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        for (id, email) in rows {
            let normalized = normalize_email(&email);
            if normalized == email {
                continue;
            }
            match self.conn.execute(
                "UPDATE people SET email = ?1 WHERE id = ?2",
                params![normalized, id],
            ) {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    tracing::warn!(
                        "Leaving email '{}' on person {} as-is: '{}' already exists",
                        email,
                        id,
                        normalized
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn person_count(&self) -> Result<i64, DbError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(1) FROM people", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn entry_count(&self) -> Result<i64, DbError> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(1) FROM gospel_share_entries", [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }
}

/// Random (version 4) UUID in hyphenated text form.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    let role: Option<String> = row.get(4)?;
    Ok(Person {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        created_at: row.get(3)?,
        role: match role.as_deref() {
            Some("admin") => Role::Admin,
            _ => Role::User,
        },
    })
}

// NULL numeric and flag columns read as 0 / false.
fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: row.get(0)?,
        person_id: row.get(1)?,
        user_id: row.get(2)?,
        entry_date: row.get(3)?,
        number_reached: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        church_invite: row.get::<_, Option<bool>>(5)?.unwrap_or(false),
        spiritual_conversation: row.get::<_, Option<bool>>(6)?.unwrap_or(false),
        story_share: row.get::<_, Option<bool>>(7)?.unwrap_or(false),
        gospel_presentation: row.get::<_, Option<bool>>(8)?.unwrap_or(false),
        gospel_response: row.get::<_, Option<bool>>(9)?.unwrap_or(false),
        number_response: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        notes: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl Db {
    fn person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        let sql = format!(
            "SELECT {} FROM people WHERE email = ?1",
            PERSON_COLUMNS
        );
        self.conn
            .query_row(&sql, params![normalize_email(email)], person_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    fn require_person(&self, id: &str) -> Result<Person, StoreError> {
        self.get_person(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "person",
            id: id.to_string(),
        })
    }

    fn require_entry(&self, id: &str) -> Result<Entry, StoreError> {
        self.get_entry(id)?.ok_or_else(|| StoreError::NotFound {
            kind: "entry",
            id: id.to_string(),
        })
    }
}

impl RecordStore for Db {
    fn list_people(&self) -> Result<Vec<Person>, StoreError> {
        let sql = format!("SELECT {} FROM people ORDER BY created_at, id", PERSON_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], person_from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    fn get_person(&self, id: &str) -> Result<Option<Person>, StoreError> {
        let sql = format!("SELECT {} FROM people WHERE id = ?1", PERSON_COLUMNS);
        self.conn
            .query_row(&sql, params![id], person_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    fn find_person_by_email(&self, email: &str) -> Result<Option<Person>, StoreError> {
        self.person_by_email(email)
    }

    /// Query people with an optional name search, ordered by a whitelisted
    /// column and cut to one page. The total counts every match.
    fn search_people(&self, query: &PeopleQuery) -> Result<Page<Person>, StoreError> {
        let mut where_clause = String::from("WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref search) = query.search {
            where_clause.push_str(" AND full_name LIKE ?1");
            params_vec.push(Box::new(format!("%{}%", search)));
        }

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(1) FROM people {}", where_clause),
            param_refs.as_slice(),
            |row| row.get(0),
        )?;

        let (start, _) = page_bounds(query.page, query.page_size);
        let sql = format!(
            "SELECT {} FROM people {} ORDER BY {} {}, id ASC LIMIT {} OFFSET {}",
            PERSON_COLUMNS,
            where_clause,
            query.sort.column(),
            query.direction.as_sql(),
            query.page_size,
            start
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), person_from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }

        Ok(Page {
            items,
            total: total as usize,
            page: query.page,
            page_size: query.page_size,
        })
    }

    fn insert_person(&self, person: &NewPerson) -> Result<Person, StoreError> {
        let id = person.id.clone().unwrap_or_else(new_id);
        self.conn.execute(
            "INSERT INTO people (id, email, full_name, created_at, role)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                normalize_email(&person.email),
                person.full_name,
                now_timestamp(),
                person.role.as_str()
            ],
        )?;
        self.require_person(&id)
    }

    fn upsert_person_by_email(&self, person: &NewPerson) -> Result<Person, StoreError> {
        let id = person.id.clone().unwrap_or_else(new_id);
        let email = normalize_email(&person.email);
        self.conn.execute(
            "INSERT INTO people (id, email, full_name, created_at, role)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(email) DO UPDATE SET full_name = excluded.full_name",
            params![
                id,
                email,
                person.full_name,
                now_timestamp(),
                person.role.as_str()
            ],
        )?;
        self.person_by_email(&email)?
            .ok_or_else(|| StoreError::NotFound {
                kind: "person",
                id: email.clone(),
            })
    }

    fn update_person(&self, id: &str, update: &PersonUpdate) -> Result<Person, StoreError> {
        let mut sets: Vec<String> = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(ref email) = update.email {
            sets.push(format!("email = ?{}", param_idx));
            params_vec.push(Box::new(normalize_email(email)));
            param_idx += 1;
        }
        if let Some(ref full_name) = update.full_name {
            sets.push(format!("full_name = ?{}", param_idx));
            params_vec.push(Box::new(full_name.clone()));
            param_idx += 1;
        }
        if let Some(role) = update.role {
            sets.push(format!("role = ?{}", param_idx));
            params_vec.push(Box::new(role.as_str()));
            param_idx += 1;
        }

        if sets.is_empty() {
            return self.require_person(id);
        }

        let sql = format!(
            "UPDATE people SET {} WHERE id = ?{}",
            sets.join(", "),
            param_idx
        );
        params_vec.push(Box::new(id.to_string()));

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let changed = self.conn.execute(&sql, param_refs.as_slice())?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "person",
                id: id.to_string(),
            });
        }
        self.require_person(id)
    }

    fn relink_person(&self, old_id: &str, new_id: &str) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        // Entries follow through ON UPDATE CASCADE; the explicit update also
        // covers databases created with foreign keys disabled.
        let changed = tx.execute(
            "UPDATE people SET id = ?2 WHERE id = ?1",
            params![old_id, new_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "person",
                id: old_id.to_string(),
            });
        }
        tx.execute(
            "UPDATE gospel_share_entries SET person_id = ?2 WHERE person_id = ?1",
            params![old_id, new_id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn insert_entry(&self, entry: &NewEntry) -> Result<Entry, StoreError> {
        let id = new_id();
        self.conn.execute(
            "INSERT INTO gospel_share_entries (
                id, person_id, entry_date, number_reached, church_invite,
                spiritual_conversation, story_share, gospel_presentation,
                gospel_response, number_response, notes, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                entry.person_id,
                entry.entry_date,
                entry.number_reached,
                entry.church_invite,
                entry.spiritual_conversation,
                entry.story_share,
                entry.gospel_presentation,
                entry.gospel_response,
                entry.number_response,
                entry.notes,
                now_timestamp(),
            ],
        )?;
        self.require_entry(&id)
    }

    fn get_entry(&self, id: &str) -> Result<Option<Entry>, StoreError> {
        let sql = format!(
            "SELECT {} FROM gospel_share_entries WHERE id = ?1",
            ENTRY_COLUMNS
        );
        self.conn
            .query_row(&sql, params![id], entry_from_row)
            .optional()
            .map_err(StoreError::from)
    }

    fn update_entry(&self, id: &str, update: &EntryUpdate) -> Result<Entry, StoreError> {
        let changed = self.conn.execute(
            "UPDATE gospel_share_entries SET
                entry_date = ?2,
                number_reached = ?3,
                church_invite = ?4,
                spiritual_conversation = ?5,
                story_share = ?6,
                gospel_presentation = ?7,
                gospel_response = ?8,
                number_response = ?9,
                notes = ?10
             WHERE id = ?1",
            params![
                id,
                update.entry_date,
                update.number_reached,
                update.church_invite,
                update.spiritual_conversation,
                update.story_share,
                update.gospel_presentation,
                update.gospel_response,
                update.number_response,
                update.notes,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "entry",
                id: id.to_string(),
            });
        }
        self.require_entry(id)
    }

    fn delete_entry(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM gospel_share_entries WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                kind: "entry",
                id: id.to_string(),
            });
        }
        Ok(())
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>, StoreError> {
        let mut sql = format!(
            "SELECT {} FROM gospel_share_entries WHERE 1=1",
            ENTRY_COLUMNS
        );

        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut param_idx = 1;

        if let Some(ref person_id) = filter.person_id {
            sql.push_str(&format!(" AND person_id = ?{}", param_idx));
            params_vec.push(Box::new(person_id.clone()));
            param_idx += 1;
        }
        if let Some(start) = filter.start {
            sql.push_str(&format!(" AND entry_date >= ?{}", param_idx));
            params_vec.push(Box::new(start.to_string()));
            param_idx += 1;
        }
        if let Some(end) = filter.end {
            sql.push_str(&format!(" AND entry_date <= ?{}", param_idx));
            params_vec.push(Box::new(end.to_string()));
        }

        let dir = filter.direction.as_sql();
        sql.push_str(&format!(" ORDER BY entry_date {dir}, created_at {dir}, id {dir}"));

        if let Some(n) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), entry_from_row)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
