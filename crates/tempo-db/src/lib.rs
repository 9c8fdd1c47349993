//! Storage layer for the tempo time tracker.
//!
//! Provides persistence for the taxonomy (categories, subcategories, tags),
//! completed sessions, and the single active timer using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. For multi-threaded access, use a `Mutex<Database>` or separate
//! instances per thread.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision (e.g., `2024-01-09T09:00:00.000Z`), always UTC, so lexicographic
//! ordering matches chronological ordering and range queries can compare
//! strings directly. Tag sets are stored as a JSON array of ids in a TEXT
//! column.
//!
//! Rows with unparseable timestamps or tag lists are skipped with a warning
//! when reading sessions: one bad historical record degrades a single total
//! rather than failing an entire report.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tempo_core::{
    ActiveTimer, Category, CategoryId, Session, SessionId, SessionStore, Subcategory,
    SubcategoryId, Tag, TagId,
};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A timer operation required a running timer but none exists.
    #[error("no active timer")]
    NoActiveTimer,
}

/// A session waiting to be inserted; the store assigns the id and computes
/// the wall-clock `duration_ms` on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub tag_ids: Vec<TagId>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

fn encode_tag_ids(tag_ids: &[TagId]) -> String {
    // Vec<i64> serialization to a JSON array cannot fail
    serde_json::to_string(tag_ids).unwrap_or_else(|_| "[]".to_string())
}

/// A session row as stored, before timestamp and tag-list decoding.
struct SessionRow {
    id: i64,
    category_id: i64,
    subcategory_id: Option<i64>,
    tag_ids: String,
    started_at: String,
    ended_at: String,
    duration_ms: i64,
}

impl SessionRow {
    /// Decodes the row, returning `None` (with a warning) if the stored
    /// timestamps or tag list are unparseable.
    fn decode(self) -> Option<Session> {
        let started_at = parse_timestamp(&self.started_at)
            .inspect_err(|err| {
                tracing::warn!(session_id = self.id, raw = %self.started_at, %err,
                    "skipping session with unparseable start timestamp");
            })
            .ok()?;
        let ended_at = parse_timestamp(&self.ended_at)
            .inspect_err(|err| {
                tracing::warn!(session_id = self.id, raw = %self.ended_at, %err,
                    "skipping session with unparseable end timestamp");
            })
            .ok()?;
        let tag_ids: Vec<TagId> = serde_json::from_str(&self.tag_ids)
            .inspect_err(|err| {
                tracing::warn!(session_id = self.id, raw = %self.tag_ids, %err,
                    "skipping session with unparseable tag list");
            })
            .ok()?;
        Some(Session {
            id: SessionId::new(self.id),
            category_id: CategoryId::new(self.category_id),
            subcategory_id: self.subcategory_id.map(SubcategoryId::new),
            tag_ids,
            started_at,
            ended_at,
            duration_ms: self.duration_ms,
        })
    }
}

const SESSION_COLUMNS: &str =
    "id, category_id, subcategory_id, tag_ids, started_at, ended_at, duration_ms";

/// Inserts a session on any connection handle, so timer conversions can run
/// inside the same transaction that mutates the `active_timer` row.
fn insert_session_on(conn: &Connection, session: &NewSession) -> Result<SessionId, DbError> {
    let duration_ms = (session.ended_at - session.started_at).num_milliseconds();
    conn.execute(
        "
        INSERT INTO sessions (category_id, subcategory_id, tag_ids, started_at, ended_at, duration_ms)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![
            session.category_id.get(),
            session.subcategory_id.map(SubcategoryId::get),
            encode_tag_ids(&session.tag_ids),
            format_timestamp(session.started_at),
            format_timestamp(session.ended_at),
            duration_ms,
        ],
    )?;
    Ok(SessionId::new(conn.last_insert_rowid()))
}

fn map_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        category_id: row.get(1)?,
        subcategory_id: row.get(2)?,
        tag_ids: row.get(3)?,
        started_at: row.get(4)?,
        ended_at: row.get(5)?,
        duration_ms: row.get(6)?,
    })
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subcategories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_subcategories_category
                ON subcategories(category_id);

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            -- Sessions: completed blocks of tracked time
            -- started_at/ended_at: RFC 3339 UTC with millisecond precision
            -- tag_ids: JSON array of tag ids
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                subcategory_id INTEGER,
                tag_ids TEXT NOT NULL DEFAULT '[]',
                started_at TEXT NOT NULL,
                ended_at TEXT NOT NULL,
                duration_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at);
            CREATE INDEX IF NOT EXISTS idx_sessions_category ON sessions(category_id);

            -- At most one row: the currently running timer
            CREATE TABLE IF NOT EXISTS active_timer (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL,
                subcategory_id INTEGER,
                tag_ids TEXT NOT NULL DEFAULT '[]',
                started_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    // ========== Taxonomy ==========

    /// Adds a category, returning its assigned id.
    pub fn add_category(&self, name: &str) -> Result<CategoryId, DbError> {
        self.conn
            .execute("INSERT INTO categories (name) VALUES (?)", params![name])?;
        Ok(CategoryId::new(self.conn.last_insert_rowid()))
    }

    /// Lists all categories ordered by name.
    pub fn list_categories(&self) -> Result<Vec<Category>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: CategoryId::new(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }

    /// Deletes a category; its subcategories are removed by the cascade.
    pub fn delete_category(&self, id: CategoryId) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM categories WHERE id = ?", params![id.get()])?;
        Ok(())
    }

    /// Adds a subcategory under a parent category.
    pub fn add_subcategory(
        &self,
        name: &str,
        category_id: CategoryId,
    ) -> Result<SubcategoryId, DbError> {
        self.conn.execute(
            "INSERT INTO subcategories (name, category_id) VALUES (?, ?)",
            params![name, category_id.get()],
        )?;
        Ok(SubcategoryId::new(self.conn.last_insert_rowid()))
    }

    /// Lists the subcategories of one category, ordered by name.
    pub fn subcategories_for_category(
        &self,
        category_id: CategoryId,
    ) -> Result<Vec<Subcategory>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category_id FROM subcategories WHERE category_id = ? ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![category_id.get()], |row| {
            Ok(Subcategory {
                id: SubcategoryId::new(row.get(0)?),
                name: row.get(1)?,
                category_id: CategoryId::new(row.get(2)?),
            })
        })?;
        let mut subcategories = Vec::new();
        for row in rows {
            subcategories.push(row?);
        }
        Ok(subcategories)
    }

    /// Deletes a subcategory.
    pub fn delete_subcategory(&self, id: SubcategoryId) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM subcategories WHERE id = ?", params![id.get()])?;
        Ok(())
    }

    /// Adds a tag, returning its assigned id.
    pub fn add_tag(&self, name: &str) -> Result<TagId, DbError> {
        self.conn
            .execute("INSERT INTO tags (name) VALUES (?)", params![name])?;
        Ok(TagId::new(self.conn.last_insert_rowid()))
    }

    /// Lists all tags ordered by name.
    pub fn list_tags(&self) -> Result<Vec<Tag>, DbError> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM tags ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok(Tag {
                id: TagId::new(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    /// Deletes a tag. Sessions keep their stored tag ids; dangling ids are
    /// harmless to the aggregator, which treats them as opaque.
    pub fn delete_tag(&self, id: TagId) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM tags WHERE id = ?", params![id.get()])?;
        Ok(())
    }

    // ========== Sessions ==========

    /// Inserts a completed session, computing its wall-clock duration.
    pub fn insert_session(&self, session: &NewSession) -> Result<SessionId, DbError> {
        insert_session_on(&self.conn, session)
    }

    /// Returns sessions whose `started_at` lies within the range, both bounds
    /// inclusive, ordered by start time then id.
    pub fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE started_at >= ? AND started_at <= ?
            ORDER BY started_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(
            params![format_timestamp(start), format_timestamp(end)],
            map_session_row,
        )?;
        let mut sessions = Vec::new();
        for row in rows {
            if let Some(session) = row?.decode() {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    /// Returns all sessions recorded against one category.
    pub fn sessions_for_category(&self, category_id: CategoryId) -> Result<Vec<Session>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE category_id = ?
            ORDER BY started_at ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map(params![category_id.get()], map_session_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            if let Some(session) = row?.decode() {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    // ========== Active timer ==========

    /// Returns the running timer, if any.
    pub fn active_timer(&self) -> Result<Option<ActiveTimer>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT category_id, subcategory_id, tag_ids, started_at
                 FROM active_timer ORDER BY id ASC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((category_id, subcategory_id, tag_ids, started_at)) = row else {
            return Ok(None);
        };
        let Ok(started_at) = parse_timestamp(&started_at) else {
            tracing::warn!(raw = %started_at, "active timer has unparseable start, ignoring it");
            return Ok(None);
        };
        let tag_ids: Vec<TagId> = serde_json::from_str(&tag_ids).unwrap_or_else(|err| {
            tracing::warn!(raw = %tag_ids, %err, "active timer has unparseable tags, treating as untagged");
            Vec::new()
        });
        Ok(Some(ActiveTimer {
            category_id: CategoryId::new(category_id),
            subcategory_id: subcategory_id.map(SubcategoryId::new),
            tag_ids,
            started_at,
        }))
    }

    /// Starts a timer at `now`, replacing any running one.
    ///
    /// A previously running timer is first converted to a session ending at
    /// `now`; its new session id is returned so callers can surface the
    /// implicit stop. The conversion and the timer replacement commit as one
    /// transaction, so a failure leaves neither a stray session nor a stale
    /// timer behind.
    pub fn start_timer(
        &mut self,
        category_id: CategoryId,
        subcategory_id: Option<SubcategoryId>,
        tag_ids: &[TagId],
        now: DateTime<Utc>,
    ) -> Result<Option<SessionId>, DbError> {
        let previous = self.active_timer()?;
        let tx = self.conn.transaction()?;
        let converted = match previous {
            Some(timer) => Some(insert_session_on(
                &tx,
                &NewSession {
                    category_id: timer.category_id,
                    subcategory_id: timer.subcategory_id,
                    tag_ids: timer.tag_ids,
                    started_at: timer.started_at,
                    ended_at: now,
                },
            )?),
            None => None,
        };
        tx.execute("DELETE FROM active_timer", [])?;
        tx.execute(
            "INSERT INTO active_timer (category_id, subcategory_id, tag_ids, started_at)
             VALUES (?, ?, ?, ?)",
            params![
                category_id.get(),
                subcategory_id.map(SubcategoryId::get),
                encode_tag_ids(tag_ids),
                format_timestamp(now),
            ],
        )?;
        tx.commit()?;
        Ok(converted)
    }

    /// Stops the running timer at `now`, converting it to a session.
    ///
    /// Returns the recorded session. Fails with [`DbError::NoActiveTimer`] if
    /// no timer is running. The session insert and the timer clear commit as
    /// one transaction; if either fails, the timer keeps running and no
    /// session is recorded, so a retry cannot double-count.
    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Result<Session, DbError> {
        let timer = self.active_timer()?.ok_or(DbError::NoActiveTimer)?;
        let tx = self.conn.transaction()?;
        let id = insert_session_on(
            &tx,
            &NewSession {
                category_id: timer.category_id,
                subcategory_id: timer.subcategory_id,
                tag_ids: timer.tag_ids.clone(),
                started_at: timer.started_at,
                ended_at: now,
            },
        )?;
        tx.execute("DELETE FROM active_timer", [])?;
        tx.commit()?;
        Ok(Session {
            id,
            category_id: timer.category_id,
            subcategory_id: timer.subcategory_id,
            tag_ids: timer.tag_ids,
            started_at: timer.started_at,
            ended_at: now,
            duration_ms: (now - timer.started_at).num_milliseconds(),
        })
    }

    // ========== Seed data ==========

    /// Seeds sample taxonomy data for first runs.
    ///
    /// Returns `false` without touching anything if any category already
    /// exists.
    pub fn seed_sample_data(&mut self) -> Result<bool, DbError> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if existing > 0 {
            tracing::debug!("sample data already present, skipping seed");
            return Ok(false);
        }

        let tx = self.conn.transaction()?;
        {
            let mut add_category = tx.prepare("INSERT INTO categories (name) VALUES (?)")?;
            let mut add_subcategory =
                tx.prepare("INSERT INTO subcategories (name, category_id) VALUES (?, ?)")?;
            let mut add_tag = tx.prepare("INSERT INTO tags (name) VALUES (?)")?;

            let subcategories: [(&str, &[&str]); 3] = [
                ("Work", &["Development", "Meetings", "Email"]),
                ("Personal", &["Exercise", "Reading"]),
                ("Learning", &["Tutorials", "Documentation"]),
            ];
            for (category, subs) in subcategories {
                add_category.execute(params![category])?;
                let category_id = tx.last_insert_rowid();
                for sub in subs {
                    add_subcategory.execute(params![sub, category_id])?;
                }
            }

            for tag in [
                "Rust",
                "TypeScript",
                "Frontend",
                "Backend",
                "Research",
                "Planning",
                "Bug Fix",
                "Feature",
            ] {
                add_tag.execute(params![tag])?;
            }
        }
        tx.commit()?;
        Ok(true)
    }
}

impl SessionStore for Database {
    type Error = DbError;

    fn sessions_started_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Session>, Self::Error> {
        // Delegates to the inherent method of the same name
        Database::sessions_started_between(self, start, end)
    }
}
