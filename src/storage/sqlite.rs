//! SQLite backend
//!
//! WAL journal so readers see the last committed snapshot while a writer
//! is active. Every mutation runs in a `BEGIN IMMEDIATE` transaction, which
//! takes the write lock up front; `busy_timeout` bounds the wait and a
//! timeout surfaces as `StoreError::Unavailable`.

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params, params_from_iter};
use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use super::{Backend, CleanupReport, Store, cleanup_candidates};
use crate::core::{Filter, NewNotification, Notification, ReadFilter, State};
use crate::error::{StoreError, StoreResult};
use crate::utils::now_rfc3339;

pub(crate) const DB_FILE: &str = "notifications.db";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    state TEXT NOT NULL CHECK (state IN ('active', 'dismissed')),
    session TEXT NOT NULL DEFAULT '',
    "window" TEXT NOT NULL DEFAULT '',
    pane TEXT NOT NULL DEFAULT '',
    message TEXT NOT NULL,
    pane_created TEXT NOT NULL DEFAULT '',
    level TEXT NOT NULL CHECK (level IN ('info', 'warning', 'error', 'critical')),
    read_timestamp TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_state ON notifications(state);
CREATE INDEX IF NOT EXISTS idx_notifications_session ON notifications(session);
CREATE INDEX IF NOT EXISTS idx_notifications_timestamp ON notifications(timestamp);
"#;

const SELECT_SQL: &str = r#"SELECT
    id,
    timestamp,
    state,
    session,
    "window",
    pane,
    message,
    pane_created,
    level,
    read_timestamp
FROM notifications"#;

const UPSERT_SQL: &str = r#"INSERT INTO notifications (
    id, timestamp, state, session, "window", pane, message, pane_created, level, read_timestamp, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
ON CONFLICT(id) DO UPDATE SET
    timestamp = excluded.timestamp,
    state = excluded.state,
    session = excluded.session,
    "window" = excluded."window",
    pane = excluded.pane,
    message = excluded.message,
    pane_created = excluded.pane_created,
    level = excluded.level,
    read_timestamp = excluded.read_timestamp,
    updated_at = excluded.updated_at"#;

#[derive(Debug)]
pub(crate) struct SqliteStore {
    conn: Connection,
}

struct RawRow {
    id: i64,
    timestamp: String,
    state: String,
    session: String,
    window: String,
    pane: String,
    message: String,
    pane_created: String,
    level: String,
    read_timestamp: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        state: row.get(2)?,
        session: row.get(3)?,
        window: row.get(4)?,
        pane: row.get(5)?,
        message: row.get(6)?,
        pane_created: row.get(7)?,
        level: row.get(8)?,
        read_timestamp: row.get(9)?,
    })
}

impl TryFrom<RawRow> for Notification {
    type Error = StoreError;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        let n = Notification {
            id: raw.id,
            timestamp: raw.timestamp,
            state: raw.state.parse()?,
            session: raw.session,
            window: raw.window,
            pane: raw.pane,
            message: raw.message,
            pane_created: raw.pane_created,
            level: raw.level.parse()?,
            read_timestamp: raw.read_timestamp,
        };
        n.validate()?;
        Ok(n)
    }
}

/// WHERE clause and bound values for `filter`
fn where_clause(filter: &Filter) -> (String, Vec<Value>) {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(state) = filter.state {
        clauses.push("state = ?");
        values.push(Value::Text(state.as_str().to_string()));
    }
    if let Some(level) = filter.level {
        clauses.push("level = ?");
        values.push(Value::Text(level.as_str().to_string()));
    }
    if let Some(session) = filter.session_criterion() {
        clauses.push("session = ?");
        values.push(Value::Text(session.to_string()));
    }
    if let Some(window) = filter.window_criterion() {
        clauses.push("\"window\" = ?");
        values.push(Value::Text(window.to_string()));
    }
    if let Some(pane) = filter.pane_criterion() {
        clauses.push("pane = ?");
        values.push(Value::Text(pane.to_string()));
    }
    if let Some(cutoff) = filter.older_than_criterion() {
        clauses.push("timestamp <= ?");
        values.push(Value::Text(cutoff.to_string()));
    }
    if let Some(cutoff) = filter.newer_than_criterion() {
        clauses.push("timestamp >= ?");
        values.push(Value::Text(cutoff.to_string()));
    }
    match filter.read {
        Some(ReadFilter::Read) => clauses.push("read_timestamp != ''"),
        Some(ReadFilter::Unread) => clauses.push("read_timestamp = ''"),
        None => {}
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

impl SqliteStore {
    pub(crate) fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA_SQL)?;
        log::debug!("event=store_open backend=sqlite path={}", path.display());
        Ok(Self { conn })
    }

    fn begin(&self) -> StoreResult<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    fn query(&self, filter: &Filter) -> StoreResult<Vec<Notification>> {
        let (clause, values) = where_clause(filter);
        let sql = format!("{SELECT_SQL}{clause} ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let raws = stmt
            .query_map(params_from_iter(values), read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raws.into_iter().map(Notification::try_from).collect()
    }

    fn set_state_where(&self, filter: &Filter) -> StoreResult<usize> {
        let tx = self.begin()?;
        let (clause, mut values) = where_clause(filter);
        let sql = format!("UPDATE notifications SET state = ?, updated_at = ?{clause}");
        let mut bound = vec![
            Value::Text(State::Dismissed.as_str().to_string()),
            Value::Text(now_rfc3339()),
        ];
        bound.append(&mut values);
        let changed = tx.execute(&sql, params_from_iter(bound))?;
        tx.commit()?;
        Ok(changed)
    }

    fn set_read_timestamp(&self, id: i64, read_timestamp: &str) -> StoreResult<()> {
        let tx = self.begin()?;
        let changed = tx.execute(
            "UPDATE notifications SET read_timestamp = ?1, updated_at = ?2 WHERE id = ?3",
            params![read_timestamp, now_rfc3339(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or overwrite `records` with their existing IDs in one
    /// transaction. Used by migration.
    pub(crate) fn upsert_all(&self, records: &[Notification]) -> StoreResult<usize> {
        let tx = self.begin()?;
        let now = now_rfc3339();
        {
            let mut stmt = tx.prepare(UPSERT_SQL)?;
            for n in records {
                n.validate()?;
                stmt.execute(params![
                    n.id,
                    n.timestamp,
                    n.state.as_str(),
                    n.session,
                    n.window,
                    n.pane,
                    n.message,
                    n.pane_created,
                    n.level.as_str(),
                    n.read_timestamp,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }
}

impl Store for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn add(&self, new: NewNotification) -> StoreResult<i64> {
        new.validate()?;
        let tx = self.begin()?;
        // AUTOINCREMENT keeps the high-water mark in sqlite_sequence, so a
        // deleted ID is never handed out again.
        let last: i64 = tx.query_row(
            "SELECT MAX(
                COALESCE((SELECT seq FROM sqlite_sequence WHERE name = 'notifications'), 0),
                COALESCE((SELECT MAX(id) FROM notifications), 0)
            )",
            [],
            |row| row.get(0),
        )?;
        let now = now_rfc3339();
        let n = new.into_notification(last + 1, &now)?;
        tx.execute(
            r#"INSERT INTO notifications (
                id, timestamp, state, session, "window", pane, message, pane_created, level, read_timestamp, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
            params![
                n.id,
                n.timestamp,
                n.state.as_str(),
                n.session,
                n.window,
                n.pane,
                n.message,
                n.pane_created,
                n.level.as_str(),
                n.read_timestamp,
                now,
            ],
        )?;
        tx.commit()?;
        log::debug!("event=notification_added backend=sqlite id={}", n.id);
        Ok(n.id)
    }

    fn list(&self, filter: &Filter) -> StoreResult<Vec<Notification>> {
        self.query(filter)
    }

    fn get(&self, id: i64) -> StoreResult<Notification> {
        let raw = self
            .conn
            .query_row(&format!("{SELECT_SQL} WHERE id = ?1"), params![id], read_row)
            .optional()?
            .ok_or(StoreError::NotFound { id })?;
        Notification::try_from(raw)
    }

    fn dismiss(&self, id: i64) -> StoreResult<()> {
        let tx = self.begin()?;
        let state: Option<String> = tx
            .query_row(
                "SELECT state FROM notifications WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match state.as_deref() {
            None => return Err(StoreError::NotFound { id }),
            Some("dismissed") => return Err(StoreError::AlreadyDismissed { id }),
            Some(_) => {}
        }
        tx.execute(
            "UPDATE notifications SET state = 'dismissed', updated_at = ?1 WHERE id = ?2",
            params![now_rfc3339(), id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn dismiss_all(&self) -> StoreResult<usize> {
        self.set_state_where(&Filter::active())
    }

    fn dismiss_by_filter(&self, session: &str, window: &str, pane: &str) -> StoreResult<usize> {
        let filter = Filter {
            state: Some(State::Active),
            ..Filter::origin(session, window, pane)
        };
        self.set_state_where(&filter)
    }

    fn mark_read(&self, id: i64) -> StoreResult<()> {
        self.set_read_timestamp(id, &now_rfc3339())
    }

    fn mark_unread(&self, id: i64) -> StoreResult<()> {
        self.set_read_timestamp(id, "")
    }

    fn cleanup_old(&self, days: u32, dry_run: bool) -> StoreResult<CleanupReport> {
        let tx = self.begin()?;
        let dismissed = {
            let (clause, values) = where_clause(&Filter {
                state: Some(State::Dismissed),
                ..Filter::default()
            });
            let mut stmt = tx.prepare(&format!("{SELECT_SQL}{clause}"))?;
            stmt.query_map(params_from_iter(values), read_row)?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .map(Notification::try_from)
                .collect::<StoreResult<Vec<_>>>()?
        };
        let candidates = cleanup_candidates(&dismissed, days, Utc::now());
        if dry_run {
            return Ok(CleanupReport {
                candidates,
                deleted: 0,
            });
        }

        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM notifications WHERE id = ?1")?;
            for id in &candidates {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
        log::info!("event=cleanup backend=sqlite deleted={deleted}");
        Ok(CleanupReport {
            candidates,
            deleted,
        })
    }

    fn active_count(&self) -> StoreResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE state = 'active'",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
