//! `SQLite`-backed record store.
//!
//! Each record is a JSON document keyed by (collection, id). Filtering and
//! ordering happen in Rust over the decoded documents, which is plenty for
//! the handful of agents and articles a single newsroom keeps.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension, params};

use super::store::{DataStore, Query, Record, expectations_hold, merge, new_record_id};
use crate::error::{NewsroomError, Result};

const STORE_MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE IF NOT EXISTS records (\
                collection TEXT NOT NULL,\
                id TEXT NOT NULL,\
                doc TEXT NOT NULL,\
                PRIMARY KEY (collection, id)\
              );",
    },
    Migration {
        version: 2,
        sql: "ALTER TABLE records ADD COLUMN created_at TEXT;\
              CREATE INDEX IF NOT EXISTS idx_records_collection ON records (collection, created_at);",
    },
];

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: i32,
    sql: &'static str,
}

/// Run schema migrations. Returns the latest schema version applied.
///
/// # Errors
/// Returns an error if creating the migrations table, reading the schema
/// version, or applying any migration fails.
pub fn run_migrations(conn: &mut Connection) -> Result<i32> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (\
            version INTEGER PRIMARY KEY,\
            applied_at TEXT DEFAULT (datetime('now'))\
        );",
    )
    .context("create schema_migrations")?;

    let mut current: i32 = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
            row.get::<_, Option<i32>>(0)
        })?
        .unwrap_or(0);

    for migration in STORE_MIGRATIONS {
        if migration.version > current {
            let tx = conn.transaction()?;
            tx.execute_batch(migration.sql)
                .with_context(|| format!("apply store migration {}", migration.version))?;
            tx.execute(
                "INSERT INTO schema_migrations (version) VALUES (?1)",
                [migration.version],
            )
            .with_context(|| format!("record store migration {}", migration.version))?;
            tx.commit()?;
            tracing::debug!(version = migration.version, "Applied store migration");
            current = migration.version;
        }
    }

    Ok(current)
}

/// Record store in a single `SQLite` file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    principal: Option<String>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("principal", &self.principal)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Create or open a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the parent directory cannot be created, the
    /// database cannot be opened, or migrations fail.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        run_migrations(&mut conn)?;
        tracing::debug!(?path, "Opened store");
        Ok(Self {
            conn: Mutex::new(conn),
            principal: None,
        })
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    /// Returns an error if migrations fail.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        run_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            principal: None,
        })
    }

    /// Report `principal` as the authenticated user.
    #[must_use]
    pub fn with_principal(mut self, principal: Option<String>) -> Self {
        self.principal = principal;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| NewsroomError::Store("store connection lock poisoned".to_string()))
    }

    fn load(conn: &Connection, collection: &str, id: &str) -> Result<Option<Record>> {
        let doc: Option<String> = conn
            .query_row(
                "SELECT doc FROM records WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        doc.map(|d| decode(&d)).transpose()
    }

    fn save(conn: &Connection, collection: &str, id: &str, record: &Record) -> Result<()> {
        conn.execute(
            "UPDATE records SET doc = ?3 WHERE collection = ?1 AND id = ?2",
            params![collection, id, serde_json::to_string(record)?],
        )?;
        Ok(())
    }
}

fn decode(doc: &str) -> Result<Record> {
    match serde_json::from_str(doc)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(NewsroomError::Store("stored document is not an object".to_string())),
    }
}

impl DataStore for SqliteStore {
    fn insert(&self, collection: &str, mut fields: Record) -> Result<String> {
        let id = match fields.get("id").and_then(serde_json::Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => new_record_id(),
        };
        fields.insert("id".to_string(), serde_json::Value::String(id.clone()));

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO records (collection, id, doc, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                collection,
                id,
                serde_json::to_string(&fields)?,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, fields: Record) -> Result<()> {
        let conn = self.conn()?;
        let mut record = Self::load(&conn, collection, id)?
            .ok_or_else(|| NewsroomError::Store(format!("{collection}/{id} not found")))?;
        merge(&mut record, fields);
        Self::save(&conn, collection, id, &record)
    }

    fn update_if(&self, collection: &str, id: &str, expected: &Record, fields: Record) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let Some(mut record) = Self::load(&tx, collection, id)? else {
            return Ok(false);
        };
        if !expectations_hold(&record, expected) {
            return Ok(false);
        }
        merge(&mut record, fields);
        Self::save(&tx, collection, id, &record)?;
        tx.commit()?;
        Ok(true)
    }

    fn select(&self, collection: &str, query: &Query) -> Result<Vec<Record>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare_cached("SELECT doc FROM records WHERE collection = ?1 ORDER BY rowid")?;
        let docs = stmt
            .query_map([collection], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let records = docs
            .iter()
            .map(|d| decode(d))
            .collect::<Result<Vec<_>>>()?;
        Ok(query.apply(records))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(deleted > 0)
    }

    fn current_principal(&self) -> Option<String> {
        self.principal.clone()
    }
}
