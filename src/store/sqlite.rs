use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};

use crate::app::{FreshetError, Result};
use crate::domain::VersionMarker;
use crate::store::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations.to_latest(&mut conn)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FreshetError::Poisoned(e.to_string()))
    }
}

impl Store for SqliteStore {
    fn load_marker(&self, resource: &str) -> Result<Option<VersionMarker>> {
        let conn = self.lock()?;

        let value = conn
            .query_row(
                "SELECT value FROM markers WHERE resource = ?1",
                params![resource],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value.map(VersionMarker::from))
    }

    fn save_marker(&self, resource: &str, marker: &VersionMarker) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO markers (resource, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(resource) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![resource, marker.as_str(), Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn list_markers(&self) -> Result<Vec<(String, VersionMarker)>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare("SELECT resource, value FROM markers ORDER BY resource")?;
        let markers = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .map(|row| row.map(|(resource, value)| (resource, VersionMarker::from(value))))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(markers)
    }

    fn load_snapshot(&self, name: &str) -> Result<Option<String>> {
        let conn = self.lock()?;

        let body = conn
            .query_row(
                "SELECT body FROM snapshots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body)
    }

    fn save_snapshot(&self, name: &str, body: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO snapshots (name, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![name, body, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    fn reset(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM markers; DELETE FROM snapshots;")?;
        Ok(())
    }
}
