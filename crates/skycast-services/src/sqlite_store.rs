//! SQLite-based record storage.
//!
//! `SqliteStore` keeps both collections (`locations` and `profile`) in one
//! database file. Ids come from `AUTOINCREMENT`, so they are never reused,
//! even after a clear.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use skycast_core::{DatabaseError, RusqliteErrorExt};
use skycast_weather::Location;
use std::path::Path;

use crate::store::{validate_location, RecordStore, StoreError, StoreResult, UserProfile};

const SCHEMA_VERSION: i32 = 1;

fn db_err(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.into_database_error())
}

/// Like `db_err`, but reports a clash on the coordinate index as a duplicate.
fn location_write_err(e: rusqlite::Error, location: &Location) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::Duplicate(format!(
                "a location at ({}, {}) is already saved",
                location.lat, location.lon
            ))
        }
        _ => db_err(e),
    }
}

/// Local SQLite storage for locations and the user profile
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database, including its parent directory.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(DatabaseError::ConnectionFailed(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let conn = Connection::open(path).map_err(db_err)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema and record its version
    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
            [],
        )
        .map_err(db_err)?;

        let version: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()
            .map_err(db_err)?;

        if let Some(v) = version {
            if v > SCHEMA_VERSION {
                return Err(StoreError::Database(DatabaseError::MigrationFailed(format!(
                    "database schema v{} is newer than supported v{}",
                    v, SCHEMA_VERSION
                ))));
            }
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city TEXT NOT NULL,
                state TEXT,
                country TEXT NOT NULL,
                lat REAL NOT NULL,
                lon REAL NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_locations_coords ON locations(lat, lon);

            CREATE TABLE IF NOT EXISTS profile (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                avatar TEXT
            );",
        )
        .map_err(|e| StoreError::Database(DatabaseError::MigrationFailed(e.to_string())))?;

        if version.is_none() {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;
        }

        Ok(())
    }

    fn row_to_location(row: &rusqlite::Row) -> rusqlite::Result<Location> {
        Ok(Location {
            id: Some(row.get(0)?),
            city: row.get(1)?,
            state: row.get(2)?,
            country: row.get(3)?,
            lat: row.get(4)?,
            lon: row.get(5)?,
        })
    }

    fn row_to_profile(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            email: row.get(2)?,
            phone: row.get(3)?,
            avatar: row.get(4)?,
        })
    }
}

impl RecordStore<Location> for SqliteStore {
    fn add(&self, record: &Location) -> StoreResult<i64> {
        validate_location(record)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO locations (city, state, country, lat, lon) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.city, record.state, record.country, record.lat, record.lon],
        )
        .map_err(|e| location_write_err(e, record))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_all(&self) -> StoreResult<Vec<Location>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, city, state, country, lat, lon FROM locations ORDER BY id")
            .map_err(db_err)?;

        let rows = stmt.query_map([], Self::row_to_location).map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn get(&self, id: i64) -> StoreResult<Option<Location>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, city, state, country, lat, lon FROM locations WHERE id = ?1",
            params![id],
            Self::row_to_location,
        )
        .optional()
        .map_err(db_err)
    }

    fn update(&self, id: i64, record: &Location) -> StoreResult<()> {
        validate_location(record)?;
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE locations SET city = ?1, state = ?2, country = ?3, lat = ?4, lon = ?5
                 WHERE id = ?6",
                params![record.city, record.state, record.country, record.lat, record.lon, id],
            )
            .map_err(|e| location_write_err(e, record))?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM locations WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM locations", [])
            .map_err(db_err)?;
        Ok(())
    }

    fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM locations", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl RecordStore<UserProfile> for SqliteStore {
    fn add(&self, record: &UserProfile) -> StoreResult<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO profile (name, email, phone, avatar) VALUES (?1, ?2, ?3, ?4)",
            params![record.name, record.email, record.phone, record.avatar],
        )
        .map_err(db_err)?;
        Ok(conn.last_insert_rowid())
    }

    fn get_all(&self) -> StoreResult<Vec<UserProfile>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT id, name, email, phone, avatar FROM profile ORDER BY id")
            .map_err(db_err)?;

        let rows = stmt.query_map([], Self::row_to_profile).map_err(db_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
    }

    fn get(&self, id: i64) -> StoreResult<Option<UserProfile>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, email, phone, avatar FROM profile WHERE id = ?1",
            params![id],
            Self::row_to_profile,
        )
        .optional()
        .map_err(db_err)
    }

    fn update(&self, id: i64, record: &UserProfile) -> StoreResult<()> {
        let changed = self
            .conn
            .lock()
            .execute(
                "UPDATE profile SET name = ?1, email = ?2, phone = ?3, avatar = ?4 WHERE id = ?5",
                params![record.name, record.email, record.phone, record.avatar, id],
            )
            .map_err(db_err)?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM profile WHERE id = ?1", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.conn
            .lock()
            .execute("DELETE FROM profile", [])
            .map_err(db_err)?;
        Ok(())
    }
}
