// Collection-scoped JSON store - isolates all database side effects
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Serialization error in {collection}/{key}: {source}")]
    Serialization {
        collection: &'static str,
        key: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Drafts,
    Favorites,
    Library,
    Calendar,
    Sessions,
    Settings,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Drafts => "drafts",
            Collection::Favorites => "favorites",
            Collection::Library => "library",
            Collection::Calendar => "calendar",
            Collection::Sessions => "sessions",
            Collection::Settings => "settings",
        }
    }
}

/// SQLite-backed key-value store of JSON documents.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn get<T: DeserializeOwned>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let conn = self.pool.get()?;

        let result: Result<String, rusqlite::Error> = conn.query_row(
            "SELECT value FROM entries WHERE collection = ?1 AND key = ?2",
            params![collection.as_str(), key],
            |row| row.get(0),
        );

        match result {
            Ok(json) => decode(collection, key, &json).map(Some),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Idempotent upsert. An existing entry keeps its position in `list`.
    pub fn put<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            collection: collection.as_str(),
            key: key.to_string(),
            source,
        })?;

        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO entries (collection, key, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, key) DO UPDATE SET
               value = excluded.value,
               updated_at = datetime('now')",
            params![collection.as_str(), key, json],
        )?;

        Ok(())
    }

    pub fn remove(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM entries WHERE collection = ?1 AND key = ?2",
            params![collection.as_str(), key],
        )?;
        Ok(rows > 0)
    }

    pub fn contains(&self, collection: Collection, key: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM entries WHERE collection = ?1 AND key = ?2",
            params![collection.as_str(), key],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All entries of a collection, newest first.
    pub fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT key, value FROM entries WHERE collection = ?1 ORDER BY seq DESC",
        )?;

        let rows: Vec<(String, String)> = stmt
            .query_map(params![collection.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut values = Vec::with_capacity(rows.len());
        for (key, json) in rows {
            match decode(collection, &key, &json) {
                Ok(v) => values.push(v),
                // A single unreadable document should not hide the rest.
                Err(e) => tracing::warn!("Skipping entry: {}", e),
            }
        }
        Ok(values)
    }

    /// Keys of a collection, newest first.
    pub fn keys(&self, collection: Collection) -> Result<Vec<String>, StoreError> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT key FROM entries WHERE collection = ?1 ORDER BY seq DESC")?;
        let keys = stmt
            .query_map(params![collection.as_str()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    pub fn count(&self, collection: Collection) -> Result<i64, StoreError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn decode<T: DeserializeOwned>(
    collection: Collection,
    key: &str,
    json: &str,
) -> Result<T, StoreError> {
    serde_json::from_str(json).map_err(|source| StoreError::Serialization {
        collection: collection.as_str(),
        key: key.to_string(),
        source,
    })
}
