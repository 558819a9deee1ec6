//! Preference store for tailfinder.
//!
//! A small `SQLite` key-value table holding the preferred provider and the
//! recent-search history. Both are read once when the search form opens
//! ([`Storage::load`]) and written back together on submission
//! ([`Storage::save`]).

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::search::{RecentSearches, SearchRecord};

/// Key holding the preferred provider.
pub const PROVIDER_KEY: &str = "preferredApiProvider";

/// Key holding the recent-search list.
pub const RECENT_SEARCHES_KEY: &str = "recentSearches";

/// Everything the search form persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Last provider used for a successful submission.
    pub provider: Option<Provider>,
    /// Recent searches, most recent first.
    pub recent: RecentSearches,
}

/// Persistent preference store.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a preference database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening preference database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        info!("Preference database ready at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted preferences.
    ///
    /// Unreadable values are logged and treated as absent, so a damaged
    /// entry never blocks the search form. The history is re-capped to
    /// `max_recent` entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn load(&self, max_recent: usize) -> Result<Preferences> {
        let provider = match self.get(PROVIDER_KEY)? {
            None => None,
            Some(raw) => match serde_json::from_str::<Provider>(&raw) {
                Ok(provider) => Some(provider),
                Err(e) => {
                    warn!("Ignoring unreadable {}: {} ({})", PROVIDER_KEY, raw, e);
                    None
                }
            },
        };

        let recent = match self.get(RECENT_SEARCHES_KEY)? {
            None => RecentSearches::default(),
            Some(raw) => match serde_json::from_str::<Vec<SearchRecord>>(&raw) {
                Ok(records) => RecentSearches::from_records(records, max_recent),
                Err(e) => {
                    warn!("Ignoring unreadable {}: {}", RECENT_SEARCHES_KEY, e);
                    RecentSearches::default()
                }
            },
        };

        debug!(
            "Loaded preferences: provider={:?}, {} recent searches",
            provider,
            recent.len()
        );
        Ok(Preferences { provider, recent })
    }

    /// Write the preferences back as a single transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the database write fails.
    pub fn save(&self, preferences: &Preferences) -> Result<()> {
        let recent = serde_json::to_string(&preferences.recent)?;
        let provider = preferences
            .provider
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let tx = self.conn.unchecked_transaction()?;
        Self::put(&tx, RECENT_SEARCHES_KEY, &recent)?;
        match provider {
            Some(provider) => Self::put(&tx, PROVIDER_KEY, &provider)?,
            None => {
                tx.execute("DELETE FROM preferences WHERE key = ?1", [PROVIDER_KEY])?;
            }
        }
        tx.commit()?;

        debug!(
            "Saved preferences: provider={:?}, {} recent searches",
            preferences.provider,
            preferences.recent.len()
        );
        Ok(())
    }

    /// Persist only the preferred provider, leaving the history untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn save_provider(&self, provider: Provider) -> Result<()> {
        let value = serde_json::to_string(&provider)?;
        Self::put(&self.conn, PROVIDER_KEY, &value)
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            r"
            INSERT INTO preferences (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn record(flight: &str, provider: Option<Provider>) -> SearchRecord {
        SearchRecord {
            flight_number: flight.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 29).unwrap(),
            provider,
        }
    }

    #[test]
    fn test_open_in_memory() {
        let storage = Storage::open_in_memory();
        assert!(storage.is_ok());
        assert_eq!(storage.unwrap().path(), Path::new(":memory:"));
    }

    #[test]
    fn test_load_empty_store() {
        let storage = create_test_storage();
        let prefs = storage.load(5).unwrap();
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_save_and_load() {
        let storage = create_test_storage();
        let mut prefs = Preferences {
            provider: Some(Provider::FlightAware),
            ..Preferences::default()
        };
        prefs.recent.record(record("BA123", Some(Provider::FlightAware)), 5);
        prefs.recent.record(record("LH456", Some(Provider::AeroDataBox)), 5);

        storage.save(&prefs).unwrap();
        assert_eq!(storage.load(5).unwrap(), prefs);
    }

    #[test]
    fn test_save_overwrites_previous_values() {
        let storage = create_test_storage();
        let mut prefs = Preferences::default();
        prefs.provider = Some(Provider::FlightAware);
        storage.save(&prefs).unwrap();

        prefs.provider = Some(Provider::AeroDataBox);
        prefs.recent.record(record("BA1", None), 5);
        storage.save(&prefs).unwrap();

        let loaded = storage.load(5).unwrap();
        assert_eq!(loaded.provider, Some(Provider::AeroDataBox));
        assert_eq!(loaded.recent.len(), 1);
    }

    #[test]
    fn test_values_are_stored_as_json() {
        let storage = create_test_storage();
        let mut prefs = Preferences {
            provider: Some(Provider::FlightAware),
            ..Preferences::default()
        };
        prefs.recent.record(record("BA123", Some(Provider::FlightAware)), 5);
        storage.save(&prefs).unwrap();

        assert_eq!(
            storage.get(PROVIDER_KEY).unwrap().as_deref(),
            Some("\"flightaware\"")
        );
        assert_eq!(
            storage.get(RECENT_SEARCHES_KEY).unwrap().as_deref(),
            Some(r#"[{"flightNumber":"BA123","date":"2026-10-29","apiProvider":"flightaware"}]"#)
        );
    }

    #[test]
    fn test_legacy_history_without_provider_loads() {
        let storage = create_test_storage();
        Storage::put(
            &storage.conn,
            RECENT_SEARCHES_KEY,
            r#"[{"flightNumber":"LH456","date":"2026-11-02"}]"#,
        )
        .unwrap();

        let prefs = storage.load(5).unwrap();
        assert_eq!(prefs.recent.len(), 1);
        assert!(prefs.recent.get(0).unwrap().provider.is_none());
    }

    #[test]
    fn test_corrupt_values_are_ignored() {
        let storage = create_test_storage();
        Storage::put(&storage.conn, PROVIDER_KEY, "\"opensky\"").unwrap();
        Storage::put(&storage.conn, RECENT_SEARCHES_KEY, "{not json").unwrap();

        let prefs = storage.load(5).unwrap();
        assert!(prefs.provider.is_none());
        assert!(prefs.recent.is_empty());
    }

    #[test]
    fn test_load_recaps_oversized_history() {
        let storage = create_test_storage();
        let records: Vec<SearchRecord> = (0..8)
            .map(|i| record(&format!("BA{i}"), Some(Provider::AeroDataBox)))
            .collect();
        Storage::put(
            &storage.conn,
            RECENT_SEARCHES_KEY,
            &serde_json::to_string(&records).unwrap(),
        )
        .unwrap();

        let prefs = storage.load(5).unwrap();
        assert_eq!(prefs.recent.len(), 5);
        assert_eq!(prefs.recent.get(0).unwrap().flight_number, "BA0");
    }

    #[test]
    fn test_save_provider_only() {
        let storage = create_test_storage();
        let mut prefs = Preferences::default();
        prefs.recent.record(record("BA123", None), 5);
        storage.save(&prefs).unwrap();

        storage.save_provider(Provider::FlightAware).unwrap();

        let loaded = storage.load(5).unwrap();
        assert_eq!(loaded.provider, Some(Provider::FlightAware));
        assert_eq!(loaded.recent.len(), 1);
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("preferences.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.save_provider(Provider::FlightAware).unwrap();
        }
        assert!(path.exists());

        let reopened = Storage::open(&path).unwrap();
        assert_eq!(
            reopened.load(5).unwrap().provider,
            Some(Provider::FlightAware)
        );
    }
}
