//! Connection configuration.

use crate::log::SqlLogConfig;
use rusqlite::OpenFlags;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// A private in-memory database.
    Memory,
    File(PathBuf),
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        if value == ":memory:" {
            Location::Memory
        } else {
            Location::File(PathBuf::from(value))
        }
    }
}

impl From<PathBuf> for Location {
    fn from(value: PathBuf) -> Self {
        Location::File(value)
    }
}

impl From<&Path> for Location {
    fn from(value: &Path) -> Self {
        Location::File(value.to_path_buf())
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Memory => f.write_str(":memory:"),
            Location::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// How the database file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
    /// Read-write, creating the file if it does not exist.
    #[default]
    ReadWriteCreate,
}

impl OpenMode {
    pub(crate) fn flags(&self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// SQLCipher key for an encrypted database file. Redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseKey(String);

impl DatabaseKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DatabaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DatabaseKey(***)")
    }
}

/// Configuration for [`Connection`](crate::Connection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// File open mode.
    pub open_mode: OpenMode,
    /// Enforce foreign keys (`PRAGMA foreign_keys`).
    pub foreign_keys: bool,
    /// How long the engine waits on a locked database before failing.
    pub busy_timeout: Option<Duration>,
    /// Encryption key, applied with `PRAGMA key` right after open.
    pub key: Option<DatabaseKey>,
    /// Statement logging.
    pub sql_log: SqlLogConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            open_mode: OpenMode::default(),
            foreign_keys: true,
            busy_timeout: None,
            key: None,
            sql_log: SqlLogConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_mode(mut self, mode: OpenMode) -> Self {
        self.open_mode = mode;
        self
    }

    pub fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// Open an encrypted database with `key`.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(DatabaseKey::new(key));
        self
    }

    pub fn sql_log(mut self, sql_log: SqlLogConfig) -> Self {
        self.sql_log = sql_log;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_location_from_str() {
        assert_eq!(Location::from(":memory:"), Location::Memory);
        assert_eq!(
            Location::from("data/app.db"),
            Location::File(PathBuf::from("data/app.db"))
        );
        assert_eq!(Location::Memory.to_string(), ":memory:");
    }

    #[test]
    fn read_write_create_is_the_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.open_mode, OpenMode::ReadWriteCreate);
        assert!(config.foreign_keys);
        assert!(config.open_mode.flags().contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(!OpenMode::ReadOnly.flags().contains(OpenFlags::SQLITE_OPEN_READ_WRITE));
    }

    #[test]
    fn builder_overrides() {
        let config = ConnectionConfig::new()
            .open_mode(OpenMode::ReadWrite)
            .foreign_keys(false)
            .busy_timeout(Duration::from_millis(250));
        assert_eq!(config.open_mode, OpenMode::ReadWrite);
        assert!(!config.foreign_keys);
        assert_eq!(config.busy_timeout, Some(Duration::from_millis(250)));
        assert!(config.key.is_none());
    }

    #[test]
    fn keys_are_redacted() {
        let config = ConnectionConfig::new().key("hunter2");
        assert_eq!(config.key.as_ref().map(DatabaseKey::expose), Some("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
