//! SQL statement logging via `tracing`.
//!
//! Every statement is emitted under the `litorm.sql` target right before it is
//! handed to the engine. Connection lifecycle events use the `litorm` target.

use tracing::Level;

/// Kind of statement being prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    /// CREATE TABLE, PRAGMA and transaction control.
    Schema,
}

/// Configuration for statement logging.
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    /// Emit statement events at all.
    pub enabled: bool,
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(200),
        }
    }
}

impl SqlLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Turn statement events off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    fn truncate_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }

    pub(crate) fn emit(&self, kind: StatementKind, sql: &str, param_count: usize) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        if !self.enabled {
            return;
        }
        let sql = self.truncate_sql(sql);
        emit_at_level!(
            self.level,
            target: "litorm.sql",
            kind = ?kind,
            param_count,
            sql = %sql,
        );
    }
}

/// Cut `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_sql_bytes("SELECT 1", 100), "SELECT 1");
        assert_eq!(truncate_sql_bytes("SELECT 1", 6), "SELECT");
        // 'é' is two bytes wide
        assert_eq!(truncate_sql_bytes("é", 1), "");
    }

    #[test]
    fn long_sql_is_elided() {
        let config = SqlLogConfig::new().max_sql_length(6);
        assert_eq!(config.truncate_sql("SELECT 1;"), "SELECT...");
        let config = config.no_truncate();
        assert_eq!(config.truncate_sql("SELECT 1;"), "SELECT 1;");
    }

    #[test]
    fn emit_is_silent_when_disabled() {
        // Must not panic without a subscriber either way.
        SqlLogConfig::new()
            .disabled()
            .emit(StatementKind::Select, "SELECT 1;", 0);
        SqlLogConfig::new()
            .level(Level::TRACE)
            .emit(StatementKind::Schema, "PRAGMA foreign_keys = ON;", 0);
    }
}
