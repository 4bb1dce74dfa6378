use crate::config::{ConnectionConfig, Location};
use crate::driver::{Driver, Row, Rows, Statement};
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use std::sync::Arc;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(SqlValue::Null),
            Value::Integer(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Value::Real(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Value::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Value::Blob(v) => ToSqlOutput::Borrowed(ValueRef::Blob(v)),
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

/// [`Driver`] backed by a `rusqlite` connection.
#[derive(Debug)]
pub struct SqliteDriver {
    connection: rusqlite::Connection,
}

impl SqliteDriver {
    /// Open `location` with the flags, key and busy timeout from `config`.
    pub fn open(location: &Location, config: &ConnectionConfig) -> OrmResult<Self> {
        let flags = config.open_mode.flags();
        let connection = match location {
            Location::Memory => rusqlite::Connection::open_in_memory_with_flags(flags),
            Location::File(path) => rusqlite::Connection::open_with_flags(path, flags),
        }
        .map_err(|e| OrmError::Connection(format!("unable to open {location}: {e}")))?;

        if let Some(key) = &config.key {
            // A wrong key only shows up once a page is read.
            connection
                .pragma_update(None, "key", key.expose())
                .and_then(|()| {
                    connection.query_row("SELECT count(*) FROM sqlite_master;", [], |row| {
                        row.get::<_, i64>(0)
                    })
                })
                .map_err(|e| {
                    OrmError::Connection(format!("unable to decrypt database {location}: {e}"))
                })?;
        }

        if let Some(timeout) = config.busy_timeout {
            connection
                .busy_timeout(timeout)
                .map_err(|e| OrmError::Connection(format!("unable to set busy timeout: {e}")))?;
        }
        Ok(Self { connection })
    }

    /// Wrap an already opened `rusqlite` connection.
    pub fn from_connection(connection: rusqlite::Connection) -> Self {
        Self { connection }
    }
}

impl Driver for SqliteDriver {
    fn prepare<'c>(&'c self, sql: &str) -> OrmResult<Box<dyn Statement + 'c>> {
        let stmt = self
            .connection
            .prepare(sql)
            .map_err(|e| OrmError::prepare(sql, e))?;
        Ok(Box::new(SqliteStatement { stmt }))
    }

    fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        self.connection
            .execute_batch(sql)
            .map_err(OrmError::from_sqlite)
    }

    fn last_insert_rowid(&self) -> i64 {
        self.connection.last_insert_rowid()
    }

    fn is_autocommit(&self) -> bool {
        self.connection.is_autocommit()
    }
}

struct SqliteStatement<'c> {
    stmt: rusqlite::Statement<'c>,
}

impl Statement for SqliteStatement<'_> {
    fn bind(&mut self, slot: usize, value: &Value) -> OrmResult<()> {
        self.stmt
            .raw_bind_parameter(slot, value)
            .map_err(OrmError::from_sqlite)
    }

    fn execute(&mut self) -> OrmResult<usize> {
        self.stmt.raw_execute().map_err(OrmError::from_sqlite)
    }

    fn query(&mut self) -> OrmResult<Box<dyn Rows + '_>> {
        let columns: Arc<[String]> = self
            .stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        Ok(Box::new(SqliteRows {
            rows: self.stmt.raw_query(),
            columns,
        }))
    }
}

struct SqliteRows<'s> {
    rows: rusqlite::Rows<'s>,
    columns: Arc<[String]>,
}

impl Rows for SqliteRows<'_> {
    fn step(&mut self) -> OrmResult<Option<Row>> {
        let Some(row) = self.rows.next().map_err(OrmError::from_sqlite)? else {
            return Ok(None);
        };
        let values = (0..self.columns.len())
            .map(|i| row.get_ref(i).map(value_from_ref))
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(OrmError::from_sqlite)?;
        Ok(Some(Row::new(Arc::clone(&self.columns), values)))
    }
}
