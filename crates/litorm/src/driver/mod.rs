//! The storage engine capability surface.
//!
//! The query builders only ever talk to the engine through [`Driver`],
//! [`Statement`] and [`Rows`]. [`SqliteDriver`] implements them on top of
//! `rusqlite`; tests can plug in a recording driver through
//! [`ConnectionBuilder::open_with_driver`](crate::ConnectionBuilder::open_with_driver).

mod sqlite;

pub use sqlite::SqliteDriver;

use crate::error::{OrmError, OrmResult};
use crate::value::{SqlType, StorageType, Value};
use std::sync::Arc;

/// A handle able to compile SQL text into statements.
pub trait Driver: Send {
    /// Compile `sql`; engine diagnostics surface as [`OrmError::Prepare`].
    fn prepare<'c>(&'c self, sql: &str) -> OrmResult<Box<dyn Statement + 'c>>;

    /// Run one or more statements that take no parameters and return no rows.
    fn execute_batch(&self, sql: &str) -> OrmResult<()>;

    /// Rowid of the most recent successful INSERT.
    fn last_insert_rowid(&self) -> i64;

    /// `false` while a transaction is open on this handle.
    fn is_autocommit(&self) -> bool {
        true
    }
}

/// A compiled statement. Dropping it finalizes the engine resource.
pub trait Statement {
    /// Bind `value` to the 1-based placeholder `slot`.
    fn bind(&mut self, slot: usize, value: &Value) -> OrmResult<()>;

    /// Step to completion, returning the number of changed rows.
    fn execute(&mut self) -> OrmResult<usize>;

    /// Start stepping a statement that yields rows.
    fn query(&mut self) -> OrmResult<Box<dyn Rows + '_>>;
}

/// A cursor over result rows.
pub trait Rows {
    /// Advance to the next row, `None` once exhausted.
    fn step(&mut self) -> OrmResult<Option<Row>>;
}

/// One owned result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Index of the first result column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value of result column `index`, read with the affinity of `expected`.
    pub fn value(&self, index: usize, expected: StorageType) -> OrmResult<Value> {
        self.values
            .get(index)
            .cloned()
            .map(|value| value.coerce(expected))
            .ok_or_else(|| OrmError::not_found(format!("result column {index}")))
    }

    /// Decode result column `index` as `T`.
    pub fn try_get<T: SqlType>(&self, index: usize) -> OrmResult<T> {
        let value = self.value(index, T::STORAGE)?;
        T::from_value(value).map_err(|rejected| {
            let column = self
                .columns
                .get(index)
                .cloned()
                .unwrap_or_else(|| index.to_string());
            OrmError::type_mismatch(column, T::STORAGE, &rejected)
        })
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
