//! # litorm
//!
//! A schema-first, statically-typed ORM and query builder for SQLite.
//!
//! ## Features
//!
//! - **Declared schema**: tables are described once, by hand or with `#[derive(Record)]`
//! - **Checked before it runs**: unknown columns and mistyped values fail before SQL reaches the engine
//! - **Positional binding**: values bind in the order the statement renders them
//! - **Tables and subqueries** both usable as FROM/JOIN sources
//! - **Structured logging**: statements are traced under the `litorm.sql` target
//!
//! ## Usage
//!
//! ```ignore
//! use litorm::prelude::*;
//!
//! #[derive(Debug, Default, Record)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(primary_key(autoincrement))]
//!     id: i64,
//!     #[orm(unique)]
//!     name: String,
//! }
//!
//! let conn = Connection::builder().register::<User>().open(":memory:")?;
//! conn.create_tables(false)?;
//!
//! let mut alice = User { name: "alice".into(), ..Default::default() };
//! conn.insert_record(&mut alice)?;
//!
//! let found = conn.select::<User>()?.eq("id", alice.id).fetch_one()?;
//! conn.delete::<User>()?.eq("id", alice.id).exec()?;
//! ```

extern crate self as litorm;

pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod log;
pub mod prelude;
pub mod qb;
pub mod schema;
pub mod value;

pub use config::{ConnectionConfig, DatabaseKey, Location, OpenMode};
pub use connection::{Connection, ConnectionBuilder};
pub use driver::{Driver, Row, Rows, SqliteDriver, Statement};
pub use error::{OrmError, OrmResult, SchemaError};
pub use log::{SqlLogConfig, StatementKind};
pub use schema::{
    Action, Column, ColumnDef, Conflict, Constraint, Record, Reference, Table, TableBuilder,
    TableSchema,
};
pub use value::{SqlType, StorageType, ToValue, Value};

// Re-export qb types for easy access
pub use qb::{
    BuiltQuery, ColumnRef, DeleteQuery, Expr, Filter, InsertQuery, JoinKind, OnConflict, Order,
    ParamList, QueryState, Records, SelectQuery, Selectable, SqlQb, Subquery, UpdateQuery,
};

#[cfg(feature = "derive")]
pub use litorm_derive::Record;
