//! Schema description: constraints, columns, tables and the per-connection
//! registry of tables.

mod column;
mod constraint;
mod registry;
mod table;

pub use column::{Column, ColumnDef};
pub use constraint::{Action, Conflict, Constraint, Reference};
pub use table::{Table, TableBuilder};

pub(crate) use registry::Registry;

use crate::error::OrmResult;
use crate::qb::Selectable;
use std::any::{Any, TypeId};

/// A record type with a declared table mapping.
///
/// Usually implemented with `#[derive(Record)]`:
///
/// ```ignore
/// #[derive(Default, Record)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(primary_key(autoincrement))]
///     id: i64,
///     #[orm(unique)]
///     name: String,
/// }
/// ```
pub trait Record: Default + Sized + 'static {
    /// Build the table descriptor for this record type.
    fn table() -> OrmResult<Table<Self>>;
}

/// Record-type-erased view of a [`Table`], as held by a connection.
pub trait TableSchema: Selectable + Send + Sync {
    fn record_type(&self) -> TypeId;

    fn record_type_name(&self) -> &'static str;

    fn create_table_query(&self, if_not_exists: bool) -> String;

    fn as_any(&self) -> &dyn Any;
}
