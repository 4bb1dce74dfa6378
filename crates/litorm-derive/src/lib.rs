//! Derive macros for litorm
//!
//! Provides `#[derive(Record)]`, which declares a record's table from its
//! fields.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod record;

/// Derive the `Record` trait for a struct.
///
/// # Example
///
/// ```ignore
/// use litorm::Record;
///
/// #[derive(Default, Record)]
/// #[orm(table = "posts")]
/// struct Post {
///     #[orm(primary_key(autoincrement))]
///     id: i64,
///     #[orm(foreign_key(table = "users", column = "id", on_delete = "cascade"))]
///     user_id: i64,
///     #[orm(unique(conflict = "replace"))]
///     slug: String,
///     body: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(primary_key)]`, `#[orm(primary_key(conflict = "...", autoincrement))]`
/// - `#[orm(not_null)]`, `#[orm(unique)]`, each optionally `(conflict = "...")`
/// - `#[orm(foreign_key(table = "...", column = "...", on_update = "...", on_delete = "..."))]`
/// - `#[orm(get = "method", set = "method")]` - Map a private field through accessors
/// - `#[orm(skip)]` - Leave the field out of the table
///
/// Conflict policies: `abort` (default), `replace`, `ignore`, `fail`, `rollback`.
/// Actions: `cascade`, `restrict`, `set_null`, `set_default`, `no_action` (default).
#[proc_macro_derive(Record, attributes(orm))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    record::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
