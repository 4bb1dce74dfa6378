//! Typed query builders bound to a connection and a table.
//!
//! Every builder collects clauses fluently, validates column references and
//! bound value types when it is built, and owns at most one prepared
//! statement.
//!
//! # Features
//!
//! - **One checked boundary**: builder methods record the first error; `build()`/`prepare()` surface it
//! - **Positional placeholders**: values bind left to right in render order
//! - **Tables and subqueries interchangeable** as FROM/JOIN sources
//!
//! # Usage
//!
//! ```ignore
//! use litorm::prelude::*;
//!
//! let users = conn
//!     .select::<User>()
//!     .eq("name", "alice")
//!     .order_by("id", Order::Desc)
//!     .limit(20)
//!     .fetch_all()?;
//!
//! conn.update::<User>()
//!     .set("name", "bob")
//!     .eq("id", 1)
//!     .exec()?;
//!
//! conn.delete::<User>().eq("id", 1).exec()?;
//! ```

mod delete;
mod expr;
mod insert;
mod param;
mod select;
mod source;
mod traits;
mod update;

pub use delete::DeleteQuery;
pub use expr::{ColumnRef, CompareOp, Expr, LogicalOp};
pub use insert::{InsertQuery, OnConflict};
pub use param::ParamList;
pub use select::{JoinKind, Order, Records, SelectQuery};
pub use source::{Selectable, Subquery};
pub use traits::{BuiltQuery, Filter, QueryState, SqlQb};
pub use update::UpdateQuery;

#[cfg(test)]
mod tests;
