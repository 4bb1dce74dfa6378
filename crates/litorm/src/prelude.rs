//! Convenient imports for typical `litorm` usage.
//!
//! ```ignore
//! use litorm::prelude::*;
//! ```

pub use crate::{
    Connection, ConnectionConfig, Expr, Filter, JoinKind, OnConflict, Order, OrmError, OrmResult,
    Record, SqlQb, Table,
};
pub use crate::{Action, Column, Conflict, Reference};
