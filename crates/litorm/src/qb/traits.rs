//! Shared builder contract and prepared-statement lifecycle.

use crate::connection::Connection;
use crate::driver::{Row, Rows, Statement};
use crate::error::{OrmError, OrmResult};
use crate::log::StatementKind;
use crate::qb::expr::{ColumnRef, Expr};
use crate::qb::param::ParamList;
use crate::value::{ToValue, Value};

/// Rendered SQL plus the values for its placeholders, in bind order.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: ParamList,
    pub kind: StatementKind,
}

/// Base trait for all query builders.
pub trait SqlQb {
    /// Validate every reference and render the statement.
    fn build(&self) -> OrmResult<BuiltQuery>;

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> OrmResult<String> {
        self.build().map(|built| built.sql)
    }
}

/// WHERE clause construction shared by SELECT, UPDATE and DELETE.
///
/// Each call is AND-ed onto the existing condition.
pub trait Filter: Sized {
    /// Attach a predicate, AND-ing it with any existing one.
    fn and_where(self, expr: Expr) -> Self;

    /// Raw condition with `?` placeholders; values bind in order.
    fn where_raw(self, sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        self.and_where(Expr::raw(sql, params))
    }

    /// Add an equality condition: column = value
    fn eq(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::eq(column, value))
    }

    /// Add an inequality condition: column != value
    fn ne(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::ne(column, value))
    }

    /// Add a greater-than condition: column > value
    fn gt(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::gt(column, value))
    }

    /// Add a greater-than-or-equal condition: column >= value
    fn gte(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::gte(column, value))
    }

    /// Add a less-than condition: column < value
    fn lt(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::lt(column, value))
    }

    /// Add a less-than-or-equal condition: column <= value
    fn lte(self, column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        self.and_where(Expr::lte(column, value))
    }

    /// Add a LIKE condition: column LIKE pattern
    fn like(self, column: impl Into<ColumnRef>, pattern: impl ToValue) -> Self {
        self.and_where(Expr::like(column, pattern))
    }

    /// Add an IN condition: column IN (?, ...)
    fn in_list<T: ToValue>(
        self,
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.and_where(Expr::in_list(column, values))
    }

    /// Add a NOT IN condition: column NOT IN (?, ...)
    fn not_in<T: ToValue>(
        self,
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        self.and_where(Expr::not_in(column, values))
    }

    /// Add a BETWEEN condition: column BETWEEN ? AND ?
    fn between(self, column: impl Into<ColumnRef>, from: impl ToValue, to: impl ToValue) -> Self {
        self.and_where(Expr::between(column, from, to))
    }

    fn is_null(self, column: impl Into<ColumnRef>) -> Self {
        self.and_where(Expr::is_null(column))
    }

    fn is_not_null(self, column: impl Into<ColumnRef>) -> Self {
        self.and_where(Expr::is_not_null(column))
    }
}

/// Lifecycle of a builder's statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Unprepared,
    Prepared,
    /// At least one step has been taken.
    Stepped,
    /// Stepped to completion; re-prepare to run again.
    Exhausted,
}

/// AND `expr` onto an optional existing condition.
pub(crate) fn conjoin(existing: Option<Expr>, expr: Expr) -> Option<Expr> {
    Some(match existing {
        Some(existing) => Expr::and(existing, expr),
        None => expr,
    })
}

/// The prepared statement owned by one builder, plus its first recorded error.
pub(crate) struct StatementSlot<'c> {
    conn: &'c Connection,
    stmt: Option<Box<dyn Statement + 'c>>,
    state: QueryState,
    error: Option<OrmError>,
}

impl<'c> StatementSlot<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            stmt: None,
            state: QueryState::Unprepared,
            error: None,
        }
    }

    pub(crate) fn connection(&self) -> &'c Connection {
        self.conn
    }

    pub(crate) fn state(&self) -> QueryState {
        self.state
    }

    /// Record `err` unless an earlier error is already recorded.
    pub(crate) fn fail(&mut self, err: OrmError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Surface the first recorded error.
    pub(crate) fn check(&self) -> OrmResult<()> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Record misuse when a clause changes once a statement exists.
    pub(crate) fn guard_mutation(&mut self, what: &str) {
        if self.state != QueryState::Unprepared {
            self.fail(OrmError::validation(format!(
                "cannot change {what} after prepare()"
            )));
        }
    }

    /// Replace any existing statement with one compiled from `built`.
    pub(crate) fn prepare(&mut self, built: BuiltQuery) -> OrmResult<()> {
        self.check()?;
        self.stmt = None;
        self.state = QueryState::Unprepared;
        self.stmt = Some(self.conn.prepare_built(&built)?);
        self.state = QueryState::Prepared;
        Ok(())
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.state == QueryState::Prepared
    }

    /// Step the statement to completion.
    pub(crate) fn execute(&mut self) -> OrmResult<usize> {
        self.check()?;
        let stmt = self
            .stmt
            .as_mut()
            .ok_or_else(|| OrmError::validation("statement is not prepared"))?;
        let changed = stmt.execute()?;
        self.state = QueryState::Exhausted;
        Ok(changed)
    }

    /// Start stepping result rows.
    pub(crate) fn cursor(&mut self) -> OrmResult<Cursor<'_>> {
        self.check()?;
        let Self { stmt, state, .. } = self;
        let stmt = stmt
            .as_mut()
            .ok_or_else(|| OrmError::validation("statement is not prepared"))?;
        let rows = stmt.query()?;
        *state = QueryState::Stepped;
        Ok(Cursor { rows, state })
    }
}

/// Row cursor that marks its statement exhausted at the end.
pub(crate) struct Cursor<'q> {
    rows: Box<dyn Rows + 'q>,
    state: &'q mut QueryState,
}

impl Cursor<'_> {
    pub(crate) fn step(&mut self) -> OrmResult<Option<Row>> {
        let row = self.rows.step()?;
        if row.is_none() {
            *self.state = QueryState::Exhausted;
        }
        Ok(row)
    }
}
