//! DELETE query builder.

use crate::connection::Connection;
use crate::error::OrmResult;
use crate::log::StatementKind;
use crate::qb::expr::Expr;
use crate::qb::param::ParamList;
use crate::qb::source::{Scope, Selectable};
use crate::qb::traits::{BuiltQuery, Filter, QueryState, SqlQb, StatementSlot, conjoin};
use crate::schema::Table;

/// DELETE builder for record type `R`. Without a WHERE clause every row goes.
pub struct DeleteQuery<'c, R> {
    slot: StatementSlot<'c>,
    table: &'c Table<R>,
    where_expr: Option<Expr>,
}

impl<'c, R: 'static> DeleteQuery<'c, R> {
    pub(crate) fn new(conn: &'c Connection, table: &'c Table<R>) -> Self {
        Self {
            slot: StatementSlot::new(conn),
            table,
            where_expr: None,
        }
    }

    pub fn state(&self) -> QueryState {
        self.slot.state()
    }

    pub fn prepare(&mut self) -> OrmResult<()> {
        let built = self.build()?;
        self.slot.prepare(built)
    }

    /// Prepare if needed and step to completion; returns the deleted row count.
    pub fn exec(&mut self) -> OrmResult<usize> {
        if !self.slot.is_prepared() {
            self.prepare()?;
        }
        self.slot.execute()
    }
}

impl<R: 'static> Filter for DeleteQuery<'_, R> {
    fn and_where(mut self, expr: Expr) -> Self {
        self.slot.guard_mutation("the WHERE clause");
        self.where_expr = conjoin(self.where_expr.take(), expr);
        self
    }
}

impl<R: 'static> SqlQb for DeleteQuery<'_, R> {
    fn build(&self) -> OrmResult<BuiltQuery> {
        self.slot.check()?;
        let mut params = ParamList::new();
        let mut sql = String::from("DELETE ");
        sql.push_str(&format!("FROM `{}`", self.table.name()));
        if let Some(expr) = &self.where_expr {
            let sources: [&dyn Selectable; 1] = [self.table];
            expr.validate(&Scope::new(sources.to_vec()))?;
            sql.push_str(" WHERE ");
            sql.push_str(&expr.build(&mut params));
        }
        sql.push(';');

        Ok(BuiltQuery {
            sql,
            params,
            kind: StatementKind::Delete,
        })
    }
}
