//! UPDATE query builder.

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult, SchemaError};
use crate::log::StatementKind;
use crate::qb::expr::Expr;
use crate::qb::param::ParamList;
use crate::qb::source::{Scope, Selectable};
use crate::qb::traits::{BuiltQuery, Filter, QueryState, SqlQb, StatementSlot, conjoin};
use crate::schema::Table;
use crate::value::{ToValue, Value};
use serde::Serialize;

/// UPDATE builder for record type `R`.
///
/// SET values bind before WHERE values.
pub struct UpdateQuery<'c, R> {
    slot: StatementSlot<'c>,
    table: &'c Table<R>,
    sets: Vec<(String, Value)>,
    where_expr: Option<Expr>,
}

impl<'c, R: 'static> UpdateQuery<'c, R> {
    pub(crate) fn new(conn: &'c Connection, table: &'c Table<R>) -> Self {
        Self {
            slot: StatementSlot::new(conn),
            table,
            sets: Vec::new(),
            where_expr: None,
        }
    }

    /// Add `column = ?`.
    pub fn set(mut self, column: impl Into<String>, value: impl ToValue) -> Self {
        self.slot.guard_mutation("the SET list");
        self.sets.push((column.into(), value.to_value()));
        self
    }

    /// Add `column = ?` with `value` serialized to JSON text.
    pub fn set_json<T: Serialize + ?Sized>(mut self, column: impl Into<String>, value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => self.set(column, json),
            Err(err) => {
                self.slot.fail(err.into());
                self
            }
        }
    }

    /// SET every column of `record` except its primary key.
    pub(crate) fn set_record(mut self, record: &R) -> Self {
        for column in self.table.columns() {
            if !column.def().is_primary_key() {
                self.sets
                    .push((column.name().to_string(), column.extract(record)));
            }
        }
        self
    }

    pub fn state(&self) -> QueryState {
        self.slot.state()
    }

    pub fn prepare(&mut self) -> OrmResult<()> {
        let built = self.build()?;
        self.slot.prepare(built)
    }

    /// Prepare if needed and step to completion; returns the changed row count.
    pub fn exec(&mut self) -> OrmResult<usize> {
        if !self.slot.is_prepared() {
            self.prepare()?;
        }
        self.slot.execute()
    }
}

impl<R: 'static> Filter for UpdateQuery<'_, R> {
    fn and_where(mut self, expr: Expr) -> Self {
        self.slot.guard_mutation("the WHERE clause");
        self.where_expr = conjoin(self.where_expr.take(), expr);
        self
    }
}

impl<R: 'static> SqlQb for UpdateQuery<'_, R> {
    fn build(&self) -> OrmResult<BuiltQuery> {
        self.slot.check()?;
        if self.sets.is_empty() {
            return Err(OrmError::validation(format!(
                "UPDATE of `{}` has no SET columns",
                self.table.name()
            )));
        }

        let mut params = ParamList::new();
        let mut assignments = Vec::with_capacity(self.sets.len());
        for (name, value) in &self.sets {
            let def = self.table.find_column(name).ok_or_else(|| SchemaError::UnknownColumn {
                table: format!("`{}`", self.table.name()),
                column: name.clone(),
            })?;
            def.check(value)?;
            params.push_value(value.clone());
            assignments.push(format!("`{}` = ?", def.name()));
        }

        let mut sql = format!(
            "UPDATE `{}` SET {}",
            self.table.name(),
            assignments.join(", ")
        );
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
            kind: StatementKind::Update,
        })
    }
}
