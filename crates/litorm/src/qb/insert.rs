//! INSERT query builder with optional upsert clause.

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult, SchemaError};
use crate::log::StatementKind;
use crate::qb::param::ParamList;
use crate::qb::traits::{BuiltQuery, QueryState, SqlQb, StatementSlot};
use crate::schema::{Column, Table};
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConflictAction {
    Nothing,
    /// Overwrite every inserted column outside the conflict target.
    UpdateInserted,
    Update(Vec<String>),
}

/// `ON CONFLICT (...) DO ...` clause for [`InsertQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnConflict {
    target: Vec<String>,
    action: ConflictAction,
}

impl OnConflict {
    /// `ON CONFLICT (target) DO NOTHING`; an empty target matches any constraint.
    pub fn do_nothing<S: Into<String>>(target: impl IntoIterator<Item = S>) -> Self {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            action: ConflictAction::Nothing,
        }
    }

    /// `ON CONFLICT (target) DO UPDATE SET` every other inserted column from `excluded`.
    pub fn do_update<S: Into<String>>(target: impl IntoIterator<Item = S>) -> Self {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            action: ConflictAction::UpdateInserted,
        }
    }

    /// `ON CONFLICT (target) DO UPDATE SET` only `columns` from `excluded`.
    pub fn do_update_columns<S: Into<String>, C: Into<String>>(
        target: impl IntoIterator<Item = S>,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            target: target.into_iter().map(Into::into).collect(),
            action: ConflictAction::Update(columns.into_iter().map(Into::into).collect()),
        }
    }
}

/// INSERT builder for record type `R`.
///
/// Column and value lists follow the table's declared order. AUTOINCREMENT
/// primary keys are left out so the engine assigns them.
pub struct InsertQuery<'c, R> {
    slot: StatementSlot<'c>,
    table: &'c Table<R>,
    columns: Vec<usize>,
    rows: Vec<Vec<Value>>,
    on_conflict: Option<OnConflict>,
}

impl<'c, R: 'static> InsertQuery<'c, R> {
    pub(crate) fn new(conn: &'c Connection, table: &'c Table<R>) -> Self {
        let columns = table
            .columns()
            .iter()
            .filter(|c| !c.def().is_autoincrement())
            .map(Column::ordinal)
            .collect();
        Self {
            slot: StatementSlot::new(conn),
            table,
            columns,
            rows: Vec::new(),
            on_conflict: None,
        }
    }

    /// Append one record's values as a VALUES row.
    pub fn values(mut self, record: &R) -> Self {
        self.push_record(record);
        self
    }

    /// Append every record as its own VALUES row.
    pub fn values_many<'r>(mut self, records: impl IntoIterator<Item = &'r R>) -> Self {
        for record in records {
            self.push_record(record);
        }
        self
    }

    fn push_record(&mut self, record: &R) {
        self.slot.guard_mutation("the VALUES list");
        let columns = self.table.columns();
        let row = self
            .columns
            .iter()
            .map(|&i| columns[i].extract(record))
            .collect();
        self.rows.push(row);
    }

    pub fn on_conflict(mut self, clause: OnConflict) -> Self {
        self.slot.guard_mutation("ON CONFLICT");
        self.on_conflict = Some(clause);
        self
    }

    /// Number of VALUES rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn state(&self) -> QueryState {
        self.slot.state()
    }

    pub fn prepare(&mut self) -> OrmResult<()> {
        let built = self.build()?;
        self.slot.prepare(built)
    }

    /// Prepare if needed and step to completion; returns the inserted row count.
    pub fn exec(&mut self) -> OrmResult<usize> {
        if !self.slot.is_prepared() {
            self.prepare()?;
        }
        self.slot.execute()
    }

    fn quoted_column(&self, name: &str) -> OrmResult<String> {
        self.table
            .column_by_name(name)
            .map(|c| format!("`{}`", c.name()))
            .map_err(|_| {
                SchemaError::UnknownColumn {
                    table: format!("`{}`", self.table.name()),
                    column: name.to_string(),
                }
                .into()
            })
    }

    fn render_on_conflict(&self, clause: &OnConflict) -> OrmResult<String> {
        let target = clause
            .target
            .iter()
            .map(|name| self.quoted_column(name))
            .collect::<OrmResult<Vec<_>>>()?;
        let mut sql = String::from(" ON CONFLICT");
        if !target.is_empty() {
            sql.push_str(&format!(" ({})", target.join(", ")));
        }

        let updated: Vec<String> = match &clause.action {
            ConflictAction::Nothing => {
                sql.push_str(" DO NOTHING");
                return Ok(sql);
            }
            ConflictAction::UpdateInserted => self
                .columns
                .iter()
                .map(|&i| self.table.columns()[i].name())
                .filter(|name| !clause.target.iter().any(|t| t == name))
                .map(|name| format!("`{name}`"))
                .collect(),
            ConflictAction::Update(columns) => columns
                .iter()
                .map(|name| self.quoted_column(name))
                .collect::<OrmResult<_>>()?,
        };

        if target.is_empty() {
            return Err(OrmError::validation(
                "ON CONFLICT DO UPDATE requires a conflict target",
            ));
        }
        if updated.is_empty() {
            return Err(OrmError::validation(
                "ON CONFLICT DO UPDATE has no columns to update",
            ));
        }
        let assignments: Vec<String> = updated
            .iter()
            .map(|column| format!("{column} = excluded.{column}"))
            .collect();
        sql.push_str(" DO UPDATE SET ");
        sql.push_str(&assignments.join(", "));
        Ok(sql)
    }
}

impl<R: 'static> SqlQb for InsertQuery<'_, R> {
    fn build(&self) -> OrmResult<BuiltQuery> {
        self.slot.check()?;
        if self.rows.is_empty() {
            return Err(OrmError::validation(format!(
                "INSERT into `{}` has no rows",
                self.table.name()
            )));
        }

        let columns = self.table.columns();
        let mut params = ParamList::new();
        let mut sql = format!("INSERT INTO `{}`", self.table.name());
        if self.columns.is_empty() {
            if self.rows.len() > 1 {
                return Err(OrmError::validation(
                    "DEFAULT VALUES inserts exactly one row",
                ));
            }
            sql.push_str(" DEFAULT VALUES");
        } else {
            let names: Vec<String> = self
                .columns
                .iter()
                .map(|&i| format!("`{}`", columns[i].name()))
                .collect();
            sql.push_str(&format!(" ({}) VALUES ", names.join(", ")));

            let mut tuples = Vec::with_capacity(self.rows.len());
            for row in &self.rows {
                let mut placeholders = Vec::with_capacity(row.len());
                for (&i, value) in self.columns.iter().zip(row) {
                    columns[i].def().check(value)?;
                    params.push_value(value.clone());
                    placeholders.push("?");
                }
                tuples.push(format!("({})", placeholders.join(", ")));
            }
            sql.push_str(&tuples.join(", "));
        }

        if let Some(clause) = &self.on_conflict {
            sql.push_str(&self.render_on_conflict(clause)?);
        }
        sql.push(';');

        Ok(BuiltQuery {
            sql,
            params,
            kind: StatementKind::Insert,
        })
    }
}
