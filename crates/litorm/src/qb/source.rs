//! FROM/JOIN sources: base tables and nested queries behind one interface.

use crate::error::{OrmResult, SchemaError};
use crate::qb::expr::ColumnRef;
use crate::qb::param::ParamList;
use crate::schema::{ColumnDef, TableSchema};

/// Anything that can appear in a FROM or JOIN clause.
///
/// Implemented by [`Table`](crate::Table) and [`Subquery`].
pub trait Selectable {
    /// Name the source's columns are qualified with.
    fn source_name(&self) -> &str;

    /// Columns this source exposes, in order.
    fn column_defs(&self) -> Vec<&ColumnDef>;

    /// Render as a FROM/JOIN source, pushing any nested parameters.
    fn render_source(&self, params: &mut ParamList) -> String;

    fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.column_defs().into_iter().find(|c| c.name() == name)
    }
}

/// A rendered SELECT usable as a FROM or JOIN source under an alias.
///
/// Built with [`SelectQuery::subquery`](crate::qb::SelectQuery::subquery).
#[derive(Debug, Clone)]
pub struct Subquery {
    alias: String,
    sql: String,
    params: ParamList,
    columns: Vec<ColumnDef>,
}

impl Subquery {
    pub(crate) fn new(
        alias: String,
        sql: String,
        params: ParamList,
        columns: Vec<ColumnDef>,
    ) -> Self {
        Self {
            alias,
            sql,
            params,
            columns,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The inner SELECT, without the alias.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Selectable for Subquery {
    fn source_name(&self) -> &str {
        &self.alias
    }

    fn column_defs(&self) -> Vec<&ColumnDef> {
        self.columns.iter().collect()
    }

    fn render_source(&self, params: &mut ParamList) -> String {
        params.extend(&self.params);
        format!("({}) AS `{}`", self.sql, self.alias)
    }
}

/// A query source as held by a builder.
pub(crate) enum Source<'c> {
    Table(&'c dyn TableSchema),
    Subquery(Subquery),
}

impl Selectable for Source<'_> {
    fn source_name(&self) -> &str {
        match self {
            Source::Table(table) => table.source_name(),
            Source::Subquery(query) => query.source_name(),
        }
    }

    fn column_defs(&self) -> Vec<&ColumnDef> {
        match self {
            Source::Table(table) => table.column_defs(),
            Source::Subquery(query) => query.column_defs(),
        }
    }

    fn render_source(&self, params: &mut ParamList) -> String {
        match self {
            Source::Table(table) => table.render_source(params),
            Source::Subquery(query) => query.render_source(params),
        }
    }
}

/// The set of sources column references are resolved against.
pub(crate) struct Scope<'a> {
    sources: Vec<&'a dyn Selectable>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(sources: Vec<&'a dyn Selectable>) -> Self {
        Self { sources }
    }

    /// Find the column a reference points at.
    ///
    /// Qualified references must name a source of this scope; unqualified
    /// ones must match exactly one source.
    pub(crate) fn resolve(&self, column: &ColumnRef) -> OrmResult<&'a ColumnDef> {
        match column.table() {
            Some(table) => {
                let source = self
                    .sources
                    .iter()
                    .copied()
                    .find(|s| s.source_name() == table)
                    .ok_or_else(|| SchemaError::UnknownTable(table.to_string()))?;
                source.find_column(column.column()).ok_or_else(|| {
                    SchemaError::UnknownColumn {
                        table: format!("`{table}`"),
                        column: column.column().to_string(),
                    }
                    .into()
                })
            }
            None => {
                let mut matches = self
                    .sources
                    .iter()
                    .copied()
                    .filter_map(|s| s.find_column(column.column()));
                match (matches.next(), matches.next()) {
                    (Some(def), None) => Ok(def),
                    (Some(_), Some(_)) => {
                        Err(SchemaError::AmbiguousColumn(column.column().to_string()).into())
                    }
                    (None, _) => Err(SchemaError::UnknownColumn {
                        table: self.describe(),
                        column: column.column().to_string(),
                    }
                    .into()),
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.sources
            .iter()
            .map(|s| format!("`{}`", s.source_name()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
