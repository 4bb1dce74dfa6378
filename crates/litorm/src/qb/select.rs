//! SELECT query builder.

use crate::connection::Connection;
use crate::error::{OrmError, OrmResult};
use crate::log::StatementKind;
use crate::qb::expr::{ColumnRef, Expr};
use crate::qb::param::ParamList;
use crate::qb::source::{Scope, Selectable, Source, Subquery};
use crate::qb::traits::{BuiltQuery, Cursor, Filter, QueryState, SqlQb, StatementSlot, conjoin};
use crate::schema::{ColumnDef, Table};

/// JOIN flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// Sort direction for ORDER BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(&self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

struct Join<'c> {
    kind: JoinKind,
    source: Source<'c>,
    on: Expr,
}

/// SELECT query builder mapping rows onto `R`.
///
/// ```ignore
/// let users: Vec<User> = conn
///     .select::<User>()
///     .join::<Post>(Expr::columns_eq("posts.user_id", "users.id"))
///     .eq("posts.published", true)
///     .order_by("users.name", Order::Asc)
///     .fetch_all()?;
/// ```
pub struct SelectQuery<'c, R> {
    slot: StatementSlot<'c>,
    table: &'c Table<R>,
    from: Source<'c>,
    joins: Vec<Join<'c>>,
    columns: Option<Vec<ColumnRef>>,
    distinct: bool,
    where_expr: Option<Expr>,
    order_by: Vec<(ColumnRef, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl<'c, R: 'static> SelectQuery<'c, R> {
    pub(crate) fn new(conn: &'c Connection, table: &'c Table<R>) -> Self {
        Self::with_source(conn, table, Source::Table(table))
    }

    pub(crate) fn from_subquery(conn: &'c Connection, table: &'c Table<R>, subquery: Subquery) -> Self {
        Self::with_source(conn, table, Source::Subquery(subquery))
    }

    fn with_source(conn: &'c Connection, table: &'c Table<R>, from: Source<'c>) -> Self {
        Self {
            slot: StatementSlot::new(conn),
            table,
            from,
            joins: Vec::new(),
            columns: None,
            distinct: false,
            where_expr: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    // ==================== SELECT columns ====================

    /// Project these columns instead of every column of the FROM source.
    pub fn columns<C: Into<ColumnRef>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.slot.guard_mutation("the column list");
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn distinct(mut self) -> Self {
        self.slot.guard_mutation("DISTINCT");
        self.distinct = true;
        self
    }

    // ==================== JOIN ====================

    /// Add `JOIN <J's table> ON <on>`.
    pub fn join<J: 'static>(self, on: Expr) -> Self {
        self.join_table::<J>(JoinKind::Inner, on)
    }

    /// Add `LEFT JOIN <J's table> ON <on>`.
    pub fn left_join<J: 'static>(self, on: Expr) -> Self {
        self.join_table::<J>(JoinKind::Left, on)
    }

    /// Join a nested query under its alias.
    pub fn join_subquery(self, subquery: Subquery, kind: JoinKind, on: Expr) -> Self {
        self.push_join(kind, Source::Subquery(subquery), on)
    }

    fn join_table<J: 'static>(mut self, kind: JoinKind, on: Expr) -> Self {
        match self.slot.connection().table::<J>() {
            Ok(table) => self.push_join(kind, Source::Table(table), on),
            Err(err) => {
                self.slot.fail(err);
                self
            }
        }
    }

    fn push_join(mut self, kind: JoinKind, source: Source<'c>, on: Expr) -> Self {
        self.slot.guard_mutation("the JOIN list");
        self.joins.push(Join { kind, source, on });
        self
    }

    // ==================== ORDER / LIMIT ====================

    pub fn order_by(mut self, column: impl Into<ColumnRef>, order: Order) -> Self {
        self.slot.guard_mutation("ORDER BY");
        self.order_by.push((column.into(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.slot.guard_mutation("LIMIT");
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.slot.guard_mutation("OFFSET");
        self.offset = Some(offset);
        self
    }

    // ==================== Rendering ====================

    fn scope(&self) -> Scope<'_> {
        let mut sources: Vec<&dyn Selectable> = Vec::with_capacity(self.joins.len() + 1);
        sources.push(&self.from);
        sources.extend(self.joins.iter().map(|join| &join.source as &dyn Selectable));
        Scope::new(sources)
    }

    /// Projected expressions with the column each one reads.
    fn projection<'s>(&'s self, scope: &Scope<'s>) -> OrmResult<Vec<(String, &'s ColumnDef)>> {
        match &self.columns {
            Some(columns) => columns
                .iter()
                .map(|column| Ok((column.to_string(), scope.resolve(column)?)))
                .collect(),
            None => Ok(self
                .from
                .column_defs()
                .into_iter()
                .map(|def| {
                    let column = ColumnRef::qualified(self.from.source_name(), def.name());
                    (column.to_string(), def)
                })
                .collect()),
        }
    }

    /// Render without the trailing `;`.
    fn render(&self, count: bool) -> OrmResult<(String, ParamList)> {
        self.slot.check()?;
        let scope = self.scope();
        let projection = self.projection(&scope)?;
        for join in &self.joins {
            join.on.validate(&scope)?;
        }
        if let Some(expr) = &self.where_expr {
            expr.validate(&scope)?;
        }
        for (column, _) in &self.order_by {
            scope.resolve(column)?;
        }

        let mut params = ParamList::new();
        let mut sql = String::from("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if count {
            sql.push_str("COUNT(*)");
        } else {
            let columns: Vec<&str> = projection.iter().map(|(sql, _)| sql.as_str()).collect();
            sql.push_str(&columns.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from.render_source(&mut params));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&join.source.render_source(&mut params));
            sql.push_str(" ON ");
            sql.push_str(&join.on.build(&mut params));
        }

        if let Some(expr) = &self.where_expr {
            sql.push_str(" WHERE ");
            sql.push_str(&expr.build(&mut params));
        }

        if !count {
            if !self.order_by.is_empty() {
                let order: Vec<String> = self
                    .order_by
                    .iter()
                    .map(|(column, order)| format!("{} {}", column, order.as_sql()))
                    .collect();
                sql.push_str(" ORDER BY ");
                sql.push_str(&order.join(", "));
            }
            match (self.limit, self.offset) {
                (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
                (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
                (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
                (None, None) => {}
            }
        }
        Ok((sql, params))
    }

    /// `SELECT COUNT(*)` over the same FROM/JOIN/WHERE.
    ///
    /// DISTINCT, LIMIT and OFFSET wrap the full query instead.
    pub fn build_count(&self) -> OrmResult<BuiltQuery> {
        let (sql, params) = if self.distinct || self.limit.is_some() || self.offset.is_some() {
            let (inner, params) = self.render(false)?;
            (format!("SELECT COUNT(*) FROM ({inner})"), params)
        } else {
            self.render(true)?
        };
        Ok(BuiltQuery {
            sql: sql + ";",
            params,
            kind: StatementKind::Select,
        })
    }

    /// Use this query as a FROM/JOIN source named `alias`.
    pub fn subquery(&self, alias: impl Into<String>) -> OrmResult<Subquery> {
        let (sql, params) = self.render(false)?;
        let scope = self.scope();
        let columns = self
            .projection(&scope)?
            .into_iter()
            .map(|(_, def)| def.clone())
            .collect();
        Ok(Subquery::new(alias.into(), sql, params, columns))
    }

    // ==================== Execution ====================

    pub fn state(&self) -> QueryState {
        self.slot.state()
    }

    /// Render, compile and bind. Re-preparing re-renders and re-binds.
    pub fn prepare(&mut self) -> OrmResult<()> {
        let built = self.build()?;
        self.slot.prepare(built)
    }

    /// Number of rows this query would return.
    pub fn count(&self) -> OrmResult<i64> {
        let built = self.build_count()?;
        let conn = self.slot.connection();
        let mut stmt = conn.prepare_built(&built)?;
        let mut rows = stmt.query()?;
        match rows.step()? {
            Some(row) => row.try_get::<i64>(0),
            None => Err(OrmError::not_found("COUNT(*) returned no row")),
        }
    }
}

impl<'c, R: Default + 'static> SelectQuery<'c, R> {
    /// Lazily step result rows, mapping each onto `R`.
    ///
    /// Prepares first unless the statement is freshly prepared; a consumed
    /// statement is re-prepared.
    pub fn rows(&mut self) -> OrmResult<Records<'_, R>> {
        if !self.slot.is_prepared() {
            self.prepare()?;
        }
        let table = self.table;
        let cursor = self.slot.cursor()?;
        Ok(Records {
            cursor,
            table,
            done: false,
        })
    }

    /// Fetch all rows.
    pub fn fetch_all(mut self) -> OrmResult<Vec<R>> {
        let rows = self.rows()?;
        rows.collect()
    }

    /// Fetch the first row, if any.
    pub fn fetch_opt(mut self) -> OrmResult<Option<R>> {
        let mut rows = self.rows()?;
        rows.next().transpose()
    }

    /// Fetch the first row; [`OrmError::NotFound`] if there is none.
    pub fn fetch_one(self) -> OrmResult<R> {
        let table = self.table.name().to_string();
        self.fetch_opt()?
            .ok_or_else(|| OrmError::not_found(format!("no row in `{table}` matched")))
    }

    /// `LIMIT 1` and fetch the row, if any.
    pub fn one(self) -> OrmResult<Option<R>> {
        self.limit(1).fetch_opt()
    }
}

impl<R: 'static> Filter for SelectQuery<'_, R> {
    fn and_where(mut self, expr: Expr) -> Self {
        self.slot.guard_mutation("the WHERE clause");
        self.where_expr = conjoin(self.where_expr.take(), expr);
        self
    }
}

impl<R: 'static> SqlQb for SelectQuery<'_, R> {
    fn build(&self) -> OrmResult<BuiltQuery> {
        let (sql, params) = self.render(false)?;
        Ok(BuiltQuery {
            sql: sql + ";",
            params,
            kind: StatementKind::Select,
        })
    }
}

/// Iterator over the records of a running SELECT.
pub struct Records<'q, R> {
    cursor: Cursor<'q>,
    table: &'q Table<R>,
    done: bool,
}

impl<R: Default> Iterator for Records<'_, R> {
    type Item = OrmResult<R>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.step() {
            Ok(Some(row)) => Some(self.table.from_row(&row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
