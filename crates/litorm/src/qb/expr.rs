//! Predicate expression tree for WHERE and JOIN ... ON clauses.
//!
//! Expressions render with positional `?` placeholders. Parameter values are
//! pushed left to right in render order, which is exactly the bind order.
//!
//! Every column reference is resolved against the query's FROM/JOIN sources
//! when the query is built, and every compared value is checked against the
//! storage type of the column it is compared with.

use crate::error::{OrmError, OrmResult};
use crate::qb::param::ParamList;
use crate::qb::source::Scope;
use crate::value::{ToValue, Value};
use std::fmt;

/// A possibly table-qualified column reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    table: Option<String>,
    column: String,
}

impl ColumnRef {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "`{}`.`{}`", table, self.column),
            None => write!(f, "`{}`", self.column),
        }
    }
}

/// `"name"` is unqualified, `"users.name"` is qualified.
impl From<&str> for ColumnRef {
    fn from(value: &str) -> Self {
        match value.split_once('.') {
            Some((table, column)) => ColumnRef::qualified(table, column),
            None => ColumnRef::new(value),
        }
    }
}

impl From<String> for ColumnRef {
    fn from(value: String) -> Self {
        ColumnRef::from(value.as_str())
    }
}

impl From<(&str, &str)> for ColumnRef {
    fn from((table, column): (&str, &str)) -> Self {
        ColumnRef::qualified(table, column)
    }
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Like => "LIKE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// Expression node for WHERE and JOIN conditions.
#[derive(Clone, Debug)]
pub enum Expr {
    /// `col OP ?`
    Compare {
        column: ColumnRef,
        op: CompareOp,
        value: Value,
    },

    /// `left OP right`, both sides columns (join conditions)
    Columns {
        left: ColumnRef,
        op: CompareOp,
        right: ColumnRef,
    },

    /// `(left AND|OR right)`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// `NOT (expr)`
    Not(Box<Expr>),

    /// `col IS NULL` or `col IS NOT NULL`
    NullCheck { column: ColumnRef, is_null: bool },

    /// `col IN (?, ?, ...)` or `col NOT IN (...)`
    InList {
        column: ColumnRef,
        values: Vec<Value>,
        negated: bool,
    },

    /// `col BETWEEN ? AND ?`
    Between {
        column: ColumnRef,
        from: Value,
        to: Value,
        negated: bool,
    },

    /// Raw SQL with `?` placeholders, one per value.
    Raw { sql: String, params: Vec<Value> },
}

fn compare(column: impl Into<ColumnRef>, op: CompareOp, value: impl ToValue) -> Expr {
    Expr::Compare {
        column: column.into(),
        op,
        value: value.to_value(),
    }
}

/// Number of `?` placeholders in `sql`, skipping quoted strings and identifiers.
fn count_placeholders(sql: &str) -> usize {
    let mut quote = None;
    let mut count = 0;
    for c in sql.chars() {
        match (quote, c) {
            // a doubled quote closes and reopens, which nets out
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '?') => count += 1,
            (None, _) => {}
        }
    }
    count
}

impl Expr {
    /// Create an equality condition: column = value
    pub fn eq(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Eq, value)
    }

    /// Create an inequality condition: column != value
    pub fn ne(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Ne, value)
    }

    /// Create a greater-than condition: column > value
    pub fn gt(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Gt, value)
    }

    /// Create a greater-than-or-equal condition: column >= value
    pub fn gte(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Ge, value)
    }

    /// Create a less-than condition: column < value
    pub fn lt(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Lt, value)
    }

    /// Create a less-than-or-equal condition: column <= value
    pub fn lte(column: impl Into<ColumnRef>, value: impl ToValue) -> Self {
        compare(column, CompareOp::Le, value)
    }

    /// Create a LIKE condition: column LIKE pattern
    pub fn like(column: impl Into<ColumnRef>, pattern: impl ToValue) -> Self {
        compare(column, CompareOp::Like, pattern)
    }

    /// Compare two columns, typically `a.fk = b.id` in a join.
    pub fn columns_eq(left: impl Into<ColumnRef>, right: impl Into<ColumnRef>) -> Self {
        Expr::Columns {
            left: left.into(),
            op: CompareOp::Eq,
            right: right.into(),
        }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conjunction of all expressions, nested left to right. `None` if empty.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Option<Self> {
        exprs.into_iter().reduce(Expr::and)
    }

    /// Disjunction of all expressions, nested left to right. `None` if empty.
    pub fn any(exprs: impl IntoIterator<Item = Expr>) -> Option<Self> {
        exprs.into_iter().reduce(Expr::or)
    }

    pub fn negate(expr: Expr) -> Self {
        Expr::Not(Box::new(expr))
    }

    pub fn is_null(column: impl Into<ColumnRef>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: true,
        }
    }

    pub fn is_not_null(column: impl Into<ColumnRef>) -> Self {
        Expr::NullCheck {
            column: column.into(),
            is_null: false,
        }
    }

    /// Create an IN condition: column IN (?, ?, ...)
    pub fn in_list<T: ToValue>(
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(|v| v.to_value()).collect(),
            negated: false,
        }
    }

    /// Create a NOT IN condition: column NOT IN (?, ?, ...)
    pub fn not_in<T: ToValue>(
        column: impl Into<ColumnRef>,
        values: impl IntoIterator<Item = T>,
    ) -> Self {
        Expr::InList {
            column: column.into(),
            values: values.into_iter().map(|v| v.to_value()).collect(),
            negated: true,
        }
    }

    pub fn between(column: impl Into<ColumnRef>, from: impl ToValue, to: impl ToValue) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.to_value(),
            to: to.to_value(),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<ColumnRef>,
        from: impl ToValue,
        to: impl ToValue,
    ) -> Self {
        Expr::Between {
            column: column.into(),
            from: from.to_value(),
            to: to.to_value(),
            negated: true,
        }
    }

    /// Raw condition with `?` placeholders, e.g. `Expr::raw("length(`name`) > ?", [Value::Integer(3)])`.
    pub fn raw(sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> Self {
        Expr::Raw {
            sql: sql.into(),
            params: params.into_iter().collect(),
        }
    }

    /// Render the expression, pushing parameter values in placeholder order.
    pub fn build(&self, params: &mut ParamList) -> String {
        match self {
            Expr::Compare { column, op, value } => {
                params.push_value(value.clone());
                format!("{} {} ?", column, op.as_sql())
            }
            Expr::Columns { left, op, right } => format!("{} {} {}", left, op.as_sql(), right),
            Expr::Logical { op, left, right } => {
                let left = left.build(params);
                let right = right.build(params);
                format!("({} {} {})", left, op.as_sql(), right)
            }
            Expr::Not(inner) => format!("NOT ({})", inner.build(params)),
            Expr::NullCheck { column, is_null } => {
                if *is_null {
                    format!("{} IS NULL", column)
                } else {
                    format!("{} IS NOT NULL", column)
                }
            }
            Expr::InList {
                column,
                values,
                negated,
            } => {
                let placeholders: Vec<&str> = values
                    .iter()
                    .map(|v| {
                        params.push_value(v.clone());
                        "?"
                    })
                    .collect();
                let op = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, op, placeholders.join(", "))
            }
            Expr::Between {
                column,
                from,
                to,
                negated,
            } => {
                params.push_value(from.clone());
                params.push_value(to.clone());
                let op = if *negated { "NOT BETWEEN" } else { "BETWEEN" };
                format!("{} {} ? AND ?", column, op)
            }
            Expr::Raw { sql, params: values } => {
                for value in values {
                    params.push_value(value.clone());
                }
                sql.clone()
            }
        }
    }

    /// Resolve every column reference against `scope` and type-check values.
    pub(crate) fn validate(&self, scope: &Scope<'_>) -> OrmResult<()> {
        match self {
            Expr::Compare { column, value, .. } => scope.resolve(column)?.check(value),
            Expr::Columns { left, right, .. } => {
                scope.resolve(left)?;
                scope.resolve(right)?;
                Ok(())
            }
            Expr::Logical { left, right, .. } => {
                left.validate(scope)?;
                right.validate(scope)
            }
            Expr::Not(inner) => inner.validate(scope),
            Expr::NullCheck { column, .. } => scope.resolve(column).map(|_| ()),
            Expr::InList { column, values, .. } => {
                let def = scope.resolve(column)?;
                values.iter().try_for_each(|v| def.check(v))
            }
            Expr::Between {
                column, from, to, ..
            } => {
                let def = scope.resolve(column)?;
                def.check(from)?;
                def.check(to)
            }
            Expr::Raw { sql, params } => {
                let placeholders = count_placeholders(sql);
                if placeholders != params.len() {
                    return Err(OrmError::validation(format!(
                        "raw condition has {placeholders} placeholders but {} values",
                        params.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

impl std::ops::BitAnd for Expr {
    type Output = Expr;

    fn bitand(self, rhs: Expr) -> Expr {
        Expr::and(self, rhs)
    }
}

impl std::ops::BitOr for Expr {
    type Output = Expr;

    fn bitor(self, rhs: Expr) -> Expr {
        Expr::or(self, rhs)
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::negate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: &Expr) -> (String, Vec<Value>) {
        let mut params = ParamList::new();
        let sql = expr.build(&mut params);
        (sql, params.as_slice().to_vec())
    }

    #[test]
    fn comparison_renders_a_placeholder() {
        let (sql, params) = render(&Expr::eq("id", 1i64));
        assert_eq!(sql, "`id` = ?");
        assert_eq!(params, vec![Value::Integer(1)]);

        let (sql, _) = render(&Expr::like("users.name", "a%"));
        assert_eq!(sql, "`users`.`name` LIKE ?");
    }

    #[test]
    fn logical_nodes_are_parenthesized() {
        let expr = Expr::and(
            Expr::eq("a", 1i64),
            Expr::or(Expr::eq("b", 2i64), Expr::gt("c", 3i64)),
        );
        let (sql, params) = render(&expr);
        assert_eq!(sql, "(`a` = ? AND (`b` = ? OR `c` > ?))");
        assert_eq!(
            params,
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn operators_build_the_same_tree() {
        let expr = Expr::eq("a", 1i64) & !Expr::is_null("b") | Expr::lt("c", 0i64);
        let (sql, _) = render(&expr);
        assert_eq!(sql, "((`a` = ? AND NOT (`b` IS NULL)) OR `c` < ?)");
    }

    #[test]
    fn null_checks() {
        assert_eq!(render(&Expr::is_null("a")).0, "`a` IS NULL");
        assert_eq!(render(&Expr::is_not_null("t.a")).0, "`t`.`a` IS NOT NULL");
    }

    #[test]
    fn membership_renders_one_placeholder_per_value() {
        let (sql, params) = render(&Expr::in_list("id", [1i64, 2, 3]));
        assert_eq!(sql, "`id` IN (?, ?, ?)");
        assert_eq!(params.len(), 3);

        let (sql, _) = render(&Expr::not_in("id", Vec::<i64>::new()));
        assert_eq!(sql, "`id` NOT IN ()");
    }

    #[test]
    fn between_pushes_both_bounds() {
        let (sql, params) = render(&Expr::between("age", 18i64, 30i64));
        assert_eq!(sql, "`age` BETWEEN ? AND ?");
        assert_eq!(params, vec![Value::Integer(18), Value::Integer(30)]);
    }

    #[test]
    fn quoted_question_marks_are_not_placeholders() {
        assert_eq!(count_placeholders("`id` = ? OR `id` = ?"), 2);
        assert_eq!(count_placeholders("`name` = 'who?'"), 0);
        assert_eq!(count_placeholders("`name` = 'it''s ?' AND `score` > ?"), 1);
        assert_eq!(count_placeholders("\"odd?col\" = ? AND `why?` IS NULL"), 1);
    }

    #[test]
    fn raw_keeps_value_order() {
        let expr = Expr::and(
            Expr::eq("a", 1i64),
            Expr::raw("length(`name`) > ?", [Value::Integer(3)]),
        );
        let (sql, params) = render(&expr);
        assert_eq!(sql, "(`a` = ? AND length(`name`) > ?)");
        assert_eq!(params, vec![Value::Integer(1), Value::Integer(3)]);
    }

    #[test]
    fn all_folds_left() {
        let expr = Expr::all([Expr::eq("a", 1i64), Expr::eq("b", 2i64), Expr::eq("c", 3i64)]).unwrap();
        assert_eq!(render(&expr).0, "((`a` = ? AND `b` = ?) AND `c` = ?)");
        assert!(Expr::any(Vec::new()).is_none());
    }

    #[test]
    fn column_refs_parse_qualification() {
        assert_eq!(ColumnRef::from("id"), ColumnRef::new("id"));
        assert_eq!(ColumnRef::from("u.id"), ColumnRef::qualified("u", "id"));
        assert_eq!(ColumnRef::from(("u", "id")).to_string(), "`u`.`id`");
    }
}
