//! Column-level constraint declarations.

use std::fmt;

/// ON CONFLICT resolution policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Conflict {
    #[default]
    Abort,
    Replace,
    Ignore,
    Fail,
    Rollback,
}

impl Conflict {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Conflict::Abort => "ABORT",
            Conflict::Replace => "REPLACE",
            Conflict::Ignore => "IGNORE",
            Conflict::Fail => "FAIL",
            Conflict::Rollback => "ROLLBACK",
        }
    }
}

/// Foreign key action taken on update or delete of the referenced row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    Cascade,
    Restrict,
    SetNull,
    SetDefault,
    #[default]
    NoAction,
}

impl Action {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Action::Cascade => "CASCADE",
            Action::Restrict => "RESTRICT",
            Action::SetNull => "SET NULL",
            Action::SetDefault => "SET DEFAULT",
            Action::NoAction => "NO ACTION",
        }
    }
}

/// Target of a foreign key: a column in another registered table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub table: String,
    pub column: String,
}

impl Reference {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

/// One declared rule on a column.
///
/// Constraints are pure data. Whether a [`Reference`] points at a real table
/// is checked when the owning connection is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constraint {
    PrimaryKey {
        conflict: Conflict,
        autoincrement: bool,
    },
    NotNull(Conflict),
    Unique(Conflict),
    ForeignKey {
        reference: Reference,
        on_update: Action,
        on_delete: Action,
    },
}

impl Constraint {
    pub fn primary_key(conflict: Conflict) -> Self {
        Constraint::PrimaryKey {
            conflict,
            autoincrement: false,
        }
    }

    pub fn not_null(conflict: Conflict) -> Self {
        Constraint::NotNull(conflict)
    }

    pub fn unique(conflict: Conflict) -> Self {
        Constraint::Unique(conflict)
    }

    pub fn foreign_key(reference: Reference, on_update: Action, on_delete: Action) -> Self {
        Constraint::ForeignKey {
            reference,
            on_update,
            on_delete,
        }
    }

    /// Exact clause text for this constraint.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::PrimaryKey {
                conflict,
                autoincrement,
            } => {
                write!(f, "PRIMARY KEY ON CONFLICT {}", conflict.as_sql())?;
                if *autoincrement {
                    f.write_str(" AUTOINCREMENT")?;
                }
                Ok(())
            }
            Constraint::NotNull(conflict) => write!(f, "NOT NULL ON CONFLICT {}", conflict.as_sql()),
            Constraint::Unique(conflict) => write!(f, "UNIQUE ON CONFLICT {}", conflict.as_sql()),
            Constraint::ForeignKey {
                reference,
                on_update,
                on_delete,
            } => write!(
                f,
                "REFERENCES `{}` (`{}`) ON UPDATE {} ON DELETE {}",
                reference.table,
                reference.column,
                on_update.as_sql(),
                on_delete.as_sql()
            ),
        }
    }
}
