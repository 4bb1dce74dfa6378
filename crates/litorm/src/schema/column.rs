//! Column descriptors: metadata plus the projection onto a record field.

use crate::driver::{Row, Statement};
use crate::error::{OrmError, OrmResult};
use crate::schema::constraint::{Action, Conflict, Constraint, Reference};
use crate::value::{SqlType, StorageType, Value};

/// Record-independent column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    name: String,
    storage: StorageType,
    nullable: bool,
    ordinal: usize,
    constraints: Vec<Constraint>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, storage: StorageType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            storage,
            nullable,
            ordinal: 0,
            constraints: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the column in its table, in declaration order.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints
            .iter()
            .any(|c| matches!(c, Constraint::PrimaryKey { .. }))
    }

    pub fn is_autoincrement(&self) -> bool {
        self.constraints.iter().any(|c| {
            matches!(
                c,
                Constraint::PrimaryKey {
                    autoincrement: true,
                    ..
                }
            )
        })
    }

    /// The foreign key target of this column, if it declares one.
    pub fn reference(&self) -> Option<&Reference> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::ForeignKey { reference, .. } => Some(reference),
            _ => None,
        })
    }

    /// Column definition as it appears inside CREATE TABLE.
    ///
    /// NOT NULL is emitted once, first: with its declared policy if the column
    /// carries an explicit NOT NULL, else with ABORT unless the column is
    /// nullable. The remaining constraints follow in declaration order.
    pub fn render_definition(&self) -> String {
        let mut sql = format!("`{}` {}", self.name, self.storage);

        let explicit = self.constraints.iter().find_map(|c| match c {
            Constraint::NotNull(conflict) => Some(*conflict),
            _ => None,
        });
        if let Some(conflict) = explicit.or((!self.nullable).then_some(Conflict::Abort)) {
            sql.push(' ');
            sql.push_str(&Constraint::NotNull(conflict).render());
        }

        for constraint in &self.constraints {
            if matches!(constraint, Constraint::NotNull(_)) {
                continue;
            }
            sql.push(' ');
            sql.push_str(&constraint.render());
        }
        sql
    }

    /// Check that `value` may be bound to this column.
    ///
    /// NULL always passes; NOT NULL is left to the engine so the declared
    /// conflict policy applies.
    pub fn check(&self, value: &Value) -> OrmResult<()> {
        match value.storage_type() {
            Some(found) if !self.storage.accepts(found) => {
                Err(OrmError::type_mismatch(&self.name, self.storage, value))
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    fn push_constraint(&mut self, constraint: Constraint) {
        if matches!(constraint, Constraint::NotNull(_)) {
            self.nullable = false;
        }
        self.constraints.push(constraint);
    }
}

type Getter<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;
type Setter<R> = Box<dyn Fn(&mut R, Value) -> Result<(), Value> + Send + Sync>;

/// A column bound to one field (or accessor pair) of record type `R`.
pub struct Column<R> {
    def: ColumnDef,
    get: Getter<R>,
    set: Setter<R>,
}

impl<R: 'static> Column<R> {
    /// Map a public field through a pair of field projections.
    ///
    /// ```ignore
    /// Column::field("name", |u: &User| &u.name, |u: &mut User| &mut u.name)
    /// ```
    pub fn field<T: SqlType + 'static>(
        name: impl Into<String>,
        get: fn(&R) -> &T,
        get_mut: fn(&mut R) -> &mut T,
    ) -> Self {
        Self {
            def: ColumnDef::new(name, T::STORAGE, T::NULLABLE),
            get: Box::new(move |record: &R| get(record).to_value()),
            set: Box::new(move |record: &mut R, value: Value| {
                *get_mut(record) = T::from_value(value)?;
                Ok(())
            }),
        }
    }

    /// Map a private field through a getter/setter pair.
    pub fn accessor<T: SqlType + 'static>(
        name: impl Into<String>,
        get: fn(&R) -> T,
        set: fn(&mut R, T),
    ) -> Self {
        Self {
            def: ColumnDef::new(name, T::STORAGE, T::NULLABLE),
            get: Box::new(move |record: &R| get(record).to_value()),
            set: Box::new(move |record: &mut R, value: Value| {
                set(record, T::from_value(value)?);
                Ok(())
            }),
        }
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.def.push_constraint(constraint);
        self
    }

    pub fn primary_key(self, conflict: Conflict) -> Self {
        self.constraint(Constraint::primary_key(conflict))
    }

    /// INTEGER PRIMARY KEY AUTOINCREMENT; omitted from INSERT and filled from the rowid.
    pub fn autoincrement(self, conflict: Conflict) -> Self {
        self.constraint(Constraint::PrimaryKey {
            conflict,
            autoincrement: true,
        })
    }

    pub fn not_null(self, conflict: Conflict) -> Self {
        self.constraint(Constraint::not_null(conflict))
    }

    pub fn unique(self, conflict: Conflict) -> Self {
        self.constraint(Constraint::unique(conflict))
    }

    pub fn foreign_key(self, reference: Reference, on_update: Action, on_delete: Action) -> Self {
        self.constraint(Constraint::foreign_key(reference, on_update, on_delete))
    }
}

impl<R> Column<R> {
    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        self.def.name()
    }

    pub fn ordinal(&self) -> usize {
        self.def.ordinal()
    }

    pub fn storage_type(&self) -> StorageType {
        self.def.storage_type()
    }

    pub fn is_nullable(&self) -> bool {
        self.def.is_nullable()
    }

    pub fn render_definition(&self) -> String {
        self.def.render_definition()
    }

    /// Read this column's value out of `record`.
    pub fn extract(&self, record: &R) -> Value {
        (self.get)(record)
    }

    /// Write `value` into `record`, applying REAL affinity first.
    pub fn assign(&self, record: &mut R, value: Value) -> OrmResult<()> {
        let value = value.coerce(self.def.storage_type());
        (self.set)(record, value)
            .map_err(|rejected| OrmError::type_mismatch(self.name(), self.storage_type(), &rejected))
    }

    /// Load result column `index` of `row` into `record`.
    pub fn load(&self, record: &mut R, row: &Row, index: usize) -> OrmResult<()> {
        let value = row.value(index, self.storage_type())?;
        self.assign(record, value)
    }

    /// Bind `value` to placeholder `slot` after checking it fits this column.
    pub fn bind(&self, statement: &mut dyn Statement, slot: usize, value: &Value) -> OrmResult<()> {
        self.def.check(value)?;
        statement.bind(slot, value)
    }

    pub(crate) fn set_ordinal(&mut self, ordinal: usize) {
        self.def.set_ordinal(ordinal);
    }
}

impl<R> std::fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column").field("def", &self.def).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::constraint::Reference;

    #[derive(Default)]
    struct Object {
        id: i64,
        name: String,
        nickname: Option<String>,
        score: f64,
        secret: i32,
    }

    impl Object {
        fn secret(&self) -> i32 {
            self.secret
        }

        fn set_secret(&mut self, secret: i32) {
            self.secret = secret;
        }
    }

    #[test]
    fn storage_and_nullability_follow_the_field_type() {
        let id = Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id);
        let nickname = Column::field(
            "nickname",
            |o: &Object| &o.nickname,
            |o: &mut Object| &mut o.nickname,
        );
        assert_eq!(id.storage_type(), StorageType::Integer);
        assert!(!id.is_nullable());
        assert_eq!(nickname.storage_type(), StorageType::Text);
        assert!(nickname.is_nullable());
    }

    #[test]
    fn implicit_not_null_is_rendered_once() {
        let plain = Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name);
        assert_eq!(plain.render_definition(), "`name` TEXT NOT NULL ON CONFLICT ABORT");

        let explicit = Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name)
            .not_null(Conflict::Abort)
            .unique(Conflict::Abort);
        assert_eq!(
            explicit.render_definition(),
            "`name` TEXT NOT NULL ON CONFLICT ABORT UNIQUE ON CONFLICT ABORT"
        );
    }

    #[test]
    fn explicit_not_null_makes_optional_columns_required() {
        let nickname = Column::field(
            "nickname",
            |o: &Object| &o.nickname,
            |o: &mut Object| &mut o.nickname,
        );
        assert_eq!(nickname.render_definition(), "`nickname` TEXT");

        let nickname = nickname.not_null(Conflict::Replace);
        assert!(!nickname.is_nullable());
        assert_eq!(
            nickname.render_definition(),
            "`nickname` TEXT NOT NULL ON CONFLICT REPLACE"
        );
    }

    #[test]
    fn constraints_render_in_declaration_order() {
        let column = Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id)
            .foreign_key(Reference::new("test", "id"), Action::Cascade, Action::Restrict)
            .unique(Conflict::Fail);
        assert_eq!(
            column.render_definition(),
            "`id` INTEGER NOT NULL ON CONFLICT ABORT REFERENCES `test` (`id`) ON UPDATE CASCADE ON DELETE RESTRICT UNIQUE ON CONFLICT FAIL"
        );
        assert_eq!(column.def().reference(), Some(&Reference::new("test", "id")));
    }

    #[test]
    fn extract_and_assign_round_trip_through_fields() {
        let name = Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name);
        let mut object = Object {
            name: "alice".into(),
            ..Object::default()
        };
        assert_eq!(name.extract(&object), Value::Text("alice".into()));

        name.assign(&mut object, Value::Text("bob".into())).unwrap();
        assert_eq!(object.name, "bob");
    }

    #[test]
    fn accessor_columns_use_the_getter_and_setter() {
        let secret = Column::accessor("secret", Object::secret, Object::set_secret);
        let mut object = Object::default();
        secret.assign(&mut object, Value::Integer(7)).unwrap();
        assert_eq!(object.secret, 7);
        assert_eq!(secret.extract(&object), Value::Integer(7));
    }

    #[test]
    fn assign_applies_real_affinity() {
        let score = Column::field("score", |o: &Object| &o.score, |o: &mut Object| &mut o.score);
        let mut object = Object::default();
        score.assign(&mut object, Value::Integer(3)).unwrap();
        assert_eq!(object.score, 3.0);
    }

    #[test]
    fn assign_rejects_wrong_storage_class() {
        let id = Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id);
        let mut object = Object::default();
        let err = id
            .assign(&mut object, Value::Text("one".into()))
            .unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn check_accepts_null_and_widening() {
        let score = Column::field("score", |o: &Object| &o.score, |o: &mut Object| &mut o.score);
        assert!(score.def().check(&Value::Null).is_ok());
        assert!(score.def().check(&Value::Integer(1)).is_ok());
        assert!(score.def().check(&Value::Text("1".into())).is_err());
    }
}
