//! Table descriptors.

use crate::driver::Row;
use crate::error::{OrmError, OrmResult, SchemaError};
use crate::qb::{ParamList, Selectable};
use crate::schema::TableSchema;
use crate::schema::column::{Column, ColumnDef};
use crate::schema::constraint::Reference;
use crate::value::StorageType;
use std::any::{Any, TypeId};

/// An ordered, named collection of columns mapped onto record type `R`.
///
/// Built with [`Table::builder`]; the builder checks everything that can be
/// checked without knowing the other tables of a connection.
///
/// ```ignore
/// let users = Table::builder("users")
///     .column(Column::field("id", |u: &User| &u.id, |u: &mut User| &mut u.id).primary_key(Conflict::Abort))
///     .column(Column::field("name", |u: &User| &u.name, |u: &mut User| &mut u.name))
///     .build()?;
/// ```
pub struct Table<R> {
    name: String,
    columns: Vec<Column<R>>,
}

/// Builder for [`Table`].
pub struct TableBuilder<R> {
    name: String,
    columns: Vec<Column<R>>,
}

impl<R: 'static> TableBuilder<R> {
    /// Append a column; declaration order is column order.
    pub fn column(mut self, column: Column<R>) -> Self {
        self.columns.push(column);
        self
    }

    pub fn build(mut self) -> OrmResult<Table<R>> {
        if self.columns.is_empty() {
            return Err(SchemaError::EmptyTable(self.name).into());
        }

        let mut primary_keys = 0;
        for (i, column) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|c| c.name() == column.name()) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.name.clone(),
                    column: column.name().to_string(),
                }
                .into());
            }
            if column.def().is_primary_key() {
                primary_keys += 1;
            }
            if column.def().is_autoincrement() && column.storage_type() != StorageType::Integer {
                return Err(SchemaError::InvalidAutoincrement {
                    table: self.name.clone(),
                    column: column.name().to_string(),
                }
                .into());
            }
        }
        if primary_keys > 1 {
            return Err(SchemaError::MultiplePrimaryKeys(self.name).into());
        }

        for (ordinal, column) in self.columns.iter_mut().enumerate() {
            column.set_ordinal(ordinal);
        }
        Ok(Table {
            name: self.name,
            columns: self.columns,
        })
    }
}

impl<R: 'static> Table<R> {
    pub fn builder(name: impl Into<String>) -> TableBuilder<R> {
        TableBuilder {
            name: name.into(),
            columns: Vec::new(),
        }
    }
}

impl<R> Table<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> OrmResult<&Column<R>> {
        self.columns
            .get(index)
            .ok_or_else(|| OrmError::not_found(format!("column {index} of table `{}`", self.name)))
    }

    pub fn column_name(&self, index: usize) -> OrmResult<&str> {
        self.column(index).map(Column::name)
    }

    pub fn column_by_name(&self, name: &str) -> OrmResult<&Column<R>> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| OrmError::not_found(format!("column `{name}` in table `{}`", self.name)))
    }

    pub fn primary_key(&self) -> Option<&Column<R>> {
        self.columns.iter().find(|c| c.def().is_primary_key())
    }

    /// The primary key, or a schema error naming this table.
    pub fn require_primary_key(&self) -> OrmResult<&Column<R>> {
        self.primary_key()
            .ok_or_else(|| SchemaError::MissingPrimaryKey(self.name.clone()).into())
    }

    /// Foreign keys declared by this table, with the declaring column.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&ColumnDef, &Reference)> {
        self.columns
            .iter()
            .filter_map(|c| c.def().reference().map(|r| (c.def(), r)))
    }

    /// `CREATE TABLE [IF NOT EXISTS] name (...);` with one definition per line.
    pub fn create_table_query(&self, if_not_exists: bool) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&self.name);
        sql.push_str(" (\n");
        let definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("    {}", c.render_definition()))
            .collect();
        sql.push_str(&definitions.join(",\n"));
        sql.push_str("\n);\n");
        sql
    }

    /// Build a record from a result row, matching result columns by name.
    ///
    /// Columns missing from the row keep their default value.
    pub fn from_row(&self, row: &Row) -> OrmResult<R>
    where
        R: Default,
    {
        let mut record = R::default();
        for column in &self.columns {
            if let Some(index) = row.index_of(column.name()) {
                column.load(&mut record, row, index)?;
            }
        }
        Ok(record)
    }
}

impl<R> std::fmt::Debug for Table<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .finish()
    }
}

impl<R: 'static> Selectable for Table<R> {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn column_defs(&self) -> Vec<&ColumnDef> {
        self.columns.iter().map(Column::def).collect()
    }

    fn render_source(&self, _params: &mut ParamList) -> String {
        format!("`{}`", self.name)
    }
}

impl<R: 'static> TableSchema for Table<R> {
    fn record_type(&self) -> TypeId {
        TypeId::of::<R>()
    }

    fn record_type_name(&self) -> &'static str {
        std::any::type_name::<R>()
    }

    fn create_table_query(&self, if_not_exists: bool) -> String {
        Table::create_table_query(self, if_not_exists)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::constraint::{Action, Conflict};
    use crate::value::Value;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Object {
        id: i64,
        name: String,
        some_id: i64,
        some_text: String,
        some_float: f32,
    }

    impl Object {
        fn id(&self) -> i64 {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = id;
        }

        fn name(&self) -> String {
            self.name.clone()
        }

        fn set_name(&mut self, name: String) {
            self.name = name;
        }
    }

    fn normalize(sql: &str) -> String {
        sql.split_whitespace().collect::<Vec<_>>().join(" ") + " "
    }

    fn plain_table() -> Table<Object> {
        Table::builder("test")
            .column(Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id))
            .column(Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name))
            .build()
            .unwrap()
    }

    fn private_table() -> Table<Object> {
        Table::builder("test_private")
            .column(Column::accessor("id", Object::id, Object::set_id))
            .column(Column::accessor("name", Object::name, Object::set_name))
            .build()
            .unwrap()
    }

    fn constrained_table() -> Table<Object> {
        Table::builder("test_constraints")
            .column(
                Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id)
                    .primary_key(Conflict::Abort),
            )
            .column(
                Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name)
                    .not_null(Conflict::Abort)
                    .unique(Conflict::Abort),
            )
            .column(
                Column::field("text", |o: &Object| &o.some_text, |o: &mut Object| {
                    &mut o.some_text
                })
                .unique(Conflict::Replace),
            )
            .column(Column::field(
                "float",
                |o: &Object| &o.some_float,
                |o: &mut Object| &mut o.some_float,
            ))
            .column(
                Column::field("someId", |o: &Object| &o.some_id, |o: &mut Object| {
                    &mut o.some_id
                })
                .foreign_key(Reference::new("test", "id"), Action::Cascade, Action::Restrict),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn columns_are_indexed_in_declaration_order() {
        let table = plain_table();
        assert_eq!(table.n_columns(), 2);
        assert_eq!(table.column_name(0).unwrap(), "id");
        assert_eq!(table.column_name(1).unwrap(), "name");
        assert!(table.column_name(2).unwrap_err().is_not_found());
        assert_eq!(table.column_by_name("name").unwrap().ordinal(), 1);
        assert!(table.column_by_name("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn accessor_columns_are_indexed_the_same() {
        let table = private_table();
        assert_eq!(table.column_name(0).unwrap(), "id");
        assert_eq!(table.column_name(1).unwrap(), "name");
    }

    #[test]
    fn create_table_query() {
        let query = plain_table().create_table_query(false);
        assert_eq!(
            normalize(&query),
            "CREATE TABLE test ( `id` INTEGER NOT NULL ON CONFLICT ABORT, `name` TEXT NOT NULL ON CONFLICT ABORT ); "
        );

        let same = private_table()
            .create_table_query(false)
            .replace("_private", "");
        assert_eq!(same, query);
    }

    #[test]
    fn create_table_query_if_not_exists() {
        let query = plain_table().create_table_query(true);
        assert!(normalize(&query).starts_with("CREATE TABLE IF NOT EXISTS test ( "));
    }

    #[test]
    fn create_table_query_with_constraints() {
        let query = constrained_table().create_table_query(false);
        let expected = "CREATE TABLE test_constraints ( \
            `id` INTEGER NOT NULL ON CONFLICT ABORT PRIMARY KEY ON CONFLICT ABORT, \
            `name` TEXT NOT NULL ON CONFLICT ABORT UNIQUE ON CONFLICT ABORT, \
            `text` TEXT NOT NULL ON CONFLICT ABORT UNIQUE ON CONFLICT REPLACE, \
            `float` REAL NOT NULL ON CONFLICT ABORT, \
            `someId` INTEGER NOT NULL ON CONFLICT ABORT REFERENCES `test` (`id`) ON UPDATE CASCADE ON DELETE RESTRICT \
            ); ";
        assert_eq!(normalize(&query), expected);
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let err = Table::builder("test")
            .column(Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id))
            .column(Column::field("id", |o: &Object| &o.some_id, |o: &mut Object| {
                &mut o.some_id
            }))
            .build()
            .unwrap_err();
        assert_eq!(
            err.as_schema_error(),
            Some(&SchemaError::DuplicateColumn {
                table: "test".into(),
                column: "id".into()
            })
        );
    }

    #[test]
    fn second_primary_key_is_rejected() {
        let err = Table::builder("test")
            .column(
                Column::field("id", |o: &Object| &o.id, |o: &mut Object| &mut o.id)
                    .primary_key(Conflict::Abort),
            )
            .column(
                Column::field("someId", |o: &Object| &o.some_id, |o: &mut Object| {
                    &mut o.some_id
                })
                .primary_key(Conflict::Abort),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err.as_schema_error(),
            Some(&SchemaError::MultiplePrimaryKeys("test".into()))
        );
    }

    #[test]
    fn autoincrement_requires_integer() {
        let err = Table::builder("test")
            .column(
                Column::field("name", |o: &Object| &o.name, |o: &mut Object| &mut o.name)
                    .autoincrement(Conflict::Abort),
            )
            .build()
            .unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn empty_tables_are_rejected() {
        let err = Table::<Object>::builder("nothing").build().unwrap_err();
        assert_eq!(
            err.as_schema_error(),
            Some(&SchemaError::EmptyTable("nothing".into()))
        );
    }

    #[test]
    fn from_row_matches_columns_by_name() {
        let table = constrained_table();
        let row = Row::new(
            Arc::from(vec!["name".to_string(), "id".to_string(), "float".to_string()]),
            vec![Value::Text("alice".into()), Value::Integer(3), Value::Integer(2)],
        );
        let object = table.from_row(&row).unwrap();
        assert_eq!(
            object,
            Object {
                id: 3,
                name: "alice".into(),
                some_float: 2.0,
                ..Object::default()
            }
        );
    }

    #[test]
    fn foreign_keys_are_listed() {
        let table = constrained_table();
        let fks: Vec<_> = table.foreign_keys().map(|(c, r)| (c.name(), r.clone())).collect();
        assert_eq!(fks, vec![("someId", Reference::new("test", "id"))]);
        assert_eq!(table.primary_key().unwrap().name(), "id");
    }
}
