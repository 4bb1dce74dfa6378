use crate::error::{OrmError, OrmResult, SchemaError};
use crate::schema::{Table, TableSchema};
use std::any::TypeId;

/// The ordered set of tables owned by a connection.
#[derive(Default)]
pub(crate) struct Registry {
    tables: Vec<Box<dyn TableSchema>>,
}

impl Registry {
    pub(crate) fn register(&mut self, table: Box<dyn TableSchema>) {
        self.tables.push(table);
    }

    /// Tables in declaration order.
    pub(crate) fn tables(&self) -> impl Iterator<Item = &dyn TableSchema> {
        self.tables.iter().map(|t| t.as_ref())
    }

    pub(crate) fn find_table(&self, name: &str) -> Option<&dyn TableSchema> {
        self.tables().find(|t| t.source_name() == name)
    }

    /// The table mapped onto record type `R`.
    pub(crate) fn get<R: 'static>(&self) -> OrmResult<&Table<R>> {
        self.tables
            .iter()
            .find(|t| t.record_type() == TypeId::of::<R>())
            .and_then(|t| t.as_any().downcast_ref::<Table<R>>())
            .ok_or_else(|| {
                OrmError::not_found(format!(
                    "no table registered for record type `{}`",
                    std::any::type_name::<R>()
                ))
            })
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.len()
    }

    /// Cross-table checks that need the full table set.
    pub(crate) fn validate(&self) -> OrmResult<()> {
        for (i, table) in self.tables.iter().enumerate() {
            let earlier = &self.tables[..i];
            if earlier.iter().any(|t| t.source_name() == table.source_name()) {
                return Err(SchemaError::DuplicateTable(table.source_name().to_string()).into());
            }
            if earlier.iter().any(|t| t.record_type() == table.record_type()) {
                return Err(
                    SchemaError::DuplicateRecordType(table.record_type_name().to_string()).into(),
                );
            }
        }

        for table in &self.tables {
            for column in table.column_defs() {
                let Some(reference) = column.reference() else {
                    continue;
                };
                let Some(target) = self.find_table(&reference.table) else {
                    return Err(SchemaError::UnknownReferencedTable {
                        table: table.source_name().to_string(),
                        column: column.name().to_string(),
                        referenced: reference.table.clone(),
                    }
                    .into());
                };
                if target.find_column(&reference.column).is_none() {
                    return Err(SchemaError::UnknownReferencedColumn {
                        table: table.source_name().to_string(),
                        column: column.name().to_string(),
                        referenced_table: reference.table.clone(),
                        referenced_column: reference.column.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }
}
