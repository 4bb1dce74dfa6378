//! The connection: one storage handle plus the tables declared for it.
//!
//! ```ignore
//! use litorm::prelude::*;
//!
//! let conn = Connection::builder()
//!     .register::<User>()
//!     .register::<Post>()
//!     .config(ConnectionConfig::new().busy_timeout(Duration::from_secs(5)))
//!     .open("app.db")?;
//! conn.create_tables(true)?;
//!
//! let mut user = User { name: "alice".into(), ..Default::default() };
//! conn.insert_record(&mut user)?;
//! let found = conn.find_record::<User>(user.id)?;
//! ```

use crate::config::{ConnectionConfig, Location};
use crate::driver::{Driver, SqliteDriver, Statement};
use crate::error::{OrmError, OrmResult};
use crate::log::StatementKind;
use crate::qb::{
    BuiltQuery, DeleteQuery, Expr, Filter, InsertQuery, Order, ParamList, SelectQuery, Subquery,
    UpdateQuery,
};
use crate::schema::{Record, Registry, Table, TableSchema};
use crate::value::{StorageType, ToValue, Value};

/// Statements opening, committing and undoing one transaction level.
struct TxnStatements {
    begin: &'static str,
    commit: &'static str,
    rollback: &'static str,
}

const TOP_LEVEL: TxnStatements = TxnStatements {
    begin: "BEGIN TRANSACTION;",
    commit: "COMMIT TRANSACTION;",
    rollback: "ROLLBACK TRANSACTION;",
};

// ROLLBACK TO leaves the savepoint open, so it is released afterwards.
const NESTED: TxnStatements = TxnStatements {
    begin: "SAVEPOINT litorm;",
    commit: "RELEASE SAVEPOINT litorm;",
    rollback: "ROLLBACK TO SAVEPOINT litorm; RELEASE SAVEPOINT litorm;",
};

/// Log a connection-level failure before handing it back.
fn logged<T>(result: OrmResult<T>, action: &str) -> OrmResult<T> {
    if let Err(err) = &result {
        tracing::error!(target: "litorm", error = %err, "{action} failed");
    }
    result
}

/// Collects table declarations and configuration, then opens a [`Connection`].
///
/// Every cross-table check (duplicate names, foreign key targets) runs when
/// the connection is opened.
#[derive(Default)]
pub struct ConnectionBuilder {
    registry: Registry,
    config: ConnectionConfig,
    error: Option<OrmError>,
}

impl ConnectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hand-declared table.
    pub fn table<R: 'static>(mut self, table: Table<R>) -> Self {
        self.registry.register(Box::new(table));
        self
    }

    /// Register the table declared by `R`'s [`Record`] impl.
    pub fn register<R: Record>(self) -> Self {
        match R::table() {
            Ok(table) => self.table(table),
            Err(err) => self.fail(err),
        }
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    fn fail(mut self, err: OrmError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    /// Validate the declared tables and open `location` with SQLite.
    pub fn open(self, location: impl Into<Location>) -> OrmResult<Connection> {
        let location = location.into();
        let (registry, config) = self.finish()?;
        let driver = logged(SqliteDriver::open(&location, &config), "open")?;
        tracing::info!(target: "litorm", %location, tables = registry.len(), "opened connection");
        Connection::init(Box::new(driver), registry, config)
    }

    /// Validate the declared tables and run them on an existing driver.
    pub fn open_with_driver(self, driver: impl Driver + 'static) -> OrmResult<Connection> {
        let (registry, config) = self.finish()?;
        tracing::info!(target: "litorm", tables = registry.len(), "opened connection on custom driver");
        Connection::init(Box::new(driver), registry, config)
    }

    fn finish(self) -> OrmResult<(Registry, ConnectionConfig)> {
        if let Some(err) = self.error {
            return logged(Err(err), "table declaration");
        }
        logged(self.registry.validate(), "schema validation")?;
        Ok((self.registry, self.config))
    }
}

/// An open storage handle with its registered tables.
///
/// Not internally synchronized: a connection may move between threads but
/// is used from one at a time.
pub struct Connection {
    driver: Box<dyn Driver>,
    registry: Registry,
    config: ConnectionConfig,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    fn init(driver: Box<dyn Driver>, registry: Registry, config: ConnectionConfig) -> OrmResult<Self> {
        let conn = Self {
            driver,
            registry,
            config,
        };
        conn.set_foreign_keys(conn.config.foreign_keys)?;
        Ok(conn)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The table registered for record type `R`.
    pub fn table<R: 'static>(&self) -> OrmResult<&Table<R>> {
        self.registry.get::<R>()
    }

    /// Registered tables in declaration order.
    pub fn tables(&self) -> impl Iterator<Item = &dyn TableSchema> {
        self.registry.tables()
    }

    // ==================== Schema ====================

    /// Issue one CREATE TABLE per registered table, in declaration order.
    ///
    /// Stops at the first failure; tables created before it are kept.
    pub fn create_tables(&self, if_not_exists: bool) -> OrmResult<()> {
        for table in self.registry.tables() {
            let sql = table.create_table_query(if_not_exists);
            logged(self.execute_sql(StatementKind::Schema, &sql), "create tables")?;
        }
        tracing::info!(target: "litorm", tables = self.registry.len(), "created tables");
        Ok(())
    }

    /// Switch foreign key enforcement on or off.
    pub fn set_foreign_keys(&self, enabled: bool) -> OrmResult<()> {
        let sql = if enabled {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        tracing::debug!(target: "litorm", enabled, "foreign keys");
        logged(self.execute_sql(StatementKind::Schema, sql), "foreign key pragma")
    }

    /// Number of user tables in the database file.
    pub fn count_tables(&self) -> OrmResult<i64> {
        let built = BuiltQuery {
            sql: "SELECT COUNT(*) FROM `sqlite_schema` WHERE `type` = 'table' AND `name` NOT LIKE 'sqlite_%';"
                .to_string(),
            params: ParamList::new(),
            kind: StatementKind::Select,
        };
        let mut stmt = self.prepare_built(&built)?;
        let mut rows = stmt.query()?;
        match rows.step()? {
            Some(row) => row.try_get::<i64>(0),
            None => Err(OrmError::not_found("sqlite_schema returned no row")),
        }
    }

    /// Run parameterless SQL, one or more statements, as-is.
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        self.execute_sql(StatementKind::Schema, sql)
    }

    fn execute_sql(&self, kind: StatementKind, sql: &str) -> OrmResult<()> {
        self.config.sql_log.emit(kind, sql, 0);
        self.driver.execute_batch(sql)
    }

    /// Log, compile and bind a rendered statement.
    pub(crate) fn prepare_built(&self, built: &BuiltQuery) -> OrmResult<Box<dyn Statement + '_>> {
        self.config
            .sql_log
            .emit(built.kind, &built.sql, built.params.len());
        let mut stmt = self.driver.prepare(&built.sql)?;
        for (slot, value) in built.params.slots() {
            stmt.bind(slot, value)?;
        }
        Ok(stmt)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.driver.last_insert_rowid()
    }

    // ==================== Transactions ====================

    /// Run `f` inside `BEGIN`/`COMMIT`, rolling back if it fails.
    ///
    /// Inside an open transaction the work runs under a savepoint instead, so
    /// a failing inner call only undoes its own changes.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> OrmResult<T>) -> OrmResult<T> {
        let nested = !self.driver.is_autocommit();
        let stmts = if nested { &NESTED } else { &TOP_LEVEL };
        self.execute_sql(StatementKind::Schema, stmts.begin)?;
        tracing::debug!(target: "litorm", nested, "transaction begin");
        match f(self) {
            Ok(value) => {
                if let Err(err) = self.execute_sql(StatementKind::Schema, stmts.commit) {
                    let err = match self.execute_sql(StatementKind::Schema, stmts.rollback) {
                        Ok(()) => err,
                        Err(rollback_err) => {
                            OrmError::Step(format!("{err} (rollback failed: {rollback_err})"))
                        }
                    };
                    return logged(Err(err), "commit");
                }
                tracing::debug!(target: "litorm", nested, "transaction commit");
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(target: "litorm", nested, error = %err, "transaction rollback");
                match self.execute_sql(StatementKind::Schema, stmts.rollback) {
                    Ok(()) => Err(err),
                    Err(rollback_err) => logged(
                        Err(OrmError::Step(format!(
                            "{err} (rollback failed: {rollback_err})"
                        ))),
                        "rollback",
                    ),
                }
            }
        }
    }

    // ==================== Query builders ====================

    pub fn select<R: 'static>(&self) -> OrmResult<SelectQuery<'_, R>> {
        Ok(SelectQuery::new(self, self.table::<R>()?))
    }

    /// SELECT from a nested query, mapping its columns onto `R` by name.
    pub fn select_from<R: 'static>(&self, subquery: Subquery) -> OrmResult<SelectQuery<'_, R>> {
        Ok(SelectQuery::from_subquery(self, self.table::<R>()?, subquery))
    }

    pub fn insert<R: 'static>(&self, record: &R) -> OrmResult<InsertQuery<'_, R>> {
        Ok(InsertQuery::new(self, self.table::<R>()?).values(record))
    }

    /// One INSERT with a VALUES row per record.
    pub fn insert_many<R: 'static>(&self, records: &[R]) -> OrmResult<InsertQuery<'_, R>> {
        Ok(InsertQuery::new(self, self.table::<R>()?).values_many(records))
    }

    pub fn update<R: 'static>(&self) -> OrmResult<UpdateQuery<'_, R>> {
        Ok(UpdateQuery::new(self, self.table::<R>()?))
    }

    pub fn delete<R: 'static>(&self) -> OrmResult<DeleteQuery<'_, R>> {
        Ok(DeleteQuery::new(self, self.table::<R>()?))
    }

    // ==================== Records ====================

    /// Insert `record`, writing the assigned rowid back into an
    /// auto-assigned integer primary key.
    pub fn insert_record<R: 'static>(&self, record: &mut R) -> OrmResult<()> {
        let table = self.table::<R>()?;
        self.insert(&*record)?.exec()?;
        if let Some(pk) = table.primary_key() {
            let assigned = pk.def().is_autoincrement() || pk.extract(record).is_null();
            if assigned && pk.storage_type() == StorageType::Integer {
                pk.assign(record, Value::Integer(self.last_insert_rowid()))?;
            }
        }
        Ok(())
    }

    /// Insert `records` in multi-row batches inside one transaction.
    ///
    /// Rowids are not written back.
    pub fn insert_many_records<R: 'static>(&self, records: &[R], batch_size: usize) -> OrmResult<usize> {
        if batch_size == 0 {
            return Err(OrmError::validation("batch size must be at least 1"));
        }
        if records.is_empty() {
            return Ok(0);
        }
        self.transaction(|conn| {
            let mut inserted = 0;
            for chunk in records.chunks(batch_size) {
                inserted += conn.insert_many(chunk)?.exec()?;
            }
            Ok(inserted)
        })
    }

    /// SET every non-key column of `record` WHERE its primary key matches.
    pub fn update_record<R: 'static>(&self, record: &R) -> OrmResult<usize> {
        let table = self.table::<R>()?;
        let pk = table.require_primary_key()?;
        self.update::<R>()?
            .set_record(record)
            .and_where(Expr::eq(pk.name(), pk.extract(record)))
            .exec()
    }

    /// The record whose primary key equals `key`.
    pub fn find_record<R: Default + 'static>(&self, key: impl ToValue) -> OrmResult<Option<R>> {
        let pk = self.table::<R>()?.require_primary_key()?;
        self.select::<R>()?.eq(pk.name(), key).one()
    }

    pub fn delete_record<R: 'static>(&self, key: impl ToValue) -> OrmResult<usize> {
        let pk = self.table::<R>()?.require_primary_key()?;
        self.delete::<R>()?.eq(pk.name(), key).exec()
    }

    /// The record with the lowest primary key.
    pub fn first<R: Default + 'static>(&self) -> OrmResult<Option<R>> {
        self.by_key_order(Order::Asc)
    }

    /// The record with the highest primary key.
    pub fn last<R: Default + 'static>(&self) -> OrmResult<Option<R>> {
        self.by_key_order(Order::Desc)
    }

    fn by_key_order<R: Default + 'static>(&self, order: Order) -> OrmResult<Option<R>> {
        let pk = self.table::<R>()?.require_primary_key()?;
        self.select::<R>()?.order_by(pk.name(), order).one()
    }

    /// Delete every row of `R`'s table.
    pub fn truncate<R: 'static>(&self) -> OrmResult<usize> {
        self.delete::<R>()?.exec()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables: Vec<&str> = self.registry.tables().map(|t| t.source_name()).collect();
        f.debug_struct("Connection")
            .field("tables", &tables)
            .field("config", &self.config)
            .finish()
    }
}
