//! Database wrapper with query helpers
//!
//! [`Database`] owns a SQLite connection and adds the conveniences the
//! rest of the crate (server, CLI, demos) needs: registering virtual table
//! definitions, issuing the one-time `CREATE VIRTUAL TABLE`, and running
//! queries into a uniform string-valued result shape.

use crate::error::Result;
use crate::table::{CachedTableDef, GeneratorTableDef, TableDef};
use crate::vtab;
use base64::Engine;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Result of a SQL query execution.
///
/// Every cell is rendered to an optional string: `None` for SQL NULL,
/// numbers via `to_string`, text as UTF-8 (lossy), blobs as Base64.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Row data.
    pub rows: Vec<Vec<Option<String>>>,
    /// Number of rows returned.
    pub row_count: usize,
}

/// An open SQLite database with livetab registration helpers.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open an in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        debug!("Opened in-memory database");
        Ok(Database { conn })
    }

    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Database { conn })
    }

    /// Direct access to the underlying connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Registration helpers ────────────────────────────────────────────

    /// Register an indexed definition as a module.
    pub fn register_table(&self, module_name: &str, def: &Arc<TableDef>) -> bool {
        vtab::register_vtable(&self.conn, module_name, def)
    }

    /// Register a cached definition as a module.
    pub fn register_cached_table<R: Send + Sync + 'static>(
        &self,
        module_name: &str,
        def: &Arc<CachedTableDef<R>>,
    ) -> bool {
        vtab::register_cached_vtable(&self.conn, module_name, def)
    }

    /// Register a generator definition as a module.
    pub fn register_generator_table<R: Send + Sync + 'static>(
        &self,
        module_name: &str,
        def: &Arc<GeneratorTableDef<R>>,
    ) -> bool {
        vtab::register_generator_vtable(&self.conn, module_name, def)
    }

    /// Issue `CREATE VIRTUAL TABLE <table> USING <module>;` after
    /// validating both identifiers.
    pub fn create_table(&self, table_name: &str, module_name: &str) -> bool {
        vtab::create_vtable(&self.conn, table_name, module_name)
    }

    /// Register an indexed definition under its own name and create the
    /// table in one step.
    pub fn register_and_create_table(&self, def: &Arc<TableDef>) -> bool {
        self.register_table(def.name(), def) && self.create_table(def.name(), def.name())
    }

    /// Register a cached definition under its own name and create the
    /// table in one step.
    pub fn register_and_create_cached_table<R: Send + Sync + 'static>(
        &self,
        def: &Arc<CachedTableDef<R>>,
    ) -> bool {
        self.register_cached_table(def.name(), def) && self.create_table(def.name(), def.name())
    }

    /// Register a generator definition under its own name and create the
    /// table in one step.
    pub fn register_and_create_generator_table<R: Send + Sync + 'static>(
        &self,
        def: &Arc<GeneratorTableDef<R>>,
    ) -> bool {
        self.register_generator_table(def.name(), def) && self.create_table(def.name(), def.name())
    }

    /// Register a deterministic scalar SQL function.
    pub fn create_scalar_function<F, T>(&self, name: &str, n_args: i32, f: F) -> Result<()>
    where
        F: Fn(&rusqlite::functions::Context<'_>) -> rusqlite::Result<T>
            + Send
            + Sync
            + std::panic::UnwindSafe
            + 'static,
        T: rusqlite::types::ToSql,
    {
        self.conn.create_scalar_function(
            name,
            n_args,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            f,
        )?;
        Ok(())
    }

    // ── Query execution ─────────────────────────────────────────────────

    /// Execute a statement, returning the number of affected rows.
    pub fn exec(&self, sql: &str) -> Result<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    /// Execute one or more statements, discarding results.
    pub fn exec_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Run a query and collect every row as strings.
    pub fn query(&self, sql: &str) -> Result<QueryOutput> {
        let mut stmt = self.conn.prepare(sql)?;
        let column_count = stmt.column_count();
        let columns: Vec<String> = (0..column_count)
            .map(|i| stmt.column_name(i).unwrap_or("?").to_string())
            .collect();

        let mut rows = Vec::new();
        let mut raw = stmt.query([])?;
        while let Some(row) = raw.next()? {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(render_cell(row.get_ref(i)?));
            }
            rows.push(values);
        }

        let row_count = rows.len();
        Ok(QueryOutput {
            columns,
            rows,
            row_count,
        })
    }

    /// First column of the first row, if any.
    pub fn scalar(&self, sql: &str) -> Result<Option<String>> {
        let output = self.query(sql)?;
        Ok(output
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .flatten())
    }
}

fn render_cell(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(s) => Some(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Some(base64::engine::general_purpose::STANDARD.encode(b)),
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_renders_cells() {
        let db = Database::open_in_memory().unwrap();
        let output = db
            .query("SELECT 1 AS a, 2.5 AS b, 'x' AS c, NULL AS d, x'0102' AS e")
            .unwrap();
        assert_eq!(output.columns, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(output.row_count, 1);
        let row = &output.rows[0];
        assert_eq!(row[0].as_deref(), Some("1"));
        assert_eq!(row[1].as_deref(), Some("2.5"));
        assert_eq!(row[2].as_deref(), Some("x"));
        assert_eq!(row[3], None);
        assert_eq!(row[4].as_deref(), Some("AQI="));
    }

    #[test]
    fn test_scalar_and_exec() {
        let db = Database::open_in_memory().unwrap();
        db.exec_batch("CREATE TABLE t(n INTEGER)").unwrap();
        assert_eq!(db.exec("INSERT INTO t VALUES (7)").unwrap(), 1);
        assert_eq!(db.scalar("SELECT n FROM t").unwrap().as_deref(), Some("7"));
        assert_eq!(db.scalar("SELECT n FROM t WHERE n = 8").unwrap(), None);
    }

    #[test]
    fn test_invalid_sql_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.query("NOT VALID SQL").is_err());
    }

    #[test]
    fn test_scalar_function_registration() {
        let db = Database::open_in_memory().unwrap();
        db.create_scalar_function("double_it", 1, |ctx| {
            let v: i64 = ctx.get(0)?;
            Ok(v * 2)
        })
        .unwrap();
        assert_eq!(
            db.scalar("SELECT double_it(21)").unwrap().as_deref(),
            Some("42")
        );
    }
}
