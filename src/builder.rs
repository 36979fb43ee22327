//! Fluent builders for virtual table definitions
//!
//! A builder collects columns, row-sourcing procedures, pushdown filters,
//! and mutation handlers, then emits an immutable descriptor wrapped in an
//! `Arc` ready for registration:
//!
//! ```no_run
//! use livetab::table;
//!
//! let data = vec![10i64, 20, 30];
//! let def = table("numbers")
//!     .count({
//!         let data = data.clone();
//!         move || data.len()
//!     })
//!     .column_int64("value", move |i| data[i])
//!     .build();
//! assert!(def.schema().contains("value INTEGER"));
//! ```
//!
//! Filter and index declarations referencing a column name that has not
//! been declared are dropped: misuse is non-fatal, but it is logged.

use crate::column::{Column, ColumnType};
use crate::iter::{RowGenerator, RowIterator};
use crate::table::{
    CachedTableDef, FilterDef, FilterFactory, GeneratorTableDef, IndexDef, SharedCache, TableDef,
};
use crate::value::ValueToken;
use crate::vtab::INDEX_PLAN_BASE;
use std::sync::Arc;
use tracing::warn;

fn resolve_column<Ctx>(table: &str, columns: &[Column<Ctx>], name: &str) -> Option<usize> {
    let found = columns.iter().position(|c| c.name() == name);
    if found.is_none() {
        warn!(
            table = %table,
            column = %name,
            "Dropping filter/index declaration for unknown column"
        );
    }
    found
}

fn push_filter(
    table: &str,
    filters: &mut Vec<FilterDef>,
    column: usize,
    cost: f64,
    rows: i64,
    factory: FilterFactory,
) {
    let plan_id = filters.len() as i32 + 1;
    if plan_id >= INDEX_PLAN_BASE {
        warn!(table = %table, "Dropping filter declaration: filter id space exhausted");
        return;
    }
    filters.push(FilterDef {
        column,
        plan_id,
        cost,
        rows,
        factory,
    });
}

// ── Indexed flavor ──────────────────────────────────────────────────────

/// Start building an indexed table definition.
///
/// Rows are addressed by integer index `0..count()`; getters read the
/// host's i-th row through whatever random access the host exposes.
pub fn table(name: impl Into<String>) -> TableBuilder {
    TableBuilder {
        name: name.into(),
        columns: Vec::new(),
        row_count: None,
        estimate_rows: None,
        filters: Vec::new(),
        delete_row: None,
        insert_row: None,
        before_modify: None,
    }
}

/// Fluent constructor for [`TableDef`].
pub struct TableBuilder {
    name: String,
    columns: Vec<Column<usize>>,
    row_count: Option<Box<dyn Fn() -> usize + Send + Sync>>,
    estimate_rows: Option<Box<dyn Fn() -> usize + Send + Sync>>,
    filters: Vec<FilterDef>,
    delete_row: Option<Box<dyn Fn(usize) -> bool + Send + Sync>>,
    insert_row: Option<Box<dyn Fn(&[ValueToken]) -> Option<i64> + Send + Sync>>,
    before_modify: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

impl TableBuilder {
    /// Row-count procedure, called once per scan for live data.
    pub fn count(mut self, f: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.row_count = Some(Box::new(f));
        self
    }

    /// Cheap row-count estimate for the planner. Planning never calls the
    /// full [`TableBuilder::count`] procedure.
    pub fn estimate_rows(mut self, f: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.estimate_rows = Some(Box::new(f));
        self
    }

    /// Hook fired once per statement before any delete/update/insert.
    /// Receives a description such as `DELETE FROM items`.
    pub fn on_modify(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.before_modify = Some(Box::new(f));
        self
    }

    /// Read-only 32-bit integer column.
    pub fn column_int(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
        ));
        self
    }

    /// Read-only 64-bit integer column.
    pub fn column_int64(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
        ));
        self
    }

    /// Read-only text column.
    pub fn column_text(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> String + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Text,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
        ));
        self
    }

    /// Read-only double column.
    pub fn column_double(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Real,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
        ));
        self
    }

    /// Read-only blob column.
    pub fn column_blob(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Blob,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
        ));
        self
    }

    /// Writable 32-bit integer column.
    pub fn column_int_rw(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> i32 + Send + Sync + 'static,
        set: impl Fn(usize, i32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new_writable(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
            Box::new(move |row: &usize, value: &ValueToken| {
                value.as_i64().map(|v| set(*row, v as i32)).unwrap_or(false)
            }),
        ));
        self
    }

    /// Writable 64-bit integer column.
    pub fn column_int64_rw(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> i64 + Send + Sync + 'static,
        set: impl Fn(usize, i64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new_writable(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
            Box::new(move |row: &usize, value: &ValueToken| {
                value.as_i64().map(|v| set(*row, v)).unwrap_or(false)
            }),
        ));
        self
    }

    /// Writable text column.
    pub fn column_text_rw(
        mut self,
        name: impl Into<String>,
        get: impl Fn(usize) -> String + Send + Sync + 'static,
        set: impl Fn(usize, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new_writable(
            name,
            ColumnType::Text,
            Box::new(move |ctx, row: &usize| ctx.set_result(&get(*row))),
            Box::new(move |row: &usize, value: &ValueToken| {
                value.as_text().map(|s| set(*row, s)).unwrap_or(false)
            }),
        ));
        self
    }

    /// Pushdown rule: `WHERE <column> = <integer>` runs the factory's
    /// iterator instead of a full scan.
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Int(Box::new(factory)),
            );
        }
        self
    }

    /// Pushdown rule for text equality constraints.
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Text(Box::new(factory)),
            );
        }
        self
    }

    /// Enable `DELETE` support. The handler receives the row index.
    pub fn deletable(mut self, f: impl Fn(usize) -> bool + Send + Sync + 'static) -> Self {
        self.delete_row = Some(Box::new(f));
        self
    }

    /// Enable `INSERT` support. The handler receives the new column values
    /// and returns the rowid of the inserted row.
    pub fn insertable(
        mut self,
        f: impl Fn(&[ValueToken]) -> Option<i64> + Send + Sync + 'static,
    ) -> Self {
        self.insert_row = Some(Box::new(f));
        self
    }

    /// Finish, yielding the immutable definition.
    pub fn build(self) -> Arc<TableDef> {
        Arc::new(TableDef {
            name: self.name,
            columns: self.columns,
            row_count: self.row_count.unwrap_or_else(|| Box::new(|| 0)),
            estimate_rows: self.estimate_rows,
            filters: self.filters,
            delete_row: self.delete_row,
            insert_row: self.insert_row,
            before_modify: self.before_modify,
        })
    }
}

// ── Cached flavor ───────────────────────────────────────────────────────

/// Start building a cached table definition over host row type `R`.
///
/// Rows are materialized by the cache builder on the first scan and
/// retained until [`CachedTableDef::invalidate_cache`].
pub fn cached_table<R>(name: impl Into<String>) -> CachedTableBuilder<R> {
    CachedTableBuilder {
        name: name.into(),
        columns: Vec::new(),
        estimate_rows: None,
        cache_builder: None,
        filters: Vec::new(),
        indexes: Vec::new(),
    }
}

/// Fluent constructor for [`CachedTableDef`].
pub struct CachedTableBuilder<R> {
    name: String,
    columns: Vec<Column<R>>,
    estimate_rows: Option<Box<dyn Fn() -> usize + Send + Sync>>,
    cache_builder: Option<Box<dyn Fn(&mut Vec<R>) + Send + Sync>>,
    filters: Vec<FilterDef>,
    indexes: Vec<IndexDef<R>>,
}

impl<R> CachedTableBuilder<R> {
    /// Cheap row-count estimate for the planner.
    pub fn estimate_rows(mut self, f: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.estimate_rows = Some(Box::new(f));
        self
    }

    /// Procedure that populates the shared cache. Called at most once per
    /// invalidation, at scan time.
    pub fn cache_builder(mut self, f: impl Fn(&mut Vec<R>) + Send + Sync + 'static) -> Self {
        self.cache_builder = Some(Box::new(f));
        self
    }

    /// Read-only 32-bit integer column.
    pub fn column_int(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only 64-bit integer column.
    pub fn column_int64(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only text column.
    pub fn column_text(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Text,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only double column.
    pub fn column_double(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Real,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only blob column.
    pub fn column_blob(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Blob,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Pushdown rule: `WHERE <column> = <integer>` runs the factory's
    /// iterator; the cache is not consulted and not built.
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Int(Box::new(factory)),
            );
        }
        self
    }

    /// Pushdown rule for text equality constraints.
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Text(Box::new(factory)),
            );
        }
        self
    }

    /// Declare a hash index on a cached column. Equality lookups against
    /// the column become O(1) probes into the built cache.
    pub fn index_on(
        mut self,
        column: &str,
        key: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            self.indexes.push(IndexDef {
                column: col,
                key: Box::new(key),
            });
        }
        self
    }

    /// Finish, yielding the immutable definition.
    pub fn build(self) -> Arc<CachedTableDef<R>> {
        Arc::new(CachedTableDef {
            name: self.name,
            columns: self.columns,
            estimate_rows: self.estimate_rows,
            cache_builder: self.cache_builder.unwrap_or_else(|| Box::new(|_| {})),
            filters: self.filters,
            indexes: self.indexes,
            cache: SharedCache::new(),
        })
    }
}

// ── Generator flavor ────────────────────────────────────────────────────

/// Start building a streaming table definition over host row type `R`.
///
/// A fresh generator is constructed per scan; `LIMIT k` costs O(k)
/// `advance` calls regardless of the source size.
pub fn generator_table<R>(name: impl Into<String>) -> GeneratorTableBuilder<R> {
    GeneratorTableBuilder {
        name: name.into(),
        columns: Vec::new(),
        estimate_rows: None,
        generator: None,
        filters: Vec::new(),
    }
}

/// Fluent constructor for [`GeneratorTableDef`].
pub struct GeneratorTableBuilder<R> {
    name: String,
    columns: Vec<Column<R>>,
    estimate_rows: Option<Box<dyn Fn() -> usize + Send + Sync>>,
    generator: Option<Box<dyn Fn() -> Box<dyn RowGenerator<R>> + Send + Sync>>,
    filters: Vec<FilterDef>,
}

impl<R> GeneratorTableBuilder<R> {
    /// Cheap row-count estimate for the planner.
    pub fn estimate_rows(mut self, f: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        self.estimate_rows = Some(Box::new(f));
        self
    }

    /// Factory constructing a fresh generator for each full scan.
    pub fn generator(
        mut self,
        f: impl Fn() -> Box<dyn RowGenerator<R>> + Send + Sync + 'static,
    ) -> Self {
        self.generator = Some(Box::new(f));
        self
    }

    /// Read-only 32-bit integer column.
    pub fn column_int(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> i32 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only 64-bit integer column.
    pub fn column_int64(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Integer,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only text column.
    pub fn column_text(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Text,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only double column.
    pub fn column_double(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Real,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Read-only blob column.
    pub fn column_blob(
        mut self,
        name: impl Into<String>,
        get: impl Fn(&R) -> Vec<u8> + Send + Sync + 'static,
    ) -> Self {
        self.columns.push(Column::new(
            name,
            ColumnType::Blob,
            Box::new(move |ctx, row: &R| ctx.set_result(&get(row))),
        ));
        self
    }

    /// Pushdown rule: `WHERE <column> = <integer>` runs the factory's
    /// iterator; the generator factory is not invoked.
    pub fn filter_eq(
        mut self,
        column: &str,
        factory: impl Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Int(Box::new(factory)),
            );
        }
        self
    }

    /// Pushdown rule for text equality constraints.
    pub fn filter_eq_text(
        mut self,
        column: &str,
        factory: impl Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static,
        cost: f64,
        est_rows: i64,
    ) -> Self {
        if let Some(col) = resolve_column(&self.name, &self.columns, column) {
            push_filter(
                &self.name,
                &mut self.filters,
                col,
                cost,
                est_rows,
                FilterFactory::Text(Box::new(factory)),
            );
        }
        self
    }

    /// Finish, yielding the immutable definition.
    pub fn build(self) -> Arc<GeneratorTableDef<R>> {
        Arc::new(GeneratorTableDef {
            name: self.name,
            columns: self.columns,
            estimate_rows: self.estimate_rows,
            generator: self.generator,
            filters: self.filters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_contains_declared_columns() {
        let def = table("t")
            .column_int64("id", |_| 0)
            .column_text("name", |_| String::new())
            .column_double("v", |_| 0.0)
            .build();
        let schema = def.schema();
        assert!(schema.contains("id INTEGER"));
        assert!(schema.contains("name TEXT"));
        assert!(schema.contains("v REAL"));
    }

    #[test]
    fn test_unknown_filter_column_is_dropped() {
        let def = table("t")
            .column_int64("id", |_| 0)
            .filter_eq("missing", |_| None, 1.0, 1)
            .build();
        assert!(def.filters.is_empty());
    }

    #[test]
    fn test_filter_ids_are_sequential_and_positive() {
        let def = table("t")
            .column_int64("a", |_| 0)
            .column_int64("b", |_| 0)
            .filter_eq("a", |_| None, 1.0, 1)
            .filter_eq("b", |_| None, 2.0, 1)
            .build();
        let ids: Vec<i32> = def.filters.iter().map(|f| f.plan_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_unknown_index_column_is_dropped() {
        let def = cached_table::<i64>("t")
            .column_int64("n", |row| *row)
            .index_on("missing", |row| *row)
            .build();
        assert!(def.indexes.is_empty());
    }
}
