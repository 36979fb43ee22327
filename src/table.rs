//! Virtual table descriptors
//!
//! A descriptor is the immutable, declarative definition of one virtual
//! table: its columns, how rows are sourced, and which equality constraints
//! can be pushed down to specialized host iterators. Descriptors are built
//! through [`crate::builder`] and shared as `Arc`s, so registering the same
//! definition under several module names shares storage (and, for the
//! cached flavor, the lazily built row cache).

use crate::column::{schema_sql, Column};
use crate::iter::{RowGenerator, RowIterator};
use crate::value::ValueToken;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Row-count procedure: enumerates (or knows) the current number of rows.
pub type CountFn = Box<dyn Fn() -> usize + Send + Sync + 'static>;

/// Cheap row-count estimate used during query planning.
pub type EstimateFn = Box<dyn Fn() -> usize + Send + Sync + 'static>;

/// Pre-mutation hook, fired once per statement before delete/update/insert.
pub type ModifyHookFn = Box<dyn Fn(&str) + Send + Sync + 'static>;

/// Delete handler: removes the row with the given index, returns success.
pub type DeleteFn = Box<dyn Fn(usize) -> bool + Send + Sync + 'static>;

/// Insert handler: receives the new column values, returns the rowid of the
/// inserted row or `None` on failure.
pub type InsertFn = Box<dyn Fn(&[ValueToken]) -> Option<i64> + Send + Sync + 'static>;

/// Factory for a pushed-down scan, typed by the bound constraint value.
pub(crate) enum FilterFactory {
    Int(Box<dyn Fn(i64) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static>),
    Text(Box<dyn Fn(&str) -> Option<Box<dyn RowIterator>> + Send + Sync + 'static>),
}

/// One pushdown rule: for `column = <value>`, run the factory's iterator
/// instead of a scan.
pub(crate) struct FilterDef {
    /// Target column index.
    pub(crate) column: usize,
    /// Plan id reported by the planner. Strictly positive and unique
    /// within a table; `0` is reserved for full scans.
    pub(crate) plan_id: i32,
    /// Estimated cost of running this filter.
    pub(crate) cost: f64,
    /// Estimated number of rows the filter produces.
    pub(crate) rows: i64,
    pub(crate) factory: FilterFactory,
}

pub(crate) fn find_filter(filters: &[FilterDef], plan_id: i32) -> Option<&FilterDef> {
    filters.iter().find(|f| f.plan_id == plan_id)
}

/// Hash-index declaration for the cached flavor.
pub(crate) struct IndexDef<R> {
    /// Target column index.
    pub(crate) column: usize,
    /// Extracts the index key from a cached row.
    pub(crate) key: Box<dyn Fn(&R) -> i64 + Send + Sync + 'static>,
}

// ── Indexed flavor ──────────────────────────────────────────────────────

/// Definition of an indexed virtual table: rows are addressed by integer
/// index through whatever random access the host exposes.
pub struct TableDef {
    pub(crate) name: String,
    pub(crate) columns: Vec<Column<usize>>,
    pub(crate) row_count: CountFn,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) filters: Vec<FilterDef>,
    pub(crate) delete_row: Option<DeleteFn>,
    pub(crate) insert_row: Option<InsertFn>,
    pub(crate) before_modify: Option<ModifyHookFn>,
}

impl TableDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared schema: `CREATE TABLE <name>(<col> <TYPE>, ...)`.
    pub fn schema(&self) -> String {
        schema_sql(&self.name, &self.columns)
    }

    pub(crate) fn fire_hook(&self, message: &str) {
        if let Some(hook) = &self.before_modify {
            hook(message);
        }
    }
}

impl std::fmt::Debug for TableDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDef")
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("filters", &self.filters.len())
            .field("deletable", &self.delete_row.is_some())
            .field("insertable", &self.insert_row.is_some())
            .finish()
    }
}

// ── Cached flavor ───────────────────────────────────────────────────────

/// Built cache contents: the materialized rows plus one hash table per
/// declared index mapping key to row positions (in cache order).
pub(crate) struct CacheState<R> {
    pub(crate) rows: Vec<R>,
    pub(crate) indexes: Vec<HashMap<i64, Vec<usize>>>,
}

/// Lazily built, invalidatable cache shared by every cursor and every
/// registration of one descriptor.
///
/// The mutex guards only construction and invalidation; cursors hold an
/// `Arc<CacheState>` and read without locking, since a built state is
/// never mutated.
pub(crate) struct SharedCache<R> {
    state: Mutex<Option<Arc<CacheState<R>>>>,
}

impl<R> SharedCache<R> {
    pub(crate) fn new() -> Self {
        SharedCache {
            state: Mutex::new(None),
        }
    }
}

/// Definition of a cached virtual table: rows are materialized once per
/// invalidation into a shared vector, with optional hash indexes for O(1)
/// equality lookups.
pub struct CachedTableDef<R> {
    pub(crate) name: String,
    pub(crate) columns: Vec<Column<R>>,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) cache_builder: Box<dyn Fn(&mut Vec<R>) + Send + Sync + 'static>,
    pub(crate) filters: Vec<FilterDef>,
    pub(crate) indexes: Vec<IndexDef<R>>,
    pub(crate) cache: SharedCache<R>,
}

impl<R> CachedTableDef<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared schema: `CREATE TABLE <name>(<col> <TYPE>, ...)`.
    pub fn schema(&self) -> String {
        schema_sql(&self.name, &self.columns)
    }

    /// The built cache, constructing it if needed.
    ///
    /// Concurrent first callers serialize on the cache mutex: exactly one
    /// builds, the rest wait and receive the same state.
    pub(crate) fn cache_state(&self) -> Arc<CacheState<R>> {
        let mut guard = self.cache.state.lock();
        if let Some(state) = guard.as_ref() {
            return Arc::clone(state);
        }

        let mut rows = Vec::new();
        (self.cache_builder)(&mut rows);

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for index in &self.indexes {
            let mut map: HashMap<i64, Vec<usize>> = HashMap::new();
            for (pos, row) in rows.iter().enumerate() {
                map.entry((index.key)(row)).or_default().push(pos);
            }
            indexes.push(map);
        }

        debug!(
            table = %self.name,
            rows = rows.len(),
            indexes = indexes.len(),
            "Built shared cache"
        );

        let state = Arc::new(CacheState { rows, indexes });
        *guard = Some(Arc::clone(&state));
        state
    }

    /// Drop the built cache. The next scan rebuilds it.
    pub fn invalidate_cache(&self) {
        *self.cache.state.lock() = None;
        debug!(table = %self.name, "Invalidated shared cache");
    }
}

impl<R> std::fmt::Debug for CachedTableDef<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTableDef")
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("filters", &self.filters.len())
            .field("indexes", &self.indexes.len())
            .finish()
    }
}

// ── Generator flavor ────────────────────────────────────────────────────

/// Factory constructing a fresh generator for one full scan.
pub type GeneratorFn<R> = Box<dyn Fn() -> Box<dyn RowGenerator<R>> + Send + Sync + 'static>;

/// Definition of a streaming virtual table: rows come from a lazy
/// generator, so `LIMIT` and short-circuiting stop the host's work.
pub struct GeneratorTableDef<R> {
    pub(crate) name: String,
    pub(crate) columns: Vec<Column<R>>,
    pub(crate) estimate_rows: Option<EstimateFn>,
    pub(crate) generator: Option<GeneratorFn<R>>,
    pub(crate) filters: Vec<FilterDef>,
}

impl<R> GeneratorTableDef<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared schema: `CREATE TABLE <name>(<col> <TYPE>, ...)`.
    pub fn schema(&self) -> String {
        schema_sql(&self.name, &self.columns)
    }
}

impl<R> std::fmt::Debug for GeneratorTableDef<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorTableDef")
            .field("name", &self.name)
            .field("columns", &self.columns.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}
