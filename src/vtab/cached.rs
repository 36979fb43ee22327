//! Cached adapter: query-scoped shared cache with hash-index lookups
//!
//! Rows are materialized once into the definition's shared cache and
//! retained across queries until invalidated. Declared hash indexes turn
//! `WHERE col = v` into an O(1) probe returning the matching row
//! positions; explicit filters bypass the cache entirely. The flavor is
//! read-only by contract.

use super::plan::{choose_plan, PlanInput};
use super::{
    module_error, start_filter_scan, DEFAULT_FULL_SCAN_ROWS, FULL_SCAN_PLAN, INDEX_PLAN_BASE,
};
use crate::iter::IterScan;
use crate::table::{CacheState, CachedTableDef};
use crate::value::ValueToken;
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, VTab, VTabConnection, VTabCursor, VTabKind,
    sqlite3_vtab, sqlite3_vtab_cursor,
};
use std::os::raw::c_int;
use std::sync::Arc;

/// Virtual table instance for one `CREATE VIRTUAL TABLE` of a cached
/// definition.
#[repr(C)]
pub struct CachedTab<R> {
    base: sqlite3_vtab,
    def: Arc<CachedTableDef<R>>,
}

enum Scan<R> {
    /// No scan selected, or the lookup produced nothing.
    Empty,
    /// Full scan over the cache vector.
    Rows { cache: Arc<CacheState<R>>, pos: usize },
    /// Hash-index lookup walking an ordered list of row positions.
    Index {
        cache: Arc<CacheState<R>>,
        positions: Vec<usize>,
        pos: usize,
    },
    /// Pushed-down filter iterator; the cache is not consulted.
    Iter(IterScan),
}

/// One active scan over a cached table.
#[repr(C)]
pub struct CachedCursor<R> {
    base: sqlite3_vtab_cursor,
    def: Arc<CachedTableDef<R>>,
    state: Scan<R>,
}

unsafe impl<'vtab, R: Send + Sync + 'static> VTab<'vtab> for CachedTab<R> {
    type Aux = Arc<CachedTableDef<R>>;
    type Cursor = CachedCursor<R>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux
            .map(Arc::clone)
            .ok_or_else(|| module_error("cached vtable registered without a definition".into()))?;
        Ok((
            def.schema(),
            CachedTab {
                base: sqlite3_vtab::default(),
                def,
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
        let index_columns: Vec<usize> = self.def.indexes.iter().map(|i| i.column).collect();
        let full_scan_rows = self
            .def
            .estimate_rows
            .as_ref()
            .map(|estimate| estimate() as f64)
            .unwrap_or(DEFAULT_FULL_SCAN_ROWS);
        choose_plan(
            info,
            &PlanInput {
                filters: &self.def.filters,
                index_columns: &index_columns,
                full_scan_rows,
            },
        )
    }

    fn open(&mut self) -> rusqlite::Result<CachedCursor<R>> {
        Ok(CachedCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: Scan::Empty,
        })
    }
}

impl<R: Send + Sync + 'static> CreateVTab<'_> for CachedTab<R> {
    const KIND: VTabKind = VTabKind::Default;
}

unsafe impl<R: Send + Sync + 'static> VTabCursor for CachedCursor<R> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = if idx_num == FULL_SCAN_PLAN {
            let cache = self.def.cache_state();
            Scan::Rows { cache, pos: 0 }
        } else if idx_num >= INDEX_PLAN_BASE {
            let index_pos = (idx_num - INDEX_PLAN_BASE) as usize;
            if index_pos >= self.def.indexes.len() {
                return Err(module_error(format!("unknown index plan id {idx_num}")));
            }
            let cache = self.def.cache_state();
            let key = if args.len() > 0 {
                ValueToken::new(args.get::<rusqlite::types::Value>(0)?).as_i64()
            } else {
                None
            };
            let positions = key
                .and_then(|k| cache.indexes[index_pos].get(&k).cloned())
                .unwrap_or_default();
            Scan::Index {
                cache,
                positions,
                pos: 0,
            }
        } else {
            match start_filter_scan(&self.def.filters, idx_num, args)? {
                Some(scan) => Scan::Iter(scan),
                None => Scan::Empty,
            }
        };
        Ok(())
    }

    fn next(&mut self) -> rusqlite::Result<()> {
        match &mut self.state {
            Scan::Rows { pos, .. } => *pos += 1,
            Scan::Index { pos, .. } => *pos += 1,
            Scan::Iter(scan) => scan.advance(),
            Scan::Empty => {}
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        match &self.state {
            Scan::Rows { cache, pos } => *pos >= cache.rows.len(),
            Scan::Index { positions, pos, .. } => *pos >= positions.len(),
            Scan::Iter(scan) => scan.eof(),
            Scan::Empty => true,
        }
    }

    fn column(&self, ctx: &mut Context, col: c_int) -> rusqlite::Result<()> {
        if col < 0 || col as usize >= self.def.columns.len() {
            return ctx.set_result(&rusqlite::types::Null);
        }
        let col = col as usize;
        match &self.state {
            Scan::Rows { cache, pos } => self.def.columns[col].read(ctx, &cache.rows[*pos]),
            Scan::Index {
                cache,
                positions,
                pos,
            } => self.def.columns[col].read(ctx, &cache.rows[positions[*pos]]),
            Scan::Iter(scan) => scan.write_column(ctx, col),
            Scan::Empty => ctx.set_result(&rusqlite::types::Null),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        match &self.state {
            Scan::Rows { pos, .. } => Ok(*pos as i64),
            Scan::Index { positions, pos, .. } => Ok(positions[*pos] as i64),
            Scan::Iter(scan) => Ok(scan.rowid()),
            Scan::Empty => Ok(0),
        }
    }
}
