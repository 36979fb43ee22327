//! Generator adapter: lazy streaming rows
//!
//! A cache would materialize every row before the engine could apply a
//! `LIMIT`; a generator advances only as far as the engine asks. Each full
//! scan constructs a fresh generator through the definition's factory and
//! drops it when the cursor closes; nothing survives between scans.
//! Pushed-down filters run their own iterator and never touch the
//! factory. The flavor is read-only.

use super::plan::{choose_plan, PlanInput};
use super::{module_error, start_filter_scan, DEFAULT_FULL_SCAN_ROWS, FULL_SCAN_PLAN};
use crate::iter::{IterScan, RowGenerator};
use crate::table::GeneratorTableDef;
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, VTab, VTabConnection, VTabCursor, VTabKind,
    sqlite3_vtab, sqlite3_vtab_cursor,
};
use std::os::raw::c_int;
use std::sync::Arc;

/// Virtual table instance for one `CREATE VIRTUAL TABLE` of a generator
/// definition.
#[repr(C)]
pub struct GeneratorTab<R> {
    base: sqlite3_vtab,
    def: Arc<GeneratorTableDef<R>>,
}

enum Scan<R> {
    /// No generator available, or the pushed-down constraint produced
    /// nothing.
    Empty,
    /// Streaming scan. Exhaustion is tracked from `advance()`'s returns.
    Gen {
        gen: Box<dyn RowGenerator<R>>,
        exhausted: bool,
    },
    /// Pushed-down filter iterator.
    Iter(IterScan),
}

/// One active scan over a generator table. Owns its generator exclusively.
#[repr(C)]
pub struct GeneratorCursor<R> {
    base: sqlite3_vtab_cursor,
    def: Arc<GeneratorTableDef<R>>,
    state: Scan<R>,
}

unsafe impl<'vtab, R: Send + Sync + 'static> VTab<'vtab> for GeneratorTab<R> {
    type Aux = Arc<GeneratorTableDef<R>>;
    type Cursor = GeneratorCursor<R>;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux.map(Arc::clone).ok_or_else(|| {
            module_error("generator vtable registered without a definition".into())
        })?;
        Ok((
            def.schema(),
            GeneratorTab {
                base: sqlite3_vtab::default(),
                def,
            },
        ))
    }

    fn best_index(&self, info: &mut IndexInfo) -> rusqlite::Result<()> {
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
                index_columns: &[],
                full_scan_rows,
            },
        )
    }

    fn open(&mut self) -> rusqlite::Result<GeneratorCursor<R>> {
        Ok(GeneratorCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: Scan::Empty,
        })
    }
}

impl<R: Send + Sync + 'static> CreateVTab<'_> for GeneratorTab<R> {
    const KIND: VTabKind = VTabKind::Default;
}

unsafe impl<R: Send + Sync + 'static> VTabCursor for GeneratorCursor<R> {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = if idx_num == FULL_SCAN_PLAN {
            match self.def.generator.as_ref() {
                Some(factory) => {
                    let mut gen = factory();
                    let exhausted = !gen.advance();
                    Scan::Gen { gen, exhausted }
                }
                None => Scan::Empty,
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
            Scan::Gen { gen, exhausted } => {
                if !*exhausted {
                    *exhausted = !gen.advance();
                }
            }
            Scan::Iter(scan) => scan.advance(),
            Scan::Empty => {}
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        match &self.state {
            Scan::Gen { exhausted, .. } => *exhausted,
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
            Scan::Gen { gen, exhausted } if !exhausted => {
                self.def.columns[col].read(ctx, gen.current())
            }
            Scan::Iter(scan) => scan.write_column(ctx, col),
            _ => ctx.set_result(&rusqlite::types::Null),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        match &self.state {
            Scan::Gen { gen, exhausted } if !exhausted => Ok(gen.rowid()),
            Scan::Iter(scan) => Ok(scan.rowid()),
            _ => Ok(0),
        }
    }
}
