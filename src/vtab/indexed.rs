//! Indexed adapter: rows addressed by integer index
//!
//! The host reports a row count at scan time and getters read the i-th row
//! through whatever random access the host exposes. Data is live: every
//! scan re-asks for the count and every `xColumn` call goes back to the
//! host. This is the only flavor that accepts writes.

use super::plan::{choose_plan, PlanInput};
use super::{module_error, start_filter_scan, DEFAULT_FULL_SCAN_ROWS, FULL_SCAN_PLAN};
use crate::iter::IterScan;
use crate::table::TableDef;
use crate::value::ValueToken;
use rusqlite::types::{Value, ValueRef};
use rusqlite::vtab::{
    Context, CreateVTab, Filters, IndexInfo, Inserts, UpdateVTab, Updates, VTab, VTabConnection,
    VTabCursor, VTabKind, sqlite3_vtab, sqlite3_vtab_cursor,
};
use std::os::raw::c_int;
use std::sync::Arc;

/// Virtual table instance for one `CREATE VIRTUAL TABLE` of an indexed
/// definition.
#[repr(C)]
pub struct IndexedTab {
    base: sqlite3_vtab,
    def: Arc<TableDef>,
}

enum Scan {
    /// No scan selected, or the pushed-down constraint produced nothing.
    Empty,
    /// Full scan over `[0, total)` as counted at filter time.
    Rows { pos: usize, total: usize },
    /// Pushed-down filter iterator.
    Iter(IterScan),
}

/// One active scan over an indexed table.
#[repr(C)]
pub struct IndexedCursor {
    base: sqlite3_vtab_cursor,
    def: Arc<TableDef>,
    state: Scan,
}

unsafe impl<'vtab> VTab<'vtab> for IndexedTab {
    type Aux = Arc<TableDef>;
    type Cursor = IndexedCursor;

    fn connect(
        _db: &mut VTabConnection,
        aux: Option<&Self::Aux>,
        _args: &[&[u8]],
    ) -> rusqlite::Result<(String, Self)> {
        let def = aux
            .map(Arc::clone)
            .ok_or_else(|| module_error("indexed vtable registered without a definition".into()))?;
        Ok((
            def.schema(),
            IndexedTab {
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

    fn open(&mut self) -> rusqlite::Result<IndexedCursor> {
        Ok(IndexedCursor {
            base: sqlite3_vtab_cursor::default(),
            def: Arc::clone(&self.def),
            state: Scan::Empty,
        })
    }
}

impl CreateVTab<'_> for IndexedTab {
    const KIND: VTabKind = VTabKind::Default;
}

impl UpdateVTab<'_> for IndexedTab {
    fn delete(&mut self, arg: ValueRef<'_>) -> rusqlite::Result<()> {
        let def = &self.def;
        let rowid = match arg {
            ValueRef::Integer(i) => i,
            _ => return Err(module_error("DELETE requires an integer rowid".into())),
        };
        let Some(handler) = def.delete_row.as_ref() else {
            return Err(module_error(format!("table {} is read-only", def.name)));
        };
        def.fire_hook(&format!("DELETE FROM {}", def.name));
        if !handler(rowid as usize) {
            return Err(module_error(format!(
                "delete handler failed for rowid {rowid} of {}",
                def.name
            )));
        }
        Ok(())
    }

    fn insert(&mut self, args: &Inserts<'_>) -> rusqlite::Result<i64> {
        let def = &self.def;
        let Some(handler) = def.insert_row.as_ref() else {
            return Err(module_error(format!("table {} is read-only", def.name)));
        };
        def.fire_hook(&format!("INSERT INTO {}", def.name));
        let mut values = Vec::with_capacity(args.len().saturating_sub(2));
        for i in 2..args.len() {
            values.push(ValueToken::new(args.get::<Value>(i)?));
        }
        handler(&values).ok_or_else(|| {
            module_error(format!("insert handler failed for {}", def.name))
        })
    }

    fn update(&mut self, args: &Updates<'_>) -> rusqlite::Result<()> {
        let def = Arc::clone(&self.def);
        let old_rowid: i64 = args.get(0)?;
        let row = old_rowid as usize;
        def.fire_hook(&format!("UPDATE {}", def.name));

        // args[2..] carry the new column values in column order.
        for (col_idx, column) in def.columns.iter().enumerate() {
            let value_idx = col_idx + 2;
            if value_idx >= args.len() {
                break;
            }
            let token = ValueToken::new(args.get::<Value>(value_idx)?);
            match column.write(&row, &token) {
                // No setter for this column: skipped.
                None => {}
                Some(true) => {}
                Some(false) => {
                    return Err(module_error(format!(
                        "setter failed for column {} of {}",
                        column.name(),
                        def.name
                    )));
                }
            }
        }
        Ok(())
    }
}

unsafe impl VTabCursor for IndexedCursor {
    fn filter(
        &mut self,
        idx_num: c_int,
        _idx_str: Option<&str>,
        args: &Filters<'_>,
    ) -> rusqlite::Result<()> {
        self.state = if idx_num == FULL_SCAN_PLAN {
            // The one row-count call of this scan.
            let total = (self.def.row_count)();
            Scan::Rows { pos: 0, total }
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
            Scan::Iter(scan) => scan.advance(),
            Scan::Empty => {}
        }
        Ok(())
    }

    fn eof(&self) -> bool {
        match &self.state {
            Scan::Rows { pos, total } => pos >= total,
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
            Scan::Rows { pos, .. } => self.def.columns[col].read(ctx, pos),
            Scan::Iter(scan) => scan.write_column(ctx, col),
            Scan::Empty => ctx.set_result(&rusqlite::types::Null),
        }
    }

    fn rowid(&self) -> rusqlite::Result<i64> {
        match &self.state {
            Scan::Rows { pos, .. } => Ok(*pos as i64),
            Scan::Iter(scan) => Ok(scan.rowid()),
            Scan::Empty => Ok(0),
        }
    }
}
