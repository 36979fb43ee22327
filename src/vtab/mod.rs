//! Virtual table adapters
//!
//! The bridge between SQLite's cursor-oriented module protocol and
//! declarative host data sources. Three adapter flavors share one
//! engine-facing contract and differ only in how rows are sourced:
//!
//! - [`indexed`]: rows addressed by integer index, optional writes
//! - [`cached`]: rows materialized once into a shared cache with hash
//!   indexes for equality lookups
//! - [`generator`]: rows pulled lazily from a host generator
//!
//! Plan ids tie the planner to the scan decoder: `0` is the reserved full
//! scan, `1..=999` are filter ids, and `1000 + n` selects the n-th hash
//! index of a cached table.

pub mod cached;
pub mod generator;
pub mod indexed;
mod plan;

use crate::iter::IterScan;
use crate::table::{
    find_filter, CachedTableDef, FilterDef, FilterFactory, GeneratorTableDef, TableDef,
};
use crate::value::ValueToken;
use rusqlite::vtab::{read_only_module, update_module, Filters};
use rusqlite::Connection;
use std::os::raw::c_int;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reserved plan id: no filter, full scan.
pub(crate) const FULL_SCAN_PLAN: c_int = 0;

/// Plan ids at or above this base select a hash-index lookup; the offset
/// is the index position within the table definition.
pub(crate) const INDEX_PLAN_BASE: i32 = 1000;

/// Planner cost of a hash-index probe.
pub(crate) const INDEX_LOOKUP_COST: f64 = 1.0;

/// Planner row estimate for a hash-index probe.
pub(crate) const INDEX_LOOKUP_ROWS: i64 = 5;

/// Full-scan row guess when no estimate procedure is declared.
pub(crate) const DEFAULT_FULL_SCAN_ROWS: f64 = 100_000.0;

/// Accept exactly `[A-Za-z0-9_]+`: anything else (quoting, Unicode,
/// punctuation) is rejected so identifiers cannot smuggle SQL.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Install an indexed table definition as a module named `module_name`.
///
/// The definition is shared with the engine by reference count; the module
/// destructor releases it on shutdown.
pub fn register_vtable(conn: &Connection, module_name: &str, def: &Arc<TableDef>) -> bool {
    match conn.create_module(
        module_name,
        update_module::<indexed::IndexedTab>(),
        Some(Arc::clone(def)),
    ) {
        Ok(()) => {
            debug!(module = %module_name, table = %def.name(), "Registered virtual table module");
            true
        }
        Err(e) => {
            warn!(module = %module_name, error = %e, "Failed to register virtual table module");
            false
        }
    }
}

/// Install a cached table definition as a module named `module_name`.
pub fn register_cached_vtable<R: Send + Sync + 'static>(
    conn: &Connection,
    module_name: &str,
    def: &Arc<CachedTableDef<R>>,
) -> bool {
    match conn.create_module(
        module_name,
        read_only_module::<cached::CachedTab<R>>(),
        Some(Arc::clone(def)),
    ) {
        Ok(()) => {
            debug!(module = %module_name, table = %def.name(), "Registered cached vtable module");
            true
        }
        Err(e) => {
            warn!(module = %module_name, error = %e, "Failed to register cached vtable module");
            false
        }
    }
}

/// Install a generator table definition as a module named `module_name`.
pub fn register_generator_vtable<R: Send + Sync + 'static>(
    conn: &Connection,
    module_name: &str,
    def: &Arc<GeneratorTableDef<R>>,
) -> bool {
    match conn.create_module(
        module_name,
        read_only_module::<generator::GeneratorTab<R>>(),
        Some(Arc::clone(def)),
    ) {
        Ok(()) => {
            debug!(module = %module_name, table = %def.name(), "Registered generator vtable module");
            true
        }
        Err(e) => {
            warn!(module = %module_name, error = %e, "Failed to register generator vtable module");
            false
        }
    }
}

/// Issue `CREATE VIRTUAL TABLE <table> USING <module>;`.
///
/// Both names must match `[A-Za-z0-9_]+`; a failed check returns `false`
/// without touching the engine.
pub fn create_vtable(conn: &Connection, table_name: &str, module_name: &str) -> bool {
    if !is_valid_identifier(table_name) || !is_valid_identifier(module_name) {
        warn!(
            table = %table_name,
            module = %module_name,
            "Refusing CREATE VIRTUAL TABLE with invalid identifier"
        );
        return false;
    }
    let sql = format!("CREATE VIRTUAL TABLE {table_name} USING {module_name};");
    match conn.execute_batch(&sql) {
        Ok(()) => true,
        Err(e) => {
            warn!(table = %table_name, module = %module_name, error = %e, "CREATE VIRTUAL TABLE failed");
            false
        }
    }
}

fn module_error(message: String) -> rusqlite::Error {
    rusqlite::Error::ModuleError(message)
}

/// Instantiate the iterator for a filter-id plan.
///
/// `None` means the scan is immediately empty: the factory declined (null
/// iterator handle) or the bound constraint value was NULL or absent.
pub(crate) fn start_filter_scan(
    filters: &[FilterDef],
    plan_id: i32,
    args: &Filters<'_>,
) -> rusqlite::Result<Option<IterScan>> {
    let Some(filter) = find_filter(filters, plan_id) else {
        return Err(module_error(format!("unknown filter plan id {plan_id}")));
    };
    if args.len() == 0 {
        return Ok(None);
    }
    let token = ValueToken::new(args.get::<rusqlite::types::Value>(0)?);
    let iter = match &filter.factory {
        FilterFactory::Int(factory) => token.as_i64().and_then(|value| factory(value)),
        FilterFactory::Text(factory) => token.as_text().and_then(|value| factory(value)),
    };
    Ok(iter.map(IterScan::start))
}
