#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

//! # livetab
//!
//! livetab exposes in-process host data as queryable relations inside
//! SQLite. A host declares a relation — name, columns, how rows are
//! sourced, optionally how equality lookups are accelerated — and livetab
//! installs a virtual table module so ordinary SQL (`SELECT`, `UPDATE`,
//! `DELETE`, joins, CTEs, aggregates) reads or mutates the host's live
//! data.
//!
//! ## Adapter flavors
//!
//! - [`table`]: **indexed** — rows addressed by integer index through the
//!   host's own random access; the only flavor that accepts writes.
//! - [`cached_table`]: **cached** — rows materialized once into a shared,
//!   invalidatable cache, with optional hash indexes turning
//!   `WHERE col = v` into an O(1) probe.
//! - [`generator_table`]: **generator** — rows pulled lazily from a host
//!   generator, so `LIMIT` stops the host's work.
//!
//! All three share one engine-facing contract: the planner pushes usable
//! equality constraints into host-provided iterators, cursors walk rows,
//! and scans always terminate off the iterator's `advance()` return value.
//!
//! ## Example
//!
//! ```no_run
//! use livetab::{table, Database};
//!
//! fn main() -> livetab::Result<()> {
//!     let data = vec![10i64, 20, 30];
//!     let def = table("numbers")
//!         .count({
//!             let data = data.clone();
//!             move || data.len()
//!         })
//!         .column_int64("value", move |i| data[i])
//!         .build();
//!
//!     let db = Database::open_in_memory()?;
//!     db.register_table("numbers_mod", &def);
//!     db.create_table("numbers", "numbers_mod");
//!
//!     let result = db.query("SELECT value FROM numbers WHERE value > 15")?;
//!     assert_eq!(result.row_count, 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Remote access
//!
//! The [`server`] module wraps a [`Database`] in a small TCP server
//! speaking length-prefixed JSON, with a matching [`server::client::Client`];
//! the `livetab` binary fronts both plus a direct query mode.

pub mod builder;
pub mod cli;
pub mod column;
pub mod config;
pub mod db;
pub mod error;
pub mod iter;
pub mod server;
pub mod table;
pub mod value;
pub mod vtab;

pub use builder::{cached_table, generator_table, table};
pub use column::ColumnType;
pub use db::{Database, QueryOutput};
pub use error::{LivetabError, Result};
pub use iter::{IterGenerator, RowGenerator, RowIterator};
pub use table::{CachedTableDef, GeneratorTableDef, TableDef};
pub use value::ValueToken;
pub use vtab::{
    create_vtable, is_valid_identifier, register_cached_vtable, register_generator_vtable,
    register_vtable,
};
