//! Integration tests for the generator (streaming) virtual table flavor
//!
//! The point of the flavor: a `LIMIT k` must cost O(k) `advance` calls, a
//! fresh generator is constructed exactly once per full scan, and filter
//! pushdown bypasses the factory entirely.

use livetab::{generator_table, Database, IterGenerator, RowGenerator, RowIterator};
use rusqlite::vtab::Context;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ────────────────────────────────────────────────────────

/// Generator over `0..limit` counting its `advance` calls.
struct CountingGenerator {
    next: i64,
    limit: i64,
    advances: Arc<AtomicUsize>,
}

impl RowGenerator<i64> for CountingGenerator {
    fn advance(&mut self) -> bool {
        self.advances.fetch_add(1, Ordering::SeqCst);
        self.next += 1;
        self.next < self.limit
    }

    fn current(&self) -> &i64 {
        &self.next
    }

    fn rowid(&self) -> i64 {
        self.next
    }
}

struct SingleRowIterator {
    value: i64,
    produced: bool,
    done: bool,
}

impl RowIterator for SingleRowIterator {
    fn advance(&mut self) -> bool {
        if self.produced {
            self.done = true;
            false
        } else {
            self.produced = true;
            true
        }
    }

    fn eof(&self) -> bool {
        self.done
    }

    fn write_column(&self, ctx: &mut Context, _col: usize) -> rusqlite::Result<()> {
        ctx.set_result(&self.value)
    }

    fn rowid(&self) -> i64 {
        0
    }
}

fn counting_def(
    factory_calls: &Arc<AtomicUsize>,
    advances: &Arc<AtomicUsize>,
) -> std::sync::Arc<livetab::GeneratorTableDef<i64>> {
    let factory_calls = Arc::clone(factory_calls);
    let advances = Arc::clone(advances);
    generator_table::<i64>("gen")
        .estimate_rows(|| 1000)
        .generator(move || {
            factory_calls.fetch_add(1, Ordering::SeqCst);
            Box::new(CountingGenerator {
                next: -1,
                limit: 1000,
                advances: Arc::clone(&advances),
            })
        })
        .column_int64("n", |row| *row)
        .build()
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn test_limit_bounds_advance_calls() {
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let advances = Arc::new(AtomicUsize::new(0));
    let def = counting_def(&factory_calls, &advances);

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    let result = db.query("SELECT n FROM gen LIMIT 10").unwrap();
    assert_eq!(result.row_count, 10);
    assert_eq!(result.rows[0][0].as_deref(), Some("0"));
    assert_eq!(result.rows[9][0].as_deref(), Some("9"));

    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    assert!(
        advances.load(Ordering::SeqCst) <= 25,
        "LIMIT 10 over a 1000-row source took {} advances",
        advances.load(Ordering::SeqCst)
    );
}

#[test]
fn test_fresh_generator_per_scan() {
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let advances = Arc::new(AtomicUsize::new(0));
    let def = counting_def(&factory_calls, &advances);

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    let first = db.query("SELECT n FROM gen LIMIT 3").unwrap();
    let second = db.query("SELECT n FROM gen LIMIT 3").unwrap();

    // Each scan starts over from a brand-new generator.
    assert_eq!(first.rows[0][0].as_deref(), Some("0"));
    assert_eq!(second.rows[0][0].as_deref(), Some("0"));
    assert_eq!(factory_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_full_source_is_streamed_to_completion() {
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let advances = Arc::new(AtomicUsize::new(0));
    let def = counting_def(&factory_calls, &advances);

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    assert_eq!(
        db.scalar("SELECT COUNT(*) FROM gen").unwrap().as_deref(),
        Some("1000")
    );
}

#[test]
fn test_filter_plan_never_invokes_factory() {
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let factory_calls_in_def = Arc::clone(&factory_calls);

    let def = generator_table::<i64>("gen")
        .estimate_rows(|| 1000)
        .generator(move || {
            factory_calls_in_def.fetch_add(1, Ordering::SeqCst);
            Box::new(IterGenerator::new(0..1000i64))
        })
        .column_int64("n", |row| *row)
        .filter_eq(
            "n",
            |target| {
                Some(Box::new(SingleRowIterator {
                    value: target,
                    produced: false,
                    done: false,
                }) as Box<dyn RowIterator>)
            },
            2.0,
            1,
        )
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    let result = db.query("SELECT n FROM gen WHERE n = 5").unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0].as_deref(), Some("5"));
    assert_eq!(factory_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_empty_generator() {
    let def = generator_table::<i64>("gen")
        .generator(|| Box::new(IterGenerator::new(std::iter::empty::<i64>())))
        .column_int64("n", |row| *row)
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    let result = db.query("SELECT * FROM gen").unwrap();
    assert_eq!(result.row_count, 0);
}

#[test]
fn test_definition_without_factory_yields_no_rows() {
    let def = generator_table::<i64>("gen")
        .column_int64("n", |row| *row)
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_generator_table(&def));

    let result = db.query("SELECT * FROM gen").unwrap();
    assert_eq!(result.row_count, 0);
}
