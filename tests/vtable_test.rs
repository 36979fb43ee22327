//! Integration tests for the indexed virtual table flavor
//!
//! These exercise the full engine path: register a definition, create the
//! table, and run real SQL against it. Covered here:
//! - basic scans, typed columns, LIMIT/OFFSET/ORDER BY, aggregates
//! - schema emission
//! - row-count discipline (once per scan, never during planning)
//! - equality-constraint pushdown into host iterators
//! - cursor termination driven by `advance()` even when `eof()` lies

use livetab::{table, Database, RowIterator};
use rusqlite::vtab::Context;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

// ── Test helpers ────────────────────────────────────────────────────────

/// Iterator yielding `(target, 0), (target, 1), ...` for `count` rows.
struct PairIterator {
    target: i64,
    count: i64,
    current: i64,
}

impl PairIterator {
    fn new(target: i64, count: i64) -> Self {
        PairIterator {
            target,
            count,
            current: -1,
        }
    }
}

impl RowIterator for PairIterator {
    fn advance(&mut self) -> bool {
        self.current += 1;
        self.current < self.count
    }

    fn eof(&self) -> bool {
        self.current >= self.count
    }

    fn write_column(&self, ctx: &mut Context, col: usize) -> rusqlite::Result<()> {
        match col {
            0 => ctx.set_result(&self.target),
            _ => ctx.set_result(&self.current),
        }
    }

    fn rowid(&self) -> i64 {
        self.current
    }
}

/// Like [`PairIterator`], but `eof()` erroneously reports `false` forever.
struct NeverEofIterator {
    inner: PairIterator,
}

impl RowIterator for NeverEofIterator {
    fn advance(&mut self) -> bool {
        self.inner.advance()
    }

    fn eof(&self) -> bool {
        false
    }

    fn write_column(&self, ctx: &mut Context, col: usize) -> rusqlite::Result<()> {
        self.inner.write_column(ctx, col)
    }

    fn rowid(&self) -> i64 {
        self.inner.rowid()
    }
}

/// Interrupt the connection if `done` is not signalled within `timeout`.
/// Turns a would-be infinite scan into a visible test failure.
fn with_watchdog<T>(db: &Database, timeout: Duration, f: impl FnOnce() -> T) -> T {
    let handle = db.conn().get_interrupt_handle();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let watchdog = std::thread::spawn(move || {
        if done_rx.recv_timeout(timeout).is_err() {
            handle.interrupt();
        }
    });
    let result = f();
    let _ = done_tx.send(());
    let _ = watchdog.join();
    result
}

// ── Tests ───────────────────────────────────────────────────────────────

#[test]
fn test_create_simple_table() {
    let data = Arc::new(vec![(1i64, "one"), (2, "two"), (3, "three")]);
    let def = table("test_table")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_int64("id", {
            let data = Arc::clone(&data);
            move |i| data[i].0
        })
        .column_text("name", {
            let data = Arc::clone(&data);
            move |i| data[i].1.to_string()
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_table("test_module", &def));
    assert!(db.create_table("test", "test_module"));

    let result = db.query("SELECT * FROM test").unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.rows[1][1].as_deref(), Some("two"));
}

#[test]
fn test_column_types_and_where() {
    let numbers = Arc::new(vec![100i64, 200, 300]);
    let def = table("numbers")
        .count({
            let numbers = Arc::clone(&numbers);
            move || numbers.len()
        })
        .column_int64("value", {
            let numbers = Arc::clone(&numbers);
            move |i| numbers[i]
        })
        .column_int64("doubled", {
            let numbers = Arc::clone(&numbers);
            move |i| numbers[i] * 2
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db
        .query("SELECT value, doubled FROM numbers WHERE value = 200")
        .unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0].as_deref(), Some("200"));
    assert_eq!(result.rows[0][1].as_deref(), Some("400"));
}

#[test]
fn test_limit_offset_order_by_and_aggregates() {
    let data: Arc<Vec<i64>> = Arc::new((0..100).collect());
    let def = table("large")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_int64("n", {
            let data = Arc::clone(&data);
            move |i| data[i]
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT * FROM large LIMIT 10").unwrap();
    assert_eq!(result.row_count, 10);

    let result = db.query("SELECT n FROM large LIMIT 5 OFFSET 10").unwrap();
    assert_eq!(result.row_count, 5);
    assert_eq!(result.rows[0][0].as_deref(), Some("10"));
    assert_eq!(result.rows[4][0].as_deref(), Some("14"));

    let result = db.query("SELECT n FROM large ORDER BY n DESC LIMIT 1").unwrap();
    assert_eq!(result.rows[0][0].as_deref(), Some("99"));

    assert_eq!(
        db.scalar("SELECT SUM(n) FROM large").unwrap().as_deref(),
        Some("4950")
    );
    assert_eq!(
        db.scalar("SELECT COUNT(*) FROM large").unwrap().as_deref(),
        Some("100")
    );
}

#[test]
fn test_double_column_sorts() {
    let doubles = Arc::new(vec![2.5f64, 1.5, 3.5]);
    let def = table("double_test")
        .count({
            let doubles = Arc::clone(&doubles);
            move || doubles.len()
        })
        .column_double("val", {
            let doubles = Arc::clone(&doubles);
            move |i| doubles[i]
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT val FROM double_test ORDER BY val").unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(result.rows[0][0].as_deref(), Some("1.5"));
    assert_eq!(result.rows[2][0].as_deref(), Some("3.5"));
}

#[test]
fn test_empty_table_invokes_no_getter() {
    let getter_calls = Arc::new(AtomicUsize::new(0));
    let def = table("empty_test")
        .count(|| 0)
        .column_int64("n", {
            let getter_calls = Arc::clone(&getter_calls);
            move |_| {
                getter_calls.fetch_add(1, Ordering::SeqCst);
                0
            }
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT * FROM empty_test").unwrap();
    assert_eq!(result.row_count, 0);
    assert_eq!(getter_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_schema_generation() {
    let def = table("schema_test")
        .count(|| 0)
        .column_int64("id", |_| 0)
        .column_text("name", |_| String::new())
        .column_double("value", |_| 0.0)
        .build();

    let schema = def.schema();
    assert!(schema.contains("id INTEGER"));
    assert!(schema.contains("name TEXT"));
    assert!(schema.contains("value REAL"));
    assert!(schema.starts_with("CREATE TABLE schema_test("));
}

#[test]
fn test_row_count_called_once_per_scan() {
    let data = Arc::new(vec![1i64, 2, 3]);
    let count_calls = Arc::new(AtomicUsize::new(0));
    let def = table("row_count_test")
        .count({
            let data = Arc::clone(&data);
            let count_calls = Arc::clone(&count_calls);
            move || {
                count_calls.fetch_add(1, Ordering::SeqCst);
                data.len()
            }
        })
        .column_int64("n", {
            let data = Arc::clone(&data);
            move |i| data[i]
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT * FROM row_count_test").unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(count_calls.load(Ordering::SeqCst), 1);

    db.query("SELECT * FROM row_count_test").unwrap();
    assert_eq!(count_calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_planner_never_calls_row_count() {
    let count_calls = Arc::new(AtomicUsize::new(0));
    let estimate_calls = Arc::new(AtomicUsize::new(0));
    let def = table("plan_test")
        .count({
            let count_calls = Arc::clone(&count_calls);
            move || {
                count_calls.fetch_add(1, Ordering::SeqCst);
                0
            }
        })
        .estimate_rows({
            let estimate_calls = Arc::clone(&estimate_calls);
            move || {
                estimate_calls.fetch_add(1, Ordering::SeqCst);
                10
            }
        })
        .column_int64("n", |_| 0)
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    // Preparing runs the planner; no scan happens, so the count procedure
    // must stay untouched.
    let stmt = db.conn().prepare("SELECT n FROM plan_test WHERE n = 1");
    assert!(stmt.is_ok());
    assert_eq!(count_calls.load(Ordering::SeqCst), 0);
    assert!(estimate_calls.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_filter_pushdown_skips_count() {
    let count_calls = Arc::new(AtomicUsize::new(0));
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let def = table("items")
        .count({
            let count_calls = Arc::clone(&count_calls);
            move || {
                count_calls.fetch_add(1, Ordering::SeqCst);
                1000
            }
        })
        .column_int64("id", |i| i as i64)
        .filter_eq(
            "id",
            {
                let factory_calls = Arc::clone(&factory_calls);
                move |target| {
                    factory_calls.fetch_add(1, Ordering::SeqCst);
                    Some(Box::new(PairIterator::new(target, 1)) as Box<dyn RowIterator>)
                }
            },
            10.0,
            3,
        )
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT id FROM items WHERE id = 42").unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0][0].as_deref(), Some("42"));
    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    assert_eq!(count_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_filter_factory_returning_none_yields_empty_scan() {
    let def = table("nulled")
        .count(|| 5)
        .column_int64("id", |i| i as i64)
        .filter_eq("id", |_| None, 1.0, 1)
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = db.query("SELECT id FROM nulled WHERE id = 7").unwrap();
    assert_eq!(result.row_count, 0);
}

#[test]
fn test_iterator_termination_uses_advance_return_value() {
    let def = table("iter_test")
        .count(|| 0)
        .column_int64("a", |_| 0)
        .column_int64("b", |_| 0)
        .filter_eq(
            "a",
            |target| {
                Some(Box::new(NeverEofIterator {
                    inner: PairIterator::new(target, 2),
                }) as Box<dyn RowIterator>)
            },
            10.0,
            2,
        )
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));

    let result = with_watchdog(&db, Duration::from_secs(10), || {
        db.query("SELECT a, b FROM iter_test WHERE a = 123")
    })
    .unwrap();

    assert_eq!(result.row_count, 2);
    assert_eq!(result.rows[0][0].as_deref(), Some("123"));
    assert_eq!(result.rows[0][1].as_deref(), Some("0"));
    assert_eq!(result.rows[1][0].as_deref(), Some("123"));
    assert_eq!(result.rows[1][1].as_deref(), Some("1"));
}

#[test]
fn test_left_join_with_missing_matches() {
    let ids = Arc::new(vec![1i64, 2, 3]);
    let def = table("nums")
        .count({
            let ids = Arc::clone(&ids);
            move || ids.len()
        })
        .column_int64("id", {
            let ids = Arc::clone(&ids);
            move |i| ids[i]
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));
    db.exec_batch("CREATE TABLE labels(id INTEGER, label TEXT); INSERT INTO labels VALUES (1, 'one')")
        .unwrap();

    let result = db
        .query(
            "SELECT nums.id, labels.label FROM nums LEFT JOIN labels ON nums.id = labels.id ORDER BY nums.id",
        )
        .unwrap();
    assert_eq!(result.row_count, 3);
    assert_eq!(result.rows[0][1].as_deref(), Some("one"));
    assert_eq!(result.rows[1][1], None);
    assert_eq!(result.rows[2][1], None);
}

#[test]
fn test_same_definition_registered_twice() {
    let data = Arc::new(vec![7i64, 8]);
    let def = table("shared")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_int64("n", {
            let data = Arc::clone(&data);
            move |i| data[i]
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_table("mod_a", &def));
    assert!(db.register_table("mod_b", &def));
    assert!(db.create_table("t_a", "mod_a"));
    assert!(db.create_table("t_b", "mod_b"));

    assert_eq!(
        db.scalar("SELECT SUM(n) FROM t_a").unwrap().as_deref(),
        Some("15")
    );
    assert_eq!(
        db.scalar("SELECT SUM(n) FROM t_b").unwrap().as_deref(),
        Some("15")
    );
}

#[test]
fn test_identifier_validation_blocks_ddl() {
    let def = table("ok_table").count(|| 0).column_int64("n", |_| 0).build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_table("ok_module", &def));

    assert!(!db.create_table("drop;--", "ok_module"));
    assert!(!db.create_table("ok_table", "bad module"));
    assert!(db.create_table("items_v2", "ok_module"));
}
