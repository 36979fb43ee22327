//! Minimal read-only table over a host vector.
//!
//! Run with: `cargo run --example basic_table`

use livetab::{table, Database};
use std::sync::Arc;

fn main() -> livetab::Result<()> {
    let data = Arc::new(vec![10i64, 20, 30, 40, 50]);

    let def = table("numbers")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_int64("value", {
            let data = Arc::clone(&data);
            move |i| data[i]
        })
        .column_int64("squared", {
            let data = Arc::clone(&data);
            move |i| data[i] * data[i]
        })
        .build();

    let db = Database::open_in_memory()?;
    db.register_table("numbers_mod", &def);
    db.create_table("numbers", "numbers_mod");

    let result = db.query("SELECT value, squared FROM numbers WHERE value > 15")?;
    for row in &result.rows {
        println!(
            "{} -> {}",
            row[0].as_deref().unwrap_or("NULL"),
            row[1].as_deref().unwrap_or("NULL")
        );
    }

    println!(
        "sum = {}",
        db.scalar("SELECT SUM(value) FROM numbers")?.unwrap_or_default()
    );
    Ok(())
}
