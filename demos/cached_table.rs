//! Cached table with constraint pushdown: a hash index answers
//! `WHERE to_ea = ?` without scanning, and an explicit filter shows a
//! host-provided iterator doing the same.
//!
//! Run with: `cargo run --example cached_table`

use livetab::{cached_table, Database, RowIterator};
use rusqlite::vtab::Context;

#[derive(Debug, Clone, Copy)]
struct Xref {
    from: i64,
    to: i64,
    kind: i64,
}

const XREFS: [Xref; 7] = [
    Xref { from: 0x1000, to: 0x2000, kind: 1 },
    Xref { from: 0x1004, to: 0x2000, kind: 1 },
    Xref { from: 0x1008, to: 0x3000, kind: 2 },
    Xref { from: 0x100C, to: 0x2000, kind: 1 },
    Xref { from: 0x2000, to: 0x3000, kind: 1 },
    Xref { from: 0x2004, to: 0x4000, kind: 2 },
    Xref { from: 0x3000, to: 0x4000, kind: 1 },
];

/// Iterator over xrefs originating at one address.
struct XrefSourceIterator {
    target: i64,
    pos: i64,
}

impl RowIterator for XrefSourceIterator {
    fn advance(&mut self) -> bool {
        loop {
            self.pos += 1;
            match XREFS.get(self.pos as usize) {
                Some(x) if x.from == self.target => return true,
                Some(_) => continue,
                None => return false,
            }
        }
    }

    fn eof(&self) -> bool {
        self.pos as usize >= XREFS.len()
    }

    fn write_column(&self, ctx: &mut Context, col: usize) -> rusqlite::Result<()> {
        let x = &XREFS[self.pos as usize];
        match col {
            0 => ctx.set_result(&x.from),
            1 => ctx.set_result(&x.to),
            _ => ctx.set_result(&x.kind),
        }
    }

    fn rowid(&self) -> i64 {
        self.pos
    }
}

fn main() -> livetab::Result<()> {
    let def = cached_table::<Xref>("xrefs")
        .estimate_rows(|| XREFS.len())
        .cache_builder(|rows| {
            println!("[cache] building {} xrefs", XREFS.len());
            rows.extend_from_slice(&XREFS);
        })
        .column_int64("from_ea", |x| x.from)
        .column_int64("to_ea", |x| x.to)
        .column_int64("kind", |x| x.kind)
        .index_on("to_ea", |x| x.to)
        .filter_eq(
            "from_ea",
            |target| {
                println!("[filter] from_ea = {target:#x}");
                Some(Box::new(XrefSourceIterator { target, pos: -1 }) as Box<dyn RowIterator>)
            },
            10.0,
            3,
        )
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_cached_table(&def);

    println!("full scan:");
    let result = db.query("SELECT printf('%#x -> %#x', from_ea, to_ea) FROM xrefs")?;
    for row in &result.rows {
        println!("  {}", row[0].as_deref().unwrap_or("NULL"));
    }

    println!("index lookup (to_ea = 0x2000):");
    let result = db.query("SELECT printf('%#x', from_ea) FROM xrefs WHERE to_ea = 0x2000")?;
    for row in &result.rows {
        println!("  {}", row[0].as_deref().unwrap_or("NULL"));
    }

    println!("filter pushdown (from_ea = 0x1004):");
    let result = db.query("SELECT printf('%#x', to_ea) FROM xrefs WHERE from_ea = 0x1004")?;
    for row in &result.rows {
        println!("  {}", row[0].as_deref().unwrap_or("NULL"));
    }
    Ok(())
}
