//! Row iterator and generator protocols
//!
//! Constraint pushdown hands scans to host-provided [`RowIterator`]s, and
//! the streaming flavor sources rows from host-provided [`RowGenerator`]s.
//! Both are pull-based: the engine drives them one row at a time, so a
//! `LIMIT` stops the host's work after the delivered rows.

use rusqlite::vtab::Context;

/// A host-provided lazy sequence of rows for one pushed-down constraint.
///
/// Iterators may produce rows in any order; the engine does not assume
/// sortedness.
pub trait RowIterator: Send {
    /// Move to the next row. Returns `false` when no row is available.
    ///
    /// The cursor decides end-of-scan from this return value alone, so an
    /// implementation must eventually return `false`.
    fn advance(&mut self) -> bool;

    /// Advisory exhaustion flag. The adapters never consult it; scans
    /// terminate on [`RowIterator::advance`] returning `false`.
    fn eof(&self) -> bool;

    /// Write column `col` of the current row into the result context.
    /// Valid only after a successful `advance`.
    fn write_column(&self, ctx: &mut Context, col: usize) -> rusqlite::Result<()>;

    /// Host-defined identity of the current row.
    fn rowid(&self) -> i64;
}

/// Cursor-side state for a scan backed by a [`RowIterator`].
///
/// The first row is pre-positioned at construction; exhaustion is tracked
/// exclusively from `advance()`'s return value.
pub(crate) struct IterScan {
    iter: Box<dyn RowIterator>,
    exhausted: bool,
}

impl IterScan {
    /// Start a scan, pre-positioning on the first row.
    pub(crate) fn start(mut iter: Box<dyn RowIterator>) -> Self {
        let exhausted = !iter.advance();
        IterScan { iter, exhausted }
    }

    pub(crate) fn advance(&mut self) {
        if !self.exhausted {
            self.exhausted = !self.iter.advance();
        }
    }

    pub(crate) fn eof(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn write_column(&self, ctx: &mut Context, col: usize) -> rusqlite::Result<()> {
        self.iter.write_column(ctx, col)
    }

    pub(crate) fn rowid(&self) -> i64 {
        self.iter.rowid()
    }
}

/// A host-provided lazy row source for the streaming flavor.
///
/// A fresh generator is constructed for every full scan and dropped when
/// the cursor closes; no state survives between scans.
pub trait RowGenerator<R>: Send {
    /// Move to the next row. Returns `false` when the source is exhausted.
    fn advance(&mut self) -> bool;

    /// The current row. Valid only after a successful `advance`.
    fn current(&self) -> &R;

    /// Host-defined identity of the current row.
    fn rowid(&self) -> i64;
}

/// Adapts any `Iterator<Item = R>` into a [`RowGenerator`] with sequential
/// rowids.
pub struct IterGenerator<I: Iterator> {
    source: I,
    current: Option<I::Item>,
    rowid: i64,
}

impl<I: Iterator> IterGenerator<I> {
    pub fn new(source: I) -> Self {
        IterGenerator {
            source,
            current: None,
            rowid: -1,
        }
    }
}

impl<R, I> RowGenerator<R> for IterGenerator<I>
where
    I: Iterator<Item = R> + Send,
    R: Send,
{
    fn advance(&mut self) -> bool {
        self.current = self.source.next();
        if self.current.is_some() {
            self.rowid += 1;
            true
        } else {
            false
        }
    }

    fn current(&self) -> &R {
        // Only reachable after a successful advance; the adapters uphold this.
        match &self.current {
            Some(row) => row,
            None => unreachable!("current() called before a successful advance()"),
        }
    }

    fn rowid(&self) -> i64 {
        self.rowid
    }
}
