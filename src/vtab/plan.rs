//! Shared query-planner hook
//!
//! All three adapter flavors answer `xBestIndex` through [`choose_plan`].
//! Only usable equality constraints are considered. Candidates, lowest
//! cost winning:
//!
//! 1. a hash index on the constrained column (cached flavor), at a fixed
//!    probe cost;
//! 2. an explicit filter declaration, at its stored cost;
//! 3. otherwise a full scan costed at the table's row estimate.
//!
//! The winning constraint is bound to argv slot 1 with the omit flag set,
//! so the engine does not re-check the predicate. Ties keep the first
//! candidate encountered, stable over the constraint list order. Planning
//! never invokes the row-count procedure; only the cheap estimate feeds
//! the full-scan cost.

use super::{
    FULL_SCAN_PLAN, INDEX_LOOKUP_COST, INDEX_LOOKUP_ROWS, INDEX_PLAN_BASE,
};
use crate::table::FilterDef;
use rusqlite::vtab::{IndexConstraintOp, IndexInfo};

/// Planner inputs for one table flavor.
pub(crate) struct PlanInput<'a> {
    /// Declared pushdown filters.
    pub(crate) filters: &'a [FilterDef],
    /// Column index of each hash index, in declaration order. Position n
    /// maps to plan id `INDEX_PLAN_BASE + n`.
    pub(crate) index_columns: &'a [usize],
    /// Estimated row count for the full-scan fallback.
    pub(crate) full_scan_rows: f64,
}

struct Candidate {
    constraint: usize,
    plan_id: i32,
    cost: f64,
    rows: i64,
}

fn offer(best: &mut Option<Candidate>, candidate: Candidate) {
    let better = match best {
        Some(current) => candidate.cost < current.cost,
        None => true,
    };
    if better {
        *best = Some(candidate);
    }
}

pub(crate) fn choose_plan(info: &mut IndexInfo, input: &PlanInput<'_>) -> rusqlite::Result<()> {
    let mut best: Option<Candidate> = None;

    for (ci, constraint) in info.constraints().enumerate() {
        if !constraint.is_usable() {
            continue;
        }
        if constraint.operator() != IndexConstraintOp::SQLITE_INDEX_CONSTRAINT_EQ {
            continue;
        }
        let column = constraint.column();
        if column < 0 {
            continue;
        }
        let column = column as usize;

        for (pos, index_column) in input.index_columns.iter().enumerate() {
            if *index_column == column {
                offer(
                    &mut best,
                    Candidate {
                        constraint: ci,
                        plan_id: INDEX_PLAN_BASE + pos as i32,
                        cost: INDEX_LOOKUP_COST,
                        rows: INDEX_LOOKUP_ROWS,
                    },
                );
            }
        }

        for filter in input.filters {
            if filter.column == column {
                offer(
                    &mut best,
                    Candidate {
                        constraint: ci,
                        plan_id: filter.plan_id,
                        cost: filter.cost,
                        rows: filter.rows,
                    },
                );
            }
        }
    }

    match best {
        Some(candidate) => {
            info.constraint_usage(candidate.constraint).set_argv_index(1);
            info.constraint_usage(candidate.constraint).set_omit(true);
            info.set_idx_num(candidate.plan_id);
            info.set_estimated_cost(candidate.cost);
            info.set_estimated_rows(candidate.rows);
        }
        None => {
            info.set_idx_num(FULL_SCAN_PLAN);
            info.set_estimated_cost(input.full_scan_rows);
            info.set_estimated_rows(input.full_scan_rows as i64);
        }
    }
    Ok(())
}
