//! Solver statistics, periodically reported via the `log` crate.
use std::time::Instant;

/// Running counters updated throughout search.
pub struct Stats {
    pub decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub restarts: u64,
    pub reductions: u64,
    pub learned_clauses: u64,
    pub deleted_clauses: u64,
    start: Instant,
    next_log_at: u64,
}

impl Default for Stats {
    fn default() -> Stats {
        Stats {
            decisions: 0,
            propagations: 0,
            conflicts: 0,
            restarts: 0,
            reductions: 0,
            learned_clauses: 0,
            deleted_clauses: 0,
            start: Instant::now(),
            next_log_at: 1000,
        }
    }
}

impl Stats {
    /// Log a progress line every couple thousand conflicts, matching the cadence solvers in this
    /// style use to keep long runs observable without flooding the log.
    pub fn log_progress_if_due(&mut self) {
        if self.conflicts < self.next_log_at {
            return;
        }
        self.next_log_at = self.conflicts + 2000;
        log::info!(
            "conflicts: {} decisions: {} propagations: {} restarts: {} reductions: {} \
             learned: {} deleted: {} elapsed: {:.1}s",
            self.conflicts,
            self.decisions,
            self.propagations,
            self.restarts,
            self.reductions,
            self.learned_clauses,
            self.deleted_clauses,
            self.start.elapsed().as_secs_f64(),
        );
    }
}
