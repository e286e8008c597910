//! Restart and clause-reduction scheduling.
//!
//! Restarts are gated on two exponential moving averages of learned-clause glue: a fast one and a
//! slow one. A restart is allowed once the fast average has risen enough above the slow one,
//! signalling that recent conflicts are producing worse clauses than the longer-term trend, and
//! only after a minimum number of conflicts have passed since the last restart.
use crate::config::SolverConfig;
use crate::ema::Ema;

/// EMA and counters driving [`crate::restart`] and [`crate::clause::reduce`].
pub struct Schedule {
    /// Total conflicts seen so far.
    pub conflicts: u64,
    /// Conflicts since the last restart.
    conflicts_since_restart: u64,
    /// Fast-decaying average of learned clause glue.
    pub fast_glue: Ema,
    /// Slow-decaying average of learned clause glue.
    pub slow_glue: Ema,
    /// Conflict count at which the next reduction is due.
    reduce_limit: u64,
    /// Growth added to the reduce interval after each reduction.
    reduce_inc: u64,
}

impl Schedule {
    pub fn new(config: &SolverConfig) -> Schedule {
        Schedule {
            conflicts: 0,
            conflicts_since_restart: 0,
            fast_glue: Ema::new(config.fast_glue_alpha()),
            slow_glue: Ema::new(config.slow_glue_alpha()),
            reduce_limit: config.reduce_initial,
            reduce_inc: config.reduce_inc,
        }
    }

    /// Feed the glue of a just-learned clause into both averages and bump the conflict count.
    pub fn record_conflict(&mut self, glue: usize) {
        self.conflicts += 1;
        self.conflicts_since_restart += 1;
        self.fast_glue.update(glue as f64);
        self.slow_glue.update(glue as f64);
    }

    /// Whether a restart should be performed right now.
    pub fn restart_due(&self, config: &SolverConfig) -> bool {
        self.conflicts_since_restart >= config.restart_interval
            && config.restart_margin * self.slow_glue.get() <= self.fast_glue.get()
    }

    pub fn restart_performed(&mut self) {
        self.conflicts_since_restart = 0;
    }

    /// Whether a reduction pass should be performed right now.
    pub fn reduce_due(&self) -> bool {
        self.conflicts >= self.reduce_limit
    }

    pub fn reduce_performed(&mut self) {
        self.reduce_limit = self.conflicts + self.reduce_inc;
        self.reduce_inc += 300;
    }
}

impl Default for Schedule {
    fn default() -> Schedule {
        Schedule::new(&SolverConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_becomes_due_after_initial_interval() {
        let config = SolverConfig::default();
        let mut schedule = Schedule::new(&config);
        assert!(!schedule.reduce_due());
        schedule.conflicts = config.reduce_initial;
        assert!(schedule.reduce_due());
    }

    #[test]
    fn reduce_interval_grows_after_each_reduction() {
        let config = SolverConfig::default();
        let mut schedule = Schedule::new(&config);
        schedule.conflicts = config.reduce_initial;
        schedule.reduce_performed();
        let first_limit = schedule.reduce_limit;
        assert_eq!(first_limit, config.reduce_initial + config.reduce_inc);

        schedule.conflicts = first_limit;
        schedule.reduce_performed();
        assert_eq!(
            schedule.reduce_limit,
            first_limit + config.reduce_inc + 300
        );
    }

    #[test]
    fn restart_blocked_until_interval_elapses() {
        let config = SolverConfig::default();
        let mut schedule = Schedule::new(&config);
        for _ in 0..config.restart_interval - 1 {
            schedule.record_conflict(10);
        }
        assert!(!schedule.restart_due(&config));
    }
}
