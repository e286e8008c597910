//! Solver configuration.
//!
//! Every tunable used by the search driver lives here so that [`crate::context::Context`] itself
//! stays free of magic numbers. Defaults follow the option table referenced by the specification
//! this solver implements (margin, intervals and EMA alphas for restarts; keep thresholds and the
//! additive growth for reduction; the depth bound for clause minimization).

/// Configurable parameters used during solving.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Restart is allowed once `margin * slow_glue <= fast_glue`. (Default: 1.1)
    pub restart_margin: f64,

    /// Number of conflicts between two restarts, in absence of other restart blockers.
    /// (Default: 6)
    pub restart_interval: u64,

    /// Whether to preserve the reusable prefix of the trail across a restart. (Default: true)
    pub reusetrail: bool,

    /// Decay exponent for the fast glue EMA: alpha = 2^-fast_glue_exp. (Default: 5)
    pub fast_glue_exp: i32,

    /// Decay exponent for the slow glue EMA: alpha = 2^-slow_glue_exp. (Default: 14)
    pub slow_glue_exp: i32,

    /// Clauses of this size or smaller are never considered for reduction. (Default: 5)
    pub keep_size: usize,

    /// Clauses with this glue or lower are never considered for reduction. (Default: 2)
    pub keep_glue: usize,

    /// Conflicts before the first reduction. (Default: 2000)
    pub reduce_initial: u64,

    /// Additive growth applied to the reduce interval after each reduction. (Default: 300)
    pub reduce_inc: u64,

    /// Maximum recursion depth used by self-subsuming clause minimization. (Default: 1000)
    pub minimize_max_depth: usize,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            restart_margin: 1.1,
            restart_interval: 6,
            reusetrail: true,
            fast_glue_exp: 5,
            slow_glue_exp: 14,
            keep_size: 5,
            keep_glue: 2,
            reduce_initial: 2000,
            reduce_inc: 300,
            minimize_max_depth: 1000,
        }
    }
}

impl SolverConfig {
    pub fn fast_glue_alpha(&self) -> f64 {
        (-self.fast_glue_exp as f64).exp2()
    }

    pub fn slow_glue_alpha(&self) -> f64 {
        (-self.slow_glue_exp as f64).exp2()
    }
}
