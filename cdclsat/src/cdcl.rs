//! The top level search loop: propagate, learn from conflicts, restart, reduce and decide.
use partial_ref::{partial, PartialRef};

use crate::analyze_conflict::analyze_conflict;
use crate::clause::{reduce::reduce, ClauseDb};
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP,
    ModelP, ProofP, ScheduleP, SolverConfigP, SolverStateP, StatsP, TmpDataP, TrailP, VmtfP,
    WatchlistsP,
};
use crate::model::extract_model;
use crate::prop::{backtrack, enqueue_assignment, propagate, Conflict, Reason};
use crate::state::SatState;

/// Runs one iteration of the search loop.
///
/// Propagates first; on a conflict, analyzes and installs the learned clause (or concludes UNSAT
/// on an empty one); otherwise, in order, accepts a complete assignment as SAT, restarts, reduces
/// the clause database, or makes a new decision. A no-op once the solver state has left
/// `Unknown`.
pub fn search_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ModelP,
        mut ProofP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VmtfP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    if let Err(conflict) = propagate(ctx.borrow()) {
        handle_conflict(ctx.borrow(), conflict);
        return;
    }

    if ctx.part(TrailP).trail().len() == ctx.part(AssignmentP).assignment().len() {
        extract_model(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
        return;
    }

    if ctx.part(ScheduleP).restart_due(ctx.part(SolverConfigP)) {
        restart(ctx.borrow());
        return;
    }

    if ctx.part(ScheduleP).reduce_due() {
        reduce(ctx.borrow());
        ctx.part_mut(ScheduleP).reduce_performed();
        ctx.part_mut(StatsP).reductions += 1;
        return;
    }

    if !decide(ctx.borrow()) {
        // Every variable is assigned without a conflict: the formula is satisfied.
        extract_model(ctx.borrow());
        ctx.part_mut(SolverStateP).sat_state = SatState::Sat;
        return;
    }

    ctx.part_mut(StatsP).log_progress_if_due();
}

/// Analyzes a conflict and installs the resulting learned clause, or concludes UNSAT.
fn handle_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP,
        mut ScheduleP,
        mut SolverStateP,
        mut StatsP,
        mut TmpDataP,
        mut TrailP,
        mut VmtfP,
        mut WatchlistsP,
        SolverConfigP,
    ),
    conflict: Conflict,
) {
    let conflict_index = ctx.part(StatsP).conflicts as u32;
    ctx.part_mut(StatsP).conflicts += 1;

    let (backtrack_to, glue) = analyze_conflict(ctx.borrow(), conflict, conflict_index);

    let (analyze, mut ctx) = ctx.split_part(AnalyzeConflictP);
    let clause = analyze.clause();

    if clause.is_empty() {
        ctx.part_mut(ProofP).conclude_unsat();
        ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        return;
    }

    ctx.part_mut(ScheduleP).record_conflict(glue);

    match clause.len() {
        1 => {
            backtrack(ctx.borrow(), 0);
            let unit = clause[0];
            // `enqueue_assignment` emits `proof.add_unit` itself, since this assignment always
            // lands at level 0.
            enqueue_assignment(ctx.borrow(), unit, Reason::Unit);
        }
        2 => {
            backtrack(ctx.borrow(), backtrack_to);
            let binary = [clause[0], clause[1]];
            ctx.part_mut(ProofP).add_derived_clause(&binary);
            ctx.part_mut(BinaryClausesP).add_binary_clause(binary);
            enqueue_assignment(ctx.borrow(), binary[0], Reason::Binary([binary[1]]));
        }
        _ => {
            backtrack(ctx.borrow(), backtrack_to);
            let cref = ClauseDb::new_learned(ctx.borrow(), clause, glue);
            let watched = [clause[0], clause[1]];
            let size = clause.len();
            ctx.part_mut(WatchlistsP).watch_clause(cref, watched, size);
            enqueue_assignment(ctx.borrow(), watched[0], Reason::Long(cref));
        }
    }

    ctx.part_mut(StatsP).learned_clauses += 1;
}

/// Perform a restart: back up to the reusable trail prefix (or all the way to level 0 if
/// `reusetrail` is disabled) and reset the conflict-since-restart counter.
fn restart(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ScheduleP,
        mut StatsP,
        mut TrailP,
        mut VmtfP,
        SolverConfigP,
    ),
) {
    let level = if ctx.part(SolverConfigP).reusetrail {
        reuse_level(ctx.borrow())
    } else {
        0
    };

    backtrack(ctx.borrow(), level);

    ctx.part_mut(ScheduleP).restart_performed();
    ctx.part_mut(StatsP).restarts += 1;
}

/// The highest decision level whose decision can be kept across a restart.
///
/// A decision level is worth keeping if its decision variable was bumped more recently than the
/// variable the VMTF queue would pick next: otherwise that candidate would just be re-decided
/// immediately at a lower level anyway.
fn reuse_level(mut ctx: partial!(Context, mut VmtfP, AssignmentP, TrailP)) -> usize {
    let (vmtf, ctx) = ctx.split_part_mut(VmtfP);

    let candidate = match vmtf.next_decision(ctx.part(AssignmentP)) {
        Some(var) => var,
        None => return ctx.part(TrailP).current_level(),
    };
    let limit = vmtf.bumped(candidate);

    let trail = ctx.part(TrailP);
    let mut level = 0;
    while level < trail.current_level()
        && vmtf.bumped(trail.decision_at_level(level + 1).var()) > limit
    {
        level += 1;
    }
    level
}

/// Make a new decision: pick the next unassigned variable from the VMTF queue, assign it its
/// saved phase and open a new decision level. Returns `false` if every variable is assigned.
fn decide(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut ProofP,
        mut StatsP,
        mut TrailP,
        mut VmtfP,
    ),
) -> bool {
    let (vmtf, mut ctx) = ctx.split_part_mut(VmtfP);

    let var = match vmtf.next_decision(ctx.part(AssignmentP)) {
        Some(var) => var,
        None => return false,
    };

    let lit = var.lit(ctx.part(AssignmentP).last_var_value(var));

    ctx.part_mut(TrailP).new_decision_level();
    enqueue_assignment(ctx.borrow(), lit, Reason::Unit);
    ctx.part_mut(StatsP).decisions += 1;

    true
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use cdclsat_formula::lits;

    use super::*;
    use crate::context::set_var_count;
    use crate::load::load_clause;

    #[test]
    fn search_solves_a_small_satisfiable_formula() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 3);
        load_clause(ctx.borrow(), &lits![1, 2]);
        load_clause(ctx.borrow(), &lits![-1, 3]);
        load_clause(ctx.borrow(), &lits![-2, -3]);

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            search_step(ctx.borrow());
        }

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Sat);
    }

    #[test]
    fn search_detects_unsatisfiable_formula() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 2);
        load_clause(ctx.borrow(), &lits![1, 2]);
        load_clause(ctx.borrow(), &lits![1, -2]);
        load_clause(ctx.borrow(), &lits![-1, 2]);
        load_clause(ctx.borrow(), &lits![-1, -2]);

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            search_step(ctx.borrow());
        }

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }
}
