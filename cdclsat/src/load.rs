//! Loading a formula into the solver.
use partial_ref::{partial, PartialRef};

use cdclsat_formula::Lit;

use crate::clause::ClauseDb;
use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, ProofP,
    SolverStateP, TmpDataP, TrailP, VmtfP, WatchlistsP,
};
use crate::prop::{backtrack, enqueue_assignment, Reason};
use crate::state::SatState;

/// Adds a clause to the current formula.
///
/// Deduplicates literals and drops tautological clauses (containing both a literal and its
/// negation). Literals already falsified at the root are removed; a literal already true at the
/// root drops the whole clause. Dispatches what remains among unit, binary and long clauses. An
/// empty clause after simplification makes the formula unsatisfiable.
///
/// Does not adjust the solver's variable count; that has to be done before calling this. If the
/// solver had already found the formula satisfiable, the decision trail is unwound to the root
/// level and the state reverts to unknown, since the previous model may not satisfy the new
/// clause. Once unsatisfiable, a formula stays unsatisfiable: adding clauses can't undo that.
pub fn load_clause(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP,
        mut SolverStateP,
        mut TmpDataP,
        mut TrailP,
        mut VmtfP,
        mut WatchlistsP,
    ),
    lits: &[Lit],
) {
    match ctx.part(SolverStateP).sat_state {
        SatState::Unsat => return,
        SatState::Sat => {
            backtrack(ctx.borrow(), 0);
            ctx.part_mut(SolverStateP).sat_state = SatState::Unknown;
        }
        SatState::Unknown => {}
    }

    let (tmp_data, mut ctx) = ctx.split_part_mut(TmpDataP);

    tmp_data.lits.clear();
    tmp_data.lits.extend_from_slice(lits);
    tmp_data.lits.sort_unstable();
    tmp_data.lits.dedup();

    let mut last = None;
    for &lit in tmp_data.lits.iter() {
        if last == Some(!lit) {
            // Tautological clause: always satisfied, drop it.
            return;
        }
        last = Some(lit);
    }

    tmp_data.lits_2.clear();
    for &lit in tmp_data.lits.iter() {
        match ctx.part(AssignmentP).lit_value(lit) {
            Some(true) => return,
            Some(false) => {}
            None => tmp_data.lits_2.push(lit),
        }
    }

    let simplified = &tmp_data.lits_2;

    match simplified[..] {
        [] => {
            ctx.part_mut(ProofP).conclude_unsat();
            ctx.part_mut(SolverStateP).sat_state = SatState::Unsat;
        }
        [unit] => enqueue_assignment(ctx.borrow(), unit, Reason::Unit),
        [a, b] => {
            ctx.part_mut(ProofP).add_input_clause(&[a, b]);
            ctx.part_mut(BinaryClausesP).add_binary_clause([a, b]);
        }
        _ => {
            let cref = ClauseDb::new_original(ctx.borrow(), simplified);
            let watched = [simplified[0], simplified[1]];
            let len = simplified.len();
            ctx.part_mut(WatchlistsP).watch_clause(cref, watched, len);
        }
    }
}

#[cfg(test)]
mod tests {
    use partial_ref::IntoPartialRefMut;

    use cdclsat_formula::lits;

    use super::*;
    use crate::context::set_var_count;

    #[test]
    fn unit_clause_assigns_immediately() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 1);
        load_clause(ctx.borrow(), &lits![1]);

        assert_eq!(ctx.part(AssignmentP).lit_value(lits![1][0]), Some(true));
    }

    #[test]
    fn binary_clause_is_stored_without_an_arena_entry() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 2);
        load_clause(ctx.borrow(), &lits![1, 2]);

        assert_eq!(ctx.part(BinaryClausesP).count(), 1);
        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 0);
    }

    #[test]
    fn long_clause_is_added_once() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);
        load_clause(ctx.borrow(), &lits![1, 2, 3]);
        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 1);

        load_clause(ctx.borrow(), &lits![-2, 3, 3, 4]);
        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 2);
    }

    #[test]
    fn tautological_clause_is_dropped() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 5);
        load_clause(ctx.borrow(), &lits![1, 2, 3]);
        load_clause(ctx.borrow(), &lits![-2, 3, 3, 4]);
        load_clause(ctx.borrow(), &lits![4, -5, 5, 2]);

        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 2);
    }

    #[test]
    fn empty_clause_makes_the_formula_unsat() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 1);
        load_clause(ctx.borrow(), &lits![1]);
        load_clause(ctx.borrow(), &lits![-1]);

        assert_eq!(ctx.part(SolverStateP).sat_state, SatState::Unsat);
    }
}
