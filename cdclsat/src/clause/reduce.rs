//! Clause database reduction: protects live reasons, flushes newly root-fixed literals, discards
//! half of the reducible learned clauses by glue and physically collects garbage.
use rustc_hash::FxHashMap;

use partial_ref::{partial, PartialRef};

use cdclsat_formula::Lit;

use crate::clause::{ClauseAlloc, ClauseDb, ClauseRef};
use crate::context::{
    AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP, ProofP, SolverConfigP, TrailP,
    WatchlistsP,
};
use crate::prop::Reason;

/// Run a full reduction pass.
///
/// Protects the reason clause of every currently assigned non-root variable, marks root-satisfied
/// clauses garbage and flushes root-falsified literals out of the rest, discards the worse half of
/// the remaining reducible redundant clauses, then physically collects garbage and rebuilds the
/// watch lists from the survivors.
pub fn reduce(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut ProofP,
        mut WatchlistsP,
        AssignmentP,
        SolverConfigP,
        TrailP,
    ),
) {
    protect_reasons(ctx.borrow());

    let fixed_count = ctx.part(TrailP).top_level_assignment_count();
    if fixed_count > ctx.part(ClauseDbP).last_fixed() {
        flush_root_fixed(ctx.borrow());
        ctx.part_mut(ClauseDbP).set_last_fixed(fixed_count);
    }

    mark_worse_half_garbage(ctx.borrow());
    collect_garbage(ctx.borrow());
    unprotect_reasons(ctx.borrow());
}

/// Set `reason = true` on the clause backing every currently assigned non-root variable, so later
/// steps of this pass never mark it garbage.
fn protect_reasons(mut ctx: partial!(Context, mut ClauseAllocP, ImplGraphP, TrailP)) {
    for &lit in ctx.part(TrailP).trail() {
        let var = lit.var();
        if ctx.part(ImplGraphP).level(var) == 0 {
            continue;
        }
        if let Reason::Long(cref) = *ctx.part(ImplGraphP).reason(var) {
            ctx.part_mut(ClauseAllocP).header_mut(cref).set_reason(true);
        }
    }
}

fn unprotect_reasons(mut ctx: partial!(Context, mut ClauseAllocP, ClauseDbP)) {
    let crefs: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .irredundant()
        .iter()
        .chain(ctx.part(ClauseDbP).redundant().iter())
        .cloned()
        .collect();
    for cref in crefs {
        ctx.part_mut(ClauseAllocP).header_mut(cref).set_reason(false);
    }
}

/// Mark clauses satisfied by a root-level true literal garbage, and physically flush root-level
/// false literals out of the rest, emitting `proof.strengthen`.
///
/// Skips clauses currently protected as a live reason: their propagated literal is not root-level
/// true (protection only applies to non-root variables), so this never conflicts with deleting a
/// clause still needed by the implication graph.
fn flush_root_fixed(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut ProofP, AssignmentP, ImplGraphP),
) {
    let crefs: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .irredundant()
        .iter()
        .chain(ctx.part(ClauseDbP).redundant().iter())
        .cloned()
        .collect();

    for cref in crefs {
        let header = ctx.part(ClauseAllocP).header(cref);
        if header.garbage() || header.reason() {
            continue;
        }

        let mut root_true = false;
        let mut any_root_false = false;
        for &lit in ctx.part(ClauseAllocP).clause(cref).lits() {
            if ctx.part(ImplGraphP).level(lit.var()) != 0 {
                continue;
            }
            match ctx.part(AssignmentP).lit_value(lit) {
                Some(true) => root_true = true,
                Some(false) => any_root_false = true,
                None => {}
            }
        }

        if root_true {
            ClauseDb::delete_clause(ctx.borrow(), cref);
            continue;
        }

        if !any_root_false {
            continue;
        }

        let original: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits().to_vec();
        let id = ctx.part(ClauseAllocP).clause(cref).header().id();

        let remaining: Vec<Lit> = original
            .into_iter()
            .filter(|&lit| {
                ctx.part(ImplGraphP).level(lit.var()) != 0
                    || ctx.part(AssignmentP).lit_value(lit) != Some(false)
            })
            .collect();

        if remaining.len() < 3 {
            // Flushing would shrink the clause below the arena's minimal size of 3. A full
            // reimplementation would demote it to a binary or unit clause; left alone here until
            // it can instead be proven garbage by the satisfied check above.
            continue;
        }

        {
            let alloc = ctx.part_mut(ClauseAllocP);
            let clause = alloc.clause_mut(cref);
            clause.lits_mut()[..remaining.len()].copy_from_slice(&remaining);
            clause.header_mut().set_len(remaining.len());
        }
        ctx.part_mut(ProofP).strengthen_clause(id, &remaining);
    }
}

/// Of the unprotected, reducible redundant clauses, discard the worse half ranked by
/// `(-glue, resolved_stamp)`, so large, high-glue and long-unused clauses go first.
fn mark_worse_half_garbage(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut ProofP, SolverConfigP),
) {
    let (keep_size, keep_glue) = {
        let config = ctx.part(SolverConfigP);
        (config.keep_size, config.keep_glue)
    };

    let mut candidates: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .redundant()
        .iter()
        .cloned()
        .filter(|&cref| {
            let header = ctx.part(ClauseAllocP).header(cref);
            !header.garbage() && !header.reason() && header.len() > keep_size && header.glue() > keep_glue
        })
        .collect();

    candidates.sort_by_key(|&cref| {
        let header = ctx.part(ClauseAllocP).header(cref);
        (-(header.glue() as i64), header.resolved_stamp())
    });

    let worse_half = candidates.len() / 2;
    for &cref in &candidates[..worse_half] {
        ClauseDb::delete_clause(ctx.borrow(), cref);
    }
}

/// Copy every non-garbage clause of `crefs` from `old_alloc` into `new_alloc`, clearing the
/// transient `reason` flag and recording the old-to-new reference mapping.
fn recopy_survivors(
    old_alloc: &ClauseAlloc,
    new_alloc: &mut ClauseAlloc,
    remap: &mut FxHashMap<ClauseRef, ClauseRef>,
    crefs: &[ClauseRef],
) -> Vec<ClauseRef> {
    let mut kept = Vec::with_capacity(crefs.len());
    for &cref in crefs {
        let clause = old_alloc.clause(cref);
        if clause.header().garbage() {
            continue;
        }
        let mut header = clause.header().clone();
        header.set_reason(false);
        let new_cref = new_alloc.add_clause(header, clause.lits());
        remap.insert(cref, new_cref);
        kept.push(new_cref);
    }
    kept
}

/// Physically free garbage-flagged clauses, compacting the arena and the irredundant/redundant
/// lists, fixing up surviving reasons and rebuilding the watch lists from scratch.
fn collect_garbage(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
) {
    let (old_irredundant, old_redundant) = {
        let db = ctx.part(ClauseDbP);
        (db.irredundant().to_vec(), db.redundant().to_vec())
    };

    let mut new_alloc = ClauseAlloc::with_capacity(ctx.part(ClauseAllocP).buffer_size());
    let mut remap: FxHashMap<ClauseRef, ClauseRef> = FxHashMap::default();

    let new_irredundant = recopy_survivors(
        ctx.part(ClauseAllocP),
        &mut new_alloc,
        &mut remap,
        &old_irredundant,
    );
    let new_redundant = recopy_survivors(
        ctx.part(ClauseAllocP),
        &mut new_alloc,
        &mut remap,
        &old_redundant,
    );

    *ctx.part_mut(ClauseAllocP) = new_alloc;
    ctx.part_mut(ClauseDbP)
        .set_collected(new_irredundant, new_redundant);

    for &lit in ctx.part(TrailP).trail() {
        let var = lit.var();
        if let Reason::Long(old_cref) = *ctx.part(ImplGraphP).reason(var) {
            if let Some(&new_cref) = remap.get(&old_cref) {
                ctx.part_mut(ImplGraphP)
                    .update_reason(var, Reason::Long(new_cref));
            }
        }
    }

    ctx.part_mut(WatchlistsP).clear();
    let survivors: Vec<ClauseRef> = ctx
        .part(ClauseDbP)
        .irredundant()
        .iter()
        .chain(ctx.part(ClauseDbP).redundant().iter())
        .cloned()
        .collect();
    for cref in survivors {
        let lits = ctx.part(ClauseAllocP).clause(cref).lits();
        let watch_lits = [lits[0], lits[1]];
        let len = lits.len();
        ctx.part_mut(WatchlistsP).watch_clause(cref, watch_lits, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cdclsat_formula::lits;

    use crate::context::{set_var_count, AssignmentP};
    use crate::prop::enqueue_assignment;

    #[test]
    fn satisfied_clauses_are_collected() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 4);

        let cref = ClauseDb::new_original(ctx.borrow(), &lits![1, 2, 3]);
        enqueue_assignment(ctx.borrow(), lits![1][0], Reason::Unit);

        reduce(ctx.borrow());

        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 0);
        let _ = cref;
        let _ = ctx.part(AssignmentP);
    }

    #[test]
    fn protected_reason_survives_and_gets_remapped() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        set_var_count(ctx.borrow(), 5);

        // A second, doomed clause first so the surviving clause's offset actually moves.
        let doomed = ClauseDb::new_learned(ctx.borrow(), &lits![-1, -2, -4], 3);
        ClauseDb::delete_clause(ctx.borrow(), doomed);

        let cref = ClauseDb::new_original(ctx.borrow(), &lits![1, 2, 3]);
        enqueue_assignment(ctx.borrow(), lits![2][0], Reason::Long(cref));

        reduce(ctx.borrow());

        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 1);
        let var = lits![2][0].var();
        match *ctx.part(ImplGraphP).reason(var) {
            Reason::Long(new_cref) => {
                assert!(!ctx.part(ClauseAllocP).header(new_cref).garbage());
            }
            _ => panic!("expected a long reason"),
        }
    }
}
