//! Database for long clauses (arena-resident, size 3 or more).
//!
//! Clauses are partitioned into an irredundant (original) and a redundant (learned) list.
//! Deletion is delayed: [`delete_clause`] only flags a clause garbage and emits the proof event,
//! physical removal and compaction of these lists happens in
//! [`collect_garbage`](crate::clause::reduce::collect_garbage).
use partial_ref::{partial, PartialRef};

use cdclsat_formula::Lit;

use super::header::HEADER_LEN;
use super::{ClauseAlloc, ClauseHeader, ClauseRef};
use crate::context::{ClauseAllocP, ClauseDbP, Context, ProofP};

/// Database for long clauses.
#[derive(Default)]
pub struct ClauseDb {
    /// May contain garbage clauses, filtered out lazily by [`reduce`](crate::clause::reduce).
    irredundant: Vec<ClauseRef>,
    /// May contain garbage clauses, filtered out lazily by [`reduce`](crate::clause::reduce).
    redundant: Vec<ClauseRef>,
    /// Size, in header-inclusive words, of clauses flagged garbage but not yet physically
    /// collected.
    garbage_size: usize,
    /// Root-level assignment count as of the last reduce pass that flushed root-fixed literals.
    last_fixed: usize,
}

impl ClauseDb {
    /// Allocate an irredundant (original) clause and emit `proof.add_input`.
    ///
    /// `lits` must already be free of tautologies and duplicate literals and have length >= 3.
    pub fn new_original(
        mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut ProofP),
        lits: &[Lit],
    ) -> ClauseRef {
        let (proof, mut ctx) = ctx.split_part_mut(ProofP);
        let id = proof.add_input_clause(lits);

        let header = ClauseHeader::new(id);
        let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);
        ctx.part_mut(ClauseDbP).irredundant.push(cref);
        cref
    }

    /// Allocate a redundant (learned) clause and emit `proof.add_derived`.
    ///
    /// `lits[0]` and `lits[1]` must already be the two literals the caller intends to watch.
    pub fn new_learned(
        mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut ProofP),
        lits: &[Lit],
        glue: usize,
    ) -> ClauseRef {
        let (proof, mut ctx) = ctx.split_part_mut(ProofP);
        let id = proof.add_derived_clause(lits);

        let header = ClauseHeader::learned(id, glue);
        let cref = ctx.part_mut(ClauseAllocP).add_clause(header, lits);
        ctx.part_mut(ClauseDbP).redundant.push(cref);
        cref
    }

    /// Flag a clause garbage and emit `proof.delete`. Physical removal is deferred.
    pub fn delete_clause(
        mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP, mut ProofP),
        cref: ClauseRef,
    ) {
        let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
        let clause = alloc.clause_mut(cref);
        debug_assert!(!clause.header().garbage(), "clause already deleted");

        clause.header_mut().set_garbage(true);
        let id = clause.header().id();
        let len = clause.header().len();
        let lits = clause.lits().to_vec();

        ctx.part_mut(ProofP).delete_clause(id, &lits);
        ctx.part_mut(ClauseDbP).garbage_size += len + HEADER_LEN;
    }

    /// All irredundant clause references, including any not yet physically collected garbage.
    pub fn irredundant(&self) -> &[ClauseRef] {
        &self.irredundant
    }

    /// All redundant clause references, including any not yet physically collected garbage.
    pub fn redundant(&self) -> &[ClauseRef] {
        &self.redundant
    }

    /// Size, in words, of flagged-garbage clauses not yet physically collected.
    pub fn garbage_size(&self) -> usize {
        self.garbage_size
    }

    /// Replace the irredundant/redundant lists and reset the garbage counter, used by
    /// [`collect_garbage`](crate::clause::reduce::collect_garbage) after compaction.
    pub(super) fn set_collected(&mut self, irredundant: Vec<ClauseRef>, redundant: Vec<ClauseRef>) {
        self.irredundant = irredundant;
        self.redundant = redundant;
        self.garbage_size = 0;
    }

    /// Number of irredundant clauses, including garbage not yet collected.
    pub fn count_irredundant(&self) -> usize {
        self.irredundant.len()
    }

    /// Number of redundant clauses, including garbage not yet collected.
    pub fn count_redundant(&self) -> usize {
        self.redundant.len()
    }

    /// Root-level assignment count as of the last reduce pass that flushed root-fixed literals.
    pub fn last_fixed(&self) -> usize {
        self.last_fixed
    }

    pub fn set_last_fixed(&mut self, fixed_count: usize) {
        self.last_fixed = fixed_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use cdclsat_formula::lits;

    #[test]
    fn add_original_and_learned_clauses() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let a = ClauseDb::new_original(ctx.borrow(), &lits![1, 2, 3]);
        let b = ClauseDb::new_learned(ctx.borrow(), &lits![-1, -2, -3], 2);

        assert_eq!(ctx.part(ClauseDbP).count_irredundant(), 1);
        assert_eq!(ctx.part(ClauseDbP).count_redundant(), 1);

        assert!(!ctx.part(ClauseAllocP).header(a).redundant());
        assert!(ctx.part(ClauseAllocP).header(b).redundant());
        assert_eq!(ctx.part(ClauseAllocP).header(b).glue(), 2);
    }

    #[test]
    fn delete_flags_garbage_and_tracks_size() {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();

        let cref = ClauseDb::new_original(ctx.borrow(), &lits![1, 2, 3]);
        assert_eq!(ctx.part(ClauseDbP).garbage_size(), 0);

        ClauseDb::delete_clause(ctx.borrow(), cref);

        assert!(ctx.part(ClauseAllocP).header(cref).garbage());
        assert!(ctx.part(ClauseDbP).garbage_size() > 0);
    }
}
