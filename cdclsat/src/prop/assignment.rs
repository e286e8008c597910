//! Partial assignment and backtracking.
use partial_ref::{partial, PartialRef};

use cdclsat_formula::{Lit, LitIdx, Var};

use crate::context::{AssignmentP, Context, ImplGraphP, ProofP, TrailP, VmtfP};
use crate::vmtf::Vmtf;

use super::Reason;

/// Current partial assignment.
#[derive(Default)]
pub struct Assignment {
    assignment: Vec<Option<bool>>,
    last_value: Vec<bool>,
}

/// This compares two `Option<bool>` values as bytes. Workaround for bad code generation.
pub fn fast_option_eq(a: Option<bool>, b: Option<bool>) -> bool {
    unsafe { std::mem::transmute::<_, u8>(a) == std::mem::transmute::<_, u8>(b) }
}

impl Assignment {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.assignment.resize(count, None);
        self.last_value.resize(count, false);
    }

    /// Current partial assignment as slice.
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    /// Value assigned to a variable.
    pub fn var_value(&self, var: Var) -> Option<bool> {
        self.assignment[var.index()]
    }

    /// Value last assigned to a variable.
    ///
    /// If the variable is currently assigned this returns the previously assigned value. If the
    /// variable was never assigned this returns false.
    pub fn last_var_value(&self, var: Var) -> bool {
        self.last_value[var.index()]
    }

    /// Value assigned to a literal.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.assignment[lit.index()].map(|b| b ^ lit.is_negative())
    }

    pub fn lit_is_true(&self, lit: Lit) -> bool {
        fast_option_eq(self.assignment[lit.index()], Some(lit.is_positive()))
    }

    pub fn lit_is_false(&self, lit: Lit) -> bool {
        fast_option_eq(self.assignment[lit.index()], Some(lit.is_negative()))
    }

    pub fn lit_is_unk(&self, lit: Lit) -> bool {
        fast_option_eq(self.assignment[lit.index()], None)
    }

    pub fn assign_lit(&mut self, lit: Lit) {
        self.assignment[lit.index()] = lit.is_positive().into()
    }
}

/// Decision and propagation history.
///
/// Binary clauses are cheap enough that the search loop drains the whole binary queue, via
/// `next_binary`, before advancing `next_long` and touching the clause database at all. Both
/// cursors only ever move forward; they are clamped to the truncated trail length on backtrack.
#[derive(Default)]
pub struct Trail {
    /// Stack of all propagated and all enqueued assignments.
    trail: Vec<Lit>,
    /// Next assignment in trail to propagate against binary clauses.
    next_binary: usize,
    /// Next assignment in trail to propagate against long clauses.
    next_long: usize,
    /// Decision levels as trail indices. `decisions[level - 1]` is the trail length just before
    /// the decision literal opening `level` was pushed.
    decisions: Vec<LitIdx>,
    /// Number of unit clauses removed from the trail.
    units_removed: usize,
}

impl Trail {
    /// Return the next literal to propagate against binary clauses, without dequeuing it.
    pub fn next_binary(&self) -> Option<Lit> {
        self.trail.get(self.next_binary).cloned()
    }

    /// Dequeue and return the next literal to propagate against binary clauses.
    pub fn pop_binary(&mut self) -> Option<Lit> {
        let head = self.next_binary();
        if head.is_some() {
            self.next_binary += 1;
        }
        head
    }

    /// Return the next literal to propagate against long clauses, without dequeuing it.
    pub fn next_long(&self) -> Option<Lit> {
        self.trail.get(self.next_long).cloned()
    }

    /// Dequeue and return the next literal to propagate against long clauses.
    pub fn pop_long(&mut self) -> Option<Lit> {
        let head = self.next_long();
        if head.is_some() {
            self.next_long += 1;
        }
        head
    }

    /// Re-enqueue all assigned literals on both queues.
    pub fn reset_queue(&mut self) {
        self.next_binary = 0;
        self.next_long = 0;
    }

    /// Assigned literals in assignment order.
    pub fn trail(&self) -> &[Lit] {
        &self.trail
    }

    /// Clear the trail.
    ///
    /// This simply removes all entries without performing any backtracking. Can only be called
    /// with no active decisions.
    pub fn clear(&mut self) {
        assert!(self.decisions.is_empty());
        self.units_removed += self.trail.len();
        self.trail.clear();
        self.next_binary = 0;
        self.next_long = 0;
    }

    /// Start a new decision level.
    ///
    /// Does not enqueue the decision itself.
    pub fn new_decision_level(&mut self) {
        self.decisions.push(self.trail.len() as LitIdx)
    }

    /// Current decision level.
    pub fn current_level(&self) -> usize {
        self.decisions.len()
    }

    /// Trail position at which decision level `level` (1-based) begins.
    pub fn level_start(&self, level: usize) -> usize {
        self.decisions[level - 1] as usize
    }

    /// The decision literal opening the given (1-based) decision level.
    pub fn decision_at_level(&self, level: usize) -> Lit {
        self.trail[self.level_start(level)]
    }

    /// The number of assignments at level 0.
    pub fn top_level_assignment_count(&self) -> usize {
        self.decisions
            .get(0)
            .map(|&len| len as usize)
            .unwrap_or(self.trail.len())
            + self.units_removed
    }

    /// Whether all assignments are processed by both propagation queues.
    pub fn fully_propagated(&self) -> bool {
        self.next_binary == self.trail.len() && self.next_long == self.trail.len()
    }
}

/// Enqueues the assignment of true to a literal.
///
/// This updates the assignment and trail, but does not perform any propagation. The literal has
/// to be unassigned when calling this. If this assignment happens at decision level 0, it is a
/// root-level unit and `proof.add_unit` is emitted for it.
pub fn enqueue_assignment(
    mut ctx: partial!(Context, mut AssignmentP, mut ImplGraphP, mut ProofP, mut TrailP),
    lit: Lit,
    reason: Reason,
) {
    let assignment = ctx.part_mut(AssignmentP);
    debug_assert!(assignment.lit_value(lit) == None);

    assignment.assign_lit(lit);

    let (trail, mut ctx) = ctx.split_part_mut(TrailP);

    let trail_pos = trail.trail.len();
    trail.trail.push(lit);

    let level = trail.decisions.len();
    ctx.part_mut(ImplGraphP).assign(lit.var(), level, trail_pos, reason);

    if level == 0 {
        ctx.part_mut(ProofP).add_unit_clause(lit);
    }
}

/// Undo all assignments in decision levels deeper than the given level.
pub fn backtrack(
    mut ctx: partial!(Context, mut AssignmentP, mut TrailP, mut VmtfP),
    level: usize,
) {
    let (assignment, mut ctx) = ctx.split_part_mut(AssignmentP);
    let (trail, mut ctx) = ctx.split_part_mut(TrailP);

    if level == trail.decisions.len() {
        return;
    }

    let new_trail_len = trail.decisions[level] as usize;

    trail.decisions.truncate(level);

    let trail_end = &trail.trail[new_trail_len..];
    let vmtf: &mut Vmtf = ctx.part_mut(VmtfP);
    for &lit in trail_end {
        vmtf.backtrack_unassign(lit.var());
        let var_assignment = &mut assignment.assignment[lit.index()];
        assignment.last_value[lit.index()] = *var_assignment == Some(true);
        *var_assignment = None;
    }
    trail.trail.truncate(new_trail_len);

    trail.next_binary = trail.next_binary.min(new_trail_len);
    trail.next_long = trail.next_long.min(new_trail_len);
}

/// Undo all decisions, returning to level 0.
pub fn restart(mut ctx: partial!(Context, mut AssignmentP, mut TrailP, mut VmtfP)) {
    backtrack(ctx.borrow(), 0);
}
