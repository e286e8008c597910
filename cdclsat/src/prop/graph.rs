//! The implication graph: per-variable level, trail position and reason.
use partial_ref::{partial, PartialRef};

use cdclsat_formula::{Lit, LitIdx, Var};

use crate::clause::ClauseRef;
use crate::context::{ClauseAllocP, Context};

/// The assignment that caused a propagation.
///
/// `Unit` covers both decisions and root-level units: in both cases there is no reason clause to
/// resolve through during conflict analysis.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reason {
    Unit,
    Binary([Lit; 1]),
    Long(ClauseRef),
}

impl Reason {
    /// The literals whose assignment caused this propagation.
    ///
    /// For a long clause reason, the propagated literal is kept at position 0 of the clause, so
    /// the causing literals are the remaining ones.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Reason::Unit => &[],
            Reason::Binary(lit) => lit,
            Reason::Long(cref) => &ctx.part(ClauseAllocP).clause(*cref).lits()[1..],
        }
    }
}

/// A falsified clause found during propagation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Conflict {
    Binary([Lit; 2]),
    Long(ClauseRef),
}

impl Conflict {
    /// The literals of the falsified clause.
    pub fn lits<'out, 'a, 'b>(&'a self, ctx: &'b partial!('b Context, ClauseAllocP)) -> &'out [Lit]
    where
        'a: 'out,
        'b: 'out,
    {
        match self {
            Conflict::Binary(lits) => lits,
            Conflict::Long(cref) => ctx.part(ClauseAllocP).clause(*cref).lits(),
        }
    }
}

/// Node and incoming edges of the implication graph.
#[derive(Copy, Clone)]
pub struct ImplNode {
    pub reason: Reason,
    pub level: LitIdx,
    pub trail_pos: LitIdx,
}

/// The implication graph.
///
/// A DAG over assigned variables, sourced by units and decisions. Every propagated assignment has
/// incoming edges from the literals whose assignment caused the propagation.
#[derive(Default)]
pub struct ImplGraph {
    /// Contains only valid data for indices of currently assigned variables.
    nodes: Vec<ImplNode>,
}

impl ImplGraph {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.nodes.resize(
            count,
            ImplNode {
                reason: Reason::Unit,
                level: 0,
                trail_pos: 0,
            },
        );
    }

    /// Get the reason for an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn reason(&self, var: Var) -> &Reason {
        &self.nodes[var.index()].reason
    }

    /// Get the decision level of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn level(&self, var: Var) -> usize {
        self.nodes[var.index()].level as usize
    }

    /// Get the trail position of an assigned variable.
    ///
    /// Returns stale data if the variable isn't assigned.
    pub fn trail_pos(&self, var: Var) -> usize {
        self.nodes[var.index()].trail_pos as usize
    }

    /// Record a new assignment's level, trail position and reason.
    pub fn assign(&mut self, var: Var, level: usize, trail_pos: usize, reason: Reason) {
        self.nodes[var.index()] = ImplNode {
            reason,
            level: level as LitIdx,
            trail_pos: trail_pos as LitIdx,
        };
    }

    /// Updates the reason for an assigned variable, e.g. after a garbage collection moved it.
    ///
    /// Make sure the reason's literals remain in front of the assigned variable in the trail.
    pub fn update_reason(&mut self, var: Var, reason: Reason) {
        self.nodes[var.index()].reason = reason
    }
}
