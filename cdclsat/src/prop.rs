//! Unit propagation.
pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, restart, Assignment, Trail};
pub use binary::propagate_binary;
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use long::propagate_long;
pub use watch::{Watch, Watchlists};

use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP, ProofP, TrailP, WatchlistsP,
};

/// Propagate all pending assignments until a fixpoint or conflict is reached.
///
/// Binary clauses are drained completely before a single long clause propagation is performed,
/// since they are cheap and a long clause propagation may itself enqueue new binary consequences.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut ProofP,
        mut TrailP,
        mut WatchlistsP,
        mut ClauseAllocP,
        BinaryClausesP,
    ),
) -> Result<(), Conflict> {
    loop {
        if let Some(lit) = ctx.part(TrailP).next_binary() {
            ctx.part_mut(TrailP).pop_binary();
            propagate_binary(ctx.borrow(), lit)?;
            continue;
        }

        if let Some(lit) = ctx.part(TrailP).next_long() {
            ctx.part_mut(TrailP).pop_long();
            propagate_long(ctx.borrow(), lit)?;
            continue;
        }

        return Ok(());
    }
}
