//! Propagation of long clauses.
use partial_ref::{partial, PartialRef};

use cdclsat_formula::Lit;

use crate::context::{
    AssignmentP, ClauseAllocP, Context, ImplGraphP, ProofP, TrailP, WatchlistsP,
};
use crate::vec_mut_scan::VecMutScan;

use super::enqueue_assignment;
use super::{Conflict, Reason, Watch};

/// Propagate all literals implied by long clauses watched by the given literal.
///
/// On conflict return the clause propagating the conflicting assignment.
///
/// See [`prop::watch`](crate::prop::watch) for the invariants that this has to uphold.
pub fn propagate_long(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut ProofP,
        mut TrailP,
        mut WatchlistsP,
        mut ClauseAllocP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let false_lit = !lit;

    let mut watches = ctx.part_mut(WatchlistsP).take_watches(lit);
    let mut conflict = None;

    {
        let mut scan = VecMutScan::new(&mut watches);

        'watchers: while let Some(mut watch) = scan.next() {
            if ctx.part(AssignmentP).lit_is_true(watch.blocking) {
                continue;
            }

            let cref = watch.cref;

            let first = {
                let alloc = ctx.part_mut(ClauseAllocP);
                let lits = alloc.clause_mut(cref).lits_mut();
                if lits[0] == false_lit {
                    lits.swap(0, 1);
                }
                lits[0]
            };

            let new_watch = Watch {
                cref,
                blocking: first,
                cached_size: watch.cached_size,
            };

            if first != watch.blocking && ctx.part(AssignmentP).lit_is_true(first) {
                *watch = new_watch;
                continue;
            }

            let tail: Vec<Lit> = ctx.part(ClauseAllocP).clause(cref).lits()[2..].to_vec();
            let replacement = tail
                .iter()
                .position(|&rest_lit| !ctx.part(AssignmentP).lit_is_false(rest_lit))
                .map(|offset| 2 + offset);

            if let Some(pos) = replacement {
                let rest_lit = {
                    let alloc = ctx.part_mut(ClauseAllocP);
                    let lits = alloc.clause_mut(cref).lits_mut();
                    let rest_lit = lits[pos];
                    lits[1] = rest_lit;
                    lits[pos] = false_lit;
                    rest_lit
                };

                // Moving the watch to !rest_lit's list is always safe here: it can never be `lit`,
                // as `rest_lit` was picked from the unwatched tail of the clause and `lit` (via
                // `false_lit`) was just written into that slot.
                debug_assert_ne!(!rest_lit, lit);
                ctx.part_mut(WatchlistsP).add_watch(!rest_lit, new_watch);
                continue 'watchers;
            }

            *watch = new_watch;

            if ctx.part(AssignmentP).lit_is_false(first) {
                conflict = Some(cref);
                break;
            }

            enqueue_assignment(ctx.borrow(), first, Reason::Long(cref));
        }
    }

    ctx.part_mut(WatchlistsP).put_watches(lit, watches);

    match conflict {
        Some(cref) => Err(Conflict::Long(cref)),
        None => Ok(()),
    }
}
