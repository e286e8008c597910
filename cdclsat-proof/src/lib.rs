//! Proof event interface emitted by the cdclsat core.
//!
//! This crate only defines the event stream and an identifier scheme for clauses; it does not
//! write any particular proof format. A `Tracer` can be attached to a solver to observe the
//! events listed below and translate them into DRAT, LRAT or any other clausal proof format. No
//! such translation is implemented here.

use cdclsat_formula::Lit;

/// Identifier assigned to a clause when it is added to the proof.
///
/// Identifiers are monotonically increasing starting at 1 and are assigned by the clause arena at
/// creation time, independent of whether a tracer is attached.
pub type ClauseId = u64;

/// A single event in the proof trace.
///
/// Events are emitted in the order described in the crate-level documentation: all input clauses
/// first, then per learned clause `Delete*` (from a reduction pass, if any) followed by
/// `AddDerived`, an optional `AddUnit`, and so on, with at most one `ConcludeUnsat`.
#[derive(Copy, Clone, Debug)]
pub enum ProofStep<'a> {
    /// An original (irredundant) clause read from the input.
    AddInput {
        id: ClauseId,
        clause: &'a [Lit],
    },
    /// A learned (redundant) clause, emitted before it is used as a reason.
    AddDerived {
        id: ClauseId,
        clause: &'a [Lit],
    },
    /// A root-level (decision level 0) unit assignment.
    AddUnit {
        id: ClauseId,
        lit: Lit,
    },
    /// A clause was removed from the arena during garbage collection.
    Delete {
        id: ClauseId,
        clause: &'a [Lit],
    },
    /// A clause had root-false literals flushed from its body during reduction.
    ///
    /// `remaining` holds the clause's literals after flushing.
    Strengthen {
        id: ClauseId,
        remaining: &'a [Lit],
    },
    /// The empty clause was derived; the formula is unsatisfiable.
    ///
    /// Emitted at most once, and only once `AddDerived`/`AddUnit` for the clauses that produced it
    /// have already been emitted.
    ConcludeUnsat,
}

/// Capability set implemented by a proof sink.
///
/// A solver connects at most one tracer at a time. The default implementations make every method
/// optional: a tracer interested only in a subset of events can override just those.
pub trait Tracer {
    fn add_input(&mut self, _id: ClauseId, _clause: &[Lit]) {}
    fn add_derived(&mut self, _id: ClauseId, _clause: &[Lit]) {}
    fn add_unit(&mut self, _id: ClauseId, _lit: Lit) {}
    fn delete(&mut self, _id: ClauseId, _clause: &[Lit]) {}
    fn strengthen(&mut self, _id: ClauseId, _remaining: &[Lit]) {}
    fn conclude_unsat(&mut self) {}

    /// Dispatches a [`ProofStep`] to the matching method.
    ///
    /// Implementations normally don't need to override this.
    fn trace(&mut self, step: &ProofStep) {
        match *step {
            ProofStep::AddInput { id, clause } => self.add_input(id, clause),
            ProofStep::AddDerived { id, clause } => self.add_derived(id, clause),
            ProofStep::AddUnit { id, lit } => self.add_unit(id, lit),
            ProofStep::Delete { id, clause } => self.delete(id, clause),
            ProofStep::Strengthen { id, remaining } => self.strengthen(id, remaining),
            ProofStep::ConcludeUnsat => self.conclude_unsat(),
        }
    }
}

/// A [`Tracer`] that records every event, useful for tests and for feeding an external writer.
#[derive(Default)]
pub struct RecordingTracer {
    pub steps: Vec<OwnedProofStep>,
}

/// Owned counterpart of [`ProofStep`] for storage beyond the lifetime of a single call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnedProofStep {
    AddInput { id: ClauseId, clause: Vec<Lit> },
    AddDerived { id: ClauseId, clause: Vec<Lit> },
    AddUnit { id: ClauseId, lit: Lit },
    Delete { id: ClauseId, clause: Vec<Lit> },
    Strengthen { id: ClauseId, remaining: Vec<Lit> },
    ConcludeUnsat,
}

impl Tracer for RecordingTracer {
    fn add_input(&mut self, id: ClauseId, clause: &[Lit]) {
        self.steps.push(OwnedProofStep::AddInput {
            id,
            clause: clause.to_vec(),
        });
    }

    fn add_derived(&mut self, id: ClauseId, clause: &[Lit]) {
        self.steps.push(OwnedProofStep::AddDerived {
            id,
            clause: clause.to_vec(),
        });
    }

    fn add_unit(&mut self, id: ClauseId, lit: Lit) {
        self.steps.push(OwnedProofStep::AddUnit { id, lit });
    }

    fn delete(&mut self, id: ClauseId, clause: &[Lit]) {
        self.steps.push(OwnedProofStep::Delete {
            id,
            clause: clause.to_vec(),
        });
    }

    fn strengthen(&mut self, id: ClauseId, remaining: &[Lit]) {
        self.steps.push(OwnedProofStep::Strengthen {
            id,
            remaining: remaining.to_vec(),
        });
    }

    fn conclude_unsat(&mut self) {
        self.steps.push(OwnedProofStep::ConcludeUnsat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_dispatches_to_matching_method() {
        let mut tracer = RecordingTracer::default();
        let clause = [Lit::from_dimacs(1), Lit::from_dimacs(-2)];

        tracer.trace(&ProofStep::AddInput { id: 1, clause: &clause });
        tracer.trace(&ProofStep::ConcludeUnsat);

        assert_eq!(
            tracer.steps,
            vec![
                OwnedProofStep::AddInput { id: 1, clause: clause.to_vec() },
                OwnedProofStep::ConcludeUnsat,
            ]
        );
    }
}
