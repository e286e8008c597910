//! Connects the solver core to an optional [`cdclsat_proof::Tracer`].
//!
//! Clause identifiers are assigned here rather than stored in [`crate::clause::ClauseHeader`], to
//! avoid growing the header for a feature most callers never use. The counter advances whenever a
//! clause is added regardless of whether a tracer is attached, so ids stay consistent if a tracer
//! is connected partway through a run.
use cdclsat_formula::Lit;
use cdclsat_proof::{ClauseId, ProofStep, Tracer};

/// Holds the (optional) attached tracer and the next clause id to hand out.
#[derive(Default)]
pub struct Proof {
    tracer: Option<Box<dyn Tracer>>,
    next_id: ClauseId,
}

impl Proof {
    /// Attach a tracer, replacing any previously connected one.
    pub fn connect(&mut self, tracer: Box<dyn Tracer>) {
        self.tracer = Some(tracer);
    }

    /// Detach the current tracer, if any.
    pub fn disconnect(&mut self) {
        self.tracer = None;
    }

    pub fn is_connected(&self) -> bool {
        self.tracer.is_some()
    }

    fn next_id(&mut self) -> ClauseId {
        self.next_id += 1;
        self.next_id
    }

    fn trace(&mut self, step: ProofStep) {
        if let Some(tracer) = &mut self.tracer {
            tracer.trace(&step);
        }
    }

    /// Record an original clause read from the input. Returns its assigned id.
    pub fn add_input_clause(&mut self, clause: &[Lit]) -> ClauseId {
        let id = self.next_id();
        self.trace(ProofStep::AddInput { id, clause });
        id
    }

    /// Record a learned clause. Returns its assigned id.
    pub fn add_derived_clause(&mut self, clause: &[Lit]) -> ClauseId {
        let id = self.next_id();
        self.trace(ProofStep::AddDerived { id, clause });
        id
    }

    /// Record a root-level unit assignment. Returns its assigned id.
    pub fn add_unit_clause(&mut self, lit: Lit) -> ClauseId {
        let id = self.next_id();
        self.trace(ProofStep::AddUnit { id, lit });
        id
    }

    /// Record that a clause was removed from the arena.
    pub fn delete_clause(&mut self, id: ClauseId, clause: &[Lit]) {
        self.trace(ProofStep::Delete { id, clause });
    }

    /// Record that a clause had root-false literals flushed from its body.
    pub fn strengthen_clause(&mut self, id: ClauseId, remaining: &[Lit]) {
        self.trace(ProofStep::Strengthen { id, remaining });
    }

    /// Record that the empty clause was derived.
    pub fn conclude_unsat(&mut self) {
        self.trace(ProofStep::ConcludeUnsat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdclsat_proof::RecordingTracer;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SharedTracer(Rc<RefCell<RecordingTracer>>);

    impl Tracer for SharedTracer {
        fn trace(&mut self, step: &ProofStep) {
            self.0.borrow_mut().trace(step);
        }
    }

    #[test]
    fn ids_increase_even_without_a_tracer() {
        let mut proof = Proof::default();
        let clause = [Lit::from_dimacs(1)];
        let id_1 = proof.add_input_clause(&clause);
        let id_2 = proof.add_input_clause(&clause);
        assert_eq!(id_2, id_1 + 1);
    }

    #[test]
    fn connected_tracer_observes_events() {
        let recording = Rc::new(RefCell::new(RecordingTracer::default()));
        let mut proof = Proof::default();
        proof.connect(Box::new(SharedTracer(recording.clone())));

        let clause = [Lit::from_dimacs(1), Lit::from_dimacs(-2)];
        proof.add_input_clause(&clause);
        proof.conclude_unsat();

        assert_eq!(recording.borrow().steps.len(), 2);
    }
}
