//! End-to-end tests driving the solver through its public API with small DIMACS instances.
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use cdclsat::solver::Solver;
use cdclsat_formula::Lit;
use cdclsat_proof::{ProofStep, Tracer};

struct CountingTracer {
    adds: usize,
    concluded_unsat: bool,
}

impl Tracer for CountingTracer {
    fn trace(&mut self, step: &ProofStep) {
        match step {
            ProofStep::AddInput { .. } | ProofStep::AddDerived { .. } | ProofStep::AddUnit { .. } => {
                self.adds += 1;
            }
            ProofStep::ConcludeUnsat => self.concluded_unsat = true,
            _ => {}
        }
    }
}

struct SharedCountingTracer(Rc<RefCell<CountingTracer>>);

impl Tracer for SharedCountingTracer {
    fn trace(&mut self, step: &ProofStep) {
        self.0.borrow_mut().trace(step);
    }
}

fn solve_dimacs(dimacs: &str) -> (Solver, Option<bool>) {
    let mut solver = Solver::new();
    solver
        .add_dimacs_cnf(dimacs.as_bytes())
        .expect("parsing failed");
    let result = solver.solve();
    (solver, result)
}

#[test]
fn small_satisfiable_instance_has_a_consistent_model() {
    let (solver, result) = solve_dimacs(
        "p cnf 2 3\n\
         1 2 0\n\
         -1 2 0\n\
         1 -2 0\n",
    );

    assert_eq!(result, Some(true));
    assert_eq!(solver.value(2).unwrap(), true);
}

#[test]
fn small_unsatisfiable_instance_concludes_unsat_exactly_once() {
    let tracer = Rc::new(RefCell::new(CountingTracer {
        adds: 0,
        concluded_unsat: false,
    }));

    let mut solver = Solver::new();
    solver.connect_proof(Box::new(SharedCountingTracer(tracer.clone())));
    solver
        .add_dimacs_cnf(
            "p cnf 2 4\n\
             1 2 0\n\
             1 -2 0\n\
             -1 2 0\n\
             -1 -2 0\n"
                .as_bytes(),
        )
        .expect("parsing failed");

    assert_eq!(solver.solve(), Some(false));
    assert!(tracer.borrow().concluded_unsat);
}

#[test]
fn clashing_root_level_units_are_unsat_without_entering_search() {
    let (_solver, result) = solve_dimacs(
        "p cnf 1 2\n\
         1 0\n\
         -1 0\n",
    );

    assert_eq!(result, Some(false));
}

#[test]
fn pigeonhole_three_into_two_is_unsat() {
    // Pigeon p is in hole h: variable (p - 1) * 2 + h, for p in 1..=3, h in 1..=2.
    let dimacs = "p cnf 6 9\n\
                  1 2 0\n\
                  3 4 0\n\
                  5 6 0\n\
                  -1 -3 0\n\
                  -1 -5 0\n\
                  -3 -5 0\n\
                  -2 -4 0\n\
                  -2 -6 0\n\
                  -4 -6 0\n";

    let tracer = Rc::new(RefCell::new(CountingTracer {
        adds: 0,
        concluded_unsat: false,
    }));

    let mut solver = Solver::new();
    solver.connect_proof(Box::new(SharedCountingTracer(tracer.clone())));
    solver
        .add_dimacs_cnf(dimacs.as_bytes())
        .expect("parsing failed");

    assert_eq!(solver.solve(), Some(false));
    assert!(tracer.borrow().adds >= 9);
    assert!(tracer.borrow().concluded_unsat);
}

#[test]
fn xor_chain_is_unsat_via_pure_binary_propagation() {
    // (a xor b), (b xor c), (a xor c) has no solution: encoded as 3 pairs of binary clauses.
    let dimacs = "p cnf 3 6\n\
                  1 2 0\n\
                  -1 -2 0\n\
                  2 3 0\n\
                  -2 -3 0\n\
                  1 -3 0\n\
                  -1 3 0\n";

    let (_solver, result) = solve_dimacs(dimacs);

    assert_eq!(result, Some(false));
}

#[test]
fn disconnecting_the_proof_tracer_stops_further_events() {
    let tracer = Rc::new(RefCell::new(CountingTracer {
        adds: 0,
        concluded_unsat: false,
    }));

    let mut solver = Solver::new();
    solver.connect_proof(Box::new(SharedCountingTracer(tracer.clone())));
    solver
        .add_dimacs_cnf("p cnf 1 1\n1 0\n".as_bytes())
        .expect("parsing failed");
    assert_eq!(tracer.borrow().adds, 1);

    solver.disconnect_proof();
    solver
        .add_dimacs_cnf("p cnf 2 1\n2 0\n".as_bytes())
        .expect("parsing failed");

    assert_eq!(tracer.borrow().adds, 1);
}

#[test]
fn model_satisfies_every_clause_of_a_larger_instance() {
    let dimacs = "p cnf 5 6\n\
                  1 2 3 0\n\
                  -1 2 4 0\n\
                  1 -2 5 0\n\
                  -3 -4 5 0\n\
                  3 4 -5 0\n\
                  -1 -2 -3 -4 -5 0\n";

    let mut solver = Solver::new();
    solver
        .add_dimacs_cnf(dimacs.as_bytes())
        .expect("parsing failed");

    assert_eq!(solver.solve(), Some(true));

    let model: HashSet<Lit> = solver.model().unwrap().into_iter().collect();

    let clauses: &[&[isize]] = &[
        &[1, 2, 3],
        &[-1, 2, 4],
        &[1, -2, 5],
        &[-3, -4, 5],
        &[3, 4, -5],
        &[-1, -2, -3, -4, -5],
    ];

    for clause in clauses {
        assert!(clause
            .iter()
            .any(|&lit| model.contains(&Lit::from_dimacs(lit))));
    }
}
