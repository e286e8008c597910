//! Boolean satisfiability solver.
use std::io;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use log::info;

use cdclsat_dimacs::DimacsParser;
use cdclsat_formula::{CnfFormula, Lit, Var};
use cdclsat_proof::Tracer;

use crate::cdcl::search_step;
use crate::context::{ensure_var_count, AssignmentP, Context, ModelP, ProofP, SolverStateP};
use crate::error::SolverError;
use crate::load::load_clause;
use crate::state::SatState;

/// A boolean satisfiability solver.
///
/// Owns all solver state; nothing here is shared across threads, and nothing suspends mid-search
/// (see the crate's concurrency notes in [`crate::cdcl`]).
#[derive(Default)]
pub struct Solver {
    ctx: Box<Context>,
    initialized: bool,
    terminator: Option<Box<dyn FnMut() -> bool>>,
}

impl Solver {
    /// Create a new solver with no variables and no clauses.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Fix the number of variables the solver will accept.
    ///
    /// Fails if called more than once. Using [`add_formula`](Solver::add_formula) or
    /// [`add_dimacs_cnf`](Solver::add_dimacs_cnf) instead grows the variable count automatically
    /// and does not require this call.
    pub fn init(&mut self, num_vars: usize) -> Result<(), SolverError> {
        if self.initialized {
            return Err(SolverError::InvalidState("init called more than once"));
        }
        self.initialized = true;
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), num_vars);
        Ok(())
    }

    fn var_count(&self) -> usize {
        let ctx = self.ctx.into_partial_ref();
        ctx.part(AssignmentP).assignment().len()
    }

    /// Add a single clause given as signed, nonzero DIMACS literals.
    ///
    /// Every literal's magnitude must be within the solver's variable count, set by
    /// [`init`](Solver::init) or a prior call to [`add_formula`](Solver::add_formula).
    pub fn add_clause(&mut self, literals: &[isize]) -> Result<(), SolverError> {
        let var_count = self.var_count();

        let mut lits = Vec::with_capacity(literals.len());
        for &lit in literals {
            if lit == 0 || lit.unsigned_abs() > var_count {
                return Err(SolverError::InvalidLiteral { lit, var_count });
            }
            lits.push(Lit::from_dimacs(lit));
        }

        let mut ctx = self.ctx.into_partial_ref_mut();
        load_clause(ctx.borrow(), &lits);
        Ok(())
    }

    /// Add a formula to the solver, growing the variable count to fit it.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        self.initialized = true;
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), formula.var_count());
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`].
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), SolverError> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = DimacsParser::new();

        loop {
            let data = buffer.fill_buf()?;
            if data.is_empty() {
                break;
            }
            parser.parse_chunk(data)?;
            let len = data.len();
            buffer.consume(len);

            self.add_formula(&parser.take_formula());
        }
        parser.eof()?;
        self.add_formula(&parser.take_formula());
        parser.check_header()?;

        info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Attach a proof tracer, replacing any previously connected one.
    pub fn connect_proof(&mut self, tracer: Box<dyn Tracer>) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(ProofP).connect(tracer);
    }

    /// Detach the currently connected proof tracer, if any.
    pub fn disconnect_proof(&mut self) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(ProofP).disconnect();
    }

    /// Install a predicate polled once between search steps; once it returns `true`,
    /// [`solve`](Solver::solve) stops and returns `None` without touching the solver's
    /// satisfiability state, leaving it usable for further search.
    pub fn set_terminator(&mut self, terminator: impl FnMut() -> bool + 'static) {
        self.terminator = Some(Box::new(terminator));
    }

    /// Remove any installed terminator.
    pub fn clear_terminator(&mut self) {
        self.terminator = None;
    }

    /// Check the satisfiability of the current formula.
    ///
    /// Returns `Some(true)` if satisfiable, `Some(false)` if unsatisfiable, or `None` if a
    /// connected terminator requested a stop before a result was reached.
    pub fn solve(&mut self) -> Option<bool> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        loop {
            if ctx.part(SolverStateP).sat_state != SatState::Unknown {
                break;
            }

            if let Some(terminator) = &mut self.terminator {
                if terminator() {
                    return None;
                }
            }

            search_step(ctx.borrow());
        }

        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => None,
            SatState::Sat => Some(true),
            SatState::Unsat => Some(false),
        }
    }

    /// Value of a single literal in the model found by a prior `Some(true)` result of
    /// [`solve`](Solver::solve).
    pub fn value(&self, lit: isize) -> Result<bool, SolverError> {
        let ctx = self.ctx.into_partial_ref();

        if ctx.part(SolverStateP).sat_state != SatState::Sat {
            return Err(SolverError::InvalidState(
                "value is only valid once solve() returned Some(true)",
            ));
        }

        let var_count = ctx.part(AssignmentP).assignment().len();
        if lit == 0 || lit.unsigned_abs() > var_count {
            return Err(SolverError::InvalidLiteral { lit, var_count });
        }

        Ok(ctx.part(ModelP).lit_is_true(Lit::from_dimacs(lit)))
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only `Some` once [`solve`](Solver::solve) has returned `Some(true)`.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(ModelP)
                    .assignment()
                    .iter()
                    .enumerate()
                    .flat_map(|(index, assignment)| {
                        assignment.map(|polarity| Var::from_index(index).lit(polarity))
                    })
                    .collect(),
            )
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use cdclsat_dimacs::write_dimacs;
    use cdclsat_formula::CnfFormula;

    use crate::test::{sat_formula, sgen_unsat_formula};

    #[test]
    fn init_twice_is_rejected() {
        let mut solver = Solver::new();
        solver.init(4).unwrap();
        assert!(matches!(
            solver.init(4),
            Err(SolverError::InvalidState(_))
        ));
    }

    #[test]
    fn invalid_literal_is_rejected() {
        let mut solver = Solver::new();
        solver.init(2).unwrap();
        assert!(matches!(
            solver.add_clause(&[0]),
            Err(SolverError::InvalidLiteral { .. })
        ));
        assert!(matches!(
            solver.add_clause(&[3]),
            Err(SolverError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn value_before_sat_is_invalid_state() {
        let mut solver = Solver::new();
        solver.init(1).unwrap();
        assert!(matches!(
            solver.value(1),
            Err(SolverError::InvalidState(_))
        ));
    }

    #[test]
    fn terminator_stops_search_and_keeps_solver_usable() {
        let mut solver = Solver::new();
        solver.init(3).unwrap();
        solver.add_clause(&[1, 2]).unwrap();
        solver.add_clause(&[-1, 3]).unwrap();
        solver.add_clause(&[-2, -3]).unwrap();

        let mut calls = 0;
        solver.set_terminator(move || {
            calls += 1;
            true
        });

        assert_eq!(solver.solve(), None);

        solver.clear_terminator();
        assert!(solver.solve().is_some());
    }

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(false));
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(), Some(true));

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|lit| model.contains(lit)));
            }
        }

        #[test]
        fn sgen_unsat_incremetal_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_state = Some(true);

            for clause in formula.iter() {
                let single_clause = CnfFormula::from(Some(clause));
                solver.add_formula(&single_clause);

                let state = solver.solve();
                if state != last_state {
                    prop_assert_eq!(state, Some(false));
                    prop_assert_eq!(last_state, Some(true));
                    last_state = state;
                }
            }

            prop_assert_eq!(last_state, Some(false));
        }
    }
}
