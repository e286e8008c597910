//! Storage for binary clauses.
//!
//! Binary clauses never enter the clause arena. Each is represented purely as a pair of entries in
//! per-literal implication lists: the list for `¬a` records `b` and vice versa. This is exactly a
//! watch list specialized to binary clauses, where the "blocking literal" is the only other
//! literal and no clause reference is ever needed on propagation.
use cdclsat_formula::Lit;

#[derive(Default)]
pub struct BinaryClauses {
    by_lit: Vec<Vec<Lit>>,
    count: usize,
}

impl BinaryClauses {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.by_lit.resize(count * 2, vec![]);
    }

    /// Add a binary clause.
    pub fn add_binary_clause(&mut self, lits: [Lit; 2]) {
        for i in 0..2 {
            self.by_lit[(!lits[i]).code()].push(lits[i ^ 1]);
        }
        self.count += 1;
    }

    /// Implications of a given literal.
    pub fn implied(&self, lit: Lit) -> &[Lit] {
        &self.by_lit[lit.code()]
    }

    /// Number of binary clauses.
    pub fn count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implied_literals_are_symmetric() {
        let mut binaries = BinaryClauses::default();
        binaries.set_var_count(4);

        let a = Lit::from_dimacs(1);
        let b = Lit::from_dimacs(-2);

        binaries.add_binary_clause([a, b]);

        assert_eq!(binaries.implied(!a), &[b]);
        assert_eq!(binaries.implied(!b), &[a]);
        assert_eq!(binaries.count(), 1);
    }
}
