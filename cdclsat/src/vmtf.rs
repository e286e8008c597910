//! Variable move-to-front (VMTF) decision queue.
//!
//! All variables live in a single doubly-linked queue at all times, ordered from least to most
//! recently bumped; `bump`/`move_to_front` unlink a variable and relink it at the tail with a fresh
//! timestamp. Deciding walks backwards from a cached `search_hint` towards the head, skipping
//! assigned variables, and the usual case touches only the hint itself: every variable more recent
//! than the hint is assigned, an invariant [`Vmtf::backtrack_unassign`] keeps up to date.
use cdclsat_formula::Var;

use crate::prop::Assignment;

#[derive(Copy, Clone, Default)]
struct Link {
    prev: Option<Var>,
    next: Option<Var>,
}

/// The VMTF decision queue.
#[derive(Default)]
pub struct Vmtf {
    links: Vec<Link>,
    bumped: Vec<u64>,
    head: Option<Var>,
    tail: Option<Var>,
    search_hint: Option<Var>,
    bump_stamp: u64,
}

impl Vmtf {
    /// Update structures for a new variable count, appending newly created variables to the tail.
    pub fn set_var_count(&mut self, count: usize) {
        let old_count = self.links.len();
        if count <= old_count {
            return;
        }

        self.links.resize(count, Link::default());
        self.bumped.resize(count, 0);

        for index in old_count..count {
            let var = Var::from_index(index);
            self.link_at_tail(var);
            self.bumped[var.index()] = self.next_stamp();
        }

        if self.search_hint.is_none() {
            self.search_hint = self.tail;
        }
    }

    fn next_stamp(&mut self) -> u64 {
        self.bump_stamp += 1;
        self.bump_stamp
    }

    fn link_at_tail(&mut self, var: Var) {
        let old_tail = self.tail;
        self.links[var.index()] = Link {
            prev: old_tail,
            next: None,
        };
        if let Some(old_tail) = old_tail {
            self.links[old_tail.index()].next = Some(var);
        } else {
            self.head = Some(var);
        }
        self.tail = Some(var);
    }

    fn unlink(&mut self, var: Var) {
        let Link { prev, next } = self.links[var.index()];
        match prev {
            Some(prev) => self.links[prev.index()].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next.index()].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Bump timestamp of a variable.
    pub fn bumped(&self, var: Var) -> u64 {
        self.bumped[var.index()]
    }

    /// Move a variable to the tail of the queue, making it the most recently bumped one.
    pub fn move_to_front(&mut self, var: Var) {
        self.unlink(var);
        self.link_at_tail(var);
        let stamp = self.next_stamp();
        self.bumped[var.index()] = stamp;
    }

    /// Pick the next unassigned variable to decide on, starting the search at `search_hint`.
    ///
    /// Updates and returns the new hint. Returns `None` if every variable is assigned.
    pub fn next_decision(&mut self, assignment: &Assignment) -> Option<Var> {
        let mut candidate = self.search_hint;

        while let Some(var) = candidate {
            if assignment.var_value(var).is_none() {
                self.search_hint = Some(var);
                return Some(var);
            }
            candidate = self.links[var.index()].prev;
        }

        self.search_hint = None;
        None
    }

    /// Called from [`crate::prop::backtrack`] for every variable that becomes unassigned.
    ///
    /// Restores the invariant that every variable more recently bumped than `search_hint` is
    /// assigned by moving the hint forward to `var` if `var` was bumped more recently.
    pub fn backtrack_unassign(&mut self, var: Var) {
        let hint_bumped = self.search_hint.map_or(0, |hint| self.bumped(hint));
        if self.bumped(var) > hint_bumped {
            self.search_hint = Some(var);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use cdclsat_formula::Var;

    #[test]
    fn decides_most_recently_bumped_first() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(4);

        let mut assignment = Assignment::default();
        assignment.set_var_count(4);

        let v0 = Var::from_index(0);
        let v2 = Var::from_index(2);

        vmtf.move_to_front(v0);

        let decided = vmtf.next_decision(&assignment);
        assert_eq!(decided, Some(v0));

        vmtf.move_to_front(v2);
        let decided = vmtf.next_decision(&assignment);
        assert_eq!(decided, Some(v2));
    }

    #[test]
    fn skips_assigned_variables() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(3);

        let mut assignment = Assignment::default();
        assignment.set_var_count(3);

        let v2 = Var::from_index(2);
        assignment.assign_lit(v2.positive());

        let decided = vmtf.next_decision(&assignment).unwrap();
        assert_ne!(decided, v2);
    }

    #[test]
    fn no_decision_when_all_assigned() {
        let mut vmtf = Vmtf::default();
        vmtf.set_var_count(2);

        let mut assignment = Assignment::default();
        assignment.set_var_count(2);
        assignment.assign_lit(Var::from_index(0).positive());
        assignment.assign_lit(Var::from_index(1).positive());

        assert_eq!(vmtf.next_decision(&assignment), None);
    }
}
