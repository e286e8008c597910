//! Model reconstruction once the search reaches a satisfying assignment.
use partial_ref::{partial, PartialRef};

use cdclsat_formula::Lit;

use crate::context::{AssignmentP, Context, ModelP};

/// The satisfying assignment found by the search, indexed by variable.
#[derive(Default)]
pub struct Model {
    assignment: Vec<Option<bool>>,
}

impl Model {
    /// The model's assignment.
    ///
    /// Only valid once the solver state is [`SatState::Sat`](crate::state::SatState::Sat).
    pub fn assignment(&self) -> &[Option<bool>] {
        &self.assignment
    }

    /// Whether a literal is true in the model.
    ///
    /// Only valid once the solver state is [`SatState::Sat`](crate::state::SatState::Sat).
    pub fn lit_is_true(&self, lit: Lit) -> bool {
        self.assignment[lit.index()] == Some(lit.is_positive())
    }
}

/// Copy the current (complete) assignment into the model.
pub fn extract_model(mut ctx: partial!(Context, mut ModelP, AssignmentP)) {
    let assignment = ctx.part(AssignmentP).assignment().to_vec();
    ctx.part_mut(ModelP).assignment = assignment;
}
