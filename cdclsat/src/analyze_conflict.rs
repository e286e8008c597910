//! Learns a new clause by analyzing a conflict.
use std::mem::swap;

use partial_ref::{partial, PartialRef};

use cdclsat_formula::{Lit, Var};

use crate::clause::ClauseAlloc;
use crate::context::{
    AnalyzeConflictP, AssignmentP, ClauseAllocP, Context, ImplGraphP, SolverConfigP, TmpDataP,
    TrailP, VmtfP,
};
use crate::glue::compute_glue;
use crate::prop::{Conflict, ImplGraph, Reason};

/// Marks a variable's status during depth-bounded clause minimization.
///
/// Kept separate from the `var_flags` used to track clause membership during resolution: a
/// variable can be a member of the clause (or touched while resolving it) without yet having an
/// answer to "is it redundant", and minimization needs to cache that answer across literals
/// without disturbing the resolution bookkeeping.
#[derive(Copy, Clone, PartialEq, Eq)]
enum Poison {
    Unknown,
    Removable,
    Needed,
}

/// Temporaries for conflict analysis.
pub struct AnalyzeConflict {
    /// The learned clause after analysis finishes.
    clause: Vec<Lit>,
    /// Number of literals of the current clause at the conflict's decision level.
    current_level_count: usize,
    /// Set for every variable currently in `clause`, or touched while resolving it.
    var_flags: Vec<bool>,
    /// Entries to clean in `var_flags`.
    to_clean: Vec<Var>,
    /// Minimization status, indexed by variable. Reset to `Unknown` after every analysis.
    poison: Vec<Poison>,
    /// Entries to clean in `poison`.
    poison_touched: Vec<Var>,
}

impl Default for AnalyzeConflict {
    fn default() -> AnalyzeConflict {
        AnalyzeConflict {
            clause: vec![],
            current_level_count: 0,
            var_flags: vec![],
            to_clean: vec![],
            poison: vec![],
            poison_touched: vec![],
        }
    }
}

impl AnalyzeConflict {
    /// Update structures for a new variable count.
    pub fn set_var_count(&mut self, count: usize) {
        self.var_flags.resize(count, false);
        self.poison.resize(count, Poison::Unknown);
    }

    /// The learned clause. The asserting (first-UIP) literal is at index 0, and, when there is
    /// more than one literal, the one with the highest decision level besides the UIP is at
    /// index 1.
    pub fn clause(&self) -> &[Lit] {
        &self.clause
    }
}

/// Literals of a reason or conflict. Binary ones own their (small, copy) literal array so both
/// cases share the same iteration code without touching the clause arena for binary clauses.
enum Antecedent {
    Binary([Lit; 1]),
    Conflict([Lit; 2]),
    Long(Vec<Lit>),
    Unit,
}

impl Antecedent {
    fn lits(&self) -> &[Lit] {
        match self {
            Antecedent::Binary(lits) => lits,
            Antecedent::Conflict(lits) => lits,
            Antecedent::Long(lits) => lits,
            Antecedent::Unit => &[],
        }
    }
}

fn conflict_antecedent(conflict: Conflict, clause_alloc: &ClauseAlloc) -> Antecedent {
    match conflict {
        Conflict::Binary(lits) => Antecedent::Conflict(lits),
        Conflict::Long(cref) => Antecedent::Long(clause_alloc.clause(cref).lits().to_vec()),
    }
}

/// The antecedent literals of a reason, i.e. the clause's literals excluding the one it made
/// true (which sits at index 0 for long clauses).
fn reason_antecedent(reason: Reason, clause_alloc: &ClauseAlloc) -> Antecedent {
    match reason {
        Reason::Unit => Antecedent::Unit,
        Reason::Binary(lits) => Antecedent::Binary(lits),
        Reason::Long(cref) => Antecedent::Long(clause_alloc.clause(cref).lits()[1..].to_vec()),
    }
}

/// Learns a new clause by analyzing a conflict.
///
/// Implements the standard first-UIP scheme: starting from the falsified clause, repeatedly
/// resolve away the most recently assigned literal of the conflict's decision level, walking the
/// trail back to front to find resolution candidates in assignment order, until exactly one such
/// literal remains.
///
/// Returns the decision level to backtrack to before asserting the learned clause, together with
/// its glue (the number of distinct decision levels among its literals).
pub fn analyze_conflict(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut ClauseAllocP,
        mut TmpDataP,
        mut VmtfP,
        AssignmentP,
        ImplGraphP,
        SolverConfigP,
        TrailP,
    ),
    conflict: Conflict,
    conflict_index: u32,
) -> (usize, usize) {
    {
        let analyze = ctx.part_mut(AnalyzeConflictP);
        analyze.clause.clear();
        analyze.current_level_count = 0;
    }

    if ctx.part(TrailP).current_level() == 0 {
        // Conflict with no decisions: the formula is unsatisfiable, learn the empty clause.
        return (0, 0);
    }

    let (clause_alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let antecedent = conflict_antecedent(conflict, clause_alloc);
    for &lit in antecedent.lits() {
        add_literal(ctx.borrow(), lit);
    }

    // Resolve away literals of the conflict's decision level in reverse chronological order,
    // bumping each reason clause's `resolved_stamp` as it is consumed, until one remains.
    let mut index = ctx.part(TrailP).trail().len();

    loop {
        index -= 1;
        let lit = ctx.part(TrailP).trail()[index];

        let (analyze, mut ctx_rest) = ctx.split_part_mut(AnalyzeConflictP);
        let lit_present = &mut analyze.var_flags[lit.index()];
        if !*lit_present {
            continue;
        }
        *lit_present = false;
        analyze.current_level_count -= 1;

        if analyze.current_level_count == 0 {
            analyze.clause.push(!lit);
            let end = analyze.clause.len() - 1;
            analyze.clause.swap(0, end);
            ctx = ctx_rest;
            break;
        }

        let (impl_graph, mut ctx_rest2) = ctx_rest.split_part(ImplGraphP);
        let reason = *impl_graph.reason(lit.var());

        let (clause_alloc, mut ctx_rest3) = ctx_rest2.split_part_mut(ClauseAllocP);
        let (config, mut ctx_rest4) = ctx_rest3.split_part(SolverConfigP);
        bump_resolved_reason(clause_alloc, reason, config, conflict_index);
        let antecedent = reason_antecedent(reason, clause_alloc);

        for &reason_lit in antecedent.lits() {
            add_literal(ctx_rest4.borrow(), reason_lit);
        }

        ctx = ctx_rest4;
    }

    // This needs `var_flags` set and keeps some of them set (the literals of the minimized
    // clause), cleaning the rest via `to_clean`.
    minimize_clause(ctx.borrow());

    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    for var in analyze.to_clean.drain(..) {
        analyze.var_flags[var.index()] = false;
    }

    // Find the highest-level literal besides the asserted one and move it to position 1, so the
    // clause installer can watch the two highest-level literals.
    let mut backtrack_to = 0;

    if analyze.clause.len() > 1 {
        let (prefix, rest) = analyze.clause.split_at_mut(2);
        let lit_1 = &mut prefix[1];
        backtrack_to = ctx.part(ImplGraphP).level(lit_1.var());
        for lit in rest.iter_mut() {
            let lit_level = ctx.part(ImplGraphP).level(lit.var());
            if lit_level > backtrack_to {
                backtrack_to = lit_level;
                swap(lit_1, lit);
            }
        }
    }

    let glue = compute_glue(ctx.borrow(), &analyze.clause);

    bump_vmtf(ctx.borrow());

    (backtrack_to, glue)
}

/// Add a literal to the current clause.
fn add_literal(
    mut ctx: partial!(Context, mut AnalyzeConflictP, ImplGraphP, TrailP),
    lit: Lit,
) {
    let (analyze, ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let lit_level = ctx.part(ImplGraphP).level(lit.var());
    // No need to add literals that are set by unit clauses or already present.
    if lit_level > 0 && !analyze.var_flags[lit.index()] {
        analyze.var_flags[lit.index()] = true;
        analyze.to_clean.push(lit.var());
        if lit_level == ctx.part(TrailP).current_level() {
            analyze.current_level_count += 1;
        } else {
            analyze.clause.push(lit);
        }
    }
}

fn bump_resolved_reason(
    clause_alloc: &mut ClauseAlloc,
    reason: Reason,
    config: &crate::config::SolverConfig,
    conflict_index: u32,
) {
    if let Reason::Long(cref) = reason {
        let header = clause_alloc.header_mut(cref);
        if header.redundant() && header.len() > config.keep_size && header.glue() > config.keep_glue
        {
            header.set_resolved_stamp(conflict_index);
        }
    }
}

/// Bump every variable touched while building or minimizing the learned clause.
///
/// Variables are moved to the front of the VMTF queue ordered ascending by `bumped + trail_pos`,
/// so their relative order is preserved while all of them become more recent than any variable
/// untouched by this conflict.
fn bump_vmtf(mut ctx: partial!(Context, mut AnalyzeConflictP, mut VmtfP, ImplGraphP)) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let impl_graph = ctx.part(ImplGraphP);

    let mut touched: Vec<Var> = analyze.to_clean.clone();
    let vmtf = ctx.part(VmtfP);
    touched.sort_by_key(|&v| vmtf.bumped(v) + impl_graph.trail_pos(v) as u64);

    let vmtf = ctx.part_mut(VmtfP);
    for var in touched {
        vmtf.move_to_front(var);
    }
}

/// Depth-bounded check of whether `var`'s assignment is implied by literals already present in
/// the clause (`var_flags`) or by other variables already proven redundant.
fn is_redundant(
    var: Var,
    depth: usize,
    max_depth: usize,
    clause_alloc: &ClauseAlloc,
    impl_graph: &ImplGraph,
    var_flags: &[bool],
    poison: &mut [Poison],
    touched: &mut Vec<Var>,
) -> bool {
    match poison[var.index()] {
        Poison::Removable => return true,
        Poison::Needed => return false,
        Poison::Unknown => {}
    }

    if depth >= max_depth {
        return false;
    }

    let reason = *impl_graph.reason(var);
    if let Reason::Unit = reason {
        poison[var.index()] = Poison::Needed;
        touched.push(var);
        return false;
    }

    let antecedent = reason_antecedent(reason, clause_alloc);
    for &lit in antecedent.lits() {
        let v = lit.var();
        if var_flags[v.index()] || impl_graph.level(v) == 0 {
            continue;
        }
        if !is_redundant(
            v,
            depth + 1,
            max_depth,
            clause_alloc,
            impl_graph,
            var_flags,
            poison,
            touched,
        ) {
            poison[var.index()] = Poison::Needed;
            touched.push(var);
            return false;
        }
    }

    poison[var.index()] = Poison::Removable;
    touched.push(var);
    true
}

/// Performs depth-bounded self-subsuming clause minimization.
///
/// For each literal apart from the asserting one, this checks whether its assignment is already
/// implied by the rest of the clause by walking backwards through the implication graph (up to
/// `minimize_max_depth` steps), removing it if so.
///
/// **Note:** requires `AnalyzeConflict::var_flags` to be set for exactly the variables of the
/// unminimized clause. Leaves additional entries set, listed in `to_clean`.
fn minimize_clause(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        ClauseAllocP,
        ImplGraphP,
        SolverConfigP,
    ),
) {
    let (analyze, mut ctx) = ctx.split_part_mut(AnalyzeConflictP);
    let clause_alloc = ctx.part(ClauseAllocP);
    let impl_graph = ctx.part(ImplGraphP);
    let max_depth = ctx.part(SolverConfigP).minimize_max_depth;

    let mut keep = vec![true; analyze.clause.len()];

    for i in 1..analyze.clause.len() {
        let lit = analyze.clause[i];
        if *impl_graph.reason(lit.var()) == Reason::Unit {
            continue;
        }

        let antecedent = reason_antecedent(*impl_graph.reason(lit.var()), clause_alloc);
        let mut removable = true;
        for &reason_lit in antecedent.lits() {
            let v = reason_lit.var();
            if analyze.var_flags[v.index()] || impl_graph.level(v) == 0 {
                continue;
            }
            if !is_redundant(
                v,
                1,
                max_depth,
                clause_alloc,
                impl_graph,
                &analyze.var_flags,
                &mut analyze.poison,
                &mut analyze.poison_touched,
            ) {
                removable = false;
                break;
            }
        }
        keep[i] = !removable;
    }

    for &v in &analyze.poison_touched {
        analyze.poison[v.index()] = Poison::Unknown;
    }
    analyze.poison_touched.clear();

    let mut kept = Vec::with_capacity(analyze.clause.len());
    for (i, &lit) in analyze.clause.iter().enumerate() {
        if keep[i] {
            kept.push(lit);
        }
    }
    analyze.clause = kept;
}
