//! This module contains the subsumption table entry: the interpolant and the
//! core memory of a finished subtree, and the check of whether a new path is
//! covered by them.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};

use itertools::Itertools;
use tracing::debug;

use crate::{
    config::Config,
    dependency::{StoreMap, StoredAddress, StoredValue, TokenId},
    expr::{Array, Expr, ExprData},
    ir::ProgramPoint,
    solver::{SatResult, Solver, Validity},
    statistics::Statistics,
    subsumption::simplify,
    tree::NodeId,
};

/// The state of a path that is checked against table entries.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    /// The node that is checked.
    pub node: NodeId,

    /// The path condition of the node, unshadowed.
    pub constraints: &'a [Expr],

    /// The node's memory at concrete addresses.
    pub concrete: &'a StoreMap,

    /// The node's memory at symbolic addresses.
    pub symbolic: &'a StoreMap,
}

/// What a successful subsumption relied on, which has to become part of the
/// interpolant of the subsumed node.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubsumptionProof {
    /// The path constraints that the solver needed.
    pub unsat_core: Vec<Expr>,

    /// The pointers of the candidate that were compared through their bounds,
    /// each with the bounds it had to stay within.
    pub pointer_values: Vec<(TokenId, BTreeSet<Expr>)>,
}

/// A summary of a fully explored subtree rooted at a program point.
#[derive(Clone, Debug)]
pub struct SubsumptionTableEntry {
    program_point: ProgramPoint,
    node:          NodeId,

    /// The core path conditions, over shadow variables. [`None`] if no path
    /// condition was needed.
    interpolant: Option<Expr>,

    /// The shadow variables of the interpolant and stores.
    existentials: BTreeSet<Array>,

    concrete: StoreMap,
    symbolic: StoreMap,
}

impl SubsumptionTableEntry {
    #[must_use]
    pub fn new(
        program_point: ProgramPoint,
        node: NodeId,
        interpolant: Option<Expr>,
        existentials: BTreeSet<Array>,
        concrete: StoreMap,
        symbolic: StoreMap,
    ) -> Self {
        Self {
            program_point,
            node,
            interpolant,
            existentials,
            concrete,
            symbolic,
        }
    }

    #[must_use]
    pub fn program_point(&self) -> ProgramPoint {
        self.program_point
    }

    /// Gets the node that the entry was built from.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn interpolant(&self) -> Option<&Expr> {
        self.interpolant.as_ref()
    }

    #[must_use]
    pub fn existentials(&self) -> &BTreeSet<Array> {
        &self.existentials
    }

    #[must_use]
    pub fn concrete_store(&self) -> &StoreMap {
        &self.concrete
    }

    #[must_use]
    pub fn symbolic_store(&self) -> &StoreMap {
        &self.symbolic
    }

    /// Checks whether the entry constrains nothing, in which case it covers
    /// every path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interpolant.is_none() && self.concrete.is_empty() && self.symbolic.is_empty()
    }

    /// Checks whether `candidate` is covered by this entry, giving the solver
    /// `timeout` per query.
    ///
    /// Returns what the subsumption relied on, or [`None`] if the candidate is
    /// not covered. Solver failures count as not covered.
    pub fn subsumed(
        &self,
        solver: &mut dyn Solver,
        candidate: &Candidate<'_>,
        timeout: Duration,
        config: &Config,
        statistics: &mut Statistics,
    ) -> Option<SubsumptionProof> {
        if self.is_empty() {
            debug!(node = %candidate.node, entry = %self.node, "Subsumed by empty entry");
            return Some(SubsumptionProof::default());
        }

        let mut builder = QueryBuilder {
            uses_bounds: config.uses_bounds(),
            equalities:  vec![],
            pointers:    BTreeMap::new(),
        };
        if let Err(reason) = builder.concrete_terms(&self.concrete, candidate) {
            debug!(node = %candidate.node, entry = %self.node, reason, "Check failed");
            return None;
        }
        builder.symbolic_terms(&self.symbolic, candidate);

        let QueryBuilder {
            equalities,
            pointers,
            ..
        } = builder;
        let pointer_values: Vec<(TokenId, BTreeSet<Expr>)> = pointers.into_iter().collect();
        let succeed = |unsat_core| {
            Some(SubsumptionProof {
                unsat_core,
                pointer_values: pointer_values.clone(),
            })
        };

        let equalities = Expr::conjunction(equalities);
        if self.interpolant.is_none() && equalities.is_none() {
            debug!(node = %candidate.node, entry = %self.node, "Subsumed as the query is empty");
            return succeed(vec![]);
        }
        let interpolant = self.interpolant.clone().unwrap_or_else(Expr::true_);
        let equalities = equalities.unwrap_or_else(Expr::true_);

        let simplified = if self.existentials.is_empty() {
            simplify::Simplified {
                query:  Expr::and(interpolant, equalities),
                closed: false,
            }
        } else {
            simplify::simplify_exists(&self.existentials, &interpolant, &equalities)
        };
        let query = simplified.query;

        if query.is_false() {
            debug!(node = %candidate.node, entry = %self.node, "Check failed as the query is unsatisfiable");
            return None;
        }
        if !simplify::detect_conflict_primitives(candidate.constraints, &query) {
            debug!(node = %candidate.node, entry = %self.node, "Check failed on contradictory equalities");
            return None;
        }
        if query.is_true() {
            debug!(node = %candidate.node, entry = %self.node, "Subsumed as the query is true");
            return succeed(vec![]);
        }

        statistics.solver_calls += 1;
        let start = Instant::now();
        let result = match (simplified.closed, query.data()) {
            (true, ExprData::Exists { body, .. }) => solver
                .check_sat(std::slice::from_ref(body), timeout)
                .map(|sat| if sat == SatResult::Sat { Validity::True } else { Validity::Unknown }),
            _ => solver.evaluate(candidate.constraints, &query, timeout),
        };
        statistics.time.solver += start.elapsed();

        match result {
            Ok(Validity::True) => {
                debug!(node = %candidate.node, entry = %self.node, "Subsumed as the solver decided validity");
                let unsat_core = if simplified.closed { vec![] } else { solver.unsat_core() };
                succeed(unsat_core)
            }
            Ok(validity) => {
                debug!(node = %candidate.node, entry = %self.node, ?validity, "Check failed as the query is not valid");
                None
            }
            Err(error) => {
                statistics.solver_failures += 1;
                debug!(node = %candidate.node, entry = %self.node, %error, "Check failed as the solver gave up");
                None
            }
        }
    }
}

/// Collects the memory constraints of a subsumption query.
struct QueryBuilder {
    uses_bounds: bool,
    equalities:  Vec<Expr>,
    pointers:    BTreeMap<TokenId, BTreeSet<Expr>>,
}

impl QueryBuilder {
    /// Whether `tabled` should be compared with `state` through its bounds
    /// rather than its exact value.
    fn compares_bounds(&self, tabled: &StoredValue, state: &StoredValue) -> bool {
        self.uses_bounds && tabled.is_pointer() && state.is_pointer() && tabled.use_bound() && tabled.has_bounds()
    }

    /// Builds the constraints that every tabled value at a concrete address
    /// imposes on the candidate.
    fn concrete_terms(&mut self, tabled_store: &StoreMap, candidate: &Candidate<'_>) -> Result<(), &'static str> {
        let empty = BTreeMap::new();
        for (site, tabled_map) in tabled_store {
            let state_concrete = candidate.concrete.get(site).unwrap_or(&empty);
            let state_symbolic = candidate.symbolic.get(site).unwrap_or(&empty);
            if state_concrete.is_empty() && state_symbolic.is_empty() {
                return Err("no memory of the allocation in the state");
            }

            for (address, tabled) in tabled_map {
                let state = state_concrete.get(address).ok_or("tabled memory region is not in the state")?;
                if tabled.expression().width() != state.expression().width() {
                    return Err("stored value widths differ");
                }

                if self.compares_bounds(tabled, state) {
                    let mut bounds = BTreeSet::new();
                    let check = tabled.bounds_check(state, &mut bounds);
                    if check.is_false() {
                        return Err("memory bounds check failed");
                    }
                    if !check.is_true() {
                        self.equalities.push(check);
                    }
                    self.pointers.entry(state.token()).or_default().extend(bounds);
                } else {
                    let equality = Expr::eq(tabled.expression().clone(), state.expression().clone());
                    if equality.is_false() {
                        return Err("stored values differ");
                    }
                    if !equality.is_true() {
                        self.equalities.push(equality);
                    }
                }

                self.cross_terms(address, tabled, state_symbolic);
            }
        }
        Ok(())
    }

    /// Builds the constraints that every tabled value at a symbolic address
    /// imposes on the candidate's memory in the same allocation.
    fn symbolic_terms(&mut self, tabled_store: &StoreMap, candidate: &Candidate<'_>) {
        let empty = BTreeMap::new();
        for (site, tabled_map) in tabled_store {
            let state_concrete = candidate.concrete.get(site).unwrap_or(&empty);
            let state_symbolic = candidate.symbolic.get(site).unwrap_or(&empty);
            for (address, tabled) in tabled_map {
                self.cross_terms(address, tabled, state_concrete);
                self.cross_terms(address, tabled, state_symbolic);
            }
        }
    }

    /// Requires, for each state entry in the allocation of `address`, that the
    /// tabled value is matched whenever the two addresses coincide.
    fn cross_terms(
        &mut self,
        address: &StoredAddress,
        tabled: &StoredValue,
        state_map: &BTreeMap<StoredAddress, StoredValue>,
    ) {
        let same_allocation = state_map.iter().filter(|(a, _)| a.context() == address.context());
        for (state_address, state) in same_allocation {
            let apart = Expr::negate(Expr::eq(address.offset().clone(), state_address.offset().clone()));

            let term = if tabled.expression().width() != state.expression().width() {
                Some(apart)
            } else if self.compares_bounds(tabled, state) {
                let mut bounds = BTreeSet::new();
                let check = tabled.bounds_check(state, &mut bounds);
                self.pointers.entry(state.token()).or_default().extend(bounds);
                if check.is_true() {
                    None
                } else if check.is_false() {
                    Some(apart)
                } else {
                    Some(Expr::or(apart, check))
                }
            } else {
                Some(Expr::or(
                    apart,
                    Expr::eq(tabled.expression().clone(), state.expression().clone()),
                ))
            };

            if let Some(term) = term.filter(|t| !t.is_true()) {
                self.equalities.push(term);
            }
        }
    }
}

impl Display for SubsumptionTableEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------ Subsumption Table Entry ------------")?;
        writeln!(f, "Program point = {}", self.program_point)?;
        writeln!(f, "Node = #{}", self.node)?;
        match &self.interpolant {
            Some(interpolant) => writeln!(f, "interpolant = {interpolant}")?,
            None => writeln!(f, "interpolant = (empty)")?,
        }

        for (name, store) in [("concrete store", &self.concrete), ("symbolic store", &self.symbolic)] {
            if store.is_empty() {
                continue;
            }
            writeln!(f, "{name} = [")?;
            for (address, value) in store.values().flatten() {
                writeln!(f, "\t{address} = {value}")?;
            }
            writeln!(f, "]")?;
        }

        if !self.existentials.is_empty() {
            writeln!(f, "existentials = [{}]", self.existentials.iter().join(", "))?;
        }
        Ok(())
    }
}
