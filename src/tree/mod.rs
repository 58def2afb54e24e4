//! This module contains the interpolation tree, which mirrors the execution
//! tree explored by the host and drives the dependency analysis, the path
//! conditions and the subsumption table on its behalf.
//!
//! # How it Works
//!
//! The host tells the tree about everything that happens on the path it is
//! currently executing:
//!
//! 1. Before running the first instruction of a node, the host makes it the
//!    current node with [`InterpolationTree::set_current_node`], and may then
//!    ask [`InterpolationTree::subsumption_check`] whether the rest of the path
//!    is already covered by the subsumption table.
//! 2. Every instruction is reported through [`InterpolationTree::execute`] or
//!    one of its specialised siblings, which update the node's
//!    [`DependencyGraph`](crate::dependency::DependencyGraph).
//! 3. At a fork, [`InterpolationTree::split`] turns the current node into an
//!    internal node with two children, and the branch constraint of each side
//!    is added with [`InterpolationTree::add_constraint`].
//! 4. When a branch turns out to be infeasible, the solver's unsat core is
//!    handed to [`InterpolationTree::mark_path_condition`] so that the
//!    constraints responsible become part of the interpolant.
//! 5. When a path ends, [`InterpolationTree::remove`] retires its leaf. Every
//!    retired node that was not itself subsumed becomes a table entry, and
//!    parents whose children are all gone are retired with them.

pub mod graph;
pub mod node;
pub mod path_condition;

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt::{Display, Formatter},
    time::{Duration, Instant},
};

use tracing::{debug, trace};

pub use self::{
    graph::TreeGraph,
    node::{Node, NodeId},
    path_condition::{ConditionId, PathCondition, PathConditions},
};
use crate::{
    config::Config,
    constant::SUBSUMPTION_POINTER_REASON,
    data::arena::ArenaIndex,
    dependency::{StoreMap, ValueGraph},
    error::{container::Locatable, tree, Result},
    expr::{BinaryOp, Expr},
    ir::{Callee, Instruction, InstructionKind, ProgramPoint, Value},
    solver::Solver,
    statistics::Statistics,
    subsumption::{Candidate, SubsumptionProof, SubsumptionTable, SubsumptionTableEntry},
};

/// The interpolation tree of one exploration.
///
/// The tree owns everything that outlives a single path: the shared
/// [`ValueGraph`], the path conditions, the subsumption table and the
/// statistics.
#[derive(Clone, Debug)]
pub struct InterpolationTree {
    config: Config,
    values: ValueGraph,

    /// The live nodes.
    nodes:     BTreeMap<NodeId, Node>,
    next_node: usize,
    root:      NodeId,
    current:   Option<NodeId>,

    conditions: PathConditions,
    table:      SubsumptionTable,
    statistics: Statistics,

    /// The recording of the tree's shape, if enabled.
    graph: Option<TreeGraph>,
}

impl InterpolationTree {
    /// Creates a tree consisting of a root node, which is the current node.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let root = NodeId::from_index(1);
        let nodes = BTreeMap::from([(root, Node::root(root, &config))]);
        let graph = config.tree_graph.then(|| TreeGraph::new(root));
        let statistics = Statistics {
            nodes_created: 1,
            ..Statistics::default()
        };

        Self {
            config,
            values: ValueGraph::new(),
            nodes,
            next_node: root.index() + 1,
            root,
            current: Some(root),
            conditions: PathConditions::new(),
            table: SubsumptionTable::new(),
            statistics,
            graph,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Gets the node that is currently being executed, if any.
    #[must_use]
    pub fn current_node(&self) -> Option<NodeId> {
        self.current
    }

    /// Gets the live node `id`, if it exists.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Gets the number of nodes that have not been retired.
    #[must_use]
    pub fn live_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn values(&self) -> &ValueGraph {
        &self.values
    }

    #[must_use]
    pub fn path_conditions(&self) -> &PathConditions {
        &self.conditions
    }

    #[must_use]
    pub fn table(&self) -> &SubsumptionTable {
        &self.table
    }

    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Gets the recording of the tree's shape, if it is enabled.
    #[must_use]
    pub fn graph(&self) -> Option<&TreeGraph> {
        self.graph.as_ref()
    }

    /// Makes `node` the current node, which is about to execute
    /// `instruction`.
    ///
    /// # Errors
    ///
    /// If `node` does not exist or has already been split.
    pub fn set_current_node(&mut self, node: NodeId, instruction: &Instruction) -> Result<()> {
        let entry = lookup(&mut self.nodes, node)?;
        if !entry.is_leaf() {
            return Err(tree::Error::AlreadySplit { node }.into());
        }
        entry.set_program_point(instruction, &self.config);
        self.current = Some(node);
        if let Some(graph) = &mut self.graph {
            graph.set_current_node(node, instruction);
        }
        trace!(%node, program_point = ?entry.program_point(), "Current node set");
        Ok(())
    }

    /// Executes `instruction` with the given operand expressions on the current
    /// node. See [`InstructionKind`] for the expected operands.
    ///
    /// Calls to internal functions enter the callee's frame.
    ///
    /// # Errors
    ///
    /// If there is no current node or the dependency graph rejects the
    /// instruction.
    pub fn execute(&mut self, instruction: &Instruction, operands: &[Expr]) -> Result<()> {
        let start = Instant::now();
        let id = self.current_id()?;
        let node = lookup(&mut self.nodes, id)?;
        let call_stack = node.call_stack().clone();
        node.dependencies_mut()
            .execute(&mut self.values, instruction, operands, &call_stack)?;

        if let InstructionKind::Call {
            callee: Callee::Internal { .. },
            ..
        } = &instruction.kind
        {
            node.set_call_stack(call_stack.push(instruction.id));
        }
        node.count_instruction();

        self.statistics.instructions += 1;
        self.statistics.time.execute += start.elapsed();
        Ok(())
    }

    /// Executes the phi node `instruction`, reached through its incoming edge
    /// `incoming` and producing `expression`, on the current node.
    ///
    /// # Errors
    ///
    /// If there is no current node or the dependency graph rejects the
    /// instruction.
    pub fn execute_phi(&mut self, instruction: &Instruction, incoming: usize, expression: &Expr) -> Result<()> {
        let start = Instant::now();
        let id = self.current_id()?;
        let node = lookup(&mut self.nodes, id)?;
        let call_stack = node.call_stack().clone();
        node.dependencies_mut()
            .execute_phi(&mut self.values, instruction, incoming, &call_stack, expression)?;
        node.count_instruction();

        self.statistics.instructions += 1;
        self.statistics.time.execute += start.elapsed();
        Ok(())
    }

    /// Executes the load or store `instruction` of `value` at `address` on the
    /// current node. If `bounds_check_passed`, the access is known to be in
    /// bounds and the address becomes part of the interpolant.
    ///
    /// # Errors
    ///
    /// If there is no current node or the dependency graph rejects the
    /// instruction.
    pub fn execute_memory_operation(
        &mut self,
        instruction: &Instruction,
        value: &Expr,
        address: &Expr,
        bounds_check_passed: bool,
    ) -> Result<()> {
        let start = Instant::now();
        let id = self.current_id()?;
        let uses_bounds = self.config.uses_bounds();
        let node = lookup(&mut self.nodes, id)?;
        let call_stack = node.call_stack().clone();
        node.dependencies_mut().execute_memory_operation(
            &mut self.values,
            instruction,
            value,
            address,
            bounds_check_passed,
            &call_stack,
            uses_bounds,
        )?;
        node.count_instruction();

        self.statistics.instructions += 1;
        self.statistics.time.execute += start.elapsed();
        Ok(())
    }

    /// Returns from the current function through `ret`, binding the returned
    /// `expression` to `call_site` in the caller's frame.
    ///
    /// This has to be called on every return from an internal call, including
    /// returns without a value, as it also leaves the callee's frame.
    ///
    /// # Errors
    ///
    /// If there is no current node or the returned value cannot be resolved.
    pub fn bind_return_value(&mut self, call_site: &Instruction, ret: &Instruction, expression: &Expr) -> Result<()> {
        let id = self.current_id()?;
        let node = lookup(&mut self.nodes, id)?;
        let call_stack = node.call_stack().clone();
        node.dependencies_mut()
            .bind_return_value(&mut self.values, call_site, ret, expression, &call_stack)?;
        node.set_call_stack(call_stack.pop());
        Ok(())
    }

    /// Tells the tree that `instruction` aborted midway on the current node
    /// because of a memory error, so that the next instruction may find its
    /// operands missing.
    ///
    /// # Errors
    ///
    /// If there is no current node.
    pub fn set_symbolic_execution_error(&mut self, instruction: &Instruction) -> Result<()> {
        let id = self.current_id()?;
        lookup(&mut self.nodes, id)?.dependencies_mut().set_recovering();
        if let Some(graph) = &mut self.graph {
            graph.set_memory_error(id, instruction);
        }
        debug!(node = %id, %instruction, "Recovering from a symbolic execution error");
        Ok(())
    }

    /// Adds `constraint` to the path condition of the current node. The
    /// constraint is the outcome of the branch condition `condition`.
    ///
    /// # Errors
    ///
    /// If there is no current node or `condition` is the result of an
    /// instruction that was never executed on the path.
    pub fn add_constraint(&mut self, constraint: Expr, condition: Value) -> Result<()> {
        let id = self.current_id()?;
        let node = lookup(&mut self.nodes, id)?;
        let call_stack = node.call_stack().clone();
        let token = node
            .dependencies_mut()
            .condition_token(&mut self.values, condition, &constraint, &call_stack)
            .map_err(|source| tree::Error::UnresolvedCondition {
                node: id,
                condition,
                source,
            })?;

        let head = self.conditions.push(constraint.clone(), token, node.path_condition());
        node.set_path_condition(head);
        if let Some(graph) = &mut self.graph {
            graph.add_path_condition(id, head, &constraint);
        }
        trace!(node = %id, %constraint, "Constraint added");
        Ok(())
    }

    /// Splits the leaf `node` into two children, returning the child for the
    /// false side of the branch followed by the child for the true side.
    ///
    /// Both children start with the node's path condition, call stack and a
    /// copy of its dependency state.
    ///
    /// # Errors
    ///
    /// If `node` does not exist or has already been split.
    pub fn split(&mut self, node: NodeId) -> Result<(NodeId, NodeId)> {
        let start = Instant::now();
        let left = NodeId::from_index(self.next_node);
        let right = NodeId::from_index(self.next_node + 1);

        let parent = lookup(&mut self.nodes, node)?;
        if !parent.is_leaf() {
            return Err(tree::Error::AlreadySplit { node }.into());
        }
        let children = [parent.child(left), parent.child(right)];
        parent.set_children(left, right);
        self.nodes.extend(children.map(|child| (child.id(), child)));
        self.next_node += 2;

        if let Some(graph) = &mut self.graph {
            graph.add_children(node, left, right);
        }
        self.statistics.nodes_created += 2;
        self.statistics.splits += 1;
        self.statistics.time.split += start.elapsed();
        debug!(%node, %left, %right, "Node split");
        Ok((left, right))
    }

    /// Checks whether the current node is covered by an entry of the
    /// subsumption table, giving the solver `timeout` per query, or the
    /// configured subsumption timeout if none is given.
    ///
    /// On success the node is marked as subsumed, so that it will not be
    /// stored itself, and whatever the subsumption relied on becomes part of
    /// the node's interpolant. Nodes that have not executed an instruction yet
    /// are never subsumed.
    ///
    /// # Errors
    ///
    /// If there is no current node, or marking the pointers the subsumption
    /// relied on produces an invalid offset bound.
    pub fn subsumption_check(&mut self, solver: &mut dyn Solver, timeout: Option<Duration>) -> Result<bool> {
        let start = Instant::now();
        let id = self.current_id()?;
        let node = self.nodes.get(&id).ok_or(tree::Error::NoSuchNode { node: id })?;
        let Some(program_point) = node.program_point() else {
            return Ok(false);
        };
        self.statistics.subsumption_checks += 1;

        let (concrete, symbolic) = match node.parent().and_then(|parent| self.nodes.get(&parent)) {
            Some(parent) => {
                parent
                    .dependencies()
                    .stored_expressions(&self.values, node.entry_call_stack(), None, false)
            }
            None => (StoreMap::new(), StoreMap::new()),
        };
        let constraints = self.conditions.constraints(node.path_condition());
        let candidate = Candidate {
            node:        id,
            constraints: &constraints,
            concrete:    &concrete,
            symbolic:    &symbolic,
        };
        let timeout = timeout.unwrap_or(self.config.subsumption_timeout);
        let outcome = self.table.check(
            solver,
            program_point,
            node.entry_call_stack(),
            &candidate,
            timeout,
            &self.config,
            &mut self.statistics,
        );

        let subsumed = match outcome {
            Some((entry_node, proof)) => {
                self.apply_proof(id, program_point, entry_node, &proof)?;
                true
            }
            None => false,
        };
        self.statistics.time.subsumption_check += start.elapsed();
        Ok(subsumed)
    }

    /// Marks what the current node's infeasible branch depended on: the
    /// condition of `branch`, if it is a conditional branch, and the path
    /// conditions in `unsat_core`.
    ///
    /// The core is matched against the path condition newest first and in
    /// order, each constraint of the core consuming the conditions up to and
    /// including its match.
    ///
    /// # Errors
    ///
    /// If there is no current node.
    pub fn mark_path_condition(&mut self, branch: Option<&Instruction>, unsat_core: &[Expr]) -> Result<()> {
        let start = Instant::now();
        let id = self.current_id()?;
        let node = self.nodes.get(&id).ok_or(tree::Error::NoSuchNode { node: id })?;

        if let Some(instruction) = branch {
            if let InstructionKind::Branch {
                condition: Some(condition),
            } = &instruction.kind
            {
                let reason = format!("branch infeasibility [{instruction}]");
                node.dependencies()
                    .mark_all_values(&mut self.values, *condition, node.call_stack(), &reason);
            }
        }

        let mut cursor = node.path_condition();
        let mut matched = vec![];
        for expr in unsat_core {
            while let Some(condition) = cursor {
                let path_condition = self.conditions.get(condition);
                cursor = path_condition.tail();
                if path_condition.constraint() == expr {
                    matched.push(condition);
                    break;
                }
            }
        }
        for condition in matched {
            self.set_condition_as_core(condition);
        }

        self.statistics.time.mark_path_condition += start.elapsed();
        Ok(())
    }

    /// Retires the leaf `node` along with every ancestor that is left without
    /// children, storing a table entry for each retired node that was not
    /// subsumed.
    ///
    /// # Errors
    ///
    /// If `node` does not exist or is not a leaf.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        let start = Instant::now();
        let leaf = self.nodes.get(&node).ok_or(tree::Error::NoSuchNode { node })?;
        if !leaf.is_leaf() {
            return Err(tree::Error::NotALeaf { node }.into());
        }

        let mut next = Some(node);
        while let Some(id) = next {
            self.store_entry(id);
            let removed = self.nodes.remove(&id).ok_or(tree::Error::NoSuchNode { node: id })?;
            if self.current == Some(id) {
                self.current = None;
            }
            self.statistics.retirements += 1;
            debug!(node = %id, subsumed = removed.is_subsumed(), "Node retired");

            next = removed.parent().and_then(|parent| {
                let parent_node = self.nodes.get_mut(&parent)?;
                parent_node.remove_child(id);
                parent_node.is_leaf().then_some(parent)
            });
        }

        self.statistics.time.remove += start.elapsed();
        Ok(())
    }

    /// Renders the recorded shape of the tree in the DOT format, if recording
    /// is enabled.
    #[must_use]
    pub fn render_graph(&self) -> Option<String> {
        self.graph.as_ref().map(TreeGraph::render)
    }

    fn current_id(&self) -> tree::Result<NodeId> {
        self.current.ok_or(tree::Error::NoCurrentNode)
    }

    /// Stores the table entry of the node `id` if it is eligible.
    fn store_entry(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if node.is_subsumed() || !node.is_storable() {
            return;
        }
        let Some(program_point) = node.program_point() else {
            return;
        };

        let existential = self.config.existential_interpolants;
        let mut replacements = BTreeSet::new();
        let interpolant = self
            .conditions
            .pack_interpolant(node.path_condition(), &mut replacements, existential);

        // The memory relevant to a program point is the memory when entering
        // the node, before any of its own instructions ran.
        let (concrete, symbolic) = match node.parent().and_then(|parent| self.nodes.get(&parent)) {
            Some(parent) => parent.dependencies().stored_expressions(
                &self.values,
                node.entry_call_stack(),
                existential.then_some(&mut replacements),
                true,
            ),
            None => (StoreMap::new(), StoreMap::new()),
        };

        let call_stack = node.entry_call_stack().clone();
        let entry = SubsumptionTableEntry::new(program_point, id, interpolant, replacements, concrete, symbolic);
        self.table.insert(&call_stack, entry);
        self.statistics.entries_inserted += 1;
        self.statistics.program_points = self.table.program_points();
    }

    /// Records that the node `id` at `program_point` was subsumed by the entry
    /// of `entry_node`, and marks what the subsumption relied on.
    fn apply_proof(
        &mut self,
        id: NodeId,
        program_point: ProgramPoint,
        entry_node: NodeId,
        proof: &SubsumptionProof,
    ) -> Result<()> {
        let node = lookup(&mut self.nodes, id)?;
        node.set_subsumed();
        let head = node.path_condition();
        self.unsat_core_interpolation(head, &proof.unsat_core);

        for (token, bounds) in &proof.pointer_values {
            self.values
                .mark_pointer_flow(
                    *token,
                    *token,
                    bounds,
                    SUBSUMPTION_POINTER_REASON,
                    self.config.offset_mismatch,
                )
                .locate(program_point)?;
        }

        if let Some(graph) = &mut self.graph {
            graph.mark_as_subsumed(id, entry_node);
        }
        self.statistics.subsumption_successes += 1;
        debug!(node = %id, entry = %entry_node, "Node subsumed");
        Ok(())
    }

    /// Marks every path condition of the list starting at `head` that occurs in
    /// `unsat_core`. The disjuncts of a disjunctive condition each stand for the
    /// whole condition.
    fn unsat_core_interpolation(&mut self, head: Option<ConditionId>, unsat_core: &[Expr]) {
        let mut markers: HashMap<Expr, ConditionId> = HashMap::new();
        for (id, condition) in self.conditions.iter(head) {
            let constraint = condition.constraint();
            if let Some((BinaryOp::Or, left, right)) = constraint.as_binary() {
                markers.insert(left.clone(), id);
                markers.insert(right.clone(), id);
            }
            markers.insert(constraint.clone(), id);
        }

        for expr in unsat_core {
            if let Some(condition) = markers.get(expr) {
                self.set_condition_as_core(*condition);
            }
        }
    }

    fn set_condition_as_core(&mut self, condition: ConditionId) {
        self.conditions.set_as_core(condition, &mut self.values);
        if let Some(graph) = &mut self.graph {
            graph.set_as_core(condition);
        }
    }
}

/// Gets the live node `id` mutably.
fn lookup(nodes: &mut BTreeMap<NodeId, Node>, id: NodeId) -> tree::Result<&mut Node> {
    nodes.get_mut(&id).ok_or(tree::Error::NoSuchNode { node: id })
}

/// Prints the live nodes by program point, followed by the subsumption table.
impl Display for InterpolationTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = |id: NodeId| {
            let program_point = self
                .nodes
                .get(&id)
                .and_then(Node::program_point)
                .map_or_else(|| "?".to_string(), |p| p.to_string());
            let active = if self.current == Some(id) { " (active)" } else { "" };
            format!("{program_point}{active}")
        };

        writeln!(f, "------------------------- Interpolation Tree -------------------------")?;
        if self.nodes.contains_key(&self.root) {
            writeln!(f, "{}", label(self.root))?;
        }

        let mut work: Vec<(NodeId, String)> = vec![(self.root, String::new())];
        while let Some((id, edges)) = work.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let (left, right) = node.children();
            let mut children = vec![];
            if let Some(left) = left {
                writeln!(f, "{edges}+-- L:{}", label(left))?;
                let padding = if right.is_some() { "|   " } else { "    " };
                children.push((left, format!("{edges}{padding}")));
            }
            if let Some(right) = right {
                writeln!(f, "{edges}+-- R:{}", label(right))?;
                children.push((right, format!("{edges}    ")));
            }
            work.extend(children.into_iter().rev());
        }

        writeln!(f, "------------------------- Subsumption Table -------------------------")?;
        write!(f, "{}", self.table)
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{
        config::Config,
        data::arena::ArenaIndex,
        error::{tree, Error},
        expr::Expr,
        ir::{InstructionId, InstructionKind, Value},
        solver::{mock::MockSolver, SatResult, Validity},
        tree::{test::util::*, InterpolationTree, NodeId},
    };

    #[test]
    fn splits_create_children_in_sequence() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;

        let (left, right) = tree.split(root)?;
        assert_eq!((left, right), (NodeId::from_index(2), NodeId::from_index(3)));
        assert!(matches!(tree.split(root), Err(Error::Tree(tree::Error::AlreadySplit { .. }))));
        assert!(matches!(
            tree.set_current_node(root, &instr(1, InstructionKind::Other)),
            Err(Error::Tree(tree::Error::AlreadySplit { .. }))
        ));
        assert_eq!(tree.statistics().nodes_created, 3);
        assert_eq!(tree.statistics().splits, 1);

        Ok(())
    }

    #[test]
    fn conditions_must_be_tracked() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;

        let result = tree.add_constraint(less_than("x", 5), Value::Instruction(InstructionId::new(42)));
        assert!(matches!(
            result,
            Err(Error::Tree(tree::Error::UnresolvedCondition { .. }))
        ));

        tree.execute(&compare(2), &[less_than("x", 5), x(), Expr::constant(5, 32)])?;
        tree.add_constraint(less_than("x", 5), compare(2).value())?;
        let node = tree.node(root).map(|n| n.path_condition());
        assert!(matches!(node, Some(Some(_))));

        Ok(())
    }

    #[test]
    fn retirement_is_post_order_and_stores_entries() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default().with_untabled_function_prefix("rt_"));
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;
        let (left, right) = tree.split(root)?;

        tree.set_current_node(left, &instr(2, InstructionKind::Other))?;
        tree.remove(left)?;
        assert_eq!(tree.table().len(), 1);
        assert!(tree.node(root).is_some());
        assert_eq!(tree.current_node(), None);

        assert!(matches!(tree.remove(root), Err(Error::Tree(tree::Error::NotALeaf { .. }))));

        tree.set_current_node(right, &instr_in(3, "rt_assume", InstructionKind::Other))?;
        tree.remove(right)?;

        // The untabled right child is skipped, but the root is stored.
        assert_eq!(tree.table().len(), 2);
        assert_eq!(tree.live_nodes(), 0);
        assert_eq!(tree.statistics().retirements, 3);
        assert!(matches!(tree.remove(root), Err(Error::Tree(tree::Error::NoSuchNode { .. }))));

        Ok(())
    }

    #[test]
    fn siblings_with_different_stores_do_not_subsume() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Alloca { size: Some(8) }))?;
        tree.execute(&instr(1, InstructionKind::Alloca { size: Some(8) }), &[Expr::pointer(0x1000)])?;
        let (first, second) = tree.split(root)?;

        // The first path stores 1, reads it back and branches on it.
        let first_child = run_with_stored(&mut tree, first, 1)?;
        let mut solver = MockSolver::answering(Validity::True);
        tree.mark_path_condition(None, &[taken(1)])?;
        tree.remove(first_child)?;
        assert_eq!(tree.table().len(), 1);

        // The second path stores 2 at the same place.
        let second_child = run_with_stored(&mut tree, second, 2)?;
        assert!(!tree.subsumption_check(&mut solver, None)?);
        assert!(solver.queries.is_empty());
        assert!(!tree.node(second_child).map_or(true, |n| n.is_subsumed()));

        Ok(())
    }

    #[test]
    fn siblings_with_equal_stores_subsume() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default().with_tree_graph(true));
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Alloca { size: Some(8) }))?;
        tree.execute(&instr(1, InstructionKind::Alloca { size: Some(8) }), &[Expr::pointer(0x1000)])?;
        let (first, second) = tree.split(root)?;

        let first_child = run_with_stored(&mut tree, first, 1)?;
        tree.mark_path_condition(None, &[taken(1)])?;
        tree.remove(first_child)?;

        let second_child = run_with_stored(&mut tree, second, 1)?;
        let mut solver = MockSolver::answering(Validity::Unknown);
        solver.sat = SatResult::Sat;
        assert!(tree.subsumption_check(&mut solver, Some(Duration::from_secs(1)))?);
        assert!(tree.node(second_child).map_or(false, |n| n.is_subsumed()));
        assert_eq!(tree.statistics().subsumption_successes, 1);

        // Subsumed nodes are not stored themselves.
        tree.remove(second_child)?;
        assert_eq!(tree.table().len(), 1);

        let dot = tree.render_graph().unwrap_or_default();
        assert!(dot.contains("(subsumed)"));
        assert!(dot.contains("[style=dashed,label=\"1\"]"));

        Ok(())
    }

    #[test]
    fn unsat_cores_mark_conditions_in_order() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;
        tree.execute(&compare(2), &[less_than("x", 5), x(), Expr::constant(5, 32)])?;
        tree.execute(&compare(3), &[less_than("x", 9), x(), Expr::constant(9, 32)])?;
        tree.add_constraint(less_than("x", 5), compare(2).value())?;
        tree.add_constraint(less_than("x", 9), compare(3).value())?;

        // The older condition comes first in the core, which consumes the
        // newer one without a match.
        tree.mark_path_condition(None, &[less_than("x", 5), less_than("x", 9)])?;
        let conditions = tree.path_conditions();
        let head = tree.node(root).and_then(|n| n.path_condition());
        let marks: Vec<bool> = conditions.iter(head).map(|(_, c)| c.is_core()).collect();
        assert_eq!(marks, vec![false, true]);

        Ok(())
    }

    #[test]
    fn branch_conditions_become_core() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;
        tree.execute(&compare(2), &[less_than("x", 5), x(), Expr::constant(5, 32)])?;

        let branch = instr(3, InstructionKind::Branch {
            condition: Some(compare(2).value()),
        });
        tree.mark_path_condition(Some(&branch), &[])?;

        let core = tree
            .node(root)
            .and_then(|n| n.dependencies().latest_value(compare(2).value(), n.call_stack()))
            .map(|token| tree.values().token(token).is_core());
        assert_eq!(core, Some(true));

        Ok(())
    }

    #[test]
    fn display_shows_structure_and_table() -> anyhow::Result<()> {
        let mut tree = InterpolationTree::new(Config::default());
        let root = tree.root();
        tree.set_current_node(root, &instr(1, InstructionKind::Other))?;
        let (left, _) = tree.split(root)?;
        tree.set_current_node(left, &instr(2, InstructionKind::Other))?;

        let printed = tree.to_string();
        assert!(printed.contains("%1\n+-- L:%2 (active)\n+-- R:?"));
        assert!(printed.contains("Subsumption Table"));

        Ok(())
    }

    mod util {
        use crate::{
            expr::{Array, Expr},
            ir::{ArithmeticOp, ConstantId, FunctionId, Instruction, InstructionId, InstructionKind, Value},
            tree::{InterpolationTree, NodeId},
        };

        pub fn instr(id: u32, kind: InstructionKind) -> Instruction {
            instr_in(id, "main", kind)
        }

        pub fn instr_in(id: u32, function: &str, kind: InstructionKind) -> Instruction {
            Instruction::new(InstructionId::new(id), FunctionId::new(0), function, kind)
        }

        pub fn compare(id: u32) -> Instruction {
            instr(id, InstructionKind::Compare {
                lhs: Value::Argument {
                    function: FunctionId::new(0),
                    index:    0,
                },
                rhs: Value::Constant(ConstantId::new(0)),
            })
        }

        pub fn x() -> Expr {
            Expr::read(Array::new("x"), 32)
        }

        pub fn less_than(name: &str, bound: u64) -> Expr {
            Expr::ult(Expr::read(Array::new(name), 32), Expr::constant(bound, 32))
        }

        /// The branch constraint taken by a path that stored `value`.
        pub fn taken(value: u64) -> Expr {
            Expr::eq(Expr::add(x(), Expr::constant(value, 32)), Expr::constant(2, 32))
        }

        /// Runs `node`, which stores `value` to the allocation `%1`, and then
        /// splits it and enters its first child, which loads the value back and
        /// branches on it.
        pub fn run_with_stored(tree: &mut InterpolationTree, node: NodeId, value: u64) -> anyhow::Result<NodeId> {
            let store = instr(10, InstructionKind::Store {
                value:   Value::Constant(ConstantId::new(u32::try_from(value)?)),
                address: Value::Instruction(InstructionId::new(1)),
            });
            tree.set_current_node(node, &store)?;
            tree.execute(&store, &[Expr::constant(value, 32), Expr::pointer(0x1000)])?;
            let (child, _) = tree.split(node)?;

            let load = instr(20, InstructionKind::Load {
                address: Value::Instruction(InstructionId::new(1)),
            });
            tree.set_current_node(child, &load)?;
            tree.execute(&load, &[Expr::constant(value, 32), Expr::pointer(0x1000)])?;
            let add = instr(21, InstructionKind::Binary {
                op:  ArithmeticOp::Add,
                lhs: Value::Instruction(InstructionId::new(20)),
                rhs: Value::Argument {
                    function: FunctionId::new(0),
                    index:    0,
                },
            });
            let sum = Expr::add(x(), Expr::constant(value, 32));
            tree.execute(&add, &[sum.clone(), Expr::constant(value, 32), x()])?;
            let compare = instr(22, InstructionKind::Compare {
                lhs: Value::Instruction(InstructionId::new(21)),
                rhs: Value::Constant(ConstantId::new(2)),
            });
            tree.execute(&compare, &[taken(value), sum, Expr::constant(2, 32)])?;
            tree.add_constraint(taken(value), compare.value())?;
            Ok(child)
        }
    }
}
