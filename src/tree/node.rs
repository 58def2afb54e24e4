//! This module contains the nodes of the interpolation tree.

use std::sync::Arc;

use crate::{
    config::Config,
    data::arena::arena_index,
    dependency::DependencyGraph,
    ir::{CallStack, Instruction, ProgramPoint},
    tree::path_condition::ConditionId,
};

arena_index!(
    /// The sequence number of a node of the interpolation tree.
    ///
    /// Sequence numbers are handed out in creation order starting from one, and
    /// are never reused within a tree.
    NodeId
);

/// A node of the interpolation tree, standing for the part of a path between
/// two splits.
///
/// A node starts out as an active leaf. It either gets split, after which it
/// is never executed again, or it gets retired once its path is finished or
/// subsumed.
#[derive(Clone, Debug)]
pub struct Node {
    id:     NodeId,
    parent: Option<NodeId>,
    left:   Option<NodeId>,
    right:  Option<NodeId>,

    /// The first instruction executed by the node.
    program_point: Option<ProgramPoint>,

    /// The function containing the program point.
    function_name: Option<Arc<str>>,

    /// The call stack at the program point.
    entry_call_stack: CallStack,

    /// The call stack of the instruction currently executed by the node.
    call_stack: CallStack,

    /// The newest condition on the node's path.
    path_condition: Option<ConditionId>,

    dependencies: DependencyGraph,

    /// Whether the node may be stored in the subsumption table.
    storable: bool,

    /// Whether the node has been subsumed by a table entry.
    subsumed: bool,

    /// The number of instructions executed on the path up to this node.
    instructions_depth: u64,
}

impl Node {
    /// Creates the root node of a tree.
    #[must_use]
    pub fn root(id: NodeId, config: &Config) -> Self {
        Self {
            id,
            parent: None,
            left: None,
            right: None,
            program_point: None,
            function_name: None,
            entry_call_stack: CallStack::new(),
            call_stack: CallStack::new(),
            path_condition: None,
            dependencies: DependencyGraph::new(config),
            storable: true,
            subsumed: false,
            instructions_depth: 0,
        }
    }

    /// Creates a child of this node, which continues its path.
    #[must_use]
    pub fn child(&self, id: NodeId) -> Self {
        Self {
            id,
            parent: Some(self.id),
            left: None,
            right: None,
            program_point: None,
            function_name: None,
            entry_call_stack: self.call_stack.clone(),
            call_stack: self.call_stack.clone(),
            path_condition: self.path_condition,
            dependencies: self.dependencies.fork(),
            storable: true,
            subsumed: false,
            instructions_depth: self.instructions_depth,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Gets the live children of the node.
    #[must_use]
    pub fn children(&self) -> (Option<NodeId>, Option<NodeId>) {
        (self.left, self.right)
    }

    /// Checks whether the node has no live children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    #[must_use]
    pub fn program_point(&self) -> Option<ProgramPoint> {
        self.program_point
    }

    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    #[must_use]
    pub fn entry_call_stack(&self) -> &CallStack {
        &self.entry_call_stack
    }

    #[must_use]
    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    #[must_use]
    pub fn path_condition(&self) -> Option<ConditionId> {
        self.path_condition
    }

    #[must_use]
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    #[must_use]
    pub fn is_storable(&self) -> bool {
        self.storable
    }

    #[must_use]
    pub fn is_subsumed(&self) -> bool {
        self.subsumed
    }

    #[must_use]
    pub fn instructions_depth(&self) -> u64 {
        self.instructions_depth
    }

    /// Records that the node is at `instruction`.
    ///
    /// Only the first instruction becomes the program point, while the node
    /// stays storable only as long as it is in a tabled function.
    pub(crate) fn set_program_point(&mut self, instruction: &Instruction, config: &Config) {
        if self.program_point.is_none() {
            self.program_point = Some(instruction.id);
            self.function_name = Some(instruction.function_name.clone());
        }
        self.storable = config.is_tabled_function(&instruction.function_name);
    }

    pub(crate) fn dependencies_mut(&mut self) -> &mut DependencyGraph {
        &mut self.dependencies
    }

    pub(crate) fn set_call_stack(&mut self, call_stack: CallStack) {
        self.call_stack = call_stack;
    }

    pub(crate) fn set_path_condition(&mut self, head: ConditionId) {
        self.path_condition = Some(head);
    }

    pub(crate) fn set_children(&mut self, left: NodeId, right: NodeId) {
        self.left = Some(left);
        self.right = Some(right);
    }

    /// Forgets the retired child `child`.
    pub(crate) fn remove_child(&mut self, child: NodeId) {
        if self.left == Some(child) {
            self.left = None;
        } else if self.right == Some(child) {
            self.right = None;
        }
    }

    pub(crate) fn set_subsumed(&mut self) {
        self.subsumed = true;
    }

    pub(crate) fn count_instruction(&mut self) {
        self.instructions_depth += 1;
    }
}

#[cfg(test)]
mod test {
    use crate::{
        config::Config,
        data::arena::ArenaIndex,
        ir::{FunctionId, Instruction, InstructionId, InstructionKind},
        tree::node::{Node, NodeId},
    };

    fn instruction(id: u32, function: &str) -> Instruction {
        Instruction::new(InstructionId::new(id), FunctionId::new(0), function, InstructionKind::Other)
    }

    #[test]
    fn only_the_first_instruction_is_the_program_point() {
        let config = Config::default().with_untabled_function_prefix("rt_");
        let mut node = Node::root(NodeId::from_index(1), &config);

        node.set_program_point(&instruction(4, "main"), &config);
        assert!(node.is_storable());
        node.set_program_point(&instruction(7, "rt_assume"), &config);

        assert_eq!(node.program_point(), Some(InstructionId::new(4)));
        assert_eq!(node.function_name(), Some("main"));
        assert!(!node.is_storable());
    }

    #[test]
    fn children_continue_the_parent() {
        let config = Config::default();
        let mut parent = Node::root(NodeId::from_index(1), &config);
        parent.set_call_stack(parent.call_stack().push(InstructionId::new(9)));
        parent.set_program_point(&instruction(4, "main"), &config);
        parent.count_instruction();

        let child = parent.child(NodeId::from_index(2));
        assert_eq!(child.parent(), Some(NodeId::from_index(1)));
        assert_eq!(child.entry_call_stack(), parent.call_stack());
        assert_eq!(child.instructions_depth(), 1);
        assert_eq!(child.program_point(), None);
        assert!(child.is_leaf());

        parent.set_children(NodeId::from_index(2), NodeId::from_index(3));
        parent.remove_child(NodeId::from_index(2));
        assert_eq!(parent.children(), (None, Some(NodeId::from_index(3))));
    }
}
