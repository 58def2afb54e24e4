//! This module contains a recording of the shape of the interpolation tree
//! that can be rendered in the DOT format for inspection.
//!
//! The recording keeps every node that was ever created, including retired
//! ones, so that the rendered tree shows the whole exploration.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::{Display, Formatter},
};

use crate::{
    expr::Expr,
    ir::Instruction,
    tree::{node::NodeId, path_condition::ConditionId},
};

/// The recorded shape of an interpolation tree.
#[derive(Clone, Debug)]
pub struct TreeGraph {
    root:  NodeId,
    nodes: BTreeMap<NodeId, GraphNode>,

    /// The node on which each path condition was added.
    conditions: HashMap<ConditionId, NodeId>,

    /// The subsumptions, in the order in which they happened, from the
    /// subsumed node to the node whose entry subsumed it.
    subsumptions: Vec<(NodeId, NodeId)>,
}

#[derive(Clone, Debug, Default)]
struct GraphNode {
    name:            Option<String>,
    path_conditions: BTreeMap<ConditionId, (String, bool)>,
    memory_error:    Option<String>,
    subsumed:        bool,
    false_target:    Option<NodeId>,
    true_target:     Option<NodeId>,
}

impl TreeGraph {
    /// Creates the recording of a tree consisting of `root`.
    #[must_use]
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            nodes: BTreeMap::from([(root, GraphNode::default())]),
            conditions: HashMap::new(),
            subsumptions: vec![],
        }
    }

    /// Records that `parent` was split into `left`, reached when its branch
    /// condition is false, and `right`, reached when it is true.
    pub fn add_children(&mut self, parent: NodeId, left: NodeId, right: NodeId) {
        let node = self.nodes.entry(parent).or_default();
        node.false_target = Some(left);
        node.true_target = Some(right);
        self.nodes.insert(left, GraphNode::default());
        self.nodes.insert(right, GraphNode::default());
    }

    /// Names `node` after `instruction` unless it has been named before.
    pub fn set_current_node(&mut self, node: NodeId, instruction: &Instruction) {
        let node = self.nodes.entry(node).or_default();
        if node.name.is_none() {
            node.name = Some(format!("{}\\l{}", escape(&instruction.function_name), position(instruction)));
        }
    }

    pub fn add_path_condition(&mut self, node: NodeId, condition: ConditionId, constraint: &Expr) {
        self.nodes
            .entry(node)
            .or_default()
            .path_conditions
            .insert(condition, (escape(&constraint.to_string()), false));
        self.conditions.insert(condition, node);
    }

    /// Marks `condition` as part of an interpolant.
    pub fn set_as_core(&mut self, condition: ConditionId) {
        let Some(node) = self.conditions.get(&condition) else {
            return;
        };
        if let Some((_, core)) = self
            .nodes
            .get_mut(node)
            .and_then(|n| n.path_conditions.get_mut(&condition))
        {
            *core = true;
        }
    }

    /// Records that `node` was subsumed by the entry built from `entry_node`.
    pub fn mark_as_subsumed(&mut self, node: NodeId, entry_node: NodeId) {
        self.nodes.entry(node).or_default().subsumed = true;
        self.subsumptions.push((node, entry_node));
    }

    /// Records that executing `instruction` on `node` caused a memory error.
    pub fn set_memory_error(&mut self, node: NodeId, instruction: &Instruction) {
        self.nodes.entry(node).or_default().memory_error = Some(position(instruction));
    }

    /// Renders the recording in the DOT format.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn write_node(&self, f: &mut Formatter<'_>, id: NodeId, node: &GraphNode) -> std::fmt::Result {
        write!(f, "Node{id} [shape=record,label=\"{{{id}: ")?;
        if let Some(name) = &node.name {
            write!(f, "{name}")?;
        }
        write!(f, "\\l")?;
        for (constraint, core) in node.path_conditions.values() {
            write!(f, "{constraint}")?;
            if *core {
                write!(f, " ITP")?;
            }
            write!(f, "\\l")?;
        }
        if let Some(location) = &node.memory_error {
            write!(f, "OUT-OF-BOUND: {location}\\l")?;
        }
        if node.subsumed {
            write!(f, "(subsumed)\\l")?;
        }
        if node.false_target.is_some() || node.true_target.is_some() {
            write!(f, "|{{<s0>F|<s1>T}}")?;
        }
        writeln!(f, "}}\"];")?;

        if let Some(target) = node.false_target {
            writeln!(f, "Node{id}:s0 -> Node{target};")?;
        }
        if let Some(target) = node.true_target {
            writeln!(f, "Node{id}:s1 -> Node{target};")?;
        }
        Ok(())
    }
}

impl Display for TreeGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "digraph search_tree {{")?;

        // False subtrees are rendered before true ones.
        let mut work = vec![self.root];
        while let Some(id) = work.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            self.write_node(f, id, node)?;
            work.extend(node.true_target);
            work.extend(node.false_target);
        }

        for (number, (source, target)) in self.subsumptions.iter().enumerate() {
            writeln!(f, "Node{source} -> Node{target} [style=dashed,label=\"{}\"];", number + 1)?;
        }
        writeln!(f, "}}")
    }
}

/// Describes where `instruction` is, preferring its source location.
fn position(instruction: &Instruction) -> String {
    match &instruction.location {
        Some(location) => escape(&location.to_string()),
        None => instruction.id.to_string(),
    }
}

/// Escapes the characters that are special in DOT record labels.
fn escape(label: &str) -> String {
    let mut escaped = String::with_capacity(label.len());
    for c in label.chars() {
        if matches!(c, '{' | '}' | '<' | '>' | '|' | '"') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod test {
    use crate::{
        data::arena::ArenaIndex,
        expr::{Array, Expr},
        ir::{FunctionId, Instruction, InstructionId, InstructionKind, SourceLocation},
        tree::{graph::TreeGraph, node::NodeId, path_condition::ConditionId},
    };

    fn node(id: usize) -> NodeId {
        NodeId::from_index(id)
    }

    #[test]
    fn renders_records_edges_and_subsumptions() {
        let mut graph = TreeGraph::new(node(1));
        let main = Instruction::new(InstructionId::new(4), FunctionId::new(0), "main", InstructionKind::Other)
            .with_location(SourceLocation {
                file: "a.c".into(),
                line: 3,
            });
        graph.set_current_node(node(1), &main);
        graph.add_children(node(1), node(2), node(3));

        let x = Expr::read(Array::new("x"), 32);
        let condition = ConditionId::from_index(0);
        graph.add_path_condition(node(3), condition, &Expr::ult(x, Expr::constant(5, 32)));
        graph.set_as_core(condition);
        graph.mark_as_subsumed(node(3), node(2));
        graph.set_memory_error(node(2), &main);

        let dot = graph.render();
        assert!(dot.starts_with("digraph search_tree {\n"));
        assert!(dot.contains("Node1 [shape=record,label=\"{1: main\\la.c:3\\l|{<s0>F|<s1>T}}\"];"));
        assert!(dot.contains("Node1:s0 -> Node2;"));
        assert!(dot.contains("Node1:s1 -> Node3;"));
        assert!(dot.contains(" ITP\\l"));
        assert!(dot.contains("(subsumed)\\l"));
        assert!(dot.contains("OUT-OF-BOUND: a.c:3\\l"));
        assert!(dot.contains("Node3 -> Node2 [style=dashed,label=\"1\"];"));
        assert!(dot.find("Node2 [").unwrap() < dot.find("Node3 [").unwrap());
    }

    #[test]
    fn nodes_keep_their_first_name() {
        let mut graph = TreeGraph::new(node(1));
        let first = Instruction::new(InstructionId::new(1), FunctionId::new(0), "f", InstructionKind::Other);
        let second = Instruction::new(InstructionId::new(2), FunctionId::new(0), "g", InstructionKind::Other);
        graph.set_current_node(node(1), &first);
        graph.set_current_node(node(1), &second);

        assert!(graph.render().contains("{1: f\\l%1\\l}"));
    }
}
