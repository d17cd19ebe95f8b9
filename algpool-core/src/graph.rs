//! Control-flow precedence graph built from the composite unit tree.
//!
//! Nodes live in a single arena and refer to each other by [`NodeId`]. The
//! structure is only mutated during pool initialization; afterwards it is
//! read by the external executor to decide traversal and short-circuiting.

use crate::clone_pool::ClonePool;
use crate::error::GraphError;
use crate::infrastructure::UnitHandle;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::trace;

/// Name of the synthetic root every top-level unit hangs from
pub const ROOT_NODE_NAME: &str = "RootDecisionHub";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// A composite unit: decides how its children's outcomes combine
#[derive(Debug, Clone)]
pub struct DecisionNode {
    pub name: String,
    /// Children form an ordered chain rather than an unordered set
    pub sequential: bool,
    /// Stop evaluating children once the outcome is determined
    pub is_lazy: bool,
    /// Combine children with OR instead of AND
    pub mode_or: bool,
    /// Propagate "pass" regardless of the children's results
    pub all_pass: bool,
    pub parents: Vec<NodeId>,
    pub children: Vec<NodeId>,
}

/// A leaf unit, possibly reachable from several decision nodes
pub struct AlgorithmNode {
    pub name: String,
    pub unit: UnitHandle,
    pub is_lazy: bool,
    pub all_pass: bool,
    pub parents: Vec<NodeId>,
    /// Runtime instances, bound once the pool has bootstrapped the unit
    pub pool: Option<Arc<ClonePool>>,
}

pub enum Node {
    Decision(DecisionNode),
    Algorithm(AlgorithmNode),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Decision(d) => &d.name,
            Node::Algorithm(a) => &a.name,
        }
    }

    pub fn parents(&self) -> &[NodeId] {
        match self {
            Node::Decision(d) => &d.parents,
            Node::Algorithm(a) => &a.parents,
        }
    }

    fn add_parent(&mut self, parent: NodeId) {
        let parents = match self {
            Node::Decision(d) => &mut d.parents,
            Node::Algorithm(a) => &mut a.parents,
        };
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }
}

#[derive(Default)]
pub struct PrecedenceGraph {
    nodes: Vec<Node>,
    head: Option<NodeId>,
    decisions: HashMap<String, NodeId>,
    algorithms: HashMap<String, NodeId>,
}

impl PrecedenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the root decision node. Must be called exactly once, before
    /// any other node is added.
    pub fn add_head_node(
        &mut self,
        name: &str,
        sequential: bool,
        is_lazy: bool,
        mode_or: bool,
        all_pass: bool,
    ) -> Result<NodeId, GraphError> {
        if let Some(head) = self.head {
            return Err(GraphError::HeadAlreadySet(self.node(head).name().to_string()));
        }
        let id = self.push_decision(name, sequential, is_lazy, mode_or, all_pass);
        self.head = Some(id);
        Ok(id)
    }

    /// Adds (or reuses) the decision node for a composite unit under `parent_name`
    pub fn add_decision_hub_node(
        &mut self,
        unit: &UnitHandle,
        parent_name: &str,
        sequential: bool,
        is_lazy: bool,
        mode_or: bool,
        all_pass: bool,
    ) -> Result<NodeId, GraphError> {
        let parent = self.parent_of(parent_name)?;
        let id = match self.decisions.get(unit.name()) {
            Some(id) => *id,
            None => {
                let id = self.push_decision(unit.name(), sequential, is_lazy, mode_or, all_pass);
                trace!(node = unit.name(), parent = parent_name, "Decision hub node added");
                id
            }
        };
        self.link(parent, id);
        Ok(id)
    }

    /// Adds the node for a leaf unit under `parent_name`. A unit already in the
    /// graph only gains the extra parent edge.
    pub fn add_algorithm_node(
        &mut self,
        unit: &UnitHandle,
        parent_name: &str,
        is_lazy: bool,
        all_pass: bool,
    ) -> Result<NodeId, GraphError> {
        let parent = self.parent_of(parent_name)?;
        let id = match self.algorithms.get(unit.name()) {
            Some(id) => *id,
            None => {
                let id = NodeId(self.nodes.len());
                self.nodes.push(Node::Algorithm(AlgorithmNode {
                    name: unit.name().to_string(),
                    unit: Arc::clone(unit),
                    is_lazy,
                    all_pass,
                    parents: Vec::new(),
                    pool: None,
                }));
                self.algorithms.insert(unit.name().to_string(), id);
                trace!(node = unit.name(), parent = parent_name, "Algorithm node added");
                id
            }
        };
        self.link(parent, id);
        Ok(id)
    }

    /// Binds the runtime clone pool of leaf `name` to its node
    pub fn attach_algorithms_to_nodes(
        &mut self,
        name: &str,
        pool: Arc<ClonePool>,
    ) -> Result<(), GraphError> {
        let id = self
            .algorithms
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownAlgorithm(name.to_string()))?;
        if let Node::Algorithm(node) = &mut self.nodes[id.0] {
            node.pool = Some(pool);
        }
        Ok(())
    }

    pub fn head(&self) -> Option<&DecisionNode> {
        self.head.and_then(|id| self.decision(id))
    }

    pub fn head_id(&self) -> Option<NodeId> {
        self.head
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn decision(&self, id: NodeId) -> Option<&DecisionNode> {
        match self.nodes.get(id.0) {
            Some(Node::Decision(d)) => Some(d),
            _ => None,
        }
    }

    pub fn decision_node(&self, name: &str) -> Option<&DecisionNode> {
        self.decisions.get(name).and_then(|id| self.decision(*id))
    }

    pub fn algorithm_node(&self, name: &str) -> Option<&AlgorithmNode> {
        match self.algorithms.get(name).map(|id| &self.nodes[id.0]) {
            Some(Node::Algorithm(a)) => Some(a),
            _ => None,
        }
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.decisions
            .get(name)
            .or_else(|| self.algorithms.get(name))
            .copied()
    }

    /// Children of a decision node, in insertion order; empty for leaves
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.decision(id).map_or(&[], |d| d.children.as_slice())
    }

    pub fn decision_count(&self) -> usize {
        self.decisions.len()
    }

    pub fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }

    /// Indented rendering of the control flow, root line omitted
    pub fn dump_control_flow(&self) -> String {
        let mut out = String::new();
        if let Some(head) = self.head {
            self.dump_node(&mut out, head, &mut Vec::new());
        }
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, path: &mut Vec<NodeId>) {
        // a cycle can only come from a configuration rejected by the depth bound
        if path.contains(&id) {
            return;
        }
        let indent = path.len();
        match self.node(id) {
            Node::Decision(d) => {
                if Some(id) != self.head {
                    let _ = write!(out, "{}{} [Seq]", "  ".repeat(indent), d.name);
                    out.push_str(if d.sequential { " [Sequential]" } else { " [Concurrent]" });
                    if d.is_lazy {
                        out.push_str(" [Lazy]");
                    }
                    if d.mode_or {
                        out.push_str(" [OR]");
                    }
                    if d.all_pass {
                        out.push_str(" [PASS]");
                    }
                    out.push('\n');
                }
                path.push(id);
                for child in &d.children {
                    self.dump_node(out, *child, path);
                }
                path.pop();
            }
            Node::Algorithm(a) => {
                let _ = write!(
                    out,
                    "{}{} [Alg] [n= {}]",
                    "  ".repeat(indent),
                    a.name,
                    a.unit.cardinality()
                );
                if !a.unit.is_clonable() {
                    out.push_str(" [unclonable]");
                }
                out.push('\n');
            }
        }
    }

    fn push_decision(
        &mut self,
        name: &str,
        sequential: bool,
        is_lazy: bool,
        mode_or: bool,
        all_pass: bool,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::Decision(DecisionNode {
            name: name.to_string(),
            sequential,
            is_lazy,
            mode_or,
            all_pass,
            parents: Vec::new(),
            children: Vec::new(),
        }));
        self.decisions.insert(name.to_string(), id);
        id
    }

    fn parent_of(&self, parent_name: &str) -> Result<NodeId, GraphError> {
        if self.head.is_none() {
            return Err(GraphError::NoHead);
        }
        self.decisions
            .get(parent_name)
            .copied()
            .ok_or_else(|| GraphError::UnknownParent(parent_name.to_string()))
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Node::Decision(d) = &mut self.nodes[parent.0] {
            if !d.children.contains(&child) {
                d.children.push(child);
            }
        }
        self.nodes[child.0].add_parent(parent);
    }
}
