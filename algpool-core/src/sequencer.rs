use crate::error::FlattenError;
use crate::graph::PrecedenceGraph;
use crate::infrastructure::UnitFactory;
use crate::registry::UnitRegistry;
use crate::types::{Composition, TypeName, UnitId};
use std::sync::Arc;
use tracing::debug;

/// Node-local control flags of a decision node, derived from a composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionFlags {
    pub sequential: bool,
    pub is_lazy: bool,
    pub mode_or: bool,
    pub all_pass: bool,
}

impl From<Composition> for DecisionFlags {
    fn from(c: Composition) -> Self {
        Self {
            sequential: c.is_sequential(),
            // Ignoring every result means every member has to run
            is_lazy: c.is_lazy() && !c.all_pass,
            mode_or: c.mode_or(),
            all_pass: c.all_pass,
        }
    }
}

enum Target {
    Unit(UnitId),
    Member(TypeName),
}

struct Frame {
    target: Target,
    parent: String,
    depth: usize,
}

/// Unrolls composite units into decision nodes and a flat list of leaves.
///
/// The walk is depth-first and pre-order, driven by an explicit stack so that
/// deeply nested configurations cannot overflow the call stack.
pub struct SequencerFlattener<'a> {
    registry: &'a mut UnitRegistry,
    graph: &'a mut PrecedenceGraph,
    factory: &'a dyn UnitFactory,
    max_depth: usize,
}

impl<'a> SequencerFlattener<'a> {
    pub fn new(
        registry: &'a mut UnitRegistry,
        graph: &'a mut PrecedenceGraph,
        factory: &'a dyn UnitFactory,
        max_depth: usize,
    ) -> Self {
        Self {
            registry,
            graph,
            factory,
            max_depth,
        }
    }

    /// Flattens `unit` under the decision node `parent_name`, appending every
    /// leaf reached to `flat` in first-visit order (duplicates included).
    /// Stops at the first failure without visiting the remaining members.
    pub fn flatten(
        &mut self,
        unit: UnitId,
        parent_name: &str,
        flat: &mut Vec<UnitId>,
    ) -> Result<(), FlattenError> {
        let mut stack = vec![Frame {
            target: Target::Unit(unit),
            parent: parent_name.to_string(),
            depth: 0,
        }];

        while let Some(frame) = stack.pop() {
            let id = match frame.target {
                Target::Unit(id) => id,
                Target::Member(ref member) => self.registry.resolve(member, self.factory)?,
            };
            let handle = Arc::clone(self.registry.get(id));
            let indent = " ".repeat(frame.depth);

            if frame.depth > self.max_depth {
                return Err(FlattenError::DepthExceeded {
                    name: handle.name().to_string(),
                    max_depth: self.max_depth,
                });
            }

            // Empty composites are treated as plain leaves
            if handle.members().is_empty() {
                debug!("{}Algorithm '{}' discovered", indent, handle.name());
                self.graph
                    .add_algorithm_node(&handle, &frame.parent, false, false)?;
                flat.push(id);
                continue;
            }

            debug!("{}Decision hub '{}' discovered", indent, handle.name());
            let flags = DecisionFlags::from(handle.composition());
            self.graph.add_decision_hub_node(
                &handle,
                &frame.parent,
                flags.sequential,
                flags.is_lazy,
                flags.mode_or,
                flags.all_pass,
            )?;

            for member in handle.members().iter().rev() {
                stack.push(Frame {
                    target: Target::Member(member.clone()),
                    parent: handle.name().to_string(),
                    depth: frame.depth + 1,
                });
            }
        }

        Ok(())
    }
}

/// Removes every later repetition of a unit, keeping first occurrences in place
pub fn dedup_by_identity(list: &mut Vec<UnitId>) {
    let mut i = 0;
    while i < list.len() {
        let mut j = i + 1;
        while j < list.len() {
            if list[j] == list[i] {
                list.remove(j);
            } else {
                j += 1;
            }
        }
        i += 1;
    }
}
