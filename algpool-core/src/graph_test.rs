#[cfg(test)]
mod tests {
    use crate::clone_pool::ClonePool;
    use crate::error::GraphError;
    use crate::graph::{Node, PrecedenceGraph, ROOT_NODE_NAME};
    use crate::infrastructure::UnitHandle;
    use crate::infrastructure_in_memory::{ConfiguredUnit, UnitSpec};
    use crate::types::Composition;
    use std::sync::Arc;

    fn unit(spec: UnitSpec) -> UnitHandle {
        Arc::new(ConfiguredUnit::new(Arc::new(spec)))
    }

    fn graph_with_head() -> PrecedenceGraph {
        let mut graph = PrecedenceGraph::new();
        graph
            .add_head_node(ROOT_NODE_NAME, false, false, false, true)
            .unwrap();
        graph
    }

    #[test]
    fn head_node_can_only_be_added_once() {
        let mut graph = graph_with_head();
        assert_eq!(
            graph.add_head_node("Other", false, false, false, true),
            Err(GraphError::HeadAlreadySet(ROOT_NODE_NAME.to_string()))
        );
        let head = graph.head().unwrap();
        assert!(head.all_pass && !head.mode_or && !head.is_lazy && !head.sequential);
    }

    #[test]
    fn nodes_require_a_head() {
        let mut graph = PrecedenceGraph::new();
        let alg = unit(UnitSpec::leaf("Alg"));
        assert_eq!(
            graph.add_algorithm_node(&alg, ROOT_NODE_NAME, false, false).err(),
            Some(GraphError::NoHead)
        );
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut graph = graph_with_head();
        let alg = unit(UnitSpec::leaf("Alg"));
        assert_eq!(
            graph.add_algorithm_node(&alg, "Missing", false, false).err(),
            Some(GraphError::UnknownParent("Missing".to_string()))
        );
        let seq = unit(UnitSpec::composite("Seq", &["Alg"], Composition::default()));
        assert!(graph
            .add_decision_hub_node(&seq, "Missing", false, false, false, false)
            .is_err());
        assert_eq!(graph.algorithm_count(), 0);
        assert_eq!(graph.decision_count(), 1);
    }

    #[test]
    fn shared_leaf_is_one_node_with_two_parents() {
        let mut graph = graph_with_head();
        let a = unit(UnitSpec::composite("SeqA", &["Shared"], Composition::default()));
        let b = unit(UnitSpec::composite("SeqB", &["Shared"], Composition::default()));
        let shared = unit(UnitSpec::leaf("Shared"));

        graph
            .add_decision_hub_node(&a, ROOT_NODE_NAME, false, false, false, false)
            .unwrap();
        graph
            .add_decision_hub_node(&b, ROOT_NODE_NAME, true, false, true, false)
            .unwrap();
        let first = graph.add_algorithm_node(&shared, "SeqA", false, false).unwrap();
        let second = graph.add_algorithm_node(&shared, "SeqB", false, false).unwrap();

        assert_eq!(first, second);
        assert_eq!(graph.algorithm_count(), 1);
        assert_eq!(graph.node(first).parents().len(), 2);

        // adding the same edge again does not duplicate it
        graph.add_algorithm_node(&shared, "SeqA", false, false).unwrap();
        let seq_a = graph.node_id("SeqA").unwrap();
        assert_eq!(graph.children(seq_a), &[first]);
    }

    #[test]
    fn attach_binds_pool_to_leaf() {
        let mut graph = graph_with_head();
        let alg = unit(UnitSpec::leaf("Alg"));
        graph.add_algorithm_node(&alg, ROOT_NODE_NAME, false, false).unwrap();

        let pool = Arc::new(ClonePool::new("Alg", 2, false));
        graph.attach_algorithms_to_nodes("Alg", Arc::clone(&pool)).unwrap();
        let node = graph.algorithm_node("Alg").unwrap();
        assert!(Arc::ptr_eq(node.pool.as_ref().unwrap(), &pool));

        assert_eq!(
            graph.attach_algorithms_to_nodes("Ghost", pool),
            Err(GraphError::UnknownAlgorithm("Ghost".to_string()))
        );
    }

    #[test]
    fn dump_renders_tree_without_root_line() {
        let mut graph = graph_with_head();
        let seq = unit(UnitSpec::composite("Seq", &["A", "B"], Composition::default()));
        let a = unit(UnitSpec::leaf("A").with_cardinality(4));
        let b = unit(UnitSpec::leaf("B").unclonable());

        graph
            .add_decision_hub_node(&seq, ROOT_NODE_NAME, true, true, true, false)
            .unwrap();
        graph.add_algorithm_node(&a, "Seq", false, false).unwrap();
        graph.add_algorithm_node(&b, "Seq", false, false).unwrap();

        let dump = graph.dump_control_flow();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(
            lines,
            vec![
                "  Seq [Seq] [Sequential] [Lazy] [OR]",
                "    A [Alg] [n= 4]",
                "    B [Alg] [n= 1] [unclonable]",
            ]
        );
        assert!(matches!(graph.node(graph.head_id().unwrap()), Node::Decision(_)));
    }
}
