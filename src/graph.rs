//! Stack dependency graph.
//!
//! A stack that imports a value from another stack must be deployed after it.
//! Edges point from the producing stack to the consuming stack, so a
//! topological sort yields a valid deployment order.

use std::collections::HashMap;

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::error::{Error, Result};

/// Deployment ordering between stacks.
#[derive(Debug, Clone, Default)]
pub struct StackGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl StackGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stack, returning the existing node if already present.
    pub fn add_stack(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.node_indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), idx);
        idx
    }

    /// Record that `consumer` must be deployed after `producer`.
    pub fn add_dependency(&mut self, consumer: &str, producer: &str) -> Result<()> {
        let from = *self
            .node_indices
            .get(producer)
            .ok_or_else(|| Error::StackNotFound(producer.to_string()))?;
        let to = *self
            .node_indices
            .get(consumer)
            .ok_or_else(|| Error::StackNotFound(consumer.to_string()))?;
        if from != to && !self.graph.contains_edge(from, to) {
            self.graph.add_edge(from, to, ());
        }
        Ok(())
    }

    /// Stacks `name` must be deployed after, in insertion order.
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        let Some(&idx) = self.node_indices.get(name) else {
            return Vec::new();
        };
        let mut deps: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        deps.sort();
        deps.into_iter()
            .filter_map(|i| self.graph.node_weight(i).cloned())
            .collect()
    }

    /// Stacks caught in a dependency cycle, if any.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                scc.into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect()
            })
            .collect()
    }

    /// Order in which the stacks can be deployed.
    ///
    /// Stacks are grouped by their depth in the graph; within a group they
    /// keep insertion order, so the result is stable across runs.
    pub fn deployment_order(&self) -> Result<Vec<String>> {
        let sorted = toposort(&self.graph, None).map_err(|_| {
            let mut cycle = self.cycles().into_iter().next().unwrap_or_default();
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            Error::DependencyCycle(cycle)
        })?;

        let mut depth = vec![0usize; self.graph.node_count()];
        for idx in &sorted {
            for next in self.graph.neighbors_directed(*idx, Direction::Outgoing) {
                depth[next.index()] = depth[next.index()].max(depth[idx.index()] + 1);
            }
        }

        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by_key(|idx| (depth[idx.index()], idx.index()));
        Ok(nodes
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_deploys_first() {
        let mut graph = StackGraph::new();
        graph.add_stack("cloudfront");
        graph.add_stack("s3");
        graph.add_dependency("cloudfront", "s3").unwrap();

        assert_eq!(graph.deployment_order().unwrap(), vec!["s3", "cloudfront"]);
        assert_eq!(graph.dependencies("cloudfront"), vec!["s3".to_string()]);
        assert!(graph.dependencies("s3").is_empty());
    }

    #[test]
    fn test_independent_stacks_keep_insertion_order() {
        let mut graph = StackGraph::new();
        for name in ["c", "a", "b"] {
            graph.add_stack(name);
        }
        graph.add_dependency("c", "b").unwrap();
        assert_eq!(graph.deployment_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = StackGraph::new();
        graph.add_stack("a");
        graph.add_stack("b");
        graph.add_dependency("b", "a").unwrap();
        graph.add_dependency("b", "a").unwrap();
        assert_eq!(graph.dependencies("b").len(), 1);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = StackGraph::new();
        graph.add_stack("a");
        graph.add_stack("b");
        graph.add_dependency("a", "b").unwrap();
        graph.add_dependency("b", "a").unwrap();

        assert_eq!(graph.cycles().len(), 1);
        match graph.deployment_order() {
            Err(Error::DependencyCycle(stacks)) => {
                assert_eq!(stacks.len(), 3);
                assert_eq!(stacks.first(), stacks.last());
            }
            other => panic!("expected a cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_stack() {
        let mut graph = StackGraph::new();
        graph.add_stack("a");
        assert!(matches!(
            graph.add_dependency("a", "missing"),
            Err(Error::StackNotFound(_))
        ));
    }
}
