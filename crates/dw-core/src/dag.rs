//! Dependency ordering for SQL steps

use crate::config::SqlStep;
use crate::error::{CoreError, CoreResult};
use crate::names::TableName;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// A directed acyclic graph of step dependencies.
///
/// Node weights are step names; node indices follow declaration order, which
/// is used to break ties so the resulting order is stable across runs.
#[derive(Debug)]
pub struct StepDag {
    graph: DiGraph<TableName, ()>,
    node_map: HashMap<TableName, NodeIndex>,
}

impl StepDag {
    /// Build the DAG from declared steps and validate it has no cycles.
    pub fn build(steps: &[SqlStep]) -> CoreResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map = HashMap::new();

        for step in steps {
            if node_map.contains_key(&step.name) {
                return Err(CoreError::Duplicate {
                    kind: "step".to_string(),
                    name: step.name.to_string(),
                });
            }
            let idx = graph.add_node(step.name.clone());
            node_map.insert(step.name.clone(), idx);
        }

        for step in steps {
            let to = node_map[&step.name];
            for dep in &step.depends_on {
                let from = node_map.get(dep).ok_or_else(|| CoreError::ConfigInvalid {
                    message: format!("step '{}' depends on unknown step '{}'", step.name, dep),
                })?;
                // Edge goes from dependency to dependent
                graph.add_edge(*from, to, ());
            }
        }

        let dag = Self { graph, node_map };
        dag.validate()?;
        Ok(dag)
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        match toposort(&self.graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Find a cycle path starting from a node for error reporting
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let mut path: Vec<String> = vec![self.graph[start].to_string()];
        let mut current = start;
        let mut visited = HashSet::new();
        visited.insert(current);

        while let Some(edge) = self.graph.edges(current).next() {
            let target = edge.target();
            path.push(self.graph[target].to_string());

            if target == start || visited.contains(&target) {
                break;
            }

            visited.insert(target);
            current = target;
        }

        path.join(" -> ")
    }

    /// Steps in dependency order; among ready steps the earliest declared runs first.
    pub fn ordered(&self) -> Vec<TableName> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|idx| self.graph.edges_directed(idx, Direction::Incoming).count())
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(i)) = ready.pop() {
            let idx = NodeIndex::new(i);
            order.push(self.graph[idx].clone());
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let t = edge.target().index();
                in_degree[t] -= 1;
                if in_degree[t] == 0 {
                    ready.push(Reverse(t));
                }
            }
        }
        order
    }

    /// Direct dependencies of a step
    pub fn dependencies(&self, name: &str) -> Vec<TableName> {
        self.node_map
            .get(name)
            .map(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .map(|e| self.graph[e.source()].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
