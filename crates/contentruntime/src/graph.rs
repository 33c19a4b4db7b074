use contentcore::{NodeId, ValidationError, WorkflowDefinition};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Predecessor view of a workflow's edges
///
/// Built once per execution. No cycle check happens here; a cycle shows up
/// later as a layer with no ready nodes.
pub struct DependencyGraph {
    graph: DiGraph<NodeId, ()>,
    order: Vec<NodeId>,
    predecessors: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the dependency graph from the workflow
    pub fn build(workflow: &WorkflowDefinition) -> Result<Self, ValidationError> {
        let mut graph = DiGraph::new();
        let mut node_to_index: HashMap<&str, NodeIndex> = HashMap::new();

        for node in &workflow.nodes {
            let idx = graph.add_node(node.id.clone());
            node_to_index.insert(node.id.as_str(), idx);
        }

        for edge in &workflow.edges {
            let (Some(from), Some(to)) = (
                node_to_index.get(edge.from.as_str()),
                node_to_index.get(edge.to.as_str()),
            ) else {
                return Err(ValidationError::UnknownEdgeNode {
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                });
            };
            graph.add_edge(*from, *to, ());
        }

        let predecessors = workflow
            .nodes
            .iter()
            .map(|node| {
                let idx = node_to_index[node.id.as_str()];
                let mut deps: Vec<NodeIndex> = graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .collect();
                // definition order, parallel edges collapsed
                deps.sort();
                deps.dedup();
                let deps: Vec<NodeId> = deps.into_iter().map(|dep| graph[dep].clone()).collect();
                (node.id.clone(), deps)
            })
            .collect();

        Ok(Self {
            graph,
            order: workflow.nodes.iter().map(|n| n.id.clone()).collect(),
            predecessors,
        })
    }

    pub fn predecessors(&self, node_id: &str) -> &[NodeId] {
        self.predecessors
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes not yet executed whose predecessors have all been executed, in
    /// definition order
    pub fn ready_nodes(&self, executed: &HashSet<NodeId>) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|id| !executed.contains(*id))
            .filter(|id| {
                self.predecessors(id)
                    .iter()
                    .all(|dep| executed.contains(dep))
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Static cycle check, used for diagnostics only
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }
}
