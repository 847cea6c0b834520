use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;

use super::types::TypeRelationship;

/// Weight of one relationship edge: the field that produces it.
#[derive(Debug, Clone)]
pub(crate) struct RelationEdge {
    pub field: String,
    pub is_list: bool,
}

/// Directed multigraph over type names: an edge per non-scalar-returning
/// field. The same (from, to) pair may carry many edges.
#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    graph: DiGraph<String, RelationEdge>,
    /// Index: type name -> node index.
    type_index: HashMap<String, NodeIndex>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every node and edge.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.type_index.clear();
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.type_index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.type_index.insert(name.to_string(), idx);
        idx
    }

    /// Record that a field on `from` returns (a wrapping of) `to`.
    pub fn add_relation(&mut self, from: &str, to: &str, field: &str, is_list: bool) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        self.graph.add_edge(
            from_idx,
            to_idx,
            RelationEdge {
                field: field.to_string(),
                is_list,
            },
        );
    }

    /// All relationships originating at `name`, in insertion order.
    pub fn relations_from(&self, name: &str) -> Vec<TypeRelationship> {
        self.directed(name, Direction::Outgoing)
    }

    /// All relationships pointing at `name`.
    pub fn relations_to(&self, name: &str) -> Vec<TypeRelationship> {
        self.directed(name, Direction::Incoming)
    }

    fn directed(&self, name: &str, direction: Direction) -> Vec<TypeRelationship> {
        let Some(&idx) = self.type_index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<TypeRelationship> = self
            .graph
            .edges_directed(idx, direction)
            .map(|edge| TypeRelationship {
                from_type: self.graph[edge.source()].clone(),
                to_type: self.graph[edge.target()].clone(),
                field_name: edge.weight().field.clone(),
                is_list: edge.weight().is_list,
            })
            .collect();
        // edges_directed iterates most-recent first; restore insertion order.
        out.reverse();
        out
    }

    /// Every relationship edge in the graph.
    pub fn all_relations(&self) -> Vec<TypeRelationship> {
        self.graph
            .edge_references()
            .map(|edge| TypeRelationship {
                from_type: self.graph[edge.source()].clone(),
                to_type: self.graph[edge.target()].clone(),
                field_name: edge.weight().field.clone(),
                is_list: edge.weight().is_list,
            })
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
