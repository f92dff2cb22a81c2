//! Graph Projection Types
//!
//! A `GraphProjection` is the output of one graph build: the nodes and edges that
//! survived filtering and edge closure, the degree of every touched id, and the
//! visual attributes a renderer needs (label, tooltip, group, size).
//!
//! Projections are plain owned data. They can be converted to the node/edge JSON
//! consumed by network renderers, or to a `petgraph` view for neighbourhood and
//! component queries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::builder::{ClosurePolicy, NodeSizing};
use crate::model::{EntityRecord, RelationshipRecord, UNCLASSIFIED_GROUP};

// ============================================================================
// Nodes and Edges
// ============================================================================

/// A node of the projection with its derived visual attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedNode {
    pub id: String,
    pub label: String,
    /// Hover text, e.g. "Service: Food Bank\nDegree: 2"
    pub tooltip: String,
    /// Category label, or "Unclassified" for dangling ids
    pub group: String,
    pub size: u32,
    pub degree: usize,
    /// Whether the node matched the filter itself
    pub seed: bool,
    /// Whether a loaded entity backs this node
    pub classified: bool,
}

impl ProjectedNode {
    /// Node for an id backed by a loaded entity.
    pub fn classified(record: &EntityRecord, degree: usize, seed: bool, sizing: &NodeSizing) -> Self {
        Self {
            id: record.id.clone(),
            label: record.label().to_string(),
            tooltip: format!("{}: {}\nDegree: {}", record.category, record.label(), degree),
            group: record.category.to_string(),
            size: sizing.size_for(degree),
            degree,
            seed,
            classified: true,
        }
    }

    /// Node for a relationship endpoint with no loaded entity.
    pub fn unclassified(id: &str, degree: usize, sizing: &NodeSizing) -> Self {
        Self {
            id: id.to_string(),
            label: id.to_string(),
            tooltip: format!("{}\nDegree: {}", id, degree),
            group: UNCLASSIFIED_GROUP.to_string(),
            size: sizing.size_for(degree),
            degree,
            seed: false,
            classified: false,
        }
    }
}

/// A directed edge of the projection, one per surviving relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedEdge {
    /// Relationship document id
    pub id: String,
    pub source: String,
    pub target: String,
    pub relationship_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectedEdge {
    /// Hover text: the description, or empty
    pub fn tooltip(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

impl From<&RelationshipRecord> for ProjectedEdge {
    fn from(rel: &RelationshipRecord) -> Self {
        Self {
            id: rel.id.clone(),
            source: rel.source_id.clone(),
            target: rel.target_id.clone(),
            relationship_type: rel.relationship_type.clone(),
            description: rel.description.clone(),
        }
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Result of one graph build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphProjection {
    policy: ClosurePolicy,
    seed: BTreeSet<String>,
    nodes: BTreeMap<String, ProjectedNode>,
    edges: Vec<ProjectedEdge>,
    degree: BTreeMap<String, usize>,
}

impl GraphProjection {
    pub(crate) fn new(
        policy: ClosurePolicy,
        seed: BTreeSet<String>,
        nodes: BTreeMap<String, ProjectedNode>,
        edges: Vec<ProjectedEdge>,
        degree: BTreeMap<String, usize>,
    ) -> Self {
        Self {
            policy,
            seed,
            nodes,
            edges,
            degree,
        }
    }

    /// Closure policy the projection was built with
    pub fn policy(&self) -> ClosurePolicy {
        self.policy
    }

    /// Ids that matched the filter
    pub fn seed(&self) -> &BTreeSet<String> {
        &self.seed
    }

    /// Check if an id matched the filter
    pub fn is_seed(&self, id: &str) -> bool {
        self.seed.contains(id)
    }

    /// Nodes keyed by id
    pub fn nodes(&self) -> &BTreeMap<String, ProjectedNode> {
        &self.nodes
    }

    /// Get a node by id
    pub fn node(&self, id: &str) -> Option<&ProjectedNode> {
        self.nodes.get(id)
    }

    /// Check if a node exists
    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Edges in relationship load order
    pub fn edges(&self) -> &[ProjectedEdge] {
        &self.edges
    }

    /// Degree of every id touched by a surviving edge
    pub fn degree(&self) -> &BTreeMap<String, usize> {
        &self.degree
    }

    /// Degree of an id; zero when no surviving edge touches it
    pub fn degree_of(&self, id: &str) -> usize {
        self.degree.get(id).copied().unwrap_or(0)
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if the projection has no nodes (nothing matched)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes for relationship endpoints with no loaded entity
    pub fn unclassified(&self) -> impl Iterator<Item = &ProjectedNode> {
        self.nodes.values().filter(|n| !n.classified)
    }

    /// Ids adjacent to `id` through a surviving edge, in either direction.
    pub fn neighbors(&self, id: &str) -> BTreeSet<&str> {
        self.edges
            .iter()
            .filter_map(|e| {
                if e.source == id {
                    Some(e.target.as_str())
                } else if e.target == id {
                    Some(e.source.as_str())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Counts describing the projection.
    pub fn summary(&self) -> ProjectionSummary {
        let mut groups: BTreeMap<String, usize> = BTreeMap::new();
        for node in self.nodes.values() {
            *groups.entry(node.group.clone()).or_default() += 1;
        }

        let mut relationship_types: BTreeMap<String, usize> = BTreeMap::new();
        for edge in &self.edges {
            *relationship_types
                .entry(edge.relationship_type.clone())
                .or_default() += 1;
        }

        ProjectionSummary {
            policy: self.policy,
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            seed_count: self.seed.len(),
            unclassified_count: self.unclassified().count(),
            component_count: self.to_petgraph().component_count(),
            groups,
            relationship_types,
        }
    }

    /// Node/edge document in the shape network renderers consume.
    pub fn to_render_graph(&self) -> RenderGraph<'_> {
        RenderGraph {
            nodes: self
                .nodes
                .values()
                .map(|n| RenderNode {
                    id: &n.id,
                    label: &n.label,
                    title: &n.tooltip,
                    group: &n.group,
                    size: n.size,
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|e| RenderEdge {
                    from: &e.source,
                    to: &e.target,
                    label: &e.relationship_type,
                    title: e.tooltip(),
                })
                .collect(),
        }
    }

    /// Render graph serialized as pretty JSON.
    pub fn to_render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_render_graph())
    }

    /// Build a `petgraph` view of the projection.
    pub fn to_petgraph(&self) -> ProjectionGraph {
        let mut view = ProjectionGraph::default();
        for node in self.nodes.values() {
            view.add_node(node.clone());
        }
        for edge in &self.edges {
            view.add_edge(edge.clone());
        }
        view
    }
}

/// Counts describing a projection, for logs and CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectionSummary {
    pub policy: ClosurePolicy,
    pub node_count: usize,
    pub edge_count: usize,
    pub seed_count: usize,
    pub unclassified_count: usize,
    /// Weakly connected components
    pub component_count: usize,
    /// Node count per group
    pub groups: BTreeMap<String, usize>,
    /// Edge count per relationship type
    pub relationship_types: BTreeMap<String, usize>,
}

// ============================================================================
// Render Document
// ============================================================================

/// Node entry of the render document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderNode<'a> {
    pub id: &'a str,
    pub label: &'a str,
    pub title: &'a str,
    pub group: &'a str,
    pub size: u32,
}

/// Edge entry of the render document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderEdge<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub label: &'a str,
    pub title: &'a str,
}

/// `{ "nodes": [...], "edges": [...] }` document for network renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderGraph<'a> {
    pub nodes: Vec<RenderNode<'a>>,
    pub edges: Vec<RenderEdge<'a>>,
}

// ============================================================================
// Petgraph View
// ============================================================================

/// Directed `petgraph` view of a projection.
///
/// Parallel edges and self-loops are kept, one graph edge per relationship.
#[derive(Debug, Clone, Default)]
pub struct ProjectionGraph {
    graph: StableGraph<ProjectedNode, ProjectedEdge>,
    node_index_map: HashMap<String, NodeIndex>,
}

impl ProjectionGraph {
    fn add_node(&mut self, node: ProjectedNode) -> NodeIndex {
        if let Some(&idx) = self.node_index_map.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_index_map.insert(id, idx);
        idx
    }

    fn add_edge(&mut self, edge: ProjectedEdge) -> bool {
        let (Some(&source), Some(&target)) = (
            self.node_index_map.get(&edge.source),
            self.node_index_map.get(&edge.target),
        ) else {
            return false;
        };
        self.graph.add_edge(source, target, edge);
        true
    }

    /// Get the underlying petgraph
    pub fn graph(&self) -> &StableGraph<ProjectedNode, ProjectedEdge> {
        &self.graph
    }

    /// Get the node index for an id
    pub fn node_index(&self, id: &str) -> Option<NodeIndex> {
        self.node_index_map.get(id).copied()
    }

    /// Get a node by id
    pub fn node(&self, id: &str) -> Option<&ProjectedNode> {
        self.node_index(id)
            .and_then(|idx| self.graph.node_weight(idx))
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes reached by edges leaving `id`, with the edge taken
    pub fn outgoing(&self, id: &str) -> Vec<(&ProjectedNode, &ProjectedEdge)> {
        self.directed(id, Direction::Outgoing)
    }

    /// Nodes with edges arriving at `id`, with the edge taken
    pub fn incoming(&self, id: &str) -> Vec<(&ProjectedNode, &ProjectedEdge)> {
        self.directed(id, Direction::Incoming)
    }

    fn directed(&self, id: &str, direction: Direction) -> Vec<(&ProjectedNode, &ProjectedEdge)> {
        let Some(idx) = self.node_index(id) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, direction)
            .filter_map(|edge_ref| {
                let other = match direction {
                    Direction::Outgoing => edge_ref.target(),
                    Direction::Incoming => edge_ref.source(),
                };
                Some((self.graph.node_weight(other)?, edge_ref.weight()))
            })
            .collect()
    }

    /// Number of weakly connected components.
    pub fn component_count(&self) -> usize {
        let mut components = UnionFind::<usize>::new(self.graph.node_bound());
        for edge_ref in self.graph.edge_references() {
            components.union(edge_ref.source().index(), edge_ref.target().index());
        }

        let roots: BTreeSet<usize> = self
            .graph
            .node_indices()
            .map(|idx| components.find(idx.index()))
            .collect();
        roots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn sample() -> GraphProjection {
        let sizing = NodeSizing::default();
        let a = EntityRecord::new("a", Category::Organization).with_name("Alpha");
        let edges = vec![
            ProjectedEdge::from(&RelationshipRecord::new("r1", "a", "z").with_type("funds")),
            ProjectedEdge::from(
                &RelationshipRecord::new("r2", "a", "z").with_description("second link"),
            ),
        ];
        let mut nodes = BTreeMap::new();
        nodes.insert("a".to_string(), ProjectedNode::classified(&a, 2, true, &sizing));
        nodes.insert("z".to_string(), ProjectedNode::unclassified("z", 2, &sizing));
        nodes.insert(
            "lonely".to_string(),
            ProjectedNode::classified(&EntityRecord::new("lonely", Category::Item), 0, true, &sizing),
        );
        let degree = BTreeMap::from([("a".to_string(), 2), ("z".to_string(), 2)]);
        let seed = BTreeSet::from(["a".to_string(), "lonely".to_string()]);
        GraphProjection::new(ClosurePolicy::InclusiveOr, seed, nodes, edges, degree)
    }

    #[test]
    fn test_node_attributes() {
        let projection = sample();
        let a = projection.node("a").unwrap();
        assert_eq!(a.tooltip, "Organization: Alpha\nDegree: 2");
        assert_eq!(a.group, "Organization");
        assert_eq!(a.size, 14);

        let z = projection.node("z").unwrap();
        assert_eq!(z.tooltip, "z\nDegree: 2");
        assert_eq!(z.group, UNCLASSIFIED_GROUP);
        assert!(!z.classified);

        let lonely = projection.node("lonely").unwrap();
        assert_eq!(lonely.size, 12);
        assert_eq!(projection.degree_of("lonely"), 0);
    }

    #[test]
    fn test_summary() {
        let summary = sample().summary();
        assert_eq!(summary.node_count, 3);
        assert_eq!(summary.edge_count, 2);
        assert_eq!(summary.seed_count, 2);
        assert_eq!(summary.unclassified_count, 1);
        assert_eq!(summary.component_count, 2);
        assert_eq!(summary.groups.get("Organization"), Some(&1));
        assert_eq!(summary.relationship_types.get("funds"), Some(&1));
        assert_eq!(summary.relationship_types.get("relatesTo"), Some(&1));
    }

    #[test]
    fn test_render_json_shape() {
        let projection = sample();
        let json: serde_json::Value =
            serde_json::from_str(&projection.to_render_json().unwrap()).unwrap();

        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0]["id"], "a");
        assert_eq!(nodes[0]["title"], "Organization: Alpha\nDegree: 2");
        assert_eq!(nodes[0]["size"], 14);

        let edges = json["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0]["from"], "a");
        assert_eq!(edges[0]["to"], "z");
        assert_eq!(edges[0]["label"], "funds");
        assert_eq!(edges[0]["title"], "");
        assert_eq!(edges[1]["title"], "second link");
    }

    #[test]
    fn test_petgraph_view_keeps_parallel_edges() {
        let view = sample().to_petgraph();
        assert_eq!(view.node_count(), 3);
        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.outgoing("a").len(), 2);
        assert_eq!(view.incoming("z").len(), 2);
        assert!(view.incoming("a").is_empty());
        assert!(view.outgoing("missing").is_empty());
        assert_eq!(view.node("z").map(|n| n.group.as_str()), Some("Unclassified"));
    }

    #[test]
    fn test_neighbors() {
        let projection = sample();
        assert_eq!(projection.neighbors("a"), BTreeSet::from(["z"]));
        assert_eq!(projection.neighbors("z"), BTreeSet::from(["a"]));
        assert!(projection.neighbors("lonely").is_empty());
    }
}
