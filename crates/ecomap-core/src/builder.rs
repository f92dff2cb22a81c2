//! Graph Builder
//!
//! Turns loaded entities and relationships into a `GraphProjection` for one filter:
//!
//! 1. the filter selects the seed set,
//! 2. the closure policy decides which relationships survive,
//! 3. every surviving edge adds one to the degree of each endpoint,
//! 4. nodes get their label, tooltip, group and size.
//!
//! Building never fails. An empty seed set produces an empty projection.
//!
//! ## Usage
//!
//! ```ignore
//! use ecomap_core::builder::{ClosurePolicy, GraphBuilder};
//!
//! let builder = GraphBuilder::new().with_policy(ClosurePolicy::StrictAnd);
//! let projection = builder.build(&entities, &relationships, &filter);
//! println!("{} nodes, {} edges", projection.node_count(), projection.edge_count());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::filter::FilterSpec;
use crate::graph::{GraphProjection, ProjectedEdge, ProjectedNode};
use crate::model::{EntityRecord, RelationshipRecord};

// ============================================================================
// Closure Policy
// ============================================================================

/// Rule deciding which relationships cross into a projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClosurePolicy {
    /// Keep a relationship if either endpoint is a seed; both endpoints become nodes
    #[default]
    InclusiveOr,
    /// Keep a relationship only if both endpoints are seeds
    StrictAnd,
}

impl ClosurePolicy {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ClosurePolicy::InclusiveOr => "inclusive-or",
            ClosurePolicy::StrictAnd => "strict-and",
        }
    }

    /// Decide a relationship from the seed membership of its endpoints.
    pub fn admits(&self, source_is_seed: bool, target_is_seed: bool) -> bool {
        match self {
            ClosurePolicy::InclusiveOr => source_is_seed || target_is_seed,
            ClosurePolicy::StrictAnd => source_is_seed && target_is_seed,
        }
    }
}

impl fmt::Display for ClosurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Builder Configuration
// ============================================================================

/// Node size as a function of degree: `base + per_degree * max(degree, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSizing {
    pub base: u32,
    pub per_degree: u32,
}

impl Default for NodeSizing {
    fn default() -> Self {
        Self {
            base: 10,
            per_degree: 2,
        }
    }
}

impl NodeSizing {
    /// Size for a degree; isolated nodes get the degree-1 size.
    pub fn size_for(&self, degree: usize) -> u32 {
        let degree = u32::try_from(degree.max(1)).unwrap_or(u32::MAX);
        self.base.saturating_add(self.per_degree.saturating_mul(degree))
    }
}

/// Configuration for the graph builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuilderConfig {
    pub policy: ClosurePolicy,
    pub sizing: NodeSizing,
}

// ============================================================================
// Graph Builder
// ============================================================================

/// Builds graph projections from loaded records.
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: BuilderConfig,
}

impl GraphBuilder {
    /// Create a builder with the default policy and sizing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the closure policy
    pub fn with_policy(mut self, policy: ClosurePolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Set the node sizing
    pub fn with_sizing(mut self, sizing: NodeSizing) -> Self {
        self.config.sizing = sizing;
        self
    }

    /// Get the builder configuration
    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Ids of the entities matching the filter.
    pub fn select_seeds(&self, entities: &[EntityRecord], filter: &FilterSpec) -> BTreeSet<String> {
        entities
            .iter()
            .filter(|record| filter.matches(record))
            .map(|record| record.id.clone())
            .collect()
    }

    /// Build the projection of `entities` and `relationships` for `filter`.
    pub fn build(
        &self,
        entities: &[EntityRecord],
        relationships: &[RelationshipRecord],
        filter: &FilterSpec,
    ) -> GraphProjection {
        let policy = self.config.policy;
        let sizing = &self.config.sizing;

        let mut index: HashMap<&str, &EntityRecord> = HashMap::with_capacity(entities.len());
        for record in entities {
            index.entry(record.id.as_str()).or_insert(record);
        }

        let seed = self.select_seeds(entities, filter);
        debug!("Filter {} selected {} seed(s)", filter, seed.len());

        let mut node_ids: BTreeSet<&str> = seed.iter().map(String::as_str).collect();
        let mut degree: BTreeMap<String, usize> = BTreeMap::new();
        let mut edges = Vec::new();

        for rel in relationships {
            let source_is_seed = seed.contains(&rel.source_id);
            let target_is_seed = seed.contains(&rel.target_id);
            if !policy.admits(source_is_seed, target_is_seed) {
                continue;
            }

            *degree.entry(rel.source_id.clone()).or_default() += 1;
            *degree.entry(rel.target_id.clone()).or_default() += 1;
            node_ids.insert(rel.source_id.as_str());
            node_ids.insert(rel.target_id.as_str());
            edges.push(ProjectedEdge::from(rel));
        }

        let nodes: BTreeMap<String, ProjectedNode> = node_ids
            .into_iter()
            .map(|id| {
                let d = degree.get(id).copied().unwrap_or(0);
                let node = match index.get(id) {
                    Some(record) => ProjectedNode::classified(record, d, seed.contains(id), sizing),
                    None => ProjectedNode::unclassified(id, d, sizing),
                };
                (id.to_string(), node)
            })
            .collect();

        let projection = GraphProjection::new(policy, seed, nodes, edges, degree);
        info!(
            "Built {} projection: {} node(s), {} edge(s), {} unclassified",
            policy,
            projection.node_count(),
            projection.edge_count(),
            projection.unclassified().count()
        );
        projection
    }
}
