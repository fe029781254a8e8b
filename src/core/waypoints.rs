//! Waypoint graph store with a short-lived snapshot cache.
//!
//! # Data flow
//!
//! ```text
//! Scene (owns live waypoints)
//!     │  waypoint_container() / waypoint_nodes()
//!     ▼
//! WaypointStore::snapshot()      rebuild when TTL expired or container changed
//!     │
//!     ▼
//! Arc<WaypointGraph>             immutable, shared with network threads
//! ```
//!
//! A request grabs one `Arc` and keeps it for its whole lifetime, so a rebuild
//! happening concurrently never changes the graph a query is walking.

use glam::Vec3;
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type WaypointId = i32;

/// Waypoint as described by the scene (connections may be one-sided or dangling)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointSpec {
    pub id: WaypointId,
    pub position: [f32; 3],
    #[serde(default)]
    pub connections: Vec<WaypointId>,
}

/// Node of a validated graph
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointNode {
    pub id: WaypointId,
    pub position: Vec3,
    /// Neighbor ids in scene order. Symmetric: if A lists B, B lists A.
    pub connections: IndexSet<WaypointId>,
}

/// Immutable undirected waypoint graph
#[derive(Debug, Clone, Default)]
pub struct WaypointGraph {
    nodes: IndexMap<WaypointId, WaypointNode>,
}

impl WaypointGraph {
    /// Build graph from scene specs.
    ///
    /// Duplicate ids keep the first occurrence. Connections to unknown ids and
    /// self-loops are dropped. One-sided connections are mirrored.
    pub fn from_specs(specs: &[WaypointSpec]) -> Self {
        let mut nodes: IndexMap<WaypointId, WaypointNode> = IndexMap::with_capacity(specs.len());
        for spec in specs {
            if nodes.contains_key(&spec.id) {
                warn!("Duplicate waypoint id {}, keeping first", spec.id);
                continue;
            }
            nodes.insert(
                spec.id,
                WaypointNode {
                    id: spec.id,
                    position: Vec3::from_array(spec.position),
                    connections: IndexSet::new(),
                },
            );
        }

        let mut edges = Vec::new();
        let mut seen = IndexSet::new();
        for spec in specs {
            // Only the surviving spec for each id contributes edges
            if !seen.insert(spec.id) {
                continue;
            }
            for &other in &spec.connections {
                if other == spec.id {
                    continue;
                }
                if !nodes.contains_key(&other) {
                    warn!("Waypoint {} connects to missing waypoint {}, dropped", spec.id, other);
                    continue;
                }
                edges.push((spec.id, other));
            }
        }

        for (a, b) in edges {
            if let Some(node) = nodes.get_mut(&a) {
                node.connections.insert(b);
            }
            if let Some(node) = nodes.get_mut(&b) {
                node.connections.insert(a);
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: WaypointId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: WaypointId) -> Option<&WaypointNode> {
        self.nodes.get(&id)
    }

    /// All nodes in scene enumeration order
    pub fn nodes(&self) -> impl Iterator<Item = &WaypointNode> {
        self.nodes.values()
    }

    /// Neighbors of `id` in connection order (empty for unknown ids)
    pub fn neighbors(&self, id: WaypointId) -> impl Iterator<Item = &WaypointNode> {
        self.nodes
            .get(&id)
            .into_iter()
            .flat_map(|n| n.connections.iter())
            .filter_map(|other| self.nodes.get(other))
    }
}

/// Source of live waypoint data (implemented by the scene)
pub trait WaypointSource {
    /// Identity of the current waypoint container, `None` if the scene has none
    fn waypoint_container(&self) -> Option<u64>;
    /// Enumerate all waypoints of the current container
    fn waypoint_nodes(&self) -> Vec<WaypointSpec>;
}

/// Cached graph snapshot, refreshed on a TTL or when the container changes
#[derive(Debug)]
pub struct WaypointStore {
    ttl: f64,
    cached: Option<CachedGraph>,
}

#[derive(Debug)]
struct CachedGraph {
    container: u64,
    built_at: f64,
    graph: Arc<WaypointGraph>,
}

impl WaypointStore {
    /// `ttl` in simulation seconds
    pub fn new(ttl: f64) -> Self {
        Self { ttl: ttl.max(0.0), cached: None }
    }

    /// Current graph snapshot, rebuilding if stale.
    ///
    /// Returns `None` when the scene has no waypoint container.
    pub fn snapshot<S>(&mut self, now: f64, source: &S) -> Option<Arc<WaypointGraph>>
    where
        S: WaypointSource + ?Sized,
    {
        let Some(container) = source.waypoint_container() else {
            if self.cached.take().is_some() {
                debug!("Waypoint container gone, cache cleared");
            }
            return None;
        };

        if let Some(cached) = &self.cached {
            let fresh = now - cached.built_at < self.ttl;
            if fresh && cached.container == container {
                return Some(Arc::clone(&cached.graph));
            }
        }

        let graph = Arc::new(WaypointGraph::from_specs(&source.waypoint_nodes()));
        debug!("Waypoint graph rebuilt: {} nodes (container {})", graph.len(), container);
        self.cached = Some(CachedGraph {
            container,
            built_at: now,
            graph: Arc::clone(&graph),
        });
        Some(graph)
    }

    /// Drop the cached graph; next snapshot rebuilds
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
