//! Navigation queries over a waypoint graph snapshot.
//!
//! Pure functions of an immutable [`WaypointGraph`], so they run on whatever
//! thread holds the snapshot (network threads, in practice).
//!
//! - `nearest_node` - linear scan, first-encountered wins ties
//! - `nodes_within_radius` - distance filter, ascending sort, truncation
//! - `nodes_in_field_of_view` - angle filter, ascending sort by distance
//! - `shortest_path` - breadth-first hop search (unweighted), distance summed afterwards

use super::waypoints::{WaypointGraph, WaypointId, WaypointNode};
use glam::Vec3;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavError {
    /// Graph missing or empty
    #[error("Waypoint system not found")]
    Unavailable,
    /// Path endpoints not in the graph
    #[error("Invalid waypoint IDs: from={from}, to={to}")]
    InvalidNode { from: WaypointId, to: WaypointId },
}

/// Node matched by a spatial query
#[derive(Debug, Clone, PartialEq)]
pub struct NodeHit<'a> {
    pub node: &'a WaypointNode,
    pub distance: f32,
}

/// Result of [`NavQuery::shortest_path`]
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    /// Node ids from start to goal, both included. Empty when not found.
    pub path: Vec<WaypointId>,
    /// Sum of Euclidean edge lengths along `path`
    pub total_distance: f32,
    pub found: bool,
}

/// Query engine borrowing one graph snapshot
#[derive(Debug, Clone, Copy)]
pub struct NavQuery<'a> {
    graph: &'a WaypointGraph,
}

impl<'a> NavQuery<'a> {
    pub fn new(graph: &'a WaypointGraph) -> Self {
        Self { graph }
    }

    fn ensure_available(&self) -> Result<(), NavError> {
        if self.graph.is_empty() {
            Err(NavError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Closest node to `point`
    pub fn nearest_node(&self, point: Vec3) -> Result<NodeHit<'a>, NavError> {
        self.ensure_available()?;
        let mut best: Option<NodeHit<'a>> = None;
        for node in self.graph.nodes() {
            let distance = node.position.distance(point);
            // Strict `<`: first-encountered wins ties
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(NodeHit { node, distance });
            }
        }
        best.ok_or(NavError::Unavailable)
    }

    /// Nodes within `max_distance` of `origin`, nearest first, at most `max_count`
    pub fn nodes_within_radius(
        &self,
        origin: Vec3,
        max_distance: f32,
        max_count: usize,
    ) -> Result<Vec<NodeHit<'a>>, NavError> {
        self.ensure_available()?;
        let mut hits: Vec<NodeHit<'a>> = self
            .graph
            .nodes()
            .map(|node| NodeHit { node, distance: node.position.distance(origin) })
            .filter(|hit| hit.distance <= max_distance)
            .collect();
        sort_by_distance(&mut hits);
        hits.truncate(max_count);
        Ok(hits)
    }

    /// Nodes whose direction from `origin` is within `fov_degrees` of `forward`, nearest first
    pub fn nodes_in_field_of_view(
        &self,
        origin: Vec3,
        forward: Vec3,
        fov_degrees: f32,
    ) -> Result<Vec<NodeHit<'a>>, NavError> {
        self.ensure_available()?;
        let mut hits: Vec<NodeHit<'a>> = self
            .graph
            .nodes()
            .filter(|node| angle_between(forward, node.position - origin) <= fov_degrees)
            .map(|node| NodeHit { node, distance: node.position.distance(origin) })
            .collect();
        sort_by_distance(&mut hits);
        Ok(hits)
    }

    /// Fewest-hops path from `from` to `to`.
    ///
    /// Equal-hop alternatives are decided by connection order. `total_distance`
    /// is measured along the returned path, so it is not necessarily the
    /// shortest Euclidean route.
    pub fn shortest_path(&self, from: WaypointId, to: WaypointId) -> Result<PathResult, NavError> {
        self.ensure_available()?;
        if !self.graph.contains(from) || !self.graph.contains(to) {
            return Err(NavError::InvalidNode { from, to });
        }
        if from == to {
            return Ok(PathResult { path: vec![from], total_distance: 0.0, found: true });
        }

        let mut queue = VecDeque::from([from]);
        let mut visited = HashSet::from([from]);
        let mut parent: HashMap<WaypointId, WaypointId> = HashMap::new();
        let mut found = false;

        while let Some(current) = queue.pop_front() {
            if current == to {
                found = true;
                break;
            }
            for next in self.graph.neighbors(current) {
                if visited.insert(next.id) {
                    parent.insert(next.id, current);
                    queue.push_back(next.id);
                }
            }
        }

        if !found {
            return Ok(PathResult { path: Vec::new(), total_distance: 0.0, found: false });
        }

        let mut path = vec![to];
        let mut node = to;
        while node != from {
            match parent.get(&node) {
                Some(&p) => {
                    path.push(p);
                    node = p;
                }
                None => break,
            }
        }
        path.reverse();

        let total_distance = path
            .windows(2)
            .filter_map(|pair| {
                let a = self.graph.node(pair[0])?;
                let b = self.graph.node(pair[1])?;
                Some(a.position.distance(b.position))
            })
            .sum();

        Ok(PathResult { path, total_distance, found: true })
    }
}

/// Unsigned angle between two vectors in degrees, `[0, 180]`.
///
/// Zero-length input yields 0, so a node sitting on the origin counts as in view.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denom = (a.length_squared() * b.length_squared()).sqrt();
    if denom < 1e-15 {
        return 0.0;
    }
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

fn sort_by_distance(hits: &mut [NodeHit<'_>]) {
    // Stable: equal distances keep enumeration order
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}
