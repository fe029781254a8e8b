//! Waypoint queries.
//!
//! One dispatched call grabs the graph snapshot and the player pose; the
//! graph math then runs here on the network thread against that snapshot.

use super::{ServiceContext, degraded_default};
use crate::core::nav::{NavQuery, angle_between};
use crate::core::waypoints::{WaypointGraph, WaypointId};
use crate::core::{DispatchError, PlayerView};
use crate::server::models::{
    NearestWaypointResponse, WaypointData, WaypointPathResponse, WaypointsResponse,
};
use crate::server::registry::{ApiRequest, ApiService, EndpointRegistry};
use crate::server::response::{ApiError, ApiResponse};
use glam::Vec3;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_MAX_DISTANCE: f32 = 50.0;
pub const DEFAULT_MAX_COUNT: usize = 10;
pub const DEFAULT_FOV: f32 = 60.0;

/// Graph and player pose captured together on the simulation thread
struct WorldSnapshot {
    graph: Option<Arc<WaypointGraph>>,
    player: Option<PlayerView>,
}

impl WorldSnapshot {
    fn graph(&self) -> Result<&WaypointGraph, ApiError> {
        match self.graph.as_deref() {
            Some(g) if !g.is_empty() => Ok(g),
            _ => Err(ApiError::WaypointSystemNotFound),
        }
    }

    fn player(&self) -> Result<&PlayerView, ApiError> {
        self.player.as_ref().ok_or(ApiError::PlayerNotFound)
    }
}

pub struct WaypointQueryService {
    ctx: ServiceContext,
}

impl WaypointQueryService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Capture, then answer. A timeout degrades to `T::default()`.
    fn query<T, F>(&self, answer: F) -> ApiResponse
    where
        T: Serialize + Default,
        F: FnOnce(&WorldSnapshot) -> Result<T, ApiError>,
    {
        let captured = self.ctx.call(|sim| WorldSnapshot {
            graph: sim.waypoint_snapshot(),
            player: sim.player(),
        });
        match captured {
            Ok(world) => match answer(&world) {
                Ok(data) => ApiResponse::success(&data),
                Err(e) => ApiResponse::error(&e),
            },
            Err(DispatchError::Timeout(t)) => degraded_default::<T>(t),
            Err(e) => ApiResponse::error(&e.into()),
        }
    }

    fn all(&self) -> ApiResponse {
        self.query(|world| {
            let graph = world.graph()?;
            let waypoints = graph.nodes().map(|n| WaypointData::new(n, 0.0, 0.0)).collect();
            Ok(WaypointsResponse::new(waypoints))
        })
    }

    fn nearby(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let max_distance = req.query_param::<f32>("maxDistance")?.unwrap_or(DEFAULT_MAX_DISTANCE);
        let max_count = req.query_param::<usize>("maxCount")?.unwrap_or(DEFAULT_MAX_COUNT);
        Ok(self.query(move |world| {
            let graph = world.graph()?;
            let player = world.player()?;
            let hits = NavQuery::new(graph).nodes_within_radius(player.position, max_distance, max_count)?;
            let waypoints = hits
                .iter()
                .map(|hit| {
                    let angle = angle_between(player.face_dir, hit.node.position - player.position);
                    WaypointData::from_hit(hit, angle)
                })
                .collect();
            Ok(WaypointsResponse::new(waypoints))
        }))
    }

    fn nearest(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let point = Vec3::new(
            req.query_param::<f32>("x")?.unwrap_or(0.0),
            req.query_param::<f32>("y")?.unwrap_or(0.0),
            req.query_param::<f32>("z")?.unwrap_or(0.0),
        );
        Ok(self.query(move |world| {
            let graph = world.graph()?;
            let hit = NavQuery::new(graph).nearest_node(point)?;
            Ok(NearestWaypointResponse {
                waypoint: WaypointData::from_hit(&hit, 0.0),
                distance: hit.distance,
            })
        }))
    }

    fn path(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let from = req.query_param::<WaypointId>("from").ok().flatten().unwrap_or(-1);
        let to = req.query_param::<WaypointId>("to").ok().flatten().unwrap_or(-1);
        if from < 0 || to < 0 {
            return Err(ApiError::MissingParameter(
                "Both 'from' and 'to' parameters are required".into(),
            ));
        }
        Ok(self.query(move |world| {
            let graph = world.graph()?;
            let result = NavQuery::new(graph).shortest_path(from, to)?;
            Ok(WaypointPathResponse {
                path: result.path,
                total_distance: result.total_distance,
                path_found: result.found,
            })
        }))
    }

    fn in_view(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let fov = req.query_param::<f32>("fov")?.unwrap_or(DEFAULT_FOV);
        Ok(self.query(move |world| {
            let graph = world.graph()?;
            let player = world.player()?;
            let hits = NavQuery::new(graph).nodes_in_field_of_view(player.position, player.forward, fov)?;
            let waypoints = hits
                .iter()
                .map(|hit| {
                    let angle = angle_between(player.forward, hit.node.position - player.position);
                    WaypointData::from_hit(hit, angle)
                })
                .collect();
            Ok(WaypointsResponse::new(waypoints))
        }))
    }
}

impl ApiService for WaypointQueryService {
    fn name(&self) -> &'static str {
        "waypoints"
    }

    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry) {
        let svc = Arc::clone(&self);
        registry.register_get("/api/waypoints/all", move |_| svc.all());
        let svc = Arc::clone(&self);
        registry.register_get("/api/waypoints/nearby", move |req| svc.nearby(req).into());
        let svc = Arc::clone(&self);
        registry.register_get("/api/waypoints/nearest", move |req| svc.nearest(req).into());
        let svc = Arc::clone(&self);
        registry.register_get("/api/waypoints/path", move |req| svc.path(req).into());
        registry.register_get("/api/waypoints/in-view", move |req| self.in_view(req).into());
    }
}
