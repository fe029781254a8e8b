use super::ServiceContext;
use crate::server::models::{PlayerPositionResponse, PlayerStateResponse, PlayerStatusResponse};
use crate::server::registry::{ApiService, EndpointRegistry};
use crate::server::response::{ApiError, ApiResponse};
use std::sync::Arc;

/// Read-only player queries: position, movement state, legacy status
pub struct PlayerStateService {
    ctx: ServiceContext,
}

impl PlayerStateService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    fn position(&self) -> ApiResponse {
        self.ctx.read(|sim| {
            let player = sim.player().ok_or(ApiError::PlayerNotFound)?;
            Ok(PlayerPositionResponse::from(&player))
        })
    }

    fn state(&self) -> ApiResponse {
        self.ctx.read(|sim| {
            let player = sim.player().ok_or(ApiError::PlayerNotFound)?;
            Ok(PlayerStateResponse::from(&player.status))
        })
    }

    fn status(&self) -> ApiResponse {
        self.ctx.read(|sim| {
            let player = sim.player().ok_or(ApiError::PlayerNotFound)?;
            Ok(PlayerStatusResponse::from(&player.status))
        })
    }
}

impl ApiService for PlayerStateService {
    fn name(&self) -> &'static str {
        "player-state"
    }

    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry) {
        let svc = Arc::clone(&self);
        registry.register_get("/api/player/position", move |_| svc.position());
        let svc = Arc::clone(&self);
        registry.register_get("/api/player/state", move |_| svc.state());
        registry.register_get("/api/player/status", move |_| self.status());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::DemoScene;
    use crate::server::services::testing::{SimHarness, get, registry_for};
    use glam::Vec3;

    #[test]
    fn test_position_reports_player_pose() {
        let harness = SimHarness::start(Box::new(DemoScene::new().with_player_at(Vec3::new(1.0, 0.0, -2.0))));
        let registry = registry_for(Arc::new(PlayerStateService::new(harness.ctx.clone())));

        let r = get(&registry, "/api/player/position");
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["position"]["x"], 1.0);
        assert_eq!(r.body["position"]["z"], -2.0);
        for key in ["rotation", "lookDir", "faceDir"] {
            assert!(r.body[key].is_object(), "{}", key);
        }
    }

    #[test]
    fn test_state_and_legacy_status() {
        let harness = SimHarness::start(Box::new(DemoScene::new()));
        let registry = registry_for(Arc::new(PlayerStateService::new(harness.ctx.clone())));

        let r = get(&registry, "/api/player/state");
        assert_eq!(r.body["isGrounded"], true);
        assert_eq!(r.body["isAlive"], true);
        assert_eq!(r.body["health"], 100.0);

        let r = get(&registry, "/api/player/status");
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["player"]["isGrounded"], true);
        assert!(r.body["player"].get("bobbingAngle").is_some());
    }

    #[test]
    fn test_missing_player() {
        let harness = SimHarness::start(Box::new(DemoScene::new().without_player()));
        let registry = registry_for(Arc::new(PlayerStateService::new(harness.ctx.clone())));

        for path in ["/api/player/position", "/api/player/state", "/api/player/status"] {
            let r = get(&registry, path);
            assert_eq!(r.status, 200);
            assert_eq!(r.body["success"], false);
            assert_eq!(r.body["kind"], "player_not_found");
        }
    }

    #[test]
    fn test_stalled_simulation_degrades_to_defaults() {
        let (ctx, _dispatcher) = SimHarness::stalled();
        let registry = registry_for(Arc::new(PlayerStateService::new(ctx)));

        let r = get(&registry, "/api/player/state");
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["kind"], "degraded");
        assert_eq!(r.body["isGrounded"], false);
        assert_eq!(r.body["moveSpeed"], 0.0);
    }
}
