//! Player commands: move, look, jump, crouch, sprint.
//!
//! Bodies are parsed and validated on the network thread, so a bad request
//! never costs a simulation tick. Only then is the device touched, inside a
//! dispatched closure.

use super::ServiceContext;
use crate::server::models::{
    CommandResponse, CrouchCommandRequest, LookCommandRequest, MoveCommandRequest,
    SprintCommandRequest,
};
use crate::server::registry::{ApiRequest, ApiService, EndpointRegistry};
use crate::server::response::{ApiError, ApiResponse};
use std::sync::Arc;

pub struct PlayerCommandService {
    ctx: ServiceContext,
}

impl PlayerCommandService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    fn move_player(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: MoveCommandRequest = req.json_body()?;
        let x = body.x.clamp(-1.0, 1.0);
        let y = body.y.clamp(-1.0, 1.0);
        Ok(self.ctx.command(move |sim| {
            sim.input.move_stick(x, y);
            Ok(CommandResponse::executed(format!("Move command executed: ({:.2}, {:.2})", x, y)))
        }))
    }

    fn look(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: LookCommandRequest = req.json_body()?;
        Ok(self.ctx.command(move |sim| {
            sim.player().ok_or(ApiError::PlayerNotFound)?;
            sim.input.look_stick(body.yaw, body.pitch);
            Ok(CommandResponse::executed(format!(
                "Look command executed: yaw={:.2}, pitch={:.2}",
                body.yaw, body.pitch
            )))
        }))
    }

    fn jump(&self) -> ApiResponse {
        self.ctx.command(|sim| {
            let player = sim.player().ok_or(ApiError::PlayerNotFound)?;
            if !player.status.grounded {
                return Ok(CommandResponse::refused("Cannot jump: player is not grounded"));
            }
            sim.input.jump();
            Ok(CommandResponse::executed("Jump command executed"))
        })
    }

    fn crouch(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: CrouchCommandRequest = req.json_body()?;
        Ok(self.ctx.command(move |sim| {
            sim.input.crouch(body.crouch);
            let state = if body.crouch { "enabled" } else { "disabled" };
            Ok(CommandResponse::executed(format!("Crouch {}", state)))
        }))
    }

    fn sprint(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let _body: SprintCommandRequest = req.json_body()?;
        Err(ApiError::CommandFailed("Sprint command is not implemented".into()))
    }
}

impl ApiService for PlayerCommandService {
    fn name(&self) -> &'static str {
        "player-command"
    }

    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry) {
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/move", move |req| svc.move_player(req).into());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/look", move |req| svc.look(req).into());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/jump", move |_| svc.jump());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/crouch", move |req| svc.crouch(req).into());
        registry.register_post("/api/player/sprint", move |req| self.sprint(req).into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::{Control, Stick};
    use crate::demo::DemoScene;
    use crate::server::services::testing::{SimHarness, post, registry_for};
    use glam::Vec3;

    fn harness(scene: DemoScene) -> (SimHarness, EndpointRegistry) {
        let harness = SimHarness::start(Box::new(scene));
        let registry = registry_for(Arc::new(PlayerCommandService::new(harness.ctx.clone())));
        (harness, registry)
    }

    #[test]
    fn test_move_clamps_and_reports() {
        let (harness, registry) = harness(DemoScene::new());
        let r = post(&registry, "/api/player/move", r#"{"x": 2.0, "y": 0.25}"#);
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["executed"], true);
        assert_eq!(r.body["message"], "Move command executed: (1.00, 0.25)");

        let sim = harness.finish();
        let axis = sim.input.axis(Stick::Move);
        assert!(axis.length() <= 1.0 + 1e-5);
        assert!(axis.x > axis.y);
    }

    #[test]
    fn test_move_validation_happens_before_dispatch() {
        // Stalled simulation: a dispatched request would degrade, a rejected one fails fast
        let (ctx, dispatcher) = SimHarness::stalled();
        let registry = registry_for(Arc::new(PlayerCommandService::new(ctx)));

        for body in ["", "{}", r#"{"x": "left", "y": 0}"#, "not json"] {
            let r = post(&registry, "/api/player/move", body);
            assert_eq!(r.status, 400, "{}", body);
            assert_eq!(r.body["kind"], "validation");
        }
        assert_eq!(dispatcher.pending(), 0);
    }

    #[test]
    fn test_jump_when_airborne_is_refused() {
        let scene = DemoScene::new()
            .with_gravity(0.0)
            .with_player_at(Vec3::new(0.0, 3.0, 0.0));
        let (_harness, registry) = harness(scene);
        let r = post(&registry, "/api/player/jump", "");
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["executed"], false);
        assert!(r.body["message"].as_str().unwrap().contains("not grounded"));
    }

    #[test]
    fn test_jump_when_grounded() {
        let (_harness, registry) = harness(DemoScene::new());
        let r = post(&registry, "/api/player/jump", "");
        assert_eq!(r.body["executed"], true);
        assert_eq!(r.body["message"], "Jump command executed");
    }

    #[test]
    fn test_jump_and_look_need_a_player() {
        let (_harness, registry) = harness(DemoScene::new().without_player());
        let r = post(&registry, "/api/player/jump", "");
        assert_eq!(r.body["kind"], "player_not_found");
        let r = post(&registry, "/api/player/look", r#"{"yaw": 10, "pitch": 0}"#);
        assert_eq!(r.body["kind"], "player_not_found");
        // Device commands still work without a player
        let r = post(&registry, "/api/player/move", r#"{"x": 0, "y": 1}"#);
        assert_eq!(r.body["executed"], true);
    }

    #[test]
    fn test_look_message() {
        let (_harness, registry) = harness(DemoScene::new());
        let r = post(&registry, "/api/player/look", r#"{"yaw": 0.5, "pitch": -0.25}"#);
        assert_eq!(r.body["message"], "Look command executed: yaw=0.50, pitch=-0.25");
    }

    #[test]
    fn test_crouch_is_held_until_disabled() {
        let (harness, registry) = harness(DemoScene::new());
        let r = post(&registry, "/api/player/crouch", r#"{"crouch": true}"#);
        assert_eq!(r.body["message"], "Crouch enabled");
        // Well past the click duration
        std::thread::sleep(std::time::Duration::from_millis(150));
        assert!(harness.ctx.call(|s| s.input.is_active(Control::Crouch)).unwrap());

        let r = post(&registry, "/api/player/crouch", r#"{"crouch": false}"#);
        assert_eq!(r.body["message"], "Crouch disabled");
        assert!(!harness.ctx.call(|s| s.input.is_active(Control::Crouch)).unwrap());
    }

    #[test]
    fn test_sprint_not_implemented() {
        let (_harness, registry) = harness(DemoScene::new());
        let r = post(&registry, "/api/player/sprint", r#"{"sprint": true}"#);
        assert_eq!(r.status, 200);
        assert_eq!(r.body["success"], false);
        assert_eq!(r.body["kind"], "command_failed");
        assert!(r.body["error"].as_str().unwrap().contains("not implemented"));
    }

    #[test]
    fn test_command_timeout_is_degraded() {
        let (ctx, dispatcher) = SimHarness::stalled();
        let registry = registry_for(Arc::new(PlayerCommandService::new(ctx)));
        let r = post(&registry, "/api/player/crouch", r#"{"crouch": true}"#);
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["executed"], false);
        assert_eq!(r.body["kind"], "degraded");
        // The command is still queued and will run on the next tick
        assert_eq!(dispatcher.pending(), 1);
    }
}
