use super::ServiceContext;
use crate::core::input::Control;
use crate::server::models::{
    AimCommandRequest, CommandResponse, FireCommandRequest, InputStateResponse,
    InspectCommandRequest,
};
use crate::server::registry::{ApiRequest, ApiService, EndpointRegistry};
use crate::server::response::{ApiError, ApiResponse};
use std::sync::Arc;

/// Direct device commands beyond movement: weapon controls, reset, state dump
pub struct InputService {
    ctx: ServiceContext,
}

impl InputService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    fn fire(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: FireCommandRequest = req.json_body()?;
        Ok(self.hold(Control::Fire, body.fire, "Fire"))
    }

    fn aim(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: AimCommandRequest = req.json_body()?;
        Ok(self.hold(Control::Aim, body.aim, "Aim"))
    }

    fn hold(&self, control: Control, on: bool, label: &'static str) -> ApiResponse {
        self.ctx.command(move |sim| {
            if on {
                sim.input.press(control);
            } else {
                sim.input.release(control);
            }
            let state = if on { "pressed" } else { "released" };
            Ok(CommandResponse::executed(format!("{} {}", label, state)))
        })
    }

    fn reload(&self) -> ApiResponse {
        self.ctx.command(|sim| {
            sim.input.reload();
            Ok(CommandResponse::executed("Reload command executed"))
        })
    }

    fn switch_weapon(&self) -> ApiResponse {
        self.ctx.command(|sim| {
            sim.input.switch_weapon();
            Ok(CommandResponse::executed("Switch weapon command executed"))
        })
    }

    fn inspect(&self, req: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let body: InspectCommandRequest = req.json_body_or_default()?;
        if let Some(d) = body.duration {
            if !d.is_finite() || d < 0.0 {
                return Err(ApiError::Validation(format!("Invalid inspect duration: {}", d)));
            }
        }
        Ok(self.ctx.command(move |sim| {
            let duration = body.duration.unwrap_or(sim.input.click_duration());
            sim.input.click(Control::Inspect, duration);
            Ok(CommandResponse::executed(format!("Inspect command executed ({:.2}s)", duration)))
        }))
    }

    fn reset(&self) -> ApiResponse {
        self.ctx.command(|sim| {
            sim.input.reset_all();
            Ok(CommandResponse::executed("Input reset"))
        })
    }

    fn state(&self) -> ApiResponse {
        self.ctx.read(|sim| Ok(InputStateResponse { input: sim.input.snapshot() }))
    }
}

impl ApiService for InputService {
    fn name(&self) -> &'static str {
        "input"
    }

    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry) {
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/fire", move |req| svc.fire(req).into());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/aim", move |req| svc.aim(req).into());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/reload", move |_| svc.reload());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/switch-weapon", move |_| svc.switch_weapon());
        let svc = Arc::clone(&self);
        registry.register_post("/api/player/inspect", move |req| svc.inspect(req).into());
        let svc = Arc::clone(&self);
        registry.register_post("/api/input/reset", move |_| svc.reset());
        registry.register_get("/api/input/state", move |_| self.state());
    }
}
