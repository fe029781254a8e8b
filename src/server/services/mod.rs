//! Request handlers grouped by concern.
//!
//! State services only read, command services write to the input device.
//! Both reach simulation state exclusively through [`ServiceContext::call`],
//! which runs a closure on the simulation thread with a bounded wait.

mod health;
mod input;
mod player_command;
mod player_state;
mod waypoints;

pub use health::{HealthService, ListenPort};
pub use input::InputService;
pub use player_command::PlayerCommandService;
pub use player_state::PlayerStateService;
pub use waypoints::WaypointQueryService;

use super::models::CommandResponse;
use super::registry::ApiService;
use super::response::{ApiError, ApiResponse};
use crate::core::{DispatchError, DispatchHandle, Simulation};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// What every service needs to reach the simulation
#[derive(Clone)]
pub struct ServiceContext {
    pub sim: DispatchHandle<Simulation>,
    pub timeout: Duration,
}

impl ServiceContext {
    pub fn new(sim: DispatchHandle<Simulation>, timeout: Duration) -> Self {
        Self { sim, timeout }
    }

    /// Run `f` on the simulation thread and wait at most `timeout` for it
    pub fn call<R, F>(&self, f: F) -> Result<R, DispatchError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Simulation) -> R + Send + 'static,
    {
        self.sim.execute_and_wait(f, self.timeout)
    }

    /// Command helper: the closure decides success, a timeout degrades to `executed:false`
    pub fn command<F>(&self, f: F) -> ApiResponse
    where
        F: FnOnce(&mut Simulation) -> Result<CommandResponse, ApiError> + Send + 'static,
    {
        match self.call(f) {
            Ok(Ok(response)) => ApiResponse::success(&response),
            Ok(Err(e)) => ApiResponse::error(&e),
            Err(DispatchError::Timeout(t)) => ApiResponse::degraded(
                &CommandResponse::refused("Command queued but not confirmed"),
                format!("Simulation did not respond within {} ms", t.as_millis()),
            ),
            Err(e) => ApiResponse::error(&e.into()),
        }
    }

    /// Read helper: a timeout degrades to `T::default()`
    pub fn read<T, F>(&self, f: F) -> ApiResponse
    where
        T: Serialize + Default + Send + 'static,
        F: FnOnce(&mut Simulation) -> Result<T, ApiError> + Send + 'static,
    {
        match self.call(f) {
            Ok(Ok(data)) => ApiResponse::success(&data),
            Ok(Err(e)) => ApiResponse::error(&e),
            Err(DispatchError::Timeout(t)) => degraded_default::<T>(t),
            Err(e) => ApiResponse::error(&e.into()),
        }
    }
}

pub(crate) fn degraded_default<T: Serialize + Default>(timeout: Duration) -> ApiResponse {
    ApiResponse::degraded(
        &T::default(),
        format!("Simulation did not respond within {} ms, values are defaults", timeout.as_millis()),
    )
}

/// Standard service set, in registration order
pub fn default_services(ctx: &ServiceContext, port: &ListenPort) -> Vec<Arc<dyn ApiService>> {
    vec![
        Arc::new(HealthService::new(port.clone())),
        Arc::new(PlayerStateService::new(ctx.clone())),
        Arc::new(PlayerCommandService::new(ctx.clone())),
        Arc::new(InputService::new(ctx.clone())),
        Arc::new(WaypointQueryService::new(ctx.clone())),
    ]
}
