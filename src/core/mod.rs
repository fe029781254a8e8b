//! Core engine modules - input device, waypoint graph, navigation, dispatcher
//!
//! These modules own simulation-side state and know nothing about HTTP.

pub mod dispatcher;
pub mod input;
pub mod nav;
pub mod sim;
pub mod waypoints;

// Re-exports for convenience
pub use dispatcher::{DispatchError, DispatchHandle, MainThreadDispatcher};
pub use input::{Control, InputSnapshot, Stick, VirtualInputDevice};
pub use nav::{NavError, NavQuery, PathResult};
pub use sim::{PlayerStatus, PlayerView, Scene, Simulation};
pub use waypoints::{WaypointGraph, WaypointId, WaypointSpec, WaypointStore};
