//! Simulation state owned by the tick thread.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   DispatchHandle<Simulation>   ┌──────────────────────────┐
//! │  HTTP worker threads │  ─────── closures ──────────▶  │  Simulation thread       │
//! │  (rouille)           │                                │                          │
//! │                      │  ◀────── results ───────────   │  tick():                 │
//! └──────────────────────┘      (bounded reply)           │   1. drain dispatcher    │
//!                                                         │   2. scene.update(input) │
//!                                                         │   3. input.tick(dt)      │
//!                                                         └──────────────────────────┘
//! ```
//!
//! Input timers advance after the scene has consumed the device, so a click
//! armed during drain is visible to at least one scene update.

use super::dispatcher::MainThreadDispatcher;
use super::input::VirtualInputDevice;
use super::waypoints::{WaypointGraph, WaypointSource, WaypointStore};
use glam::Vec3;
use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Movement flags and scalars of the controlled character
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub grounded: bool,
    pub crouching: bool,
    pub sprinting: bool,
    pub sliding: bool,
    pub alive: bool,
    /// Run speed normalized to `[0, 1]`
    pub move_speed: f32,
    pub health: f32,
    /// Head-bob phase in degrees
    pub bobbing_angle: f32,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            grounded: false,
            crouching: false,
            sprinting: false,
            sliding: false,
            alive: true,
            move_speed: 0.0,
            health: 100.0,
            bobbing_angle: 0.0,
        }
    }
}

/// Read-only view of the player, taken on the simulation thread
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayerView {
    pub position: Vec3,
    /// Body euler angles in degrees
    pub rotation: Vec3,
    /// Camera euler angles in degrees (pitch, yaw, roll)
    pub look_euler: Vec3,
    /// Unit vector the player faces, camera pitch included
    pub face_dir: Vec3,
    /// Horizontal body forward axis
    pub forward: Vec3,
    pub status: PlayerStatus,
}

/// Host world the gateway is attached to.
///
/// Implemented by the engine (or [`crate::demo::DemoScene`] when headless).
pub trait Scene: WaypointSource + Send {
    /// Active player, `None` when no player entity exists
    fn player(&self) -> Option<PlayerView>;

    /// Advance world state one tick, consuming the current device state
    fn update(&mut self, input: &VirtualInputDevice, dt: f32);
}

/// Everything dispatched closures may touch
pub struct Simulation {
    pub input: VirtualInputDevice,
    pub waypoints: WaypointStore,
    pub scene: Box<dyn Scene>,
    clock: f64,
    ticks: u64,
}

impl Simulation {
    pub fn new(scene: Box<dyn Scene>, input: VirtualInputDevice, waypoints: WaypointStore) -> Self {
        Self { input, waypoints, scene, clock: 0.0, ticks: 0 }
    }

    /// Simulation time in seconds
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn player(&self) -> Option<PlayerView> {
        self.scene.player()
    }

    /// Current waypoint graph snapshot (rebuilt if stale)
    pub fn waypoint_snapshot(&mut self) -> Option<Arc<WaypointGraph>> {
        self.waypoints.snapshot(self.clock, self.scene.as_ref())
    }

    /// Run one simulation step.
    ///
    /// Queued jobs run first, in FIFO order, then the scene update, then input timers.
    pub fn tick(&mut self, dispatcher: &MainThreadDispatcher<Simulation>, dt: f32) -> usize {
        let executed = dispatcher.drain(self);
        self.scene.update(&self.input, dt);
        self.input.tick(dt);
        self.clock += f64::from(dt.max(0.0));
        self.ticks += 1;
        if executed > 0 {
            trace!("tick {}: {} dispatched job(s)", self.ticks, executed);
        }
        executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::input::Control;
    use crate::core::waypoints::WaypointSpec;
    use std::sync::Mutex;

    /// Scene that records which controls were active on each update
    struct RecordingScene {
        seen: Arc<Mutex<Vec<bool>>>,
        container: Option<u64>,
    }

    impl WaypointSource for RecordingScene {
        fn waypoint_container(&self) -> Option<u64> {
            self.container
        }

        fn waypoint_nodes(&self) -> Vec<WaypointSpec> {
            vec![WaypointSpec { id: 1, position: [0.0, 0.0, 0.0], connections: vec![] }]
        }
    }

    impl Scene for RecordingScene {
        fn player(&self) -> Option<PlayerView> {
            None
        }

        fn update(&mut self, input: &VirtualInputDevice, _dt: f32) {
            self.seen.lock().unwrap().push(input.is_active(Control::Jump));
        }
    }

    fn sim(seen: Arc<Mutex<Vec<bool>>>) -> Simulation {
        let scene = RecordingScene { seen, container: Some(1) };
        Simulation::new(Box::new(scene), VirtualInputDevice::new(0.1), WaypointStore::new(1.0))
    }

    #[test]
    fn test_click_visible_to_scene_before_release() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut sim = sim(Arc::clone(&seen));
        let dispatcher = MainThreadDispatcher::new();
        let handle = dispatcher.handle();

        // Click shorter than one tick still reaches the scene once
        handle.enqueue(|s: &mut Simulation| s.input.click(Control::Jump, 0.001));
        sim.tick(&dispatcher, 1.0 / 60.0);
        sim.tick(&dispatcher, 1.0 / 60.0);

        assert_eq!(*seen.lock().unwrap(), vec![true, false]);
        assert!(!sim.input.is_active(Control::Jump));
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut sim = sim(Arc::new(Mutex::new(Vec::new())));
        let dispatcher = MainThreadDispatcher::new();
        for _ in 0..4 {
            sim.tick(&dispatcher, 0.25);
        }
        assert_eq!(sim.ticks(), 4);
        assert!((sim.clock() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_waypoint_snapshot_uses_sim_clock() {
        let mut sim = sim(Arc::new(Mutex::new(Vec::new())));
        let dispatcher = MainThreadDispatcher::new();
        let a = sim.waypoint_snapshot().unwrap();
        sim.tick(&dispatcher, 0.5);
        let b = sim.waypoint_snapshot().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        sim.tick(&dispatcher, 0.6);
        let c = sim.waypoint_snapshot().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
