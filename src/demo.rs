//! Headless demo scene: a kinematic first-person player on a flat floor.
//!
//! Stands in for a real engine so the gateway can run end to end. The player
//! reads the virtual input device every tick exactly like an engine character
//! controller would:
//!
//! - move stick - strafe/forward at walk speed, scaled by crouch or sprint
//! - look stick - yaw/pitch rate
//! - jump - launches when grounded, then gravity until the floor
//!
//! Waypoints come either from a built-in grid or a JSON file.

use crate::core::input::{Control, Stick, VirtualInputDevice};
use crate::core::sim::{PlayerStatus, PlayerView, Scene};
use crate::core::waypoints::{WaypointId, WaypointSource, WaypointSpec};
use anyhow::{Context, Result};
use glam::Vec3;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

const WALK_SPEED: f32 = 4.0;
const SPRINT_MULTIPLIER: f32 = 1.75;
const CROUCH_MULTIPLIER: f32 = 0.5;
/// Degrees per second at full stick deflection
const LOOK_RATE: f32 = 180.0;
const PITCH_LIMIT: f32 = 89.0;
const JUMP_VELOCITY: f32 = 5.0;
const DEFAULT_GRAVITY: f32 = 9.81;
/// Head-bob cycles per second while walking
const BOB_FREQUENCY: f32 = 1.8;

#[derive(Debug, Clone)]
struct DemoPlayer {
    position: Vec3,
    vertical_velocity: f32,
    /// Degrees, 0 faces +Z
    yaw: f32,
    /// Degrees, positive looks up
    pitch: f32,
    status: PlayerStatus,
}

impl DemoPlayer {
    fn at(position: Vec3) -> Self {
        let mut player = Self {
            position,
            vertical_velocity: 0.0,
            yaw: 0.0,
            pitch: 0.0,
            status: PlayerStatus::default(),
        };
        player.status.grounded = position.y <= 0.0;
        player
    }

    fn forward(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    fn right(&self) -> Vec3 {
        let yaw = self.yaw.to_radians();
        Vec3::new(yaw.cos(), 0.0, -yaw.sin())
    }

    fn face_dir(&self) -> Vec3 {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        Vec3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos())
    }

    fn view(&self) -> PlayerView {
        PlayerView {
            position: self.position,
            rotation: Vec3::new(0.0, self.yaw, 0.0),
            look_euler: Vec3::new(self.pitch, self.yaw, 0.0),
            face_dir: self.face_dir(),
            forward: self.forward(),
            status: self.status,
        }
    }

    fn update(&mut self, input: &VirtualInputDevice, dt: f32, gravity: f32) {
        let look = input.axis(Stick::Look);
        self.yaw = (self.yaw + look.x * LOOK_RATE * dt).rem_euclid(360.0);
        self.pitch = (self.pitch + look.y * LOOK_RATE * dt).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let crouching = input.is_active(Control::Crouch);
        let sprinting = input.is_active(Control::Sprint) && !crouching;
        let scale = if sprinting {
            SPRINT_MULTIPLIER
        } else if crouching {
            CROUCH_MULTIPLIER
        } else {
            1.0
        };

        let stick = input.axis(Stick::Move);
        let planar = self.right() * stick.x + self.forward() * stick.y;
        self.position += planar * WALK_SPEED * scale * dt;

        if input.is_active(Control::Jump) && self.status.grounded {
            self.vertical_velocity = JUMP_VELOCITY;
            self.status.grounded = false;
            debug!("Demo player jumped");
        }
        if !self.status.grounded {
            self.vertical_velocity -= gravity * dt;
            self.position.y += self.vertical_velocity * dt;
            if self.position.y <= 0.0 {
                self.position.y = 0.0;
                self.vertical_velocity = 0.0;
                self.status.grounded = true;
            }
        }

        let moving = stick.length() > 1e-3;
        self.status.crouching = crouching;
        self.status.sprinting = sprinting && moving;
        self.status.move_speed = (stick.length() * scale / SPRINT_MULTIPLIER).clamp(0.0, 1.0);
        if moving && self.status.grounded {
            self.status.bobbing_angle =
                (self.status.bobbing_angle + BOB_FREQUENCY * 360.0 * scale * dt).rem_euclid(360.0);
        }
    }
}

/// Waypoint file layout: a bare array or `{"waypoints": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum WaypointFile {
    List(Vec<WaypointSpec>),
    Wrapped { waypoints: Vec<WaypointSpec> },
}

pub struct DemoScene {
    player: Option<DemoPlayer>,
    waypoints: Option<Vec<WaypointSpec>>,
    /// Bumped whenever the waypoint set is replaced
    container: u64,
    gravity: f32,
}

impl Default for DemoScene {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoScene {
    /// Player at the origin, 5x5 waypoint grid with 4 m spacing
    pub fn new() -> Self {
        Self {
            player: Some(DemoPlayer::at(Vec3::ZERO)),
            waypoints: Some(Self::grid(5, 5, 4.0)),
            container: 1,
            gravity: DEFAULT_GRAVITY,
        }
    }

    pub fn with_player_at(mut self, position: Vec3) -> Self {
        self.player = Some(DemoPlayer::at(position));
        self
    }

    pub fn without_player(mut self) -> Self {
        self.player = None;
        self
    }

    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_waypoints(mut self, waypoints: Vec<WaypointSpec>) -> Self {
        self.set_waypoints(waypoints);
        self
    }

    pub fn without_waypoints(mut self) -> Self {
        self.waypoints = None;
        self
    }

    /// Replace the waypoint set; caches keyed on the container rebuild
    pub fn set_waypoints(&mut self, waypoints: Vec<WaypointSpec>) {
        self.waypoints = Some(waypoints);
        self.container += 1;
    }

    /// Grid centred on the origin, 4-connected, ids row-major from 1
    pub fn grid(cols: usize, rows: usize, spacing: f32) -> Vec<WaypointSpec> {
        let id = |c: usize, r: usize| (r * cols + c + 1) as WaypointId;
        let x0 = (cols.saturating_sub(1)) as f32 * spacing * 0.5;
        let z0 = (rows.saturating_sub(1)) as f32 * spacing * 0.5;

        let mut specs = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                let mut connections = Vec::new();
                if c + 1 < cols {
                    connections.push(id(c + 1, r));
                }
                if r + 1 < rows {
                    connections.push(id(c, r + 1));
                }
                specs.push(WaypointSpec {
                    id: id(c, r),
                    position: [c as f32 * spacing - x0, 0.0, r as f32 * spacing - z0],
                    connections,
                });
            }
        }
        specs
    }

    /// Load waypoints from a JSON file
    pub fn load_waypoints(path: &Path) -> Result<Vec<WaypointSpec>> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read waypoint file {}", path.display()))?;
        let file: WaypointFile = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse waypoint file {}", path.display()))?;
        let specs = match file {
            WaypointFile::List(specs) => specs,
            WaypointFile::Wrapped { waypoints } => waypoints,
        };
        info!("Loaded {} waypoints from {}", specs.len(), path.display());
        Ok(specs)
    }
}

impl WaypointSource for DemoScene {
    fn waypoint_container(&self) -> Option<u64> {
        self.waypoints.as_ref().map(|_| self.container)
    }

    fn waypoint_nodes(&self) -> Vec<WaypointSpec> {
        self.waypoints.clone().unwrap_or_default()
    }
}

impl Scene for DemoScene {
    fn player(&self) -> Option<PlayerView> {
        self.player.as_ref().map(DemoPlayer::view)
    }

    fn update(&mut self, input: &VirtualInputDevice, dt: f32) {
        let gravity = self.gravity;
        if let Some(player) = self.player.as_mut() {
            player.update(input, dt, gravity);
        }
    }
}
