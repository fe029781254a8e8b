//! Wire DTOs. camelCase on the wire, flat, no invariants beyond field presence.
//!
//! Response DTOs are merged into the envelope by [`super::ApiResponse::success`],
//! so they never carry `success` themselves.

use crate::core::input::InputSnapshot;
use crate::core::nav::NodeHit;
use crate::core::sim::{PlayerStatus, PlayerView};
use crate::core::waypoints::{WaypointId, WaypointNode};
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

// === Health ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub server: String,
    pub port: u16,
    /// Local time, `YYYY-MM-DD HH:MM:SS`
    pub time: String,
}

// === Player state ===

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPositionResponse {
    pub position: Vec3Data,
    pub rotation: Vec3Data,
    pub look_dir: Vec3Data,
    pub face_dir: Vec3Data,
}

impl From<&PlayerView> for PlayerPositionResponse {
    fn from(p: &PlayerView) -> Self {
        Self {
            position: p.position.into(),
            rotation: p.rotation.into(),
            look_dir: p.look_euler.into(),
            face_dir: p.face_dir.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateResponse {
    pub is_grounded: bool,
    pub is_crouching: bool,
    pub is_sprinting: bool,
    pub is_sliding: bool,
    pub is_alive: bool,
    pub move_speed: f32,
    pub health: f32,
}

impl From<&PlayerStatus> for PlayerStateResponse {
    fn from(s: &PlayerStatus) -> Self {
        Self {
            is_grounded: s.grounded,
            is_crouching: s.crouching,
            is_sprinting: s.sprinting,
            is_sliding: s.sliding,
            is_alive: s.alive,
            move_speed: s.move_speed,
            health: s.health,
        }
    }
}

/// Older status shape served by `/api/player/status`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerStatusResponse {
    pub player: PlayerStatusData,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatusData {
    pub is_grounded: bool,
    pub is_crouching: bool,
    pub is_sprinting: bool,
    pub is_sliding: bool,
    pub move_speed: f32,
    pub bobbing_angle: f32,
}

impl From<&PlayerStatus> for PlayerStatusResponse {
    fn from(s: &PlayerStatus) -> Self {
        Self {
            player: PlayerStatusData {
                is_grounded: s.grounded,
                is_crouching: s.crouching,
                is_sprinting: s.sprinting,
                is_sliding: s.sliding,
                move_speed: s.move_speed,
                bobbing_angle: s.bobbing_angle,
            },
        }
    }
}

// === Commands ===

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveCommandRequest {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookCommandRequest {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrouchCommandRequest {
    pub crouch: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SprintCommandRequest {
    pub sprint: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireCommandRequest {
    pub fire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AimCommandRequest {
    pub aim: bool,
}

/// Optional click length override (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InspectCommandRequest {
    #[serde(default)]
    pub duration: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    pub executed: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn executed(message: impl Into<String>) -> Self {
        Self { executed: true, message: message.into() }
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self { executed: false, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputStateResponse {
    pub input: InputSnapshot,
}

// === Waypoints ===

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointData {
    pub id: WaypointId,
    pub position: Vec3Data,
    pub connected_ids: Vec<WaypointId>,
    pub distance_from_player: f32,
    pub angle_from_player: f32,
}

impl WaypointData {
    pub fn new(node: &WaypointNode, distance_from_player: f32, angle_from_player: f32) -> Self {
        Self {
            id: node.id,
            position: node.position.into(),
            connected_ids: node.connections.iter().copied().collect(),
            distance_from_player,
            angle_from_player,
        }
    }

    pub fn from_hit(hit: &NodeHit<'_>, angle_from_player: f32) -> Self {
        Self::new(hit.node, hit.distance, angle_from_player)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointsResponse {
    pub waypoints: Vec<WaypointData>,
    pub total_count: usize,
}

impl WaypointsResponse {
    pub fn new(waypoints: Vec<WaypointData>) -> Self {
        let total_count = waypoints.len();
        Self { waypoints, total_count }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NearestWaypointResponse {
    pub waypoint: WaypointData,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaypointPathResponse {
    pub path: Vec<WaypointId>,
    pub total_distance: f32,
    pub path_found: bool,
}
