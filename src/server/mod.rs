//! REST API gateway for remote agent control of the simulation.
//!
//! # Purpose
//!
//! Lets an external agent read player and navigation state and inject input
//! commands into the running simulation over HTTP + JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐    DispatchHandle::execute_and_wait    ┌──────────────────────┐
//! │  rouille worker threads │  ───── closure(&mut Simulation) ─────▶ │  Simulation thread   │
//! │                         │                                        │  (fixed tick loop)   │
//! │  POST /api/player/jump  │  ──▶ grounded? input.jump() ─────────▶ │  drain → update →    │
//! │  GET /api/waypoints/... │  ──▶ graph snapshot + player pose ───▶ │  input.tick(dt)      │
//! └─────────────────────────┘                                        └──────────────────────┘
//!          │                                                                  │
//!          │◀──────────── reply (bounded wait, degraded on timeout) ──────────│
//! ```
//!
//! - **rouille** - sync HTTP server, handlers run on its worker pool
//! - **EndpointRegistry** - exact `(method, path)` table filled by services
//! - **ServiceContext** - the only route from a handler into simulation state
//!
//! # Endpoints
//!
//! | Method | Path                       | Description                      |
//! |--------|----------------------------|----------------------------------|
//! | GET    | `/api/health`              | Health check                     |
//! | GET    | `/api/player/position`     | Position, rotation, look/face dir |
//! | GET    | `/api/player/state`        | Grounded/crouch/sprint/alive flags |
//! | GET    | `/api/player/status`       | Legacy status shape              |
//! | POST   | `/api/player/move`         | Move stick `{x, y}`              |
//! | POST   | `/api/player/look`         | Look stick `{yaw, pitch}`        |
//! | POST   | `/api/player/jump`         | Jump if grounded                 |
//! | POST   | `/api/player/crouch`       | Crouch `{crouch}`                |
//! | POST   | `/api/player/sprint`       | Not implemented, `command_failed` |
//! | POST   | `/api/player/fire`         | Fire `{fire}`                    |
//! | POST   | `/api/player/aim`          | Aim `{aim}`                      |
//! | POST   | `/api/player/reload`       | Reload                           |
//! | POST   | `/api/player/switch-weapon`| Switch weapon                    |
//! | POST   | `/api/player/inspect`      | Inspect `{duration?}`            |
//! | POST   | `/api/input/reset`         | Release everything               |
//! | GET    | `/api/input/state`         | Device snapshot                  |
//! | GET    | `/api/waypoints/all`       | Every node                       |
//! | GET    | `/api/waypoints/nearby`    | `?maxDistance&maxCount`          |
//! | GET    | `/api/waypoints/nearest`   | `?x&y&z`                         |
//! | GET    | `/api/waypoints/path`      | `?from&to` BFS path              |
//! | GET    | `/api/waypoints/in-view`   | `?fov`                           |

mod api;
pub mod models;
pub mod registry;
pub mod response;
pub mod services;

pub use api::ApiServer;
pub use registry::{ApiRequest, ApiService, EndpointRegistry, Method};
pub use response::{ApiError, ApiResponse};
pub use services::{ListenPort, ServiceContext, default_services};
