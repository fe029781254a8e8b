//! AGENTGATE - remote agent control gateway library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (input device, waypoints, navigation, dispatcher, simulation)
pub mod core;

// HTTP surface
pub mod server;

// App modules
pub mod cli;
pub mod config;
pub mod console;
pub mod demo;
pub mod paths;

// Re-export commonly used types from core
pub use core::{DispatchHandle, MainThreadDispatcher, Scene, Simulation, VirtualInputDevice, WaypointStore};
pub use server::{ApiServer, EndpointRegistry, ServiceContext};
