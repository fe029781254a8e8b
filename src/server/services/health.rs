use crate::server::models::HealthResponse;
use crate::server::registry::{ApiService, EndpointRegistry};
use crate::server::response::ApiResponse;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

pub const SERVER_NAME: &str = "agentgate API";

/// Port reported by `/api/health`, updated by the server once it has bound
#[derive(Debug, Clone, Default)]
pub struct ListenPort(Arc<AtomicU16>);

impl ListenPort {
    pub fn new(port: u16) -> Self {
        Self(Arc::new(AtomicU16::new(port)))
    }

    pub fn get(&self) -> u16 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, port: u16) {
        self.0.store(port, Ordering::Relaxed);
    }
}

/// `GET /api/health` - answers without touching the simulation
pub struct HealthService {
    port: ListenPort,
}

impl HealthService {
    pub fn new(port: ListenPort) -> Self {
        Self { port }
    }

    fn health(&self) -> ApiResponse {
        ApiResponse::success(&HealthResponse {
            status: "healthy".into(),
            server: SERVER_NAME.into(),
            port: self.port.get(),
            time: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        })
    }
}

impl ApiService for HealthService {
    fn name(&self) -> &'static str {
        "health"
    }

    fn register_endpoints(self: Arc<Self>, registry: &mut EndpointRegistry) {
        registry.register_get("/api/health", move |_| self.health());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::services::testing::{get, registry_for};

    #[test]
    fn test_health_shape() {
        let registry = registry_for(Arc::new(HealthService::new(ListenPort::new(9123))));
        let r = get(&registry, "/api/health");
        assert_eq!(r.status, 200);
        assert_eq!(r.body["success"], true);
        assert_eq!(r.body["status"], "healthy");
        assert_eq!(r.body["server"], SERVER_NAME);
        assert_eq!(r.body["port"], 9123);

        let time = r.body["time"].as_str().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").is_ok(), "{}", time);
    }

    #[test]
    fn test_health_follows_listen_port() {
        let port = ListenPort::new(0);
        let registry = registry_for(Arc::new(HealthService::new(port.clone())));
        assert_eq!(get(&registry, "/api/health").body["port"], 0);

        port.set(41234);
        assert_eq!(get(&registry, "/api/health").body["port"], 41234);
    }
}
