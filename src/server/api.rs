//! HTTP gateway using rouille.
//!
//! # Purpose
//!
//! Owns the listener threads, converts each incoming request to an
//! [`ApiRequest`], routes it through the [`EndpointRegistry`] and writes the
//! JSON envelope back. Handlers that touch live state go through the
//! dispatcher themselves; this layer never does.
//!
//! # Key types
//!
//! - [`ApiServer`] - Stopped/Running state machine, one listener per host
//!
//! # Thread safety
//!
//! - rouille runs handlers on its own worker pool, the registry is shared via `Arc`
//! - `stop()` signals every listener and joins it, so the port is free on return
//! - CORS headers added to all responses for browser access
//!
//! # Used by
//!
//! - `main.rs` - builds the registry from `default_services` and calls `start()`

use super::registry::{ApiRequest, EndpointRegistry};
use super::response::ApiResponse;
use super::services::ListenPort;
use crate::config::GatewayConfig;
use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use rouille::{Request, Response};
use std::net::SocketAddr;
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;

struct Listener {
    addr: SocketAddr,
    thread: JoinHandle<()>,
    stop: mpsc::Sender<()>,
}

enum ServerState {
    Stopped,
    Running(Vec<Listener>),
}

/// REST API server
pub struct ApiServer {
    config: GatewayConfig,
    registry: Arc<EndpointRegistry>,
    listen_port: Option<ListenPort>,
    state: ServerState,
}

impl ApiServer {
    pub fn new(config: GatewayConfig, registry: Arc<EndpointRegistry>) -> Self {
        Self { config, registry, listen_port: None, state: ServerState::Stopped }
    }

    /// Publish the first listener's bound port to `port` on every start
    pub fn with_listen_port(mut self, port: ListenPort) -> Self {
        self.listen_port = Some(port);
        self
    }

    /// Bind every configured host. Already running is a no-op.
    ///
    /// If any address fails to bind, the listeners opened so far are shut
    /// down again and the server stays stopped.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let mut listeners = Vec::new();
        for addr in self.config.bind_addrs() {
            let registry = Arc::clone(&self.registry);
            let max_body = self.config.max_body_bytes;
            let bound = rouille::Server::new(addr.as_str(), move |request| {
                Self::handle_request(request, &registry, max_body)
            });
            let server = match bound {
                Ok(server) => server,
                Err(e) => {
                    shutdown(listeners);
                    return Err(anyhow!("Failed to bind API server on {}: {}", addr, e));
                }
            };
            let local = server.server_addr();
            let (thread, stop) = server.stoppable();
            info!("API server listening on http://{}", local);
            listeners.push(Listener { addr: local, thread, stop });
        }

        if let (Some(port), Some(first)) = (&self.listen_port, listeners.first()) {
            port.set(first.addr.port());
        }

        info!("Registered {} endpoints:", self.registry.len());
        for (method, path) in self.registry.endpoints() {
            info!("  {:<4} {}", method, path);
        }

        self.state = ServerState::Running(listeners);
        Ok(())
    }

    /// Close every listener and wait for its thread. Stopped is a no-op.
    pub fn stop(&mut self) {
        if let ServerState::Running(listeners) = std::mem::replace(&mut self.state, ServerState::Stopped) {
            shutdown(listeners);
            info!("API server stopped");
        }
    }

    /// Start if stopped, stop if running. Returns the new running state.
    pub fn toggle(&mut self) -> Result<bool> {
        if self.is_running() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.is_running())
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ServerState::Running(_))
    }

    /// Bound addresses (ephemeral ports resolved), empty when stopped
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        match &self.state {
            ServerState::Running(listeners) => listeners.iter().map(|l| l.addr).collect(),
            ServerState::Stopped => Vec::new(),
        }
    }

    /// Base URL of the first listener
    pub fn server_url(&self) -> Option<String> {
        self.local_addrs().first().map(|addr| format!("http://{}", addr))
    }

    pub fn handle_request(request: &Request, registry: &EndpointRegistry, max_body: usize) -> Response {
        // Handle preflight
        if request.method() == "OPTIONS" {
            return Response::empty_204()
                .with_additional_header("Access-Control-Allow-Origin", "*")
                .with_additional_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
                .with_additional_header("Access-Control-Allow-Headers", "Content-Type");
        }

        debug!("{} {}", request.method(), request.raw_url());
        let response = match ApiRequest::from_rouille(request, max_body) {
            Ok(api_request) => registry.dispatch(&api_request),
            Err(e) => ApiResponse::error(&e),
        };

        Response::json(&response.body)
            .with_status_code(response.status)
            .with_additional_header("Access-Control-Allow-Origin", "*")
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn shutdown(listeners: Vec<Listener>) {
    for listener in &listeners {
        // Err means the server thread already exited
        let _ = listener.stop.send(());
    }
    for listener in listeners {
        if listener.thread.join().is_err() {
            warn!("API listener thread on {} panicked", listener.addr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::services::{HealthService, ListenPort};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Duration;

    fn registry_with_port(port: &ListenPort) -> Arc<EndpointRegistry> {
        Arc::new(EndpointRegistry::with_services(vec![Arc::new(HealthService::new(port.clone()))]))
    }

    fn registry() -> Arc<EndpointRegistry> {
        registry_with_port(&ListenPort::new(8080))
    }

    fn body_of(response: Response) -> serde_json::Value {
        let (mut reader, _) = response.data.into_reader_and_size();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn has_cors(response: &Response) -> bool {
        response
            .headers
            .iter()
            .any(|(k, v)| k.eq_ignore_ascii_case("Access-Control-Allow-Origin") && v == "*")
    }

    #[test]
    fn test_routes_through_registry() {
        let registry = registry();
        let request = Request::fake_http("GET", "/api/health", vec![], vec![]);
        let response = ApiServer::handle_request(&request, &registry, 1024);
        assert_eq!(response.status_code, 200);
        assert!(has_cors(&response));
        let body = body_of(response);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn test_unknown_route_is_json_404() {
        let registry = registry();
        let request = Request::fake_http("GET", "/api/nope", vec![], vec![]);
        let response = ApiServer::handle_request(&request, &registry, 1024);
        assert_eq!(response.status_code, 404);
        assert!(has_cors(&response));
        let body = body_of(response);
        assert_eq!(body["success"], false);
        assert_eq!(body["kind"], "route_not_found");
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[test]
    fn test_preflight() {
        let registry = registry();
        let request = Request::fake_http("OPTIONS", "/api/player/move", vec![], vec![]);
        let response = ApiServer::handle_request(&request, &registry, 1024);
        assert_eq!(response.status_code, 204);
        assert!(has_cors(&response));
    }

    #[test]
    fn test_oversized_body_rejected() {
        let registry = registry();
        let request = Request::fake_http("POST", "/api/health", vec![], vec![b'x'; 64]);
        let response = ApiServer::handle_request(&request, &registry, 16);
        assert_eq!(response.status_code, 400);
        assert_eq!(body_of(response)["kind"], "validation");
    }

    fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        write!(stream, "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path).unwrap();
        let mut text = String::new();
        stream.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_lifecycle_start_stop_rebind() {
        let config = GatewayConfig { port: 0, ..Default::default() };
        let mut server = ApiServer::new(config, registry());
        assert!(!server.is_running());
        assert!(server.server_url().is_none());

        server.start().unwrap();
        assert!(server.is_running());
        let addr = server.local_addrs()[0];
        assert_ne!(addr.port(), 0);

        let reply = http_get(addr, "/api/health");
        assert!(reply.starts_with("HTTP/1.1 200"), "{}", reply);
        assert!(reply.contains("healthy"), "{}", reply);

        server.stop();
        assert!(!server.is_running());
        assert!(server.local_addrs().is_empty());

        // Same port again; the accept thread may need a moment to let go
        let config = GatewayConfig { port: addr.port(), ..Default::default() };
        let mut again = ApiServer::new(config, registry());
        let mut bound = false;
        for _ in 0..50 {
            if again.start().is_ok() {
                bound = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(bound, "port {} not released", addr.port());
        assert_eq!(again.local_addrs()[0].port(), addr.port());
        assert_eq!(again.toggle().unwrap(), false);
    }

    #[test]
    fn test_health_reports_bound_ephemeral_port() {
        let port = ListenPort::new(0);
        let config = GatewayConfig { port: 0, ..Default::default() };
        let mut server = ApiServer::new(config, registry_with_port(&port)).with_listen_port(port.clone());
        server.start().unwrap();
        let addr = server.local_addrs()[0];
        assert_eq!(port.get(), addr.port());

        let reply = http_get(addr, "/api/health");
        assert!(reply.contains(&format!("\"port\":{}", addr.port())), "{}", reply);
        server.stop();
    }
}
