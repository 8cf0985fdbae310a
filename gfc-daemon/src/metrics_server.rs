//! Prometheus scrape endpoint
//!
//! A blocking tiny_http server on its own thread, answering `/metrics` with
//! the current gauge set and 404 for everything else.

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use gfc_core::constants::metrics::{CONTENT_TYPE, PATH};
use gfc_core::FanMetrics;
use gfc_error::{FanControlError, Result};
use tiny_http::{Header, Method, Response, Server};
use tracing::{debug, info};

type Body = Response<std::io::Cursor<Vec<u8>>>;

pub struct MetricsServer {
    server: Arc<Server>,
    worker: Option<JoinHandle<()>>,
}

impl MetricsServer {
    /// Bind on all interfaces and start serving
    pub fn start(port: u16, metrics: Arc<FanMetrics>) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let server = Server::http(addr)
            .map_err(|e| FanControlError::MetricsServer(format!("bind {}: {}", addr, e)))?;
        let server = Arc::new(server);

        let worker = {
            let server = Arc::clone(&server);
            thread::Builder::new()
                .name("metrics-http".into())
                .spawn(move || serve(&server, &metrics))?
        };

        let server = Self {
            server,
            worker: Some(worker),
        };
        info!(
            "Metrics available on http://{}:{}{}",
            addr.ip(),
            server.local_port().unwrap_or(port),
            PATH
        );
        Ok(server)
    }

    /// Port actually bound, useful when started on port 0
    pub fn local_port(&self) -> Option<u16> {
        self.server.server_addr().to_ip().map(|addr| addr.port())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                debug!("Metrics thread panicked");
            }
        }
    }
}

impl Drop for MetricsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(server: &Server, metrics: &FanMetrics) {
    for request in server.incoming_requests() {
        let response = respond(request.method(), request.url(), metrics);
        if let Err(e) = request.respond(response) {
            debug!("Failed to answer metrics request: {}", e);
        }
    }
    debug!("Metrics server stopped");
}

fn respond(method: &Method, url: &str, metrics: &FanMetrics) -> Body {
    let path = url.split('?').next().unwrap_or(url);
    if path != PATH {
        return Response::from_string("Not Found").with_status_code(404);
    }
    if !matches!(method, Method::Get | Method::Head) {
        return Response::from_string("Method Not Allowed").with_status_code(405);
    }

    let response = Response::from_string(metrics.render());
    match Header::from_bytes(&b"Content-Type"[..], CONTENT_TYPE.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfc_core::{FanState, MetricsSink};
    use std::io::{Read, Write};
    use std::net::TcpStream;

    fn metrics() -> Arc<FanMetrics> {
        Arc::new(FanMetrics::new("70", "/sys/class/thermal/thermal_zone0/temp", 45.0, 77.0, 5.0))
    }

    #[test]
    fn test_respond_metrics() {
        let metrics = metrics();
        metrics.set_fan_state(FanState::On);
        let response = respond(&Method::Get, "/metrics", &metrics);
        assert_eq!(response.status_code().0, 200);
    }

    #[test]
    fn test_respond_query_string() {
        let response = respond(&Method::Get, "/metrics?name[]=x", &metrics());
        assert_eq!(response.status_code().0, 200);
    }

    #[test]
    fn test_respond_unknown_path() {
        let response = respond(&Method::Get, "/", &metrics());
        assert_eq!(response.status_code().0, 404);
    }

    #[test]
    fn test_respond_wrong_method() {
        let response = respond(&Method::Post, "/metrics", &metrics());
        assert_eq!(response.status_code().0, 405);
    }

    #[test]
    fn test_scrape_over_http() {
        let metrics = metrics();
        metrics.set_temperature(51.25);
        let server = MetricsServer::start(0, Arc::clone(&metrics)).unwrap();
        let port = server.local_port().unwrap();

        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.0\r\nHost: localhost\r\n\r\n")
            .unwrap();
        let mut body = String::new();
        stream.read_to_string(&mut body).unwrap();

        assert!(body.starts_with("HTTP/1."), "{}", body);
        assert!(body.contains(" 200 "), "{}", body);
        assert!(body.contains("text/plain; version=0.0.4"));
        assert!(body.contains("gpio_fan_control_temperature{"));
        assert!(body.contains("} 51.25"));

        server.stop();
    }

    #[test]
    fn test_bind_conflict_is_reported() {
        let first = MetricsServer::start(0, metrics()).unwrap();
        let port = first.local_port().unwrap();
        let err = MetricsServer::start(port, metrics()).err().unwrap();
        assert!(matches!(err, FanControlError::MetricsServer(_)));
        first.stop();
    }
}
