//! Mock API server.
//!
//! Answers requests matching a configured expectation with the canned
//! response and forwards everything else to the real backend.
//!
//! Expectations live in a JSON file:
//!
//! ```json
//! [
//!   { "method": "GET", "path": "/api/users", "status": 200,
//!     "headers": { "Content-Type": "application/json" },
//!     "body": [{ "id": 1 }] }
//! ]
//! ```
//!
//! A string `body` is sent verbatim; any other JSON value is serialized.

use std::fs;
use std::io::Read;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tiny_http::{Header, Request, Response, Server, StatusCode};

use crate::config::{MockConfig, ProjectConfig};
use crate::log;

#[derive(Debug, Clone, Deserialize)]
pub struct Expectation {
    /// Any method when absent.
    #[serde(default)]
    pub method: Option<String>,
    pub path: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub headers: FxHashMap<String, String>,
    #[serde(default)]
    pub body: serde_json::Value,
}

fn default_status() -> u16 {
    200
}

impl Expectation {
    pub fn matches(&self, method: &str, url: &str) -> bool {
        let path = url.split('?').next().unwrap_or(url);
        self.path == path
            && self
                .method
                .as_deref()
                .is_none_or(|m| m.eq_ignore_ascii_case(method))
    }

    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::String(s) => s.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }
}

/// Load the expectation list; a missing file means no expectations.
pub fn load_expectations(path: &Path) -> Result<Vec<Expectation>> {
    if !path.exists() {
        log!("mock"; "{} not found, proxying everything", path.display());
        return Ok(Vec::new());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid expectations in {}", path.display()))
}

pub struct MockServer {
    server: Server,
    expectations: Arc<Vec<Expectation>>,
    backend: Backend,
}

impl MockServer {
    pub fn bind(config: &MockConfig, expectations: Vec<Expectation>) -> Result<Self> {
        let server = Server::http(("127.0.0.1", config.port))
            .map_err(|e| anyhow!("failed to bind mock server on port {}: {}", config.port, e))?;
        Ok(Self {
            server,
            expectations: Arc::new(expectations),
            backend: Backend::new(config.proxy_port),
        })
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.server.server_addr().to_ip()
    }

    /// Serve until the process ends; each request gets its own worker.
    pub fn run(self) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .context("failed to create mock server thread pool")?;

        for request in self.server.incoming_requests() {
            let expectations = Arc::clone(&self.expectations);
            let backend = self.backend.clone();
            pool.spawn(move || {
                if let Err(e) = handle(request, &expectations, &backend) {
                    log!("mock"; "request error: {e:#}");
                }
            });
        }
        Ok(())
    }
}

/// `mockserver` task.
pub fn serve(config: &ProjectConfig) -> Result<()> {
    let mock = &config.mock;
    let expectations = load_expectations(&config.root_join(&mock.expectations))?;
    let server = MockServer::bind(mock, expectations)?;
    log!("mock"; "http://127.0.0.1:{} ({} expectation(s), forwarding to port {})",
        mock.port, server.expectations.len(), mock.proxy_port);
    server.run()
}

fn handle(mut request: Request, expectations: &[Expectation], backend: &Backend) -> Result<()> {
    let method = request.method().as_str().to_string();
    let url = request.url().to_string();

    if let Some(expectation) = expectations.iter().find(|e| e.matches(&method, &url)) {
        crate::debug!("mock"; "{method} {url} -> {}", expectation.status);
        let mut response = Response::from_data(expectation.body_bytes())
            .with_status_code(StatusCode(expectation.status));
        for (name, value) in &expectation.headers {
            response = response.with_header(header(name, value)?);
        }
        request.respond(response)?;
        return Ok(());
    }

    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body)?;
    let headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().to_string(), h.value.as_str().to_string()))
        .collect();

    match backend.forward(&method, &url, &headers, &body) {
        Ok(upstream) => {
            crate::debug!("mock"; "{method} {url} -> proxied {}", upstream.status);
            let mut response =
                Response::from_data(upstream.body).with_status_code(StatusCode(upstream.status));
            for (name, value) in &upstream.headers {
                response = response.with_header(header(name, value)?);
            }
            request.respond(response)?;
        }
        Err(e) => {
            log!("mock"; "{method} {url}: backend unreachable: {e:#}");
            request.respond(Response::from_string("bad gateway").with_status_code(StatusCode(502)))?;
        }
    }
    Ok(())
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header `{name}`"))
}

/// Headers describing one connection, never relayed.
fn is_hop_header(name: &str) -> bool {
    ["connection", "transfer-encoding", "content-length", "keep-alive", "host"]
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

// ============================================================================
// Forwarding
// ============================================================================

/// Backend response, relayed as is apart from connection headers.
#[derive(Debug, PartialEq, Eq)]
pub struct Upstream {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// The real backend on a local port. Redirects and error statuses are the
/// client's business, so both come back as plain responses.
#[derive(Clone)]
struct Backend {
    agent: ureq::Agent,
    port: u16,
}

impl Backend {
    fn new(port: u16) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(30))
            .redirects(0)
            .build();
        Self { agent, port }
    }

    fn forward(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: &[u8],
    ) -> Result<Upstream> {
        let target = format!("http://127.0.0.1:{}{url}", self.port);
        let mut request = self.agent.request(method, &target);
        for (name, value) in headers {
            if !is_hop_header(name) {
                request = request.set(name, value);
            }
        }

        let result = if body.is_empty() {
            request.call()
        } else {
            request.send_bytes(body)
        };
        let response = match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(e)) => return Err(anyhow!("{e}")),
        };
        relay(response)
    }
}

fn relay(response: ureq::Response) -> Result<Upstream> {
    let status = response.status();
    let mut headers = Vec::new();
    for name in response.headers_names() {
        if is_hop_header(&name) {
            continue;
        }
        for value in response.all(&name) {
            headers.push((name.clone(), value.to_string()));
        }
    }
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .context("failed to read backend response")?;
    Ok(Upstream {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::{TcpListener, TcpStream};

    fn expectations() -> Vec<Expectation> {
        serde_json::from_str(
            r#"[
                {"method": "GET", "path": "/api/users", "body": [{"id": 1}],
                 "headers": {"Content-Type": "application/json"}},
                {"path": "/api/ping", "status": 204},
                {"method": "POST", "path": "/api/login", "status": 401, "body": "nope"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_matching() {
        let list = expectations();
        let find = |m: &str, u: &str| list.iter().position(|e| e.matches(m, u));

        assert_eq!(find("GET", "/api/users"), Some(0));
        assert_eq!(find("get", "/api/users?page=2"), Some(0));
        assert_eq!(find("POST", "/api/users"), None);
        assert_eq!(find("DELETE", "/api/ping"), Some(1));
        assert_eq!(find("POST", "/api/login"), Some(2));
    }

    #[test]
    fn test_body_encoding() {
        let list = expectations();
        assert_eq!(list[0].body_bytes(), br#"[{"id":1}]"#);
        assert!(list[1].body_bytes().is_empty());
        assert_eq!(list[2].body_bytes(), b"nope");
    }

    #[test]
    fn test_missing_expectation_file() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(load_expectations(&temp.path().join("none.json")).unwrap().is_empty());
    }

    fn get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(stream, "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    /// A backend answering every request with the same raw response.
    fn backend(raw: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = stream.unwrap();
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                stream.write_all(raw).unwrap();
            }
        });
        port
    }

    fn mock(proxy_port: u16) -> SocketAddr {
        let config = MockConfig {
            port: 0,
            proxy_port,
            expectations: "unused.json".into(),
        };
        let server = MockServer::bind(&config, expectations()).unwrap();
        let addr = server.addr().unwrap();
        std::thread::spawn(move || server.run());
        addr
    }

    #[test]
    fn test_serves_and_proxies() {
        let addr = mock(backend(
            b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\nConnection: close\r\n\r\nbackend",
        ));

        let mocked = get(addr, "/api/users");
        assert!(mocked.starts_with("HTTP/1.1 200"));
        assert!(mocked.ends_with(r#"[{"id":1}]"#));

        let proxied = get(addr, "/index.html");
        assert!(proxied.starts_with("HTTP/1.1 200"));
        assert!(proxied.ends_with("backend"));
    }

    #[test]
    fn test_proxied_chunked_body_arrives_unframed() {
        let addr = mock(backend(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: gzip, chunked\r\nX-Id: 7\r\nConnection: close\r\n\r\n3\r\nabc\r\n0\r\n\r\n",
        ));

        let proxied = get(addr, "/stream");
        assert!(proxied.starts_with("HTTP/1.1 200"), "{proxied}");
        assert!(proxied.to_ascii_lowercase().contains("x-id: 7"), "{proxied}");
        assert!(proxied.ends_with("\r\n\r\nabc"), "{proxied}");
    }

    #[test]
    fn test_backend_errors_pass_through() {
        let addr = mock(backend(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
        ));

        let proxied = get(addr, "/api/unknown");
        assert!(proxied.starts_with("HTTP/1.1 404"), "{proxied}");
        assert!(proxied.ends_with("missing"), "{proxied}");
    }

    #[test]
    fn test_unreachable_backend_is_bad_gateway() {
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let proxied = get(mock(port), "/index.html");
        assert!(proxied.starts_with("HTTP/1.1 502"), "{proxied}");
    }
}
