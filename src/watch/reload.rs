//! LiveReload server.
//!
//! Speaks the LiveReload protocol over WebSocket: the client opens with a
//! `hello` command and gets one back; after that the server only pushes
//! `reload` commands. The client script itself is served over plain HTTP
//! at `/livereload.js` on the same port.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::json;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

pub const PROTOCOL: &str = "http://livereload.com/protocols/official-7";

/// Browser side of the protocol.
pub const CLIENT_JS: &str = include_str!("livereload.js");

/// Ports tried after the configured one when it is busy.
const MAX_PORT_RETRIES: u16 = 10;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

pub struct ReloadServer {
    clients: Clients,
    port: u16,
}

impl ReloadServer {
    /// Bind (retrying the next ports) and accept clients on a background
    /// thread.
    pub fn start(base_port: u16) -> Result<Self> {
        let (listener, port) = bind_with_retry(base_port)?;
        let clients: Clients = Arc::new(Mutex::new(Vec::new()));

        let accepted = Arc::clone(&clients);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        if let Some(ws) = accept(stream) {
                            let mut clients = accepted.lock();
                            clients.push(ws);
                            crate::debug!("reload"; "client connected (total: {})", clients.len());
                        }
                    }
                    Err(e) => crate::log!("reload"; "accept error: {}", e),
                }
            }
        });

        Ok(Self { clients, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Tell every client to reload `path`. Stylesheets are swapped in
    /// place when `live_css` is set. Returns the number of clients
    /// reached; clients that fail are dropped.
    pub fn reload(&self, path: &str, live_css: bool) -> usize {
        let text = reload_message(path, live_css);
        let mut clients = self.clients.lock();
        clients.retain_mut(|ws| ws.send(Message::Text(text.clone().into())).is_ok());
        crate::debug!("reload"; "reload {} sent to {} client(s)", path, clients.len());
        clients.len()
    }
}

pub fn hello_message() -> String {
    json!({
        "command": "hello",
        "protocols": [PROTOCOL],
        "serverName": env!("CARGO_PKG_NAME"),
    })
    .to_string()
}

pub fn reload_message(path: &str, live_css: bool) -> String {
    json!({
        "command": "reload",
        "path": path,
        "liveCSS": live_css,
    })
    .to_string()
}

/// Serve the client script to connections asking for it; upgrade every
/// other connection.
fn accept(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    if requests_client_script(&stream) {
        if let Err(e) = send_client_script(stream) {
            crate::log!("reload"; "failed to serve client script: {}", e);
        }
        return None;
    }
    let _ = stream.set_read_timeout(None);
    handshake(stream)
}

/// Look at the request line without consuming it.
fn requests_client_script(stream: &TcpStream) -> bool {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(1)));
    let mut buf = [0u8; 64];
    for _ in 0..50 {
        match stream.peek(&mut buf) {
            Ok(0) | Err(_) => return false,
            Ok(n) if n == buf.len() || buf[..n].contains(&b'\n') => {
                return buf[..n].starts_with(b"GET /livereload.js");
            }
            Ok(_) => std::thread::sleep(Duration::from_millis(10)),
        }
    }
    false
}

fn send_client_script(mut stream: TcpStream) -> std::io::Result<()> {
    // Drain the request head so closing does not reset the connection.
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") && head.len() < 8192 {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }

    write!(
        stream,
        "HTTP/1.1 200 OK\r\nContent-Type: application/javascript\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
        CLIENT_JS.len()
    )?;
    stream.write_all(CLIENT_JS.as_bytes())?;
    stream.flush()
}

/// Upgrade the connection and answer the client's `hello`.
fn handshake(stream: TcpStream) -> Option<WebSocket<TcpStream>> {
    let mut ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            crate::log!("reload"; "handshake failed: {}", e);
            return None;
        }
    };

    // Clients that never say hello still get one.
    let _ = ws.get_ref().set_read_timeout(Some(Duration::from_secs(1)));
    if let Ok(Message::Text(text)) = ws.read() {
        let command = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|v| v.get("command").and_then(|c| c.as_str()).map(String::from));
        crate::debug!("reload"; "client says {}", command.as_deref().unwrap_or("?"));
    }
    let _ = ws.get_ref().set_read_timeout(None);

    ws.send(Message::Text(hello_message().into())).ok()?;
    Some(ws)
}

fn bind_with_retry(base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                let actual = listener.local_addr()?.port();
                if offset > 0 {
                    crate::log!("reload"; "port {} in use, using {} instead", base_port, actual);
                }
                return Ok((listener, actual));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow::anyhow!(
        "failed to bind live reload server after {} attempts: {}",
        MAX_PORT_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}
