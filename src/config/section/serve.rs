//! Watch-mode sections: `[serve]`, `[server]`, `[mock]`.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! livereload_port = 35729
//!
//! [server]
//! command = ["node", "server.js"]
//! watch = ["devServer"]
//! env_var = "NODE_ENV"
//!
//! [mock]
//! port = 8081
//! proxy_port = 8080
//! expectations = "mock/expectations.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::ConfigDiagnostics;

/// Live reload channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Port of the live reload WebSocket (next ports are tried if busy).
    pub livereload_port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            livereload_port: crate::watch::DEFAULT_LIVERELOAD_PORT,
        }
    }
}

/// Backing application server supervised by the watch loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enable: bool,
    pub command: Vec<String>,
    /// Directories whose changes restart the server.
    pub watch: Vec<PathBuf>,
    /// Extensions that count as server sources.
    pub ext: Vec<String>,
    /// Variable carrying `development` / `production`.
    pub env_var: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enable: true,
            command: vec!["node".into(), "server.js".into()],
            watch: vec!["devServer".into()],
            ext: vec!["js".into()],
            env_var: "NODE_ENV".into(),
        }
    }
}

/// Mock API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub port: u16,
    /// Unmatched requests are forwarded to `127.0.0.1:<proxy_port>`.
    pub proxy_port: u16,
    /// JSON file with the list of expectations.
    pub expectations: PathBuf,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            proxy_port: 8080,
            expectations: "mock/expectations.json".into(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.enable && self.command.is_empty() {
            diag.error_with_hint(
                "server.command",
                "command must not be empty",
                "set `enable = false` to run without a backing server",
            );
        }
        if self.env_var.is_empty() {
            diag.error("server.env_var", "variable name must not be empty");
        }
    }
}

impl MockConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.port == self.proxy_port {
            diag.error("mock.proxy_port", "must differ from mock.port");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_ports_must_differ() {
        let mock = MockConfig {
            port: 9000,
            proxy_port: 9000,
            ..MockConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        mock.validate(&mut diag);
        assert!(!diag.is_empty());
    }

    #[test]
    fn test_disabled_server_may_have_no_command() {
        let server = ServerConfig {
            enable: false,
            command: vec![],
            ..ServerConfig::default()
        };
        let mut diag = ConfigDiagnostics::new();
        server.validate(&mut diag);
        assert!(diag.is_empty());
    }
}
