//! Server configuration

use serde::{Deserialize, Serialize};

/// Default TCP port for the query server.
pub const DEFAULT_PORT: u16 = 13337;

/// Default bind address (loopback only).
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default cap on a single wire message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for [`crate::server::Server`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind. Non-loopback addresses require an auth token
    /// unless `allow_insecure_no_auth` is set.
    pub bind: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Shared token clients must present with each request.
    pub auth_token: Option<String>,
    /// Explicitly allow binding a non-loopback address without a token.
    pub allow_insecure_no_auth: bool,
    /// Cap on a single request or response frame.
    pub max_message_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
            auth_token: None,
            allow_insecure_no_auth: false,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl ServerConfig {
    /// Whether the configured bind address stays on the local machine.
    pub fn is_loopback_bind(&self) -> bool {
        self.bind == "localhost" || self.bind == "::1" || self.bind.starts_with("127.")
    }
}
