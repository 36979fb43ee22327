//! Thin query client
//!
//! Connects to a livetab server and exchanges one length-prefixed JSON
//! request/response pair per query over a persistent connection.

use super::protocol::{read_response, send_request, QueryRequest, QueryResponse};
use crate::config::DEFAULT_MAX_MESSAGE_BYTES;
use crate::error::{LivetabError, Result};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::debug;

/// Client for the livetab query server.
pub struct Client {
    stream: TcpStream,
    token: Option<String>,
    max_message_bytes: usize,
}

impl Client {
    /// Connect to a server, optionally carrying an auth token on every
    /// request.
    pub async fn connect(addr: impl ToSocketAddrs, token: Option<String>) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected to query server");
        Ok(Client {
            stream,
            token,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        })
    }

    /// Override the response-size cap.
    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    /// Execute SQL remotely, returning the raw response.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResponse> {
        let request = QueryRequest {
            sql: sql.to_string(),
            token: self.token.clone(),
        };
        send_request(&mut self.stream, &request).await?;
        read_response(&mut self.stream, self.max_message_bytes).await
    }

    /// Execute SQL remotely, converting a failure response into an error.
    pub async fn query_ok(&mut self, sql: &str) -> Result<QueryResponse> {
        let response = self.query(sql).await?;
        if response.success {
            Ok(response)
        } else {
            Err(LivetabError::Remote(
                response
                    .error
                    .unwrap_or_else(|| "unknown server error".to_string()),
            ))
        }
    }
}
