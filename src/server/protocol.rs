//! Wire protocol: length-prefixed JSON over TCP
//!
//! Every message is a 4-byte big-endian unsigned length followed by that
//! many bytes of JSON. Requests carry the SQL text and an optional auth
//! token; responses carry either the result set or an error:
//!
//! ```text
//! {"sql":"SELECT ...","token":"..."}
//! {"success":true,"columns":[...],"rows":[[...],...],"row_count":N}
//! {"success":false,"error":"message"}
//! ```

use crate::config::DEFAULT_MAX_MESSAGE_BYTES;
use crate::db::QueryOutput;
use crate::error::{LivetabError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A query request from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// SQL text to execute.
    pub sql: String,
    /// Auth token, required when the server is configured with one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A query response from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Vec<Option<String>>>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResponse {
    /// A successful response carrying a result set.
    pub fn ok(output: QueryOutput) -> Self {
        QueryResponse {
            success: true,
            columns: output.columns,
            row_count: output.row_count,
            rows: output.rows,
            error: None,
        }
    }

    /// A failure response carrying an error message.
    pub fn fail(message: impl Into<String>) -> Self {
        QueryResponse {
            success: false,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            error: Some(message.into()),
        }
    }
}

/// Read one length-prefixed frame, enforcing `max_bytes` before the body
/// is allocated.
pub async fn read_frame<S>(stream: &mut S, max_bytes: usize) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut size_buf = [0u8; 4];
    stream.read_exact(&mut size_buf).await?;
    let size = u32::from_be_bytes(size_buf) as usize;

    if size > max_bytes {
        return Err(LivetabError::MessageTooLarge {
            size,
            max: max_bytes,
        });
    }

    let mut body = vec![0u8; size];
    stream.read_exact(&mut body).await?;
    Ok(body)
}

/// Write one length-prefixed frame.
pub async fn write_frame<S>(stream: &mut S, payload: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let size = u32::try_from(payload.len())
        .map_err(|_| LivetabError::protocol("frame exceeds u32 length prefix"))?;
    stream.write_all(&size.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Serialize and send a request.
pub async fn send_request<S>(stream: &mut S, request: &QueryRequest) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(request)?;
    write_frame(stream, &payload).await
}

/// Receive and parse a request.
pub async fn read_request<S>(stream: &mut S, max_bytes: usize) -> Result<QueryRequest>
where
    S: AsyncRead + Unpin,
{
    let body = read_frame(stream, max_bytes).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Serialize and send a response.
pub async fn send_response<S>(stream: &mut S, response: &QueryResponse) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(response)?;
    write_frame(stream, &payload).await
}

/// Receive and parse a response.
pub async fn read_response<S>(stream: &mut S, max_bytes: usize) -> Result<QueryResponse>
where
    S: AsyncRead + Unpin,
{
    let body = read_frame(stream, max_bytes).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// Default frame cap re-exported for callers that frame by hand.
pub const MAX_MESSAGE_BYTES: usize = DEFAULT_MAX_MESSAGE_BYTES;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = QueryRequest {
            sql: "SELECT 1".to_string(),
            token: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"sql":"SELECT 1"}"#);

        let parsed: QueryRequest = serde_json::from_str(r#"{"sql":"SELECT 2","token":"s3cret"}"#)
            .unwrap();
        assert_eq!(parsed.sql, "SELECT 2");
        assert_eq!(parsed.token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_response_shapes() {
        let ok = QueryResponse::ok(QueryOutput {
            columns: vec!["n".to_string()],
            rows: vec![vec![Some("1".to_string())], vec![None]],
            row_count: 2,
        });
        let json = serde_json::to_string(&ok).unwrap();
        assert!(json.contains(r#""success":true"#));
        assert!(json.contains(r#""row_count":2"#));
        assert!(json.contains("null"));
        assert!(!json.contains("error"));

        let fail = QueryResponse::fail("no such table");
        let json = serde_json::to_string(&fail).unwrap();
        assert!(json.contains(r#""success":false"#));
        assert!(json.contains(r#""error":"no such table""#));
        assert!(!json.contains("columns"));
    }
}
