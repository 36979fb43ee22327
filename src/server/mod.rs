//! TCP query server
//!
//! Accepts length-prefixed JSON query requests (see [`protocol`]) and
//! executes them against a shared [`Database`]. Queries are serialized
//! through a mutex because a SQLite connection is single-threaded; the
//! accept loop and framing are async.
//!
//! Bind policy: a non-loopback address without an auth token is refused
//! at bind time unless `allow_insecure_no_auth` is set. With a token
//! configured, every request must present it.

pub mod client;
pub mod protocol;

use crate::config::ServerConfig;
use crate::db::Database;
use crate::error::{LivetabError, Result};
use parking_lot::Mutex;
use self::protocol::{read_request, send_response, QueryResponse};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// The livetab query server.
pub struct Server {
    config: ServerConfig,
    db: Arc<Mutex<Database>>,
}

impl Server {
    pub fn new(config: ServerConfig, db: Database) -> Self {
        Server {
            config,
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Bind the listener, enforcing the loopback/token policy.
    pub async fn bind(self) -> Result<BoundServer> {
        if !self.config.is_loopback_bind()
            && self.config.auth_token.is_none()
            && !self.config.allow_insecure_no_auth
        {
            return Err(LivetabError::Config(format!(
                "refusing to bind {} without an auth token; set one or allow_insecure_no_auth",
                self.config.bind
            )));
        }

        let addr = format!("{}:{}", self.config.bind, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "Query server listening");

        Ok(BoundServer {
            config: self.config,
            db: self.db,
            listener,
            local_addr,
        })
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<()> {
        self.bind().await?.serve().await
    }
}

/// A server whose listener is bound and whose address is known.
pub struct BoundServer {
    config: ServerConfig,
    db: Arc<Mutex<Database>>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundServer {
    /// The actual bound address (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever.
    pub async fn serve(self) -> Result<()> {
        let config = Arc::new(self.config);
        loop {
            let (stream, peer) = self.listener.accept().await?;
            debug!(peer = %peer, "Client connected");
            let db = Arc::clone(&self.db);
            let config = Arc::clone(&config);
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer, db, config).await {
                    match &e {
                        LivetabError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                            debug!(peer = %peer, "Client disconnected");
                        }
                        _ => warn!(peer = %peer, error = %e, "Connection closed with error"),
                    }
                }
            });
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    db: Arc<Mutex<Database>>,
    config: Arc<ServerConfig>,
) -> Result<()> {
    loop {
        let request = match read_request(&mut stream, config.max_message_bytes).await {
            Ok(request) => request,
            Err(LivetabError::MessageTooLarge { size, max }) => {
                warn!(peer = %peer, size, max, "Rejecting oversized request");
                let response = QueryResponse::fail(format!(
                    "request of {size} bytes exceeds maximum {max}"
                ));
                send_response(&mut stream, &response).await?;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let response = if let Some(expected) = config.auth_token.as_deref() {
            if request.token.as_deref() == Some(expected) {
                execute(&db, &request.sql)
            } else {
                warn!(peer = %peer, "Rejected request with missing or invalid token");
                QueryResponse::fail("unauthorized")
            }
        } else {
            execute(&db, &request.sql)
        };

        send_response(&mut stream, &response).await?;
    }
}

fn execute(db: &Mutex<Database>, sql: &str) -> QueryResponse {
    debug!(sql = %sql, "Executing remote query");
    match db.lock().query(sql) {
        Ok(output) => QueryResponse::ok(output),
        Err(e) => QueryResponse::fail(e.to_string()),
    }
}
