//! End-to-end tests for the TCP query server and thin client

use livetab::config::ServerConfig;
use livetab::server::client::Client;
use livetab::server::Server;
use livetab::{table, Database, LivetabError};
use std::net::SocketAddr;
use std::sync::Arc;

// ── Test helpers ────────────────────────────────────────────────────────

fn demo_database() -> Database {
    let data = Arc::new(vec![(1i64, "alpha"), (2, "beta"), (3, "gamma")]);
    let def = table("words")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_int64("id", {
            let data = Arc::clone(&data);
            move |i| data[i].0
        })
        .column_text("word", {
            let data = Arc::clone(&data);
            move |i| data[i].1.to_string()
        })
        .build();

    let db = Database::open_in_memory().unwrap();
    assert!(db.register_and_create_table(&def));
    db
}

/// Bind a server on an ephemeral loopback port and serve in the
/// background.
async fn spawn_server(config: ServerConfig) -> SocketAddr {
    let bound = Server::new(config, demo_database()).bind().await.unwrap();
    let addr = bound.local_addr();
    tokio::spawn(bound.serve());
    addr
}

fn loopback_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        ..ServerConfig::default()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_query_over_the_wire() {
    let addr = spawn_server(loopback_config()).await;

    let mut client = Client::connect(addr, None).await.unwrap();
    let response = client
        .query_ok("SELECT word FROM words WHERE id = 2")
        .await
        .unwrap();
    assert_eq!(response.columns, vec!["word"]);
    assert_eq!(response.row_count, 1);
    assert_eq!(response.rows[0][0].as_deref(), Some("beta"));
}

#[tokio::test]
async fn test_multiple_queries_on_one_connection() {
    let addr = spawn_server(loopback_config()).await;

    let mut client = Client::connect(addr, None).await.unwrap();
    for expected in ["3", "2", "1"] {
        let response = client
            .query_ok(&format!("SELECT COUNT(*) FROM words WHERE id <= {expected}"))
            .await
            .unwrap();
        assert_eq!(response.rows[0][0].as_deref(), Some(expected));
    }
}

#[tokio::test]
async fn test_sql_errors_come_back_as_failure_responses() {
    let addr = spawn_server(loopback_config()).await;

    let mut client = Client::connect(addr, None).await.unwrap();
    let response = client.query("SELECT * FROM missing_table").await.unwrap();
    assert!(!response.success);
    assert!(response.error.is_some());

    let err = client.query_ok("SELECT * FROM missing_table").await;
    assert!(matches!(err, Err(LivetabError::Remote(_))));
}

#[tokio::test]
async fn test_token_is_enforced() {
    let config = ServerConfig {
        auth_token: Some("hunter2".to_string()),
        ..loopback_config()
    };
    let addr = spawn_server(config).await;

    // Missing token.
    let mut client = Client::connect(addr, None).await.unwrap();
    let response = client.query("SELECT 1").await.unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("unauthorized"));

    // Wrong token.
    let mut client = Client::connect(addr, Some("wrong".to_string())).await.unwrap();
    let response = client.query("SELECT 1").await.unwrap();
    assert!(!response.success);

    // Correct token.
    let mut client = Client::connect(addr, Some("hunter2".to_string()))
        .await
        .unwrap();
    let response = client.query_ok("SELECT COUNT(*) FROM words").await.unwrap();
    assert_eq!(response.rows[0][0].as_deref(), Some("3"));
}

#[tokio::test]
async fn test_non_loopback_bind_requires_token() {
    let config = ServerConfig {
        bind: "0.0.0.0".to_string(),
        port: 0,
        ..ServerConfig::default()
    };
    let err = Server::new(config, demo_database()).bind().await;
    assert!(matches!(err, Err(LivetabError::Config(_))));
}

#[tokio::test]
async fn test_non_loopback_bind_allowed_with_token() {
    let config = ServerConfig {
        bind: "0.0.0.0".to_string(),
        port: 0,
        auth_token: Some("t".to_string()),
        ..ServerConfig::default()
    };
    let bound = Server::new(config, demo_database()).bind().await.unwrap();
    assert_eq!(bound.local_addr().ip().to_string(), "0.0.0.0");
}

#[tokio::test]
async fn test_non_loopback_bind_allowed_with_explicit_override() {
    let config = ServerConfig {
        bind: "0.0.0.0".to_string(),
        port: 0,
        allow_insecure_no_auth: true,
        ..ServerConfig::default()
    };
    assert!(Server::new(config, demo_database()).bind().await.is_ok());
}
