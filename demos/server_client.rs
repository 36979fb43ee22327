//! Query server and thin client talking over loopback TCP.
//!
//! Run with: `cargo run --example server_client`

use livetab::config::ServerConfig;
use livetab::server::client::Client;
use livetab::server::Server;
use livetab::{table, Database};
use std::sync::Arc;

#[tokio::main]
async fn main() -> livetab::Result<()> {
    let data = Arc::new(vec![("ping", 4i64), ("pong", 7), ("peng", 1)]);
    let def = table("counters")
        .count({
            let data = Arc::clone(&data);
            move || data.len()
        })
        .column_text("name", {
            let data = Arc::clone(&data);
            move |i| data[i].0.to_string()
        })
        .column_int64("hits", {
            let data = Arc::clone(&data);
            move |i| data[i].1
        })
        .build();

    let db = Database::open_in_memory()?;
    db.register_and_create_table(&def);

    let config = ServerConfig {
        port: 0,
        auth_token: Some("demo-token".to_string()),
        ..ServerConfig::default()
    };
    let bound = Server::new(config, db).bind().await?;
    let addr = bound.local_addr();
    tokio::spawn(bound.serve());
    println!("server on {addr}");

    let mut client = Client::connect(addr, Some("demo-token".to_string())).await?;
    let response = client
        .query_ok("SELECT name, hits FROM counters ORDER BY hits DESC")
        .await?;
    for row in &response.rows {
        println!(
            "{}: {}",
            row[0].as_deref().unwrap_or("NULL"),
            row[1].as_deref().unwrap_or("NULL")
        );
    }
    Ok(())
}
