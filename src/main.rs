//! livetab - query live SQLite data locally or over the wire

use clap::Parser;
use livetab::cli::{emit_output, Cli, Mode};
use livetab::config::ServerConfig;
use livetab::db::{Database, QueryOutput};
use livetab::server::client::Client;
use livetab::server::Server;
use livetab::Result;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("livetab=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!(error = %e, "livetab failed");
        eprintln!("livetab: {e}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match cli.mode() {
        Mode::Direct => run_direct(&cli),
        Mode::Serve => runtime.block_on(run_serve(&cli)),
        Mode::Client => runtime.block_on(run_client(&cli)),
    }
}

fn open_source(cli: &Cli) -> Result<Database> {
    if cli.source == ":memory:" {
        Database::open_in_memory()
    } else {
        Database::open(&cli.source)
    }
}

fn run_direct(cli: &Cli) -> Result<()> {
    let db = open_source(cli)?;
    let output = db.query(&cli.sql()?)?;
    emit_output(&output, cli.output.as_ref())
}

async fn run_serve(cli: &Cli) -> Result<()> {
    let config = ServerConfig {
        bind: cli.bind.clone(),
        port: cli.port,
        auth_token: cli.token.clone(),
        allow_insecure_no_auth: cli.allow_insecure_no_auth,
        ..ServerConfig::default()
    };
    let db = open_source(cli)?;
    Server::new(config, db).run().await
}

async fn run_client(cli: &Cli) -> Result<()> {
    let addr = cli
        .connect
        .clone()
        .unwrap_or_else(|| format!("127.0.0.1:{}", cli.port));
    let mut client = Client::connect(addr, cli.token.clone()).await?;
    let response = client.query_ok(&cli.sql()?).await?;
    let output = QueryOutput {
        columns: response.columns,
        row_count: response.row_count,
        rows: response.rows,
    };
    emit_output(&output, cli.output.as_ref())
}
