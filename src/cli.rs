//! Command-line interface
//!
//! Three modes:
//! - **direct** (default): open the source database, run the SQL, exit
//! - **serve** (`--serve`): expose the source database over TCP
//! - **client** (`--connect host:port`): run the SQL on a remote server

use crate::db::QueryOutput;
use crate::error::{LivetabError, Result};
use clap::Parser;
use comfy_table::Table;
use std::io::Write;
use std::path::PathBuf;

/// Query live SQLite data locally or over the wire.
#[derive(Parser, Debug, Clone)]
#[command(name = "livetab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expose and query live host data as SQLite virtual tables")]
pub struct Cli {
    /// Database source to open (path or :memory:)
    #[arg(short = 's', long, default_value = ":memory:")]
    pub source: String,

    /// SQL command to execute
    #[arg(short = 'c', long)]
    pub command: Option<String>,

    /// File containing SQL to execute
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Write results as CSV to this file instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Run as a query server
    #[arg(long)]
    pub serve: bool,

    /// Server port (serve mode)
    #[arg(long, default_value_t = crate::config::DEFAULT_PORT)]
    pub port: u16,

    /// Server bind address (serve mode)
    #[arg(long, default_value = crate::config::DEFAULT_BIND)]
    pub bind: String,

    /// Connect to a remote server (host:port) instead of opening a source
    #[arg(long)]
    pub connect: Option<String>,

    /// Auth token for serve/client modes
    #[arg(long, env = "LIVETAB_TOKEN")]
    pub token: Option<String>,

    /// Allow serving on a non-loopback address without an auth token
    #[arg(long)]
    pub allow_insecure_no_auth: bool,
}

/// Execution mode derived from the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Direct,
    Serve,
    Client,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.serve {
            Mode::Serve
        } else if self.connect.is_some() {
            Mode::Client
        } else {
            Mode::Direct
        }
    }

    /// The SQL to run, from `--command` or `--file`.
    pub fn sql(&self) -> Result<String> {
        match (&self.command, &self.file) {
            (Some(sql), _) => Ok(sql.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
            (None, None) => Err(LivetabError::Config(
                "nothing to run: pass --command or --file".to_string(),
            )),
        }
    }
}

/// Render a result set to stdout or, with `--output`, to a CSV file.
pub fn emit_output(output: &QueryOutput, target: Option<&PathBuf>) -> Result<()> {
    match target {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            write_csv(&mut file, output)?;
        }
        None => {
            print_table(output);
        }
    }
    Ok(())
}

fn print_table(output: &QueryOutput) {
    let mut table = Table::new();
    table.set_header(output.columns.clone());
    for row in &output.rows {
        table.add_row(
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| "NULL".to_string())),
        );
    }
    println!("{table}");
    println!(
        "{} row{}",
        output.row_count,
        if output.row_count == 1 { "" } else { "s" }
    );
}

fn write_csv<W: Write>(writer: &mut W, output: &QueryOutput) -> Result<()> {
    writeln!(writer, "{}", output.columns.iter().map(|c| csv_field(c)).collect::<Vec<_>>().join(","))?;
    for row in &output.rows {
        let line = row
            .iter()
            .map(|cell| csv_field(cell.as_deref().unwrap_or("")))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_selection() {
        let cli = Cli::parse_from(["livetab", "-c", "SELECT 1"]);
        assert_eq!(cli.mode(), Mode::Direct);

        let cli = Cli::parse_from(["livetab", "--serve", "--port", "9999"]);
        assert_eq!(cli.mode(), Mode::Serve);
        assert_eq!(cli.port, 9999);

        let cli = Cli::parse_from(["livetab", "--connect", "127.0.0.1:13337", "-c", "SELECT 1"]);
        assert_eq!(cli.mode(), Mode::Client);
    }

    #[test]
    fn test_sql_requires_command_or_file() {
        let cli = Cli::parse_from(["livetab"]);
        assert!(cli.sql().is_err());

        let cli = Cli::parse_from(["livetab", "-c", "SELECT 1"]);
        assert_eq!(cli.sql().unwrap(), "SELECT 1");
    }

    #[test]
    fn test_csv_field_quoting() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
