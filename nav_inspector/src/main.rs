use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use nav_client::{load_client_config_from_env, PathfindingClient};
use nav_runtime::parse_query_line;
use tracing::{info, warn};

mod report;

use report::run_request;

#[derive(Parser, Debug)]
#[command(author, version, about = "Query a running navigation server", long_about = None)]
struct Cli {
    /// Server address; overrides the configured endpoint.
    #[arg(long)]
    endpoint: Option<String>,
    /// Read timeout in milliseconds; zero waits forever.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Pretty-print JSON results.
    #[arg(long)]
    pretty: bool,
    /// A single query, e.g. `path 0 0 0 0 20 0 0 smooth`. Without one, queries
    /// are read line by line from stdin.
    query: Vec<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = load_client_config_from_env();
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config = config.with_read_timeout(Duration::from_millis(timeout_ms));
    }
    info!(endpoint = config.endpoint(), "inspector.ready");
    let mut client = PathfindingClient::tcp(config);

    if !cli.query.is_empty() {
        let line = cli.query.join(" ");
        return execute(&mut client, &line, cli.pretty);
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.wrap_err("failed to read query from stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if matches!(trimmed, "quit" | "exit") {
            break;
        }
        if let Err(err) = execute(&mut client, trimmed, cli.pretty) {
            warn!(query = trimmed, "inspector.query_failed");
            eprintln!("error: {err:#}");
        }
    }
    Ok(())
}

fn execute(client: &mut PathfindingClient, line: &str, pretty: bool) -> Result<()> {
    let request = parse_query_line(line).wrap_err_with(|| format!("could not parse `{line}`"))?;
    let report = run_request(client, &request)?;
    let rendered = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
