use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "health-cli")]
#[command(about = "Query a service-health endpoint; exits non-zero unless the check passes", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Admin bearer token (admin commands only).
    #[arg(short, long, default_value = "")]
    key: String,

    /// Give up after this many seconds.
    #[arg(short, long, default_value_t = 5)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Liveness: use for restart decisions
    Live,
    /// Readiness: use for traffic admission
    Ready,
    /// Full health report
    Full,
    /// Admin: service status and cache state
    Status,
    /// Admin: drop a cached snapshot (live, ready, full or all)
    Invalidate { kind: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()?;

    let mut headers = HeaderMap::new();
    if !cli.key.is_empty() {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
        );
    }

    let base = cli.url.trim_end_matches('/');
    let res = match &cli.command {
        Commands::Live => client.get(format!("{}/health/live", base)).send().await?,
        Commands::Ready => client.get(format!("{}/health/ready", base)).send().await?,
        Commands::Full => client.get(format!("{}/health", base)).send().await?,
        Commands::Status => {
            client
                .get(format!("{}/admin/status", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Invalidate { kind } => {
            client
                .delete(format!("{}/admin/health/cache/{}", base, kind))
                .headers(headers)
                .send()
                .await?
        }
    };

    print_response(res).await
}

/// Print the body; true when the status was 2xx.
async fn print_response(res: reqwest::Response) -> Result<bool, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Status: {}", status);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("{}", status),
        Err(_) => println!("{}", text),
    }

    Ok(status.is_success())
}
