use std::process::ExitCode;

use tower::Service;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coletor_mpam::{CollectRequest, CollectService, CollectorConfig};

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the downloaded file paths.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match CollectorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    info!("Collecting period {}", config.period());

    let mut service = CollectService::new();
    let result = match service.call(CollectRequest::from(config)).await {
        Ok(result) => result,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };

    // The downstream parser expects the paths newline-separated, in
    // collection order. Changes here must be reflected there.
    let lines: Vec<String> = result
        .files
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    println!("{}", lines.join("\n"));

    ExitCode::SUCCESS
}
