use std::process::ExitCode;

use clap::Parser;
use docbench::{
    BenchConfig, BenchError, Benchmark, JsonReporter, OutputFormat, Reporter, StdoutReporter,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = BenchConfig::parse();
    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &BenchConfig) -> Result<(), BenchError> {
    if let Ok(effective) = serde_json::to_string(config) {
        tracing::debug!("Effective configuration: {effective}");
    }

    let reporter: Box<dyn Reporter> = match config.format {
        OutputFormat::Text => Box::new(StdoutReporter),
        OutputFormat::Json => Box::new(JsonReporter),
    };

    let bench = Benchmark::connect(config).await?;
    let outcome = bench.run(reporter.as_ref()).await;
    if let Err(err) = bench.close().await {
        tracing::warn!("Failed to close store connection: {err}");
    }
    outcome.map(|_| ())
}
