mod comparator;
mod config;
mod evaluator;
mod executor;
mod parser;
mod runner;

use anyhow::Context;
use config::ChildEnvironment;
use executor::Grader;
use grader_common::inputs::{EnvInputs, RawInputs};
use grader_common::output::{set_output, RESULT_OUTPUT};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Grader booting...");

    let raw = RawInputs::read(&EnvInputs);
    let grader = Grader::new(ChildEnvironment::from_host());

    let envelope = grader.run(&raw).await;
    let encoded = envelope
        .encode()
        .context("Failed to encode result envelope")?;

    set_output(RESULT_OUTPUT, &encoded).context("Failed to set result output")?;

    info!(status = %envelope.status, "Result emitted");
    Ok(())
}

/// Logs go to stderr; stdout may carry the host output command
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("GRADER_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
