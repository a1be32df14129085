//! MotionCoach feedback CLI.
//!
//! Usage: `mcoach [FILE|-]` reads NDJSON requests, `mcoach --schema` prints
//! the request JSON Schema.

use std::io::{self, BufWriter};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcoach_cli::{open_input, request_schema, run};
use mcoach_engine::{EngineConfig, FeedbackPipeline};

const USAGE: &str = "usage: mcoach [FILE|-]\n       mcoach --schema";

fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--schema") => {
            println!("{}", request_schema()?);
            return Ok(());
        }
        Some("-h") | Some("--help") => {
            println!("{USAGE}");
            return Ok(());
        }
        _ if args.len() > 1 => anyhow::bail!("{USAGE}"),
        _ => {}
    }

    let metrics = if metrics_enabled() {
        Some(init_metrics()?)
    } else {
        None
    };

    let config = EngineConfig::from_env();
    info!(?config, "Starting mcoach");

    let pipeline = FeedbackPipeline::new(&config);
    let mut registry = config.session_registry();
    let input = open_input(args.first().map(String::as_str))?;
    let output = BufWriter::new(io::stdout().lock());

    let stats = run(input, output, &pipeline, &mut registry)?;
    info!(
        processed = stats.processed,
        failed = stats.failed,
        sessions = registry.len(),
        "Input finished"
    );

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    Ok(())
}

/// Colored output for dev, JSON for production. Logs go to stderr; stdout
/// carries the NDJSON reports.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mcoach_engine=info,mcoach_cli=info,mcoach=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .with(env_filter)
            .init();
    }
}

fn metrics_enabled() -> bool {
    std::env::var("MCOACH_METRICS")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))
}
