//! CLI entry point: runs a detection session or the latency benchmark.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vigil_core::{
    run_latency_benchmark, BenchmarkOptions, DetectError, DetectionSession, EngineConfig,
    MockAdapter, Scenario, SessionOptions, SessionOutcome, StaticFrameSource, TerminationPolicy,
    TriggerRecorder, VisionAdapter,
};

const ADAPTER_CHOICES: &str = "mock";

/// Detect a targeted visual event with a vision-classification backend.
///
/// Exits after the first confirmed trigger; the scenario YAML declares the
/// candidate events and their confirmation run-lengths.
#[derive(Debug, Parser)]
#[command(name = "vigil", version)]
struct Cli {
    /// Path to the scenario YAML.
    #[arg(long)]
    scenario: PathBuf,

    /// Backend adapter to use (choices: mock; default from config).
    #[arg(long)]
    adapter: Option<String>,

    /// Seconds between classification cycles (default from config).
    #[arg(long)]
    interval: Option<f64>,

    /// Override confirm_frames for all events.
    #[arg(long)]
    confirm_frames: Option<u32>,

    /// Latency benchmark mode: run N timed frames, report statistics, exit.
    /// Run with all other applications closed; the measurement is only valid
    /// on an otherwise idle machine.
    #[arg(long, value_name = "N")]
    benchmark_latency: Option<usize>,

    /// Acknowledge the benchmark's clean-environment precondition.
    #[arg(long)]
    ack_quiet: bool,

    /// Evidence directory for trigger output (default from config).
    #[arg(long)]
    evidence_dir: Option<PathBuf>,

    /// Stop after this many frames even without a confirmed trigger.
    #[arg(long)]
    frame_limit: Option<u64>,
}

fn build_adapter(name: &str) -> Result<Box<dyn VisionAdapter>, DetectError> {
    match name {
        "mock" => Ok(Box::new(MockAdapter::from_env())),
        other => Err(DetectError::UnknownAdapter {
            name: other.to_string(),
            choices: ADAPTER_CHOICES.to_string(),
        }),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "vigil session failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), DetectError> {
    let config = EngineConfig::load()?;
    let scenario = Scenario::from_path(&cli.scenario)?;
    let adapter_name = cli.adapter.as_deref().unwrap_or(&config.adapter);

    if let Some(frames) = cli.benchmark_latency {
        return benchmark(&config, &scenario, adapter_name, frames, cli.ack_quiet).await;
    }
    detect(&cli, &config, scenario, adapter_name).await
}

async fn benchmark(
    config: &EngineConfig,
    scenario: &Scenario,
    adapter_name: &str,
    frames: usize,
    ack_quiet: bool,
) -> Result<(), DetectError> {
    println!("{}", "=".repeat(60));
    println!("  LATENCY BENCHMARK MODE");
    println!("{}", "=".repeat(60));
    println!("  IMPORTANT: close all other applications before proceeding.");
    println!("  Concurrent CPU/memory load will skew latency measurements;");
    println!("  these numbers are the authoritative real-time baseline.");
    println!("{}", "=".repeat(60));

    let mut adapter = build_adapter(adapter_name)?;
    let mut source = StaticFrameSource::default();
    let prompt = scenario.classification_prompt();
    let options = BenchmarkOptions {
        frames,
        quiet_environment_acknowledged: ack_quiet,
    };

    let report = run_latency_benchmark(adapter.as_mut(), &mut source, &prompt, &options).await?;
    println!("\n{}", report.summary());
    let verdict = if report.meets_budget(config.latency_budget_ms) {
        "MET"
    } else {
        "NOT MET"
    };
    println!(
        "\n  Real-time gate (<{:.0}ms mean): {}",
        config.latency_budget_ms, verdict
    );
    Ok(())
}

async fn detect(
    cli: &Cli,
    config: &EngineConfig,
    scenario: Scenario,
    adapter_name: &str,
) -> Result<(), DetectError> {
    let adapter = build_adapter(adapter_name)?;
    let options = SessionOptions {
        interval: Duration::from_secs_f64(cli.interval.unwrap_or(config.interval_secs)),
        confirm_override: cli.confirm_frames,
        max_consecutive_failures: config.max_consecutive_failures,
        termination: cli
            .frame_limit
            .map(TerminationPolicy::FrameLimit)
            .unwrap_or(TerminationPolicy::FirstTrigger),
    };
    let evidence_dir = cli
        .evidence_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.evidence_dir));
    let recorder = TriggerRecorder::new(evidence_dir);

    let session = DetectionSession::new(scenario, adapter, recorder, options);
    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received; cancelling after the current tick");
            cancel.cancel();
        }
    });

    let mut source = StaticFrameSource::default();
    match session.run(&mut source).await? {
        SessionOutcome::Triggered(record) => {
            println!("\nEVENT TRIGGERED: {}", record.event_id);
            println!("  Label:  {}", record.event_label);
            println!("  Frame:  {}", record.frame_path.display());
            println!(
                "{}",
                serde_json::to_string_pretty(&record).unwrap_or_default()
            );
        }
        SessionOutcome::FrameLimitReached { frames } => {
            println!("\nNo event confirmed within the {frames}-frame limit.");
        }
        SessionOutcome::Cancelled { frames } => {
            println!("\nCancelled after {frames} frames; no event confirmed.");
        }
    }
    Ok(())
}
