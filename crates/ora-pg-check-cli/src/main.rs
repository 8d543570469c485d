//! ora-pg-check CLI - Oracle to PostgreSQL data consistency checker.

use clap::Parser;
use ora_pg_check::{CheckError, Config, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{info, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "ora-pg-check")]
#[command(about = "Checksum-based data consistency checker for Oracle to PostgreSQL")]
#[command(version)]
struct Cli {
    /// Path to the configuration file
    #[arg(default_value = "config.yml")]
    config: PathBuf,

    /// Output JSON summary to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Timeout in seconds for graceful shutdown after an interrupt
    #[arg(long, default_value = "60")]
    shutdown_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CheckError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| CheckError::Config(e.to_string()))?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    // Setup signal handling for graceful shutdown (SIGINT and SIGTERM)
    let cancel_rx = setup_signal_handler(cli.shutdown_timeout).await?;

    let orchestrator = Orchestrator::new(config)?;
    let summary = orchestrator.run(Some(cancel_rx)).await?;

    if cli.output_json {
        println!("{}", summary.to_json()?);
    } else {
        println!("\nCheck completed!");
        println!("  Duration: {:.2}s", summary.duration_seconds);
        println!("  Tasks: {}", summary.tasks_total);
        println!("  Consistent: {}", summary.passed);
        println!("  Inconsistent: {}", summary.inconsistent);
        println!("  Execution failed: {}", summary.execution_failed);
        println!("  Synthesis failed: {}", summary.synthesis_failed);
        println!("  Consistency rate: {:.2}%", summary.consistency_rate);
        println!("  Detail report: {}", summary.detail_report.display());
        println!("  Summary report: {}", summary.summary_report.display());
    }

    // A completed run exits 0 regardless of the consistency outcome; the
    // reports carry the verdict.
    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}

/// Setup signal handlers for graceful shutdown.
/// Handles both SIGINT (Ctrl-C) and SIGTERM. Returns a watch channel
/// receiver that flips to true when a signal is received; a second timer
/// forces the process down if shutdown exceeds the grace period.
#[cfg(unix)]
async fn setup_signal_handler(shutdown_timeout: u64) -> Result<watch::Receiver<bool>, CheckError> {
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to setup SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to setup SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {
                eprintln!("\nReceived SIGINT. Shutting down (timeout: {}s)...", shutdown_timeout);
            }
            _ = sigterm.recv() => {
                eprintln!("\nReceived SIGTERM. Shutting down (timeout: {}s)...", shutdown_timeout);
            }
        }
        let _ = cancel_tx.send(true);
        tokio::time::sleep(std::time::Duration::from_secs(shutdown_timeout)).await;
        eprintln!("Graceful shutdown timed out, forcing exit");
        std::process::exit(130);
    });

    Ok(cancel_rx)
}

/// Setup signal handler for Windows (only SIGINT/Ctrl-C).
#[cfg(not(unix))]
async fn setup_signal_handler(shutdown_timeout: u64) -> Result<watch::Receiver<bool>, CheckError> {
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to setup Ctrl-C handler");
        eprintln!("\nReceived Ctrl-C. Shutting down (timeout: {}s)...", shutdown_timeout);
        let _ = cancel_tx.send(true);
        tokio::time::sleep(std::time::Duration::from_secs(shutdown_timeout)).await;
        eprintln!("Graceful shutdown timed out, forcing exit");
        std::process::exit(130);
    });

    Ok(cancel_rx)
}
