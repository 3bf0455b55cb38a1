//! Dull ticker CLI
//!
//! Touches a dull ticker once per line read from stdin and prints every tick
//! as a JSON line.

use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

use dull_ticker::{DullConfig, DullTicker, Result, Ticks};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        eprintln!("Usage: {} [CONFIG.toml]", args[0]);
        eprintln!("\nTouches a dull ticker for every stdin line and prints ticks as JSON.");
        eprintln!("At end of input, waits for the last touch to be ticked, then exits.");
        eprintln!("\nEnvironment variables (used without a config file):");
        eprintln!("  DULL_MIN_INTERVAL    Minimum tick interval (default: 10s)");
        eprintln!("  DULL_MAX_INTERVAL    Maximum tick interval, 0 = unbounded (default: 30m)");
        eprintln!("  DULL_RESET_DURATION  Idle time before a forced tick (default: 3m)");
        std::process::exit(1);
    }

    if let Err(e) = run(args.get(1).map(String::as_str)).await {
        eprintln!("dull-ticker failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config_path: Option<&str>) -> Result<()> {
    let config = match config_path {
        Some(path) => DullConfig::from_file(path)?,
        None => DullConfig::from_env()?,
    };

    let (ticker, ticks) = DullTicker::spawn(&config)?;
    let printer = tokio::spawn(print_ticks(ticker.clone(), ticks));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while lines.next_line().await?.is_some() {
        ticker.touch().await?;
    }

    // Stopping right away would discard the last touch.
    while ticker.snapshot().await?.last_touch.is_some() {
        tokio::time::sleep(config.poll_period()).await;
    }

    tracing::info!("end of input, stopping");
    ticker.stop();
    if let Err(e) = printer.await {
        tracing::error!(error = %e, "tick printer panicked");
    }
    Ok(())
}

async fn print_ticks(ticker: DullTicker, mut ticks: Ticks) {
    while let Some(at) = ticks.recv().await {
        // The snapshot is unavailable once the ticker stopped; print the tick anyway.
        let interval_ms = ticker
            .snapshot()
            .await
            .ok()
            .map(|s| millis(s.interval));
        let line = serde_json::json!({
            "tick": rfc3339(at),
            "interval_ms": interval_ms,
        });
        println!("{}", line);
    }
}

fn rfc3339(at: SystemTime) -> String {
    DateTime::<Utc>::from(at).to_rfc3339()
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_secs(10)), 10_000);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }
}
