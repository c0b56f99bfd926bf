use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod frame_loop;
mod frames;
mod panel;

/// Grace period for the loop to notice the stop flag after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "rollcalld", about = "Rollcall attendance daemon")]
struct Args {
    /// Detection frames as JSON lines (reads stdin when omitted)
    #[arg(long)]
    frames: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries panel updates; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = config::Config::from_env();
    tracing::info!(?config, "rollcalld starting");

    let stop = Arc::new(AtomicBool::new(false));
    let mut handle = frame_loop::spawn_frame_loop(&config, args.frames, stop.clone())
        .context("failed to start frame loop")?;

    tracing::info!("rollcalld ready");

    let result = tokio::select! {
        done = &mut handle.done => done,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            tracing::info!("interrupt received; stopping after the current frame");
            stop.store(true, Ordering::Relaxed);
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle.done).await {
                Ok(done) => done,
                Err(_) => {
                    tracing::warn!("frame loop still blocked on input; exiting without it");
                    return Ok(());
                }
            }
        }
    };

    let summary = result
        .map_err(|_| frame_loop::LoopError::ThreadExited)
        .and_then(|r| r)
        .context("frame loop terminated")?;

    tracing::info!(
        frames = summary.frames,
        marks = summary.marks,
        stop = ?summary.stop,
        "rollcalld shutting down"
    );
    Ok(())
}
