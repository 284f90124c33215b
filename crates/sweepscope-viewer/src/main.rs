//! Headless sweep scope fed by the simulated device

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use sweepscope_simulation::{start_exg_stream, StreamCommand};
use sweepscope_viewer::cli::Cli;
use sweepscope_viewer::{
    spawn_ingestion, spawn_render_driver, IngestionReport, LineSummary, Scope, ScopeStats,
    SummaryBackend,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct RunSummary<'a> {
    scope: ScopeStats,
    ingestion: IngestionReport,
    last_frame: &'a [LineSummary],
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    let scope = Arc::new(Scope::new(cli.scope_config()?)?);
    scope
        .apply_filter_settings(&cli.filter_settings()?)
        .context("applying filter settings")?;

    let (receiver, control, stream_info) =
        start_exg_stream(cli.stream_config()?).context("starting simulated stream")?;
    let ingestion = spawn_ingestion(receiver, Arc::clone(&scope));
    let render = spawn_render_driver(
        Arc::clone(&scope),
        SummaryBackend::new(u64::from(cli.fps.max(1))),
        cli.fps,
    );

    control
        .send(StreamCommand::Start)
        .await
        .context("stream task ended before start")?;
    info!(
        stream = %stream_info.name,
        srate = stream_info.nominal_srate,
        channels = stream_info.channel_count,
        "streaming"
    );

    if cli.duration > 0.0 {
        let run_for = Duration::try_from_secs_f32(cli.duration).context("invalid --duration")?;
        tokio::select! {
            _ = tokio::time::sleep(run_for) => {}
            result = tokio::signal::ctrl_c() => result.context("waiting for Ctrl-C")?,
        }
    } else {
        tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    }

    if control.send(StreamCommand::Stop).await.is_err() {
        warn!("stream task already gone");
    }
    let report = ingestion.stop().await?;
    let backend = render.stop().await?;
    drop(control);

    for channel in scope.config().channels.iter() {
        if let Some(chain) = scope.describe_channel(channel) {
            info!(channel, %chain, "filter chain");
        }
    }

    let summary = RunSummary {
        scope: scope.stats(),
        ingestion: report,
        last_frame: backend.last_frame(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
