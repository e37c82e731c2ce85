use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use stream_engine::config::StreamConfig;
use stream_engine::{Engine, StreamContext};

use crate::config::RunArgs;
use crate::error::ServerError;
use crate::exporter::LineExporter;
use crate::pipeline::{EventsPipeline, PIPELINE_ID};
use crate::replay_client::ReplayClient;

pub async fn run(args: RunArgs) -> Result<(), ServerError> {
    tracing::info!("stream-server starting");

    // --- Load config ---
    let config = StreamConfig::load(&args.config)?;
    let ctx = Arc::new(StreamContext::from_config(&config)?);
    tracing::info!(
        config = %args.config,
        version = %ctx.version(),
        integration = %ctx.integration_name(),
        topics = ?ctx.topics(),
        replay_preset = %ctx.replay().preset(),
        "loaded config"
    );

    // --- Client ---
    let client = Arc::new(ReplayClient::new(
        &args.replay_dir,
        ctx.credentials().clone(),
        Duration::from_millis(args.poll_interval_ms),
    ));
    tracing::info!(dir = %args.replay_dir.display(), "using local replay client");

    // --- Engine ---
    let token = CancellationToken::new();
    let mut engine = Engine::bootstrap(ctx.clone(), client, token.clone()).await?;
    let receiver = engine.take_receiver().ok_or(ServerError::ReceiverTaken)?;

    // --- Pipeline ---
    let pipeline = EventsPipeline::new(PIPELINE_ID, Box::new(receiver), ctx.fan_in_capacity());
    let exporter = LineExporter::new(ctx.integration_name(), tokio::io::stdout());
    let mut pipeline_handle = tokio::spawn(pipeline.run(exporter, token.clone()));
    tracing::info!("streaming events, press Ctrl+C to stop");

    // --- Wait for Ctrl+C or a pipeline failure ---
    let (signal, finished) = tokio::select! {
        signal = tokio::signal::ctrl_c() => (Some(signal), None),
        result = &mut pipeline_handle => (None, Some(result)),
    };
    tracing::info!("shutting down...");

    token.cancel();
    for sub in engine.shutdown().await {
        tracing::info!(
            topic = %sub.topic(),
            checkpoint = ?sub.checkpoint(),
            "subscription stopped"
        );
    }

    let finished = match finished {
        Some(result) => result,
        None => pipeline_handle.await,
    };
    let exported = finished??;
    if let Some(signal) = signal {
        signal.map_err(ServerError::Signal)?;
    }

    tracing::info!(exported, "shutdown complete");
    Ok(())
}
