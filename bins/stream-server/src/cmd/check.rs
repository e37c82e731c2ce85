use stream_engine::StreamContext;
use stream_engine::config::StreamConfig;

use crate::config::CheckArgs;
use crate::error::ServerError;

pub fn run(args: CheckArgs) -> Result<(), ServerError> {
    let config = StreamConfig::load(&args.config)?;
    let ctx = StreamContext::from_config(&config)?;
    tracing::info!(
        config = %args.config,
        version = %ctx.version(),
        integration = %ctx.integration_name(),
        topics = ?ctx.topics(),
        replay_preset = %ctx.replay().preset(),
        replay_id = ?ctx.replay().replay_id(),
        credentials = ?ctx.credentials(),
        "configuration is valid"
    );
    Ok(())
}
