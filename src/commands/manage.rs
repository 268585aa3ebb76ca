use crate::state::Context;
use tracing::info;

/// Return this channel to idle and stop its live feed
#[poise::command(slash_command, guild_only)]
pub async fn reset(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let channel = ctx.channel_id().get();
    let was_loading = ctx.data().sessions.get(channel).await.is_loading();
    ctx.data().sessions.reset(channel).await;
    let stopped = ctx.data().refresh.cancel(channel).await;
    info!(channel, was_loading, stopped_refresh = stopped, "Channel reset");

    let mut reply = String::from("Channel reset. Ready for a new analysis.");
    if was_loading {
        // the in-flight request keeps running; its result still lands in history
        reply.push_str("\nThe pending analysis will no longer block this channel.");
    }
    if stopped {
        reply.push_str("\nLive feed stopped.");
    }
    ctx.say(reply).await?;
    Ok(())
}
