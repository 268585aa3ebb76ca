use crate::state::Context;

/// Configure report parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "max_attempts | backoff_step_ms | refresh_interval_secs | expand_all"]
    param: Option<String>,
    #[description = "New value (expand_all: 0 or 1)"] value: Option<u64>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().report_config.read().await;
            ctx.say(format!(
                "**Report Configuration:**\n\
                 `max_attempts`: {}\n\
                 `backoff_step_ms`: {}\n\
                 `refresh_interval_secs`: {}\n\
                 `expand_all`: {}",
                config.max_attempts,
                config.backoff_step_ms,
                config.refresh_interval_secs,
                config.expand_all
            ))
            .await?;
        }
        (Some(key), Some(val)) => {
            let mut config = ctx.data().report_config.write().await;
            match key {
                "max_attempts" => {
                    config.max_attempts = val.clamp(1, 10) as u32;
                    ctx.say(format!("`max_attempts` set to {}", config.max_attempts))
                        .await?;
                }
                "backoff_step_ms" => {
                    config.backoff_step_ms = val;
                    ctx.say(format!("`backoff_step_ms` set to {}", val)).await?;
                }
                "refresh_interval_secs" => {
                    // Applies to live feeds started after the change.
                    config.refresh_interval_secs = val.max(60);
                    ctx.say(format!(
                        "`refresh_interval_secs` set to {}",
                        config.refresh_interval_secs
                    ))
                    .await?;
                }
                "expand_all" => {
                    config.expand_all = val != 0;
                    ctx.say(format!("`expand_all` set to {}", config.expand_all))
                        .await?;
                }
                _ => {
                    ctx.say(format!(
                        "Unknown param `{}`. Valid: `max_attempts`, `backoff_step_ms`, `refresh_interval_secs`, `expand_all`",
                        key
                    ))
                    .await?;
                }
            }
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/cio config max_attempts 3`")
                .await?;
        }
    }

    Ok(())
}
