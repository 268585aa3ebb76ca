use super::present::present_report;
use crate::history::ReportRepository;
use crate::state::Context;

const HISTORY_PAGE: usize = 15;

/// List saved reports, newest first
#[poise::command(slash_command, guild_only)]
pub async fn history(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let reports = ctx.data().history.list().await?;
    if reports.is_empty() {
        ctx.say("No saved reports yet.").await?;
        return Ok(());
    }

    let mut out = format!("**Saved Reports** ({})\n", reports.len());
    for report in reports.iter().take(HISTORY_PAGE) {
        out.push_str(&format!(
            "{} **{}** · <t:{}:R> · `{}`\n",
            report.mode.icon(),
            report.title,
            report.date.timestamp(),
            report.id
        ));
    }
    if reports.len() > HISTORY_PAGE {
        out.push_str(&format!("…and {} more\n", reports.len() - HISTORY_PAGE));
    }
    out.push_str("\nUse `/cio open <id>` to view one.");

    ctx.say(out).await?;
    Ok(())
}

/// Open a saved report
#[poise::command(slash_command, guild_only)]
pub async fn open(
    ctx: Context<'_>,
    #[description = "Report ID"]
    #[autocomplete = "autocomplete_report"]
    id: String,
) -> Result<(), anyhow::Error> {
    let Some(report) = ctx.data().history.get(&id).await? else {
        ctx.say(format!("Report `{}` not found.", id)).await?;
        return Ok(());
    };

    ctx.say(format!(
        "{} **{}** · saved <t:{}:f>",
        report.mode.icon(),
        report.title,
        report.date.timestamp()
    ))
    .await?;

    let expand_all = ctx.data().report_config.read().await.expand_all;
    present_report(ctx, &report.content, expand_all).await
}

/// Delete a saved report
#[poise::command(slash_command, guild_only)]
pub async fn delete(
    ctx: Context<'_>,
    #[description = "Report ID"]
    #[autocomplete = "autocomplete_report"]
    id: String,
) -> Result<(), anyhow::Error> {
    if ctx.data().history.remove(&id).await? {
        ctx.say(format!("Deleted report `{}`.", id)).await?;
    } else {
        ctx.say(format!("Report `{}` not found.", id)).await?;
    }
    Ok(())
}

/// Autocomplete saved reports by title or id.
async fn autocomplete_report(
    ctx: Context<'_>,
    partial: &str,
) -> Vec<poise::serenity_prelude::AutocompleteChoice> {
    let reports = ctx.data().history.list().await.unwrap_or_default();
    let partial = partial.to_lowercase();

    reports
        .into_iter()
        .filter(|r| r.title.to_lowercase().contains(&partial) || r.id.starts_with(&partial))
        .take(25)
        .map(|r| {
            let name: String = format!("{} {}", r.mode.icon(), r.title)
                .chars()
                .take(100)
                .collect();
            poise::serenity_prelude::AutocompleteChoice::new(name, r.id)
        })
        .collect()
}
