use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use poise::serenity_prelude as serenity;
use poise::CreateReply;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::present::{post_report, present_report};
use crate::analyst::{prompts, ReportAnalyst, RequestState, Sessions};
use crate::history::{save_report, ReportHistory};
use crate::report::{AnalysisMode, Language};
use crate::state::{Context, ReportConfig};

const LOADING_STEPS: &[&str] = &[
    "Initialising system...",
    "Connecting to global market databases...",
    "Protocol 1: syncing real-time search...",
    "Verifying ticker symbol and exchange data...",
    "Analysing macroeconomic indicators...",
    "Scanning DART/SEC filings...",
    "Computing financial ratios...",
    "Simulating Plan A/B/C scenarios...",
    "Writing the final investment report...",
];
const LOADING_TICK: Duration = Duration::from_secs(2);

/// Run an investment analysis
#[poise::command(slash_command, guild_only)]
pub async fn analyze(
    ctx: Context<'_>,
    #[description = "Report type"] mode: AnalysisMode,
    #[description = "Ticker, asset or topic (blank for the global market)"] query: Option<String>,
    #[description = "Report language"] language: Option<Language>,
    #[description = "Repost the news dashboard on a timer"] live: Option<bool>,
) -> Result<(), anyhow::Error> {
    let query = query.unwrap_or_default();
    let lang = language.unwrap_or_default();
    let channel = ctx.channel_id().get();
    let data = ctx.data();

    if let Err(running) = data.sessions.begin(channel, &query, mode, lang).await {
        ctx.say(busy_reply(&running)).await?;
        return Ok(());
    }
    if mode != AnalysisMode::News {
        data.refresh.cancel(channel).await;
    }

    let config = data.report_config.read().await.clone();
    let target = display_target(&query, lang);
    info!(user = ctx.author().name, channel, target, mode = ?mode, lang = ?lang, "Analysis started");

    let ack = acknowledge(&data.sessions, channel, ctx.say(loading_log(target, mode, 0))).await?;

    let request = data
        .analyst
        .request_report(&query, mode, lang, config.retry_policy());
    tokio::pin!(request);

    let mut shown = 0;
    let result = loop {
        tokio::select! {
            result = &mut request => break result,
            _ = tokio::time::sleep(LOADING_TICK), if shown < LOADING_STEPS.len() => {
                shown += 1;
                let log = loading_log(target, mode, shown);
                if let Err(e) = ack.edit(ctx, CreateReply::default().content(log)).await {
                    warn!("Failed to update loading message: {}", e);
                }
            }
        }
    };

    data.sessions.finish(channel, &result).await;

    let content = match result {
        Ok(content) => content,
        Err(e) => {
            warn!(channel, error = %e, "Analysis failed");
            ack.edit(
                ctx,
                CreateReply::default().content(format!(
                    "⛔ **System Failure**\n> {}\n\nRun `/cio reset` and try again.",
                    e
                )),
            )
            .await?;
            return Ok(());
        }
    };

    let done = format!("✅ {} **{}** · `{}`", mode.icon(), mode.label(), target);
    if let Err(e) = ack.edit(ctx, CreateReply::default().content(done)).await {
        warn!("Failed to update loading message: {}", e);
    }

    if let Err(e) = save_report(
        data.history.as_ref(),
        &query,
        mode,
        &content,
        chrono::Utc::now(),
    )
    .await
    {
        warn!("Failed to save report to history: {}", e);
    }

    if mode == AnalysisMode::News && live.unwrap_or(false) {
        start_news_refresh(ctx, query.clone(), lang, &config).await;
        ctx.say(format!(
            "🔄 Live feed on: refreshing every {} min. `/cio reset` stops it.",
            config.refresh_interval_secs / 60
        ))
        .await?;
    } else if mode == AnalysisMode::News && data.refresh.is_active(channel).await {
        ctx.say("🔄 The live feed for this channel keeps running.").await?;
    }

    present_report(ctx, &content, config.expand_all).await
}

/// Rerun the news dashboard on a timer and post each fresh result.
async fn start_news_refresh(ctx: Context<'_>, query: String, lang: Language, config: &ReportConfig) {
    let data = ctx.data();
    let channel_id = ctx.channel_id();
    let channel = channel_id.get();
    let http = ctx.serenity_context().http.clone();
    let analyst = data.analyst.clone();
    let sessions = data.sessions.clone();
    let history = data.history.clone();
    let report_config = data.report_config.clone();

    data.refresh
        .start(channel, config.refresh_interval(), move || {
            refresh_tick(RefreshJob {
                http: http.clone(),
                channel: channel_id,
                query: query.clone(),
                lang,
                analyst: analyst.clone(),
                sessions: sessions.clone(),
                history: history.clone(),
                report_config: report_config.clone(),
            })
        })
        .await;
}

struct RefreshJob {
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
    query: String,
    lang: Language,
    analyst: Arc<ReportAnalyst>,
    sessions: Arc<Sessions>,
    history: Arc<ReportHistory>,
    report_config: Arc<RwLock<ReportConfig>>,
}

async fn refresh_tick(job: RefreshJob) {
    let channel = job.channel.get();
    if job
        .sessions
        .begin(channel, &job.query, AnalysisMode::News, job.lang)
        .await
        .is_err()
    {
        info!(channel, "Channel busy, skipping auto-refresh");
        return;
    }

    let policy = job.report_config.read().await.retry_policy();
    let result = job
        .analyst
        .request_report(&job.query, AnalysisMode::News, job.lang, policy)
        .await;
    job.sessions.finish(channel, &result).await;

    match result {
        Ok(content) => {
            if let Err(e) = save_report(
                job.history.as_ref(),
                &job.query,
                AnalysisMode::News,
                &content,
                chrono::Utc::now(),
            )
            .await
            {
                warn!("Failed to save refreshed report: {}", e);
            }
            if let Err(e) = post_report(&job.http, job.channel, &content).await {
                warn!(channel, "Failed to post refreshed report: {}", e);
            }
        }
        Err(e) => warn!(channel, error = %e, "Auto-refresh failed"),
    }
}

/// Await the first reply of a request. If it cannot be sent the channel is
/// put back to idle, since nothing will ever finish the request.
async fn acknowledge<T, E, Fut>(sessions: &Sessions, channel: u64, send: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let sent = send.await;
    if sent.is_err() {
        sessions.reset(channel).await;
    }
    sent
}

fn busy_reply(running: &RequestState) -> String {
    match running {
        RequestState::Loading { query, mode, lang } => format!(
            "⏳ {} **{}** for `{}` is already running in this channel. Use `/cio reset` if it is stuck.",
            mode.icon(),
            mode.label(),
            display_target(query, *lang)
        ),
        _ => "⏳ An analysis is already running in this channel. Use `/cio reset` if it is stuck."
            .to_string(),
    }
}

fn display_target(query: &str, lang: Language) -> &str {
    match query.trim() {
        "" => prompts::default_query(lang),
        q => q,
    }
}

/// Terminal-style progress: the first `shown` pipeline steps, newest last.
fn loading_log(target: &str, mode: AnalysisMode, shown: usize) -> String {
    let mut out = format!(
        "{} **{}** · `{}`\n```\n",
        mode.icon(),
        mode.label(),
        target
    );
    for step in LOADING_STEPS.iter().take(shown) {
        out.push_str(&format!("> {}\n", step));
    }
    out.push_str("> _\n```");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_log_grows() {
        let first = loading_log("NVDA", AnalysisMode::DeepDive, 0);
        assert!(first.contains("`NVDA`"));
        assert!(!first.contains(LOADING_STEPS[0]));

        let all = loading_log("NVDA", AnalysisMode::DeepDive, LOADING_STEPS.len() + 3);
        assert!(all.contains(LOADING_STEPS[LOADING_STEPS.len() - 1]));
        assert_eq!(all.matches("\n> ").count(), LOADING_STEPS.len() + 1);
    }

    #[test]
    fn test_display_target_defaults() {
        assert_eq!(display_target(" ", Language::En), "global market trends");
        assert_eq!(display_target("TSLA", Language::Ko), "TSLA");
    }

    #[test]
    fn test_busy_reply_names_running_request() {
        let running = RequestState::Loading {
            query: String::new(),
            mode: AnalysisMode::News,
            lang: Language::Ko,
        };
        let reply = busy_reply(&running);
        assert!(reply.contains("News Dashboard"));
        assert!(reply.contains("`글로벌 시장 동향`"));
    }

    #[tokio::test]
    async fn test_failed_ack_releases_channel() {
        let sessions = Sessions::default();
        sessions
            .begin(3, "NVDA", AnalysisMode::DeepDive, Language::En)
            .await
            .unwrap();

        let sent: Result<(), &str> =
            acknowledge(&sessions, 3, async { Err("Unknown Message") }).await;
        assert!(sent.is_err());
        assert_eq!(sessions.get(3).await, RequestState::Idle);
        assert!(sessions
            .begin(3, "NVDA", AnalysisMode::DeepDive, Language::En)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_sent_ack_keeps_channel_loading() {
        let sessions = Sessions::default();
        sessions
            .begin(4, "TSLA", AnalysisMode::QuickIntel, Language::En)
            .await
            .unwrap();

        let sent: Result<u8, &str> = acknowledge(&sessions, 4, async { Ok(1) }).await;
        assert_eq!(sent, Ok(1));
        assert!(sessions.get(4).await.is_loading());
    }
}
