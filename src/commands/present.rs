use std::time::Duration;

use poise::serenity_prelude as serenity;
use poise::CreateReply;
use tracing::debug;

use crate::report::format::{self, MESSAGE_LIMIT};
use crate::report::{split, ReportDocument, ReportPresenter, SectionKind};
use crate::state::Context;

/// Buttons stop responding after this long without a press.
const INTERACTION_TIMEOUT: Duration = Duration::from_secs(15 * 60);
/// Five rows of five is Discord's cap; one row is kept for the toggle-all button.
const MAX_SECTION_BUTTONS: usize = 20;
const BUTTON_LABEL_LEN: usize = 40;

/// Send a report as the reply to a command: the preamble, then one message
/// holding the sections with a toggle button per section.
pub async fn present_report(
    ctx: Context<'_>,
    content: &str,
    expand_all: bool,
) -> Result<(), anyhow::Error> {
    let doc = split(content);
    let mut presenter = ReportPresenter::new(&doc, expand_all);

    for chunk in format::chunks(&format::preamble(&doc), MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    if doc.sections.is_empty() {
        return Ok(());
    }

    let prefix = ctx.id().to_string();
    let handle = ctx
        .send(
            CreateReply::default()
                .content(format::sections_view(&doc, &presenter))
                .components(buttons(&prefix, &doc, &presenter)),
        )
        .await?;

    loop {
        let own_prefix = prefix.clone();
        let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
            .filter(move |press| press_target(&own_prefix, &press.data.custom_id).is_some())
            .timeout(INTERACTION_TIMEOUT)
            .await
        else {
            break;
        };
        let target = press_target(&prefix, &press.data.custom_id)
            .unwrap_or_default()
            .to_string();

        if target == "all" {
            let flag = !presenter.expand_all();
            presenter.set_expand_all(flag);
            debug!(expand_all = flag, "All sections toggled");
        } else if let Some(section) = doc.section(&target) {
            let open = presenter.toggle(&section.id);
            debug!(section = %section.title, ?open, total_open = presenter.open_count(), "Section toggled");
        }

        press
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .content(format::sections_view(&doc, &presenter))
                        .components(buttons(&prefix, &doc, &presenter)),
                ),
            )
            .await?;
    }

    handle
        .edit(ctx, CreateReply::default().components(vec![]))
        .await?;
    Ok(())
}

/// Post a report to a channel without interaction, every section open.
pub async fn post_report(
    http: &serenity::Http,
    channel: serenity::ChannelId,
    content: &str,
) -> Result<(), anyhow::Error> {
    let doc = split(content);
    let presenter = ReportPresenter::new(&doc, true);

    let mut text = format::preamble(&doc);
    if !doc.sections.is_empty() {
        text.push_str("\n\n");
        text.push_str(&format::sections_view(&doc, &presenter));
    }
    for chunk in format::chunks(&text, MESSAGE_LIMIT) {
        channel.say(http, chunk).await?;
    }
    Ok(())
}

fn buttons(
    prefix: &str,
    doc: &ReportDocument,
    presenter: &ReportPresenter,
) -> Vec<serenity::CreateActionRow> {
    let section_buttons: Vec<serenity::CreateButton> = doc
        .sections
        .iter()
        .take(MAX_SECTION_BUTTONS)
        .map(|section| {
            let kind = SectionKind::classify(&section.title);
            let open = presenter.is_open(&section.id);
            let style = match (kind.accented(), open) {
                (true, _) => serenity::ButtonStyle::Success,
                (false, true) => serenity::ButtonStyle::Primary,
                (false, false) => serenity::ButtonStyle::Secondary,
            };
            let arrow = if open { "▼" } else { "▶" };
            serenity::CreateButton::new(format!("{}:{}", prefix, section.id))
                .label(format!("{} {}", arrow, short_label(&section.title)))
                .emoji(serenity::ReactionType::Unicode(kind.icon().to_string()))
                .style(style)
        })
        .collect();

    let mut rows: Vec<serenity::CreateActionRow> = section_buttons
        .chunks(5)
        .map(|row| serenity::CreateActionRow::Buttons(row.to_vec()))
        .collect();

    let toggle_all = if presenter.expand_all() {
        "Collapse All"
    } else {
        "Expand All"
    };
    rows.push(serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(format!("{}:all", prefix))
            .label(toggle_all)
            .style(serenity::ButtonStyle::Secondary),
    ]));
    rows
}

/// The button target (`all` or a section id) of a custom id minted for
/// this reply, or `None` for buttons of other replies.
fn press_target<'a>(prefix: &str, custom_id: &'a str) -> Option<&'a str> {
    custom_id
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(':'))
}

fn short_label(title: &str) -> String {
    if title.chars().count() <= BUTTON_LABEL_LEN {
        return title.to_string();
    }
    let cut: String = title.chars().take(BUTTON_LABEL_LEN - 1).collect();
    format!("{}…", cut.trim_end())
}
