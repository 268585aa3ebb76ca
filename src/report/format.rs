//! Discord-flavoured markdown output for rendered reports.

use super::presenter::{ReportPresenter, SectionKind};
use super::render::{self, plain_text, Block, Inline};
use super::types::ReportDocument;

/// Hard Discord message limit is 2000; keep a little headroom.
pub const MESSAGE_LIMIT: usize = 1990;

const TRUNCATED: &str = "\n… *(truncated, expand fewer sections)*";

/// Status banner, header, alert and news: everything above the sections.
pub fn preamble(doc: &ReportDocument) -> String {
    let mut out = String::new();

    let status = if doc.alert.is_some() {
        "🔔 ALERTS ACTIVE"
    } else {
        "NORMAL"
    };
    out.push_str(&format!("📄 **Investment Analysis Report** · `{}`\n\n", status));

    let header = blocks(&render::render_markdown(&doc.header));
    if !header.is_empty() {
        out.push_str(&header);
        out.push_str("\n\n");
    }

    let alert_lines = doc.alert_lines();
    if !alert_lines.is_empty() {
        out.push_str("🚨 **CRITICAL MARKET ALERT** `LIVE`\n");
        for line in alert_lines {
            out.push_str(&format!("> `{}`\n", line));
        }
        out.push('\n');
    }

    if let Some(news) = &doc.news {
        out.push_str("📰 **LIVE MARKET FEED** · `UPDATED`\n");
        out.push_str(&blocks(&render::render(news)));
        out.push_str("\n\n");
    }

    if !doc.sections.is_empty() {
        out.push_str("⚓ **Navigation**\n");
        for section in &doc.sections {
            let kind = SectionKind::classify(&section.title);
            out.push_str(&format!("{} {}\n", kind.icon(), section.title));
        }
    }

    out.trim_end().to_string()
}

/// Collapsible view of the sections, clipped to one message.
pub fn sections_view(doc: &ReportDocument, presenter: &ReportPresenter) -> String {
    if doc.sections.is_empty() {
        return "*No sections in this report.*".to_string();
    }

    let mut out = String::new();
    for section in &doc.sections {
        let kind = SectionKind::classify(&section.title);
        let open = presenter.is_open(&section.id);
        let arrow = if open { "▼" } else { "▶" };
        let title = if kind.accented() {
            format!("__**{}**__", section.title)
        } else {
            format!("**{}**", section.title)
        };
        out.push_str(&format!(
            "{} {} {} · `{}`\n",
            arrow,
            kind.icon(),
            title,
            kind.label()
        ));

        if open {
            let body = blocks(&render::render(&section.content));
            if !body.is_empty() {
                out.push_str(&body);
                out.push('\n');
            }
            out.push('\n');
        }
    }

    clip(out.trim_end(), MESSAGE_LIMIT)
}

/// Clip at a char boundary, marking the cut.
pub fn clip(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit.saturating_sub(TRUNCATED.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &text[..end], TRUNCATED)
}

/// Split text into chunks of at most `max` bytes, preferring newline or
/// space boundaries.
pub fn chunks(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max {
            out.push(remaining);
            break;
        }
        let mut limit = max;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let split_at = remaining[..limit]
            .rfind('\n')
            .or_else(|| remaining[..limit].rfind(' '))
            .map(|i| i + 1)
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        out.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    out
}

/// Render display blocks as Discord markdown.
pub fn blocks(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(block)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn block(b: &Block) -> String {
    match b {
        Block::Heading {
            level,
            accent,
            content,
        } => {
            let text = inlines(content);
            match (level, accent) {
                (1, _) => format!("# {}", text),
                (2, _) => format!("## {}", text),
                (_, true) => format!("### ▍{}", text),
                _ => format!("**{}**", text),
            }
        }
        Block::Paragraph(content) => inlines(content),
        Block::List { start, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = match start {
                    Some(n) => format!("{}. ", n + i as u64),
                    None => "- ".to_string(),
                };
                let pad = " ".repeat(marker.chars().count());
                let body = blocks(item).replace("\n\n", "\n");
                let mut lines = body.lines();
                let first = lines.next().unwrap_or_default();
                let mut rendered = format!("{}{}", marker, first);
                for line in lines {
                    rendered.push('\n');
                    rendered.push_str(&pad);
                    rendered.push_str(line);
                }
                rendered
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Quote(inner) => blocks(inner)
            .lines()
            .map(|l| format!("> {}", l))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::Code { lang, code } => format!(
            "```{}\n{}\n```",
            lang.as_deref().unwrap_or_default(),
            code.trim_end()
        ),
        Block::Table { header, rows } => table(header, rows),
        Block::Rule => "───────────".to_string(),
        Block::Callout { kind, description } => format!(
            "> {} **{}**\n> *\"{}\"*",
            kind.icon(),
            kind.label().to_uppercase(),
            description
        ),
    }
}

fn inlines(content: &[Inline]) -> String {
    let mut out = String::new();
    for inline in content {
        match inline {
            Inline::Text(t) => out.push_str(t),
            Inline::Code(t) => out.push_str(&format!("`{}`", t)),
            Inline::Strong(c) => out.push_str(&format!("**{}**", inlines(c))),
            Inline::Emphasis(c) => out.push_str(&format!("*{}*", inlines(c))),
            Inline::Strikethrough(c) => out.push_str(&format!("~~{}~~", inlines(c))),
            Inline::Link { url, content } => {
                out.push_str(&format!("[{}]({})", inlines(content), url))
            }
            Inline::Image { url, alt } => out.push_str(&format!("[🖼️ {}]({})", alt, url)),
            Inline::Break => out.push('\n'),
        }
    }
    out
}

/// Tables have no Discord markdown; draw a padded grid in a code block.
fn table(header: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) -> String {
    let head: Vec<String> = header.iter().map(|c| plain_text(c)).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|r| r.iter().map(|c| plain_text(c)).collect())
        .collect();

    let columns = head.len().max(body.iter().map(Vec::len).max().unwrap_or(0));
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&head).chain(body.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |row: &[String]| {
        (0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let pad = widths[i] - cell.chars().count();
                format!("{}{}", cell, " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut out = String::from("```\n");
    out.push_str(&line(&head));
    out.push('\n');
    out.push_str(
        &widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &body {
        out.push('\n');
        out.push_str(&line(row));
    }
    out.push_str("\n```");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::split;

    #[test]
    fn test_preamble_alert_and_news() {
        let doc = split(":::ALERT:::X|Y:::END_ALERT:::\n## Latest News\n- A\n## Summary\nbody1\n## Plan\nbody2");
        let text = preamble(&doc);
        assert!(text.contains("ALERTS ACTIVE"));
        assert!(text.contains("CRITICAL MARKET ALERT"));
        assert!(text.contains("> `X`\n> `Y`"));
        assert!(text.contains("LIVE MARKET FEED"));
        assert!(text.contains("- A"));
        assert!(text.contains("📄 Summary"));
        assert!(text.contains("🧩 Plan"));
    }

    #[test]
    fn test_preamble_without_alert() {
        let text = preamble(&split("# Title\n## A\nb"));
        assert!(text.contains("`NORMAL`"));
        assert!(text.contains("# Title"));
        assert!(!text.contains("CRITICAL"));
        assert!(!text.contains("LIVE MARKET FEED"));
    }

    #[test]
    fn test_sections_view_follows_presenter() {
        let doc = split("## Executive Summary\nfirst body\n## Plan A/B/C\nsecond body");
        let mut presenter = ReportPresenter::new(&doc, false);
        let view = sections_view(&doc, &presenter);
        assert!(view.contains("▼ 📄 **Executive Summary**"));
        assert!(view.contains("first body"));
        assert!(view.contains("▶ 🧩 __**Plan A/B/C**__ · `Strategy`"));
        assert!(view.contains("**Executive Summary** · `Summary`"));
        assert!(!view.contains("second body"));

        presenter.toggle("sec-1");
        let view = sections_view(&doc, &presenter);
        assert!(view.contains("▼ 🧩 __**Plan A/B/C**__"));
        assert!(view.contains("second body"));
    }

    #[test]
    fn test_sections_view_clips_to_limit() {
        let long = "word ".repeat(1000);
        let doc = split(&format!("## Big\n{}", long));
        let view = sections_view(&doc, &ReportPresenter::new(&doc, true));
        assert!(view.len() <= MESSAGE_LIMIT);
        assert!(view.ends_with("expand fewer sections)*"));
    }

    #[test]
    fn test_callout_format() {
        let out = blocks(&render::render("[Image: Fed chair at podium]"));
        assert_eq!(out, "> 🖼️ **NEWS IMAGE SOURCE**\n> *\"Fed chair at podium\"*");
    }

    #[test]
    fn test_list_and_heading_format() {
        let out = blocks(&render::render_markdown("### Drivers\n\n1. Rates\n2. **AI capex**"));
        assert_eq!(out, "### ▍Drivers\n\n1. Rates\n2. **AI capex**");
    }

    #[test]
    fn test_table_grid() {
        let out = blocks(&render::render_markdown("| A | Long |\n|---|---|\n| xyz | 1 |\n"));
        assert_eq!(out, "```\nA   | Long\n----+-----\nxyz | 1\n```");
    }

    #[test]
    fn test_clip_respects_char_boundary() {
        let text = "가".repeat(1000);
        let clipped = clip(&text, 100);
        assert!(clipped.len() <= 100);
        assert!(clipped.starts_with('가'));
    }

    #[test]
    fn test_chunks_prefer_newlines() {
        let text = "aaaa\nbbbb\ncccc";
        assert_eq!(chunks(text, 10), vec!["aaaa\nbbbb\n", "cccc"]);
        assert_eq!(chunks("", 10), Vec::<&str>::new());
    }
}
