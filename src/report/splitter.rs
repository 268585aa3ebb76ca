//! Line-scanner that turns a raw report into a [`ReportDocument`].
//!
//! Extraction order is fixed: alert block, then the news section, then the
//! header/section split on what is left.

use super::types::{ReportDocument, Section};

pub const ALERT_START: &str = ":::ALERT:::";
pub const ALERT_END: &str = ":::END_ALERT:::";
pub const NEWS_LABELS: &[&str] = &["Latest News", "최신 뉴스"];
const SECTION_MARKER: &str = "## ";

/// Split a raw report. Pure: the same text always yields the same document.
pub fn split(raw: &str) -> ReportDocument {
    let mut working = raw.to_string();
    let mut extracted = false;

    let alert = take_alert(&mut working);
    if alert.is_some() {
        extracted = true;
    }

    let news = take_news(&mut working);
    if news.is_some() {
        extracted = true;
    }

    let body = if extracted { working.trim() } else { working.as_str() };
    let (header, sections) = split_sections(body);

    ReportDocument {
        header,
        alert,
        news,
        sections,
    }
}

/// Remove every well-formed alert block; return the first one's interior.
fn take_alert(text: &mut String) -> Option<String> {
    let mut first = None;
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find(ALERT_START) {
        let start = search_from + rel;
        let inner_start = start + ALERT_START.len();
        let Some(end_rel) = text[inner_start..].find(ALERT_END) else {
            break;
        };
        let inner_end = inner_start + end_rel;

        if first.is_none() {
            first = Some(text[inner_start..inner_end].trim().to_string());
        }
        text.replace_range(start..inner_end + ALERT_END.len(), "");
        search_from = start;
    }

    first
}

/// Remove the news section (heading line through the next `##` heading).
fn take_news(text: &mut String) -> Option<String> {
    let (region_start, content_start, region_end) = {
        let lines = scan_lines(text.as_str());
        let heading = lines.iter().position(|l| is_news_heading(l.text))?;
        let region_end = lines[heading + 1..]
            .iter()
            .find(|l| is_level_two_heading(l.text))
            .map(|l| l.start)
            .unwrap_or(text.len());
        (lines[heading].start, lines[heading].end, region_end)
    };

    let news = text[content_start..region_end].trim().to_string();
    text.replace_range(region_start..region_end, "");
    Some(news)
}

/// Split on `## ` lines. Returns (header, sections).
fn split_sections(text: &str) -> (String, Vec<Section>) {
    let boundaries: Vec<usize> = scan_lines(text)
        .iter()
        .filter(|l| l.text.starts_with(SECTION_MARKER))
        .map(|l| l.start)
        .collect();

    let Some(&first) = boundaries.first() else {
        return (text.to_string(), Vec::new());
    };

    let sections = boundaries
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = boundaries.get(index + 1).copied().unwrap_or(text.len());
            let chunk = &text[start + SECTION_MARKER.len()..end];
            let (title, content) = match chunk.find('\n') {
                Some(nl) => (chunk[..nl].trim(), chunk[nl + 1..].trim()),
                None => (chunk.trim(), ""),
            };
            Section {
                id: format!("sec-{}", index),
                title: title.to_string(),
                content: content.to_string(),
            }
        })
        .collect();

    (text[..first].to_string(), sections)
}

struct Line<'a> {
    /// Byte offset of the first char of the line.
    start: usize,
    /// Byte offset just past the line's newline (or end of text).
    end: usize,
    text: &'a str,
}

/// Lines that can act as structural boundaries. Lines inside fenced code
/// blocks are dropped so a `## ` in a snippet never starts a section.
fn scan_lines(text: &str) -> Vec<Line<'_>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    let mut fence: Option<&str> = None;

    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim_end_matches(['\n', '\r']);
        let trimmed = line.trim_start();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if trimmed.starts_with("```") {
            fence = Some("```");
            continue;
        }
        if trimmed.starts_with("~~~") {
            fence = Some("~~~");
            continue;
        }

        lines.push(Line {
            start,
            end: offset,
            text: line,
        });
    }

    lines
}

fn is_level_two_heading(line: &str) -> bool {
    line.starts_with("##") && !line.starts_with("###")
}

fn is_news_heading(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("##") else {
        return false;
    };
    let label = rest.trim();
    // `##` followed by more hashes is a deeper heading, not the news block.
    !rest.starts_with('#') && NEWS_LABELS.contains(&label)
}
