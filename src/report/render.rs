//! Markdown to display-tree conversion, with `[Visual: ...]` / `[Image: ...]`
//! placeholders lifted out as callouts.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Visual,
    Image,
}

impl PlaceholderKind {
    const ALL: [PlaceholderKind; 2] = [PlaceholderKind::Visual, PlaceholderKind::Image];

    fn opening(self) -> &'static str {
        match self {
            PlaceholderKind::Visual => "[Visual:",
            PlaceholderKind::Image => "[Image:",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlaceholderKind::Visual => "Generated Visual Representation",
            PlaceholderKind::Image => "News Image Source",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            PlaceholderKind::Visual => "📊",
            PlaceholderKind::Image => "🖼️",
        }
    }
}

/// A slice of section text: either plain markdown or one placeholder tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Markdown {
        range: Range<usize>,
        text: &'a str,
    },
    Placeholder {
        range: Range<usize>,
        kind: PlaceholderKind,
        description: &'a str,
    },
}

impl Segment<'_> {
    /// Byte range of this segment in the partitioned text.
    pub fn range(&self) -> &Range<usize> {
        match self {
            Segment::Markdown { range, .. } | Segment::Placeholder { range, .. } => range,
        }
    }
}

/// Split text into markdown spans and placeholder tags, in source order.
/// Without any tag the whole text comes back as one markdown segment.
pub fn partition(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut emitted = 0;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find('[') {
        let open = cursor + rel;
        match match_placeholder(text, open) {
            Some((kind, desc, end)) => {
                if open > emitted {
                    segments.push(Segment::Markdown {
                        range: emitted..open,
                        text: &text[emitted..open],
                    });
                }
                segments.push(Segment::Placeholder {
                    range: open..end,
                    kind,
                    description: &text[desc],
                });
                emitted = end;
                cursor = end;
            }
            None => cursor = open + 1,
        }
    }

    if segments.is_empty() {
        return vec![Segment::Markdown {
            range: 0..text.len(),
            text,
        }];
    }
    if emitted < text.len() {
        segments.push(Segment::Markdown {
            range: emitted..text.len(),
            text: &text[emitted..],
        });
    }
    segments
}

/// Match a tag starting at `open`. Returns kind, description range and the
/// offset just past the closing bracket.
fn match_placeholder(text: &str, open: usize) -> Option<(PlaceholderKind, Range<usize>, usize)> {
    let rest = &text[open..];
    let kind = PlaceholderKind::ALL
        .into_iter()
        .find(|k| rest.starts_with(k.opening()))?;

    let after_colon = open + kind.opening().len();
    let desc_start = after_colon
        + text[after_colon..]
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(text.len() - after_colon);

    let close = desc_start + text[desc_start..].find(']')?;
    if text[desc_start..close].contains('\n') {
        return None;
    }
    Some((kind, desc_start..close, close + 1))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// `level` is the display level: `###` shows as 4 with an accent bar,
    /// `####` as 5.
    Heading {
        level: u8,
        accent: bool,
        content: Vec<Inline>,
    },
    Paragraph(Vec<Inline>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Quote(Vec<Block>),
    Code {
        lang: Option<String>,
        code: String,
    },
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
    Rule,
    Callout {
        kind: PlaceholderKind,
        description: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link { url: String, content: Vec<Inline> },
    Image { url: String, alt: String },
    Break,
}

/// Flatten inlines to their visible text.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Strong(c) | Inline::Emphasis(c) | Inline::Strikethrough(c) => {
                out.push_str(&plain_text(c))
            }
            Inline::Link { content, .. } => out.push_str(&plain_text(content)),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::Break => out.push('\n'),
        }
    }
    out
}

/// Render section text: placeholders become callouts, the rest is markdown.
pub fn render(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for segment in partition(text) {
        match segment {
            Segment::Markdown { text, .. } => blocks.extend(render_markdown(text)),
            Segment::Placeholder {
                kind, description, ..
            } => blocks.push(Block::Callout {
                kind,
                description: description.to_string(),
            }),
        }
    }
    blocks
}

pub fn render_markdown(text: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::default();
    for event in Parser::new_ext(text, options) {
        builder.event(event);
    }
    builder.finish()
}

fn display_heading(level: HeadingLevel) -> (u8, bool) {
    match level {
        HeadingLevel::H1 => (1, false),
        HeadingLevel::H2 => (2, false),
        HeadingLevel::H3 => (4, true),
        HeadingLevel::H4 | HeadingLevel::H5 => (5, false),
        HeadingLevel::H6 => (6, false),
    }
}

enum Container {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List {
        start: Option<u64>,
        items: Vec<Vec<Block>>,
    },
    Item(Vec<Block>),
}

enum InlineKind {
    Paragraph,
    /// Text that arrived outside a paragraph (tight list items, html).
    Implicit,
    Heading(u8, bool),
    Strong,
    Emphasis,
    Strikethrough,
    Link(String),
    Image(String),
    Cell,
}

struct InlineFrame {
    kind: InlineKind,
    children: Vec<Inline>,
}

#[derive(Default)]
struct TableFrame {
    header: Vec<Vec<Inline>>,
    rows: Vec<Vec<Vec<Inline>>>,
    row: Vec<Vec<Inline>>,
}

struct TreeBuilder {
    containers: Vec<Container>,
    inlines: Vec<InlineFrame>,
    table: Option<TableFrame>,
    code: Option<(Option<String>, String)>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self {
            containers: vec![Container::Root(Vec::new())],
            inlines: Vec::new(),
            table: None,
            code: None,
        }
    }
}

impl TreeBuilder {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(t) => match &mut self.code {
                Some((_, code)) => code.push_str(&t),
                None => self.push_inline(Inline::Text(t.into_string())),
            },
            Event::Code(t) => self.push_inline(Inline::Code(t.into_string())),
            Event::Html(t) | Event::InlineHtml(t) => {
                self.push_inline(Inline::Text(t.into_string()))
            }
            Event::SoftBreak => self.push_inline(Inline::Text(" ".to_string())),
            Event::HardBreak => self.push_inline(Inline::Break),
            Event::Rule => {
                self.close_implicit();
                self.push_block(Block::Rule);
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.push_inline(Inline::Text(marker.to_string()));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_block_inline(InlineKind::Paragraph),
            Tag::Heading { level, .. } => {
                let (level, accent) = display_heading(level);
                self.open_block_inline(InlineKind::Heading(level, accent));
            }
            Tag::BlockQuote(_) => {
                self.close_implicit();
                self.containers.push(Container::Quote(Vec::new()));
            }
            Tag::List(start) => {
                self.close_implicit();
                self.containers.push(Container::List {
                    start,
                    items: Vec::new(),
                });
            }
            Tag::Item => {
                self.close_implicit();
                self.containers.push(Container::Item(Vec::new()));
            }
            Tag::CodeBlock(kind) => {
                self.close_implicit();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) if !info.is_empty() => Some(info.into_string()),
                    _ => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::Table(_) => {
                self.close_implicit();
                self.table = Some(TableFrame::default());
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                }
            }
            Tag::TableCell => self.inlines.push(InlineFrame {
                kind: InlineKind::Cell,
                children: Vec::new(),
            }),
            Tag::Emphasis => self.open_inline(InlineKind::Emphasis),
            Tag::Strong => self.open_inline(InlineKind::Strong),
            Tag::Strikethrough => self.open_inline(InlineKind::Strikethrough),
            Tag::Link { dest_url, .. } => self.open_inline(InlineKind::Link(dest_url.into_string())),
            Tag::Image { dest_url, .. } => {
                self.open_inline(InlineKind::Image(dest_url.into_string()))
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.close_inline(),
            TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item => {
                self.close_implicit();
                self.close_container();
            }
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code.take() {
                    self.push_block(Block::Code { lang, code });
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header = std::mem::take(&mut table.row);
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            TagEnd::TableCell
            | TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_inline(),
            _ => {}
        }
    }

    fn open_block_inline(&mut self, kind: InlineKind) {
        self.close_implicit();
        self.inlines.push(InlineFrame {
            kind,
            children: Vec::new(),
        });
    }

    fn open_inline(&mut self, kind: InlineKind) {
        if self.inlines.is_empty() {
            self.open_block_inline(InlineKind::Implicit);
        }
        self.inlines.push(InlineFrame {
            kind,
            children: Vec::new(),
        });
    }

    fn push_inline(&mut self, inline: Inline) {
        if self.inlines.is_empty() {
            self.open_block_inline(InlineKind::Implicit);
        }
        if let Some(top) = self.inlines.last_mut() {
            top.children.push(inline);
        }
    }

    fn close_inline(&mut self) {
        let Some(frame) = self.inlines.pop() else {
            return;
        };
        let children = frame.children;
        match frame.kind {
            InlineKind::Paragraph | InlineKind::Implicit => {
                self.push_block(Block::Paragraph(children))
            }
            InlineKind::Heading(level, accent) => self.push_block(Block::Heading {
                level,
                accent,
                content: children,
            }),
            InlineKind::Cell => {
                if let Some(table) = &mut self.table {
                    table.row.push(children);
                }
            }
            InlineKind::Strong => self.push_inline(Inline::Strong(children)),
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis(children)),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough(children)),
            InlineKind::Link(url) => self.push_inline(Inline::Link {
                url,
                content: children,
            }),
            InlineKind::Image(url) => self.push_inline(Inline::Image {
                url,
                alt: plain_text(&children),
            }),
        }
    }

    fn close_implicit(&mut self) {
        if matches!(
            self.inlines.last(),
            Some(InlineFrame {
                kind: InlineKind::Implicit,
                ..
            })
        ) {
            self.close_inline();
        }
    }

    fn close_container(&mut self) {
        if self.containers.len() <= 1 {
            return;
        }
        let Some(container) = self.containers.pop() else {
            return;
        };
        match container {
            Container::Item(blocks) => match self.containers.last_mut() {
                Some(Container::List { items, .. }) => items.push(blocks),
                _ => {
                    for block in blocks {
                        self.push_block(block);
                    }
                }
            },
            Container::List { start, items } => self.push_block(Block::List { start, items }),
            Container::Quote(blocks) => self.push_block(Block::Quote(blocks)),
            Container::Root(blocks) => {
                for block in blocks {
                    self.push_block(block);
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Root(blocks) | Container::Quote(blocks) | Container::Item(blocks)) => {
                blocks.push(block)
            }
            Some(Container::List { items, .. }) => match items.last_mut() {
                Some(item) => item.push(block),
                None => items.push(vec![block]),
            },
            None => self.containers.push(Container::Root(vec![block])),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        while !self.inlines.is_empty() {
            self.close_inline();
        }
        while self.containers.len() > 1 {
            self.close_container();
        }
        match self.containers.pop() {
            Some(Container::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn test_partition_no_tags_single_span() {
        let segs = partition("plain **markdown**");
        assert_eq!(
            segs,
            vec![Segment::Markdown {
                range: 0..18,
                text: "plain **markdown**",
            }]
        );
    }

    #[test]
    fn test_partition_interleaves_in_order() {
        let src = "Intro [Visual: Revenue chart] middle [Image:  CEO photo ] end";
        let segs = partition(src);
        assert_eq!(segs.len(), 5);

        match &segs[1] {
            Segment::Placeholder {
                kind, description, ..
            } => {
                assert_eq!(*kind, PlaceholderKind::Visual);
                assert_eq!(*description, "Revenue chart");
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
        match &segs[3] {
            Segment::Placeholder {
                kind, description, ..
            } => {
                assert_eq!(*kind, PlaceholderKind::Image);
                assert_eq!(*description, "CEO photo ");
            }
            other => panic!("expected placeholder, got {:?}", other),
        }
    }

    #[test]
    fn test_partition_ranges_reconstruct_text() {
        let src = "[Visual: a][Image: b]\ntext [Visual: c]";
        let segs = partition(src);
        let callouts = segs
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder { .. }))
            .count();
        assert_eq!(callouts, 3);
        assert!(segs.len() <= 2 * callouts + 1);

        let rebuilt: String = segs.iter().map(|s| &src[s.range().clone()]).collect();
        assert_eq!(rebuilt, src);

        let mut expected_start = 0;
        for seg in &segs {
            assert_eq!(seg.range().start, expected_start);
            expected_start = seg.range().end;
        }
        assert_eq!(expected_start, src.len());
    }

    #[test]
    fn test_partition_ignores_multiline_and_unknown_tags() {
        let src = "[Visual: broken\nacross lines] [Chart: nope] [link](http://x)";
        let segs = partition(src);
        assert_eq!(segs.len(), 1);
    }

    #[test]
    fn test_partition_is_non_greedy() {
        let segs = partition("[Visual: first] and [Visual: second]");
        let descs: Vec<&str> = segs
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder { description, .. } => Some(*description),
                _ => None,
            })
            .collect();
        assert_eq!(descs, vec!["first", "second"]);
    }

    #[test]
    fn test_render_callout_between_paragraphs() {
        let blocks = render("Before.\n\n[Visual: Beta vs market]\n\nAfter.");
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(vec![text("Before.")]),
                Block::Callout {
                    kind: PlaceholderKind::Visual,
                    description: "Beta vs market".to_string(),
                },
                Block::Paragraph(vec![text("After.")]),
            ]
        );
    }

    #[test]
    fn test_heading_levels_remapped() {
        let blocks = render_markdown("### Sub\n\n#### Minor\n\n# Top");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 4,
                    accent: true,
                    content: vec![text("Sub")],
                },
                Block::Heading {
                    level: 5,
                    accent: false,
                    content: vec![text("Minor")],
                },
                Block::Heading {
                    level: 1,
                    accent: false,
                    content: vec![text("Top")],
                },
            ]
        );
    }

    #[test]
    fn test_tight_list_items_become_paragraphs() {
        let blocks = render_markdown("1. **Plan A** main\n2. Plan B");
        assert_eq!(
            blocks,
            vec![Block::List {
                start: Some(1),
                items: vec![
                    vec![Block::Paragraph(vec![
                        Inline::Strong(vec![text("Plan A")]),
                        text(" main"),
                    ])],
                    vec![Block::Paragraph(vec![text("Plan B")])],
                ],
            }]
        );
    }

    #[test]
    fn test_nested_list_and_quote() {
        let blocks = render_markdown("- outer\n  - inner\n\n> quoted *note*");
        match &blocks[0] {
            Block::List { start: None, items } => {
                assert_eq!(items.len(), 1);
                assert!(matches!(items[0][1], Block::List { .. }));
            }
            other => panic!("expected list, got {:?}", other),
        }
        assert_eq!(
            blocks[1],
            Block::Quote(vec![Block::Paragraph(vec![
                text("quoted "),
                Inline::Emphasis(vec![text("note")]),
            ])])
        );
    }

    #[test]
    fn test_table_cells() {
        let blocks = render_markdown("| Ticker | Price |\n|---|---|\n| NVDA | `131.2` |\n");
        assert_eq!(
            blocks,
            vec![Block::Table {
                header: vec![vec![text("Ticker")], vec![text("Price")]],
                rows: vec![vec![vec![text("NVDA")], vec![Inline::Code("131.2".to_string())]]],
            }]
        );
    }

    #[test]
    fn test_links_images_and_code_block() {
        let blocks =
            render_markdown("[Reuters, 2025](https://reuters.com) ![chart](c.png)\n\n```py\nx = 1\n```");
        assert_eq!(
            blocks[0],
            Block::Paragraph(vec![
                Inline::Link {
                    url: "https://reuters.com".to_string(),
                    content: vec![text("Reuters, 2025")],
                },
                text(" "),
                Inline::Image {
                    url: "c.png".to_string(),
                    alt: "chart".to_string(),
                },
            ])
        );
        assert_eq!(
            blocks[1],
            Block::Code {
                lang: Some("py".to_string()),
                code: "x = 1\n".to_string(),
            }
        );
    }

    #[test]
    fn test_plain_text_flattens() {
        let inlines = vec![
            text("a "),
            Inline::Strong(vec![Inline::Emphasis(vec![text("b")])]),
            Inline::Code("c".to_string()),
        ];
        assert_eq!(plain_text(&inlines), "a bc");
    }
}
