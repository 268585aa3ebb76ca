use super::types::ReportDocument;

/// Semantic kind of a section, derived from its title on every render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Strategy,
    Summary,
    Generational,
    General,
}

const STRATEGY_KEYWORDS: &[&str] = &["plan", "시나리오"];
const SUMMARY_KEYWORDS: &[&str] = &["summary", "요약"];
const GENERATIONAL_KEYWORDS: &[&str] = &["generation", "세대", "관점"];

impl SectionKind {
    /// Case-insensitive keyword match on the title; first rule wins.
    pub fn classify(title: &str) -> Self {
        let lower = title.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

        if has(STRATEGY_KEYWORDS) {
            SectionKind::Strategy
        } else if has(SUMMARY_KEYWORDS) {
            SectionKind::Summary
        } else if has(GENERATIONAL_KEYWORDS) {
            SectionKind::Generational
        } else {
            SectionKind::General
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            SectionKind::Strategy => "🧩",
            SectionKind::Summary => "📄",
            SectionKind::Generational => "👥",
            SectionKind::General => "💼",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SectionKind::Strategy => "Strategy",
            SectionKind::Summary => "Summary",
            SectionKind::Generational => "Perspectives",
            SectionKind::General => "Analysis",
        }
    }

    /// Strategy titles keep their highlight whether open or closed.
    pub fn accented(self) -> bool {
        matches!(self, SectionKind::Strategy)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SectionState {
    id: String,
    open: bool,
}

/// Open/closed state for every section of one document.
///
/// Built fresh for each document: the first section starts open (all of them
/// when `expand_all` is set). Changing `expand_all` overwrites every manual
/// toggle; setting it to its current value is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPresenter {
    expand_all: bool,
    sections: Vec<SectionState>,
}

impl ReportPresenter {
    pub fn new(doc: &ReportDocument, expand_all: bool) -> Self {
        let sections = doc
            .sections
            .iter()
            .enumerate()
            .map(|(index, s)| SectionState {
                id: s.id.clone(),
                open: expand_all || index == 0,
            })
            .collect();
        Self {
            expand_all,
            sections,
        }
    }

    pub fn expand_all(&self) -> bool {
        self.expand_all
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.sections.iter().any(|s| s.id == id && s.open)
    }

    /// Flip one section. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let section = self.sections.iter_mut().find(|s| s.id == id)?;
        section.open = !section.open;
        Some(section.open)
    }

    pub fn set_expand_all(&mut self, expand_all: bool) {
        if self.expand_all == expand_all {
            return;
        }
        self.expand_all = expand_all;
        for section in &mut self.sections {
            section.open = expand_all;
        }
    }

    pub fn open_count(&self) -> usize {
        self.sections.iter().filter(|s| s.open).count()
    }
}
