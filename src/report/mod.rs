pub mod format;
pub mod presenter;
pub mod render;
pub mod splitter;
pub mod types;

pub use presenter::{ReportPresenter, SectionKind};
pub use splitter::split;
pub use types::{AnalysisMode, Language, ReportDocument, SavedReport};
