// src/core/bookmarks.rs
//! The fixed BRD outline and the fuzzy heading → bookmark lookup.

/// One line of the table of contents and the bookmark it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    /// Section number as printed, e.g. `"2.3"`.
    pub number: &'static str,
    /// Heading label without the number.
    pub title: &'static str,
    pub bookmark: &'static str,
    /// 0 for numbered top sections (`x.0`), 1 for sub-items.
    pub indent: u8,
}

impl TocEntry {
    pub fn label(&self) -> String {
        format!("{} {}", self.number, self.title)
    }
}

const fn entry(number: &'static str, title: &'static str, bookmark: &'static str, indent: u8) -> TocEntry {
    TocEntry { number, title, bookmark, indent }
}

/// Standard BRD sections 1.0 through 11.0, in document order.
pub const BRD_OUTLINE: [TocEntry; 16] = [
    entry("1.0", "Introduction", "introduction", 0),
    entry("1.1", "Purpose", "purpose", 1),
    entry("1.2", "To be process / High level solution", "to_be_process", 1),
    entry("2.0", "Impact Analysis", "impact_analysis", 0),
    entry("2.1", "System impacts", "system_impacts", 1),
    entry("2.2", "Impacted Products", "impacted_products", 1),
    entry("2.3", "List of APIs required", "apis_required", 1),
    entry("3.0", "Process / Data Flow diagram / Figma", "process_flow", 0),
    entry("4.0", "Business / System Requirement", "business_requirement", 0),
    entry("5.0", "MIS / DATA Requirement", "mis_data_requirement", 0),
    entry("6.0", "Communication Requirement", "communication_requirement", 0),
    entry("7.0", "Test Scenarios", "test_scenarios", 0),
    entry("8.0", "Questions / Suggestions", "questions_suggestions", 0),
    entry("9.0", "Reference Document", "reference_document", 0),
    entry("10.0", "Appendix", "appendix", 0),
    entry("11.0", "Risk Evaluation", "risk_evaluation", 0),
];

/// Lookup table from headings to outline bookmarks.
#[derive(Debug, Clone)]
pub struct BookmarkMap {
    entries: Vec<(String, &'static TocEntry)>,
}

impl Default for BookmarkMap {
    fn default() -> Self {
        Self::new(&BRD_OUTLINE)
    }
}

impl BookmarkMap {
    pub fn new(outline: &'static [TocEntry]) -> Self {
        let entries = outline
            .iter()
            .map(|e| (e.title.to_lowercase(), e))
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = &'static TocEntry> + '_ {
        self.entries.iter().map(|(_, e)| *e)
    }

    /// Find the outline entry a heading belongs to.
    ///
    /// A leading section number (`"2.0"`, `"2.1."`) wins outright; otherwise
    /// the first entry whose label contains the heading text, or is contained
    /// by it, ignoring case.
    pub fn lookup(&self, heading: &str) -> Option<&'static TocEntry> {
        let heading = heading.trim();
        if heading.is_empty() {
            return None;
        }

        if let Some(number) = leading_number(heading) {
            if let Some((_, e)) = self.entries.iter().find(|(_, e)| e.number == number) {
                return Some(e);
            }
        }

        let text = strip_number(heading).to_lowercase();
        if text.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(label, _)| text.contains(label.as_str()) || label.contains(text.as_str()))
            .map(|(_, e)| *e)
    }
}

/// `"2.1. System impacts"` → `Some("2.1")`; a bare `"7"` → `Some("7.0")`.
fn leading_number(heading: &str) -> Option<String> {
    let token = heading.split_whitespace().next()?;
    let token = token.trim_end_matches(['.', ':', ')']);
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !token.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if token.contains('.') {
        Some(token.to_string())
    } else {
        Some(format!("{token}.0"))
    }
}

fn strip_number(heading: &str) -> &str {
    match heading.split_once(char::is_whitespace) {
        Some((first, rest)) if leading_number(first).is_some() => rest.trim(),
        _ if leading_number(heading).is_some() => "",
        _ => heading,
    }
}
