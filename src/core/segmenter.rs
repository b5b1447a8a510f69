// src/core/segmenter.rs
use serde::Serialize;

/// Deepest heading level the renderer distinguishes; `####` and beyond clamp here.
pub const MAX_HEADING_DEPTH: u8 = 3;

/// One heading and the raw lines that follow it up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub level: u8,
    pub heading_text: String,
    pub body_lines: Vec<String>,
}

impl Section {
    /// True for text that appeared before any heading.
    pub fn is_preamble(&self) -> bool {
        self.heading_text.is_empty()
    }
}

/// Split markdown into sections at every line that starts with `#`.
///
/// Text before the first heading becomes a level-1 section with an empty
/// heading. Sections whose heading and body are both blank are dropped.
pub fn segment(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;

    for raw in markdown.lines() {
        let line = raw.trim_end_matches('\r');
        if line.starts_with('#') {
            if let Some(section) = current.take() {
                push_section(&mut sections, section);
            }
            let (level, heading_text) = parse_heading(line);
            current = Some(Section {
                level,
                heading_text,
                body_lines: Vec::new(),
            });
        } else {
            current
                .get_or_insert_with(|| Section {
                    level: 1,
                    heading_text: String::new(),
                    body_lines: Vec::new(),
                })
                .body_lines
                .push(line.trim_end().to_string());
        }
    }

    if let Some(section) = current.take() {
        push_section(&mut sections, section);
    }

    sections
}

/// Level and cleaned text of a `#` heading line.
pub(crate) fn parse_heading(line: &str) -> (u8, String) {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    let level = hashes.clamp(1, MAX_HEADING_DEPTH as usize) as u8;
    let text = line[hashes..].trim();
    // Headings are styled already; drop bold markers wherever the model put
    // them ("## **1.0** Introduction") and any stray emphasis at the ends.
    let text = text.replace("**", "");
    let text = text.trim_matches('*').trim();
    (level, text.to_string())
}

fn push_section(sections: &mut Vec<Section>, mut section: Section) {
    while section.body_lines.first().is_some_and(|l| l.trim().is_empty()) {
        section.body_lines.remove(0);
    }
    while section.body_lines.last().is_some_and(|l| l.trim().is_empty()) {
        section.body_lines.pop();
    }
    if section.heading_text.is_empty() && section.body_lines.is_empty() {
        return;
    }
    sections.push(section);
}
