// src/core/assembler.rs
use crate::core::bookmarks::BookmarkMap;
use crate::core::document::{Block, ListKind, OutputDocument, ParagraphStyle};
use crate::core::inline::parse_runs;
use crate::core::segmenter::Section;
use crate::core::table::{is_table_line, parse_table, Table};
use crate::RenderOptions;
use log::{debug, info};
use std::collections::HashMap;

const TABLE_MARKER_OPEN: &str = "[[TABLE_ID:";
const TABLE_MARKER_CLOSE: &str = "]]";

/// Tables extracted from source documents, addressed by `[[TABLE_ID:<token>]]`.
pub type TableRegistry = HashMap<String, Table>;

/// Append every section to `doc` in order.
///
/// Headings that match the BRD outline get a bookmark so the TOC can link to
/// them. Top-level headings start a new page unless they name an outline
/// sub-item. Body lines become tables, list items or paragraphs. Nothing here
/// fails: unparseable tables fall back to paragraph text.
pub fn assemble(
    doc: &mut OutputDocument,
    sections: &[Section],
    tables: &TableRegistry,
    options: &RenderOptions,
) {
    let map = BookmarkMap::default();
    let top_level = sections
        .iter()
        .filter(|s| !s.is_preamble())
        .map(|s| s.level)
        .min();
    let mut first_heading = true;

    for section in sections {
        if !section.is_preamble() {
            let entry = map.lookup(&section.heading_text);
            // Outline sub-items (1.1, 2.3, ...) stay on their parent's page
            // even when written at the same markdown depth.
            let major = Some(section.level) == top_level && entry.map_or(true, |e| e.indent == 0);
            if options.page_breaks
                && major
                && !first_heading
                && doc.last_block() != Some(&Block::PageBreak)
            {
                doc.push(Block::PageBreak);
            }
            first_heading = false;

            let bookmark = entry
                .map(|e| e.bookmark)
                .filter(|name| doc.claim_bookmark(name))
                .map(str::to_string);
            debug!(
                "heading L{} {:?} -> {:?}",
                section.level, section.heading_text, bookmark
            );
            doc.push(Block::Heading {
                level: section.level,
                text: section.heading_text.clone(),
                bookmark,
            });
        }
        render_body(doc, &section.body_lines, tables, options);
    }
    info!(
        "assembled {} sections, {} tables in document",
        sections.len(),
        doc.table_count()
    );
}

fn render_body(
    doc: &mut OutputDocument,
    lines: &[String],
    tables: &TableRegistry,
    options: &RenderOptions,
) {
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        if is_table_line(line) {
            let start = i;
            while i < lines.len() && is_table_line(&lines[i]) {
                i += 1;
            }
            let run = &lines[start..i];
            match parse_table(run) {
                Some(mut table) => {
                    if options.prune_empty_columns {
                        table.prune_empty_trailing_columns();
                    }
                    doc.push(Block::Table(table));
                }
                None => {
                    for l in run {
                        push_paragraph(doc, l.trim());
                    }
                }
            }
            continue;
        }
        render_line(doc, line, tables);
        i += 1;
    }
}

fn render_line(doc: &mut OutputDocument, line: &str, tables: &TableRegistry) {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_horizontal_rule(trimmed) {
        return;
    }

    if let Some((before, token, after)) = split_table_marker(trimmed) {
        if let Some(table) = tables.get(token) {
            render_line(doc, before, tables);
            doc.push(Block::Table(table.clone()));
            render_line(doc, after, tables);
            return;
        }
        debug!("unknown table marker {token:?}, keeping text");
    }

    let depth = list_depth(line);
    if let Some(item) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        doc.push(Block::ListItem {
            kind: ListKind::Bullet,
            depth,
            runs: parse_runs(item.trim()),
        });
    } else if let Some(item) = strip_ordinal(trimmed) {
        doc.push(Block::ListItem {
            kind: ListKind::Numbered,
            depth,
            runs: parse_runs(item),
        });
    } else {
        push_paragraph(doc, trimmed);
    }
}

fn push_paragraph(doc: &mut OutputDocument, text: &str) {
    if text.is_empty() {
        return;
    }
    doc.push(Block::Paragraph {
        style: ParagraphStyle::Normal,
        runs: parse_runs(text),
    });
}

/// `"12. text"` → `Some("text")`. The dot must be followed by whitespace so
/// that section numbers like `"1.0 Scope"` stay paragraphs.
fn strip_ordinal(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix('.')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

/// Nested list level from leading indentation, two spaces (or a tab) per level.
fn list_depth(line: &str) -> u8 {
    let width: usize = line
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    (width / 2).min(2) as u8
}

fn is_horizontal_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '*')
            || line.chars().all(|c| c == '_'))
}

fn split_table_marker(line: &str) -> Option<(&str, &str, &str)> {
    let open = line.find(TABLE_MARKER_OPEN)?;
    let token_start = open + TABLE_MARKER_OPEN.len();
    let close = line[token_start..].find(TABLE_MARKER_CLOSE)? + token_start;
    Some((
        &line[..open],
        line[token_start..close].trim(),
        &line[close + TABLE_MARKER_CLOSE.len()..],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::inline::TextRun;
    use crate::core::segmenter::segment;

    fn render(md: &str) -> OutputDocument {
        let mut doc = OutputDocument::new("t");
        assemble(&mut doc, &segment(md), &TableRegistry::new(), &RenderOptions::default());
        doc
    }

    fn text(runs: &[TextRun]) -> String {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn intro_and_impact_sections() {
        let doc = render("## 1.0 Introduction\nSome purpose text.\n## 2.0 Impact Analysis\n| A | B |\n| --- | --- |\n| x | y |\n");
        let blocks = doc.blocks();
        assert_eq!(
            blocks[0],
            Block::Heading { level: 2, text: "1.0 Introduction".into(), bookmark: Some("introduction".into()) }
        );
        assert!(matches!(&blocks[1], Block::Paragraph { runs, .. } if text(runs) == "Some purpose text."));
        assert_eq!(blocks[2], Block::PageBreak);
        assert_eq!(
            blocks[3],
            Block::Heading { level: 2, text: "2.0 Impact Analysis".into(), bookmark: Some("impact_analysis".into()) }
        );
        let Block::Table(t) = &blocks[4] else { panic!("expected table, got {:?}", blocks[4]) };
        assert_eq!(t.header(), ["A", "B"]);
        assert_eq!(t.data_rows(), [vec!["x".to_string(), "y".to_string()]]);
        assert_eq!(blocks.len(), 5);
    }

    #[test]
    fn unmatched_heading_renders_without_bookmark() {
        let doc = render("# Glossary\nterm");
        assert_eq!(doc.headings().collect::<Vec<_>>(), vec![("Glossary", None)]);
    }

    #[test]
    fn duplicate_bookmark_is_anchored_once() {
        let doc = render("## 1.0 Introduction\n## Introduction again\n");
        let marks: Vec<_> = doc.headings().map(|(_, b)| b).collect();
        assert_eq!(marks, vec![Some("introduction"), None]);
    }

    #[test]
    fn lists_are_recognised() {
        let doc = render("# A\n- one\n* two\n  - nested\n3. three\n1.0 not a list\n");
        let kinds: Vec<_> = doc
            .blocks()
            .iter()
            .filter_map(|b| match b {
                Block::ListItem { kind, depth, runs } => Some((*kind, *depth, text(runs))),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ListKind::Bullet, 0, "one".to_string()),
                (ListKind::Bullet, 0, "two".to_string()),
                (ListKind::Bullet, 1, "nested".to_string()),
                (ListKind::Numbered, 0, "three".to_string()),
            ]
        );
        assert!(matches!(doc.blocks().last(), Some(Block::Paragraph { runs, .. }) if text(runs) == "1.0 not a list"));
    }

    #[test]
    fn lone_pipe_line_is_paragraph() {
        let doc = render("# A\n| just | one |\nafter");
        assert!(doc.blocks().iter().all(|b| !matches!(b, Block::Table(_))));
        assert!(matches!(&doc.blocks()[1], Block::Paragraph { runs, .. } if text(runs) == "| just | one |"));
    }

    #[test]
    fn page_break_only_between_top_level_headings() {
        let doc = render("# One\n## One.a\n# Two\n# Three\n");
        let breaks = doc.blocks().iter().filter(|b| **b == Block::PageBreak).count();
        assert_eq!(breaks, 2);
        assert_ne!(doc.blocks()[0], Block::PageBreak);
    }

    #[test]
    fn outline_sub_items_at_top_depth_do_not_break() {
        let doc = render(
            "## 1.0 Introduction\na\n## 1.1 Purpose\nb\n## 1.2 To be process\nc\n## 2.0 Impact Analysis\nd\n## 2.1 System impacts\ne\n",
        );
        let blocks = doc.blocks();
        let broken_before: Vec<&str> = blocks
            .windows(2)
            .filter_map(|w| match w {
                [Block::PageBreak, Block::Heading { text, .. }] => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(broken_before, vec!["2.0 Impact Analysis"]);
        assert_eq!(blocks.iter().filter(|b| **b == Block::PageBreak).count(), 1);
    }

    #[test]
    fn page_breaks_can_be_disabled() {
        let mut doc = OutputDocument::new("t");
        let options = RenderOptions { page_breaks: false, ..RenderOptions::default() };
        assemble(&mut doc, &segment("# One\n# Two\n"), &TableRegistry::new(), &options);
        assert!(!doc.blocks().contains(&Block::PageBreak));
    }

    #[test]
    fn preamble_has_no_heading() {
        let doc = render("intro words\n# 1.0 Introduction\n");
        assert!(matches!(&doc.blocks()[0], Block::Paragraph { .. }));
        assert_eq!(doc.headings().count(), 1);
    }

    #[test]
    fn table_marker_is_replaced() {
        let mut tables = TableRegistry::new();
        let t = Table::new(vec!["K".into()], vec![vec!["v".into()]]);
        tables.insert("doc1_t1".to_string(), t.clone());
        let mut doc = OutputDocument::new("t");
        assemble(
            &mut doc,
            &segment("# A\nSee [[TABLE_ID:doc1_t1]] below\n[[TABLE_ID:missing]]\n"),
            &tables,
            &RenderOptions::default(),
        );
        let blocks = &doc.blocks()[1..];
        assert!(matches!(&blocks[0], Block::Paragraph { runs, .. } if text(runs) == "See"));
        assert_eq!(blocks[1], Block::Table(t));
        assert!(matches!(&blocks[2], Block::Paragraph { runs, .. } if text(runs) == "below"));
        assert!(matches!(&blocks[3], Block::Paragraph { runs, .. } if text(runs) == "[[TABLE_ID:missing]]"));
    }

    #[test]
    fn empty_columns_pruned_when_enabled() {
        let mut doc = OutputDocument::new("t");
        let options = RenderOptions { prune_empty_columns: true, ..RenderOptions::default() };
        assemble(&mut doc, &segment("# A\n| a | b |\n| 1 | nan |\n"), &TableRegistry::new(), &options);
        let Some(Block::Table(t)) = doc.blocks().last() else { panic!() };
        assert_eq!(t.column_count(), 1);
    }

    #[test]
    fn horizontal_rules_are_skipped() {
        let doc = render("# A\n---\ntext\n");
        assert_eq!(doc.blocks().len(), 2);
    }
}
