// src/core/toc.rs
use crate::core::bookmarks::BookmarkMap;
use crate::core::document::{Block, OutputDocument, ParagraphStyle};
use crate::core::inline::TextRun;
use quick_xml::escape::escape;

pub const TOC_HEADING: &str = "Table of Contents";

pub const TOC_REFRESH_NOTE: &str =
    "Page numbers are fields: select all (Ctrl+A) and press F9, or right-click and choose Update Field, to fill them in.";

/// Emits table-of-contents lines and the bookmark anchors they resolve to.
///
/// The document assembler only speaks in (label, bookmark) pairs; how a link
/// and its page-number field are encoded is up to the implementation.
pub trait TocEntryBuilder {
    /// One TOC line: a link labelled `label` to `bookmark`, a leader tab and a
    /// page-number reference to the same bookmark.
    fn entry(&mut self, label: &str, bookmark: &str, indent: u8);

    /// Open the destination anchor for `bookmark`; returns the handle to close it.
    fn anchor_start(&mut self, bookmark: &str) -> u32;

    fn anchor_end(&mut self, id: u32);
}

/// Append the fixed TOC block: heading, one entry per outline item, refresh note.
pub fn build_toc(doc: &mut OutputDocument, map: &BookmarkMap) {
    doc.push(Block::Heading {
        level: 1,
        text: TOC_HEADING.to_string(),
        bookmark: None,
    });
    for entry in map.entries() {
        doc.push(Block::TocEntry(*entry));
    }
    doc.push(Block::Paragraph {
        style: ParagraphStyle::Caption,
        runs: vec![TextRun::plain(TOC_REFRESH_NOTE)],
    });
}

/// Right tab stop for the page-number column, in twentieths of a point.
const TOC_TAB_POS: u32 = 9350;
const TOC_INDENT_STEP: u32 = 440;

/// WordprocessingML implementation: hyperlinks to internal anchors plus
/// `PAGEREF <bookmark> \h` field codes.
pub struct OoxmlToc<'a> {
    out: &'a mut String,
    next_id: &'a mut u32,
}

impl<'a> OoxmlToc<'a> {
    pub fn new(out: &'a mut String, next_id: &'a mut u32) -> Self {
        Self { out, next_id }
    }

    fn field_char(&mut self, kind: &str) {
        self.out
            .push_str(&format!(r#"<w:r><w:fldChar w:fldCharType="{kind}"/></w:r>"#));
    }
}

impl TocEntryBuilder for OoxmlToc<'_> {
    fn entry(&mut self, label: &str, bookmark: &str, indent: u8) {
        let style = if indent == 0 { "TOC1" } else { "TOC2" };
        let left = TOC_INDENT_STEP * indent as u32;
        let bookmark = escape(bookmark);

        self.out.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{style}"/><w:tabs><w:tab w:val="right" w:leader="dot" w:pos="{TOC_TAB_POS}"/></w:tabs><w:ind w:left="{left}"/></w:pPr>"#
        ));
        self.out.push_str(&format!(
            r#"<w:hyperlink w:anchor="{bookmark}" w:history="1"><w:r><w:rPr><w:rStyle w:val="Hyperlink"/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:hyperlink>"#,
            escape(label)
        ));
        self.out.push_str("<w:r><w:tab/></w:r>");
        self.field_char("begin");
        self.out.push_str(&format!(
            r#"<w:r><w:instrText xml:space="preserve"> PAGEREF {bookmark} \h </w:instrText></w:r>"#
        ));
        self.field_char("separate");
        self.field_char("end");
        self.out.push_str("</w:p>");
    }

    fn anchor_start(&mut self, bookmark: &str) -> u32 {
        let id = *self.next_id;
        *self.next_id += 1;
        self.out.push_str(&format!(
            r#"<w:bookmarkStart w:id="{id}" w:name="{}"/>"#,
            escape(bookmark)
        ));
        id
    }

    fn anchor_end(&mut self, id: u32) {
        self.out.push_str(&format!(r#"<w:bookmarkEnd w:id="{id}"/>"#));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_has_link_tab_and_pageref() {
        let mut xml = String::new();
        let mut ids = 0;
        OoxmlToc::new(&mut xml, &mut ids).entry("1.0 Introduction", "introduction", 0);

        assert!(xml.contains(r#"<w:hyperlink w:anchor="introduction""#));
        assert!(xml.contains(">1.0 Introduction</w:t>"));
        assert!(xml.contains("<w:r><w:tab/></w:r>"));
        assert!(xml.contains(r" PAGEREF introduction \h "));
        let begin = xml.find(r#"w:fldCharType="begin""#).unwrap();
        let instr = xml.find("PAGEREF").unwrap();
        let end = xml.find(r#"w:fldCharType="end""#).unwrap();
        assert!(begin < instr && instr < end);
    }

    #[test]
    fn sub_items_are_indented() {
        let mut xml = String::new();
        let mut ids = 0;
        OoxmlToc::new(&mut xml, &mut ids).entry("1.1 Purpose", "purpose", 1);
        assert!(xml.contains(r#"<w:pStyle w:val="TOC2"/>"#));
        assert!(xml.contains(r#"<w:ind w:left="440"/>"#));
    }

    #[test]
    fn anchors_get_increasing_ids() {
        let mut xml = String::new();
        let mut ids = 7;
        let mut toc = OoxmlToc::new(&mut xml, &mut ids);
        let a = toc.anchor_start("introduction");
        toc.anchor_end(a);
        let b = toc.anchor_start("purpose");
        toc.anchor_end(b);
        assert_eq!((a, b), (7, 8));
        assert!(xml.contains(r#"<w:bookmarkStart w:id="7" w:name="introduction"/>"#));
        assert!(xml.contains(r#"<w:bookmarkEnd w:id="8"/>"#));
    }

    #[test]
    fn labels_are_escaped() {
        let mut xml = String::new();
        let mut ids = 0;
        OoxmlToc::new(&mut xml, &mut ids).entry("Q&A <draft>", "qa", 0);
        assert!(xml.contains("Q&amp;A &lt;draft&gt;"));
    }
}
