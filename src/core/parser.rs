use crate::core::assembler::TableRegistry;
use crate::core::pdf_parser::PdfParser;
use crate::core::table::Table;
use crate::error::{BrdError, Result};
use log::{info, warn};
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub trait Parser {
    /// Extract plain requirement text and any tables from one source document.
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument>;
}

/// Text and tables pulled out of one input file.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub text: String,
    pub tables: Vec<Table>,
}

/// All inputs combined, ready for prompt assembly.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Requirement text of every readable file, blank-line separated.
    pub requirements: String,
    /// Each table as `[[TABLE_ID:<token>]]` followed by its markdown.
    pub tables_text: String,
    pub tables: TableRegistry,
    /// Files that could not be read, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.requirements.trim().is_empty() && self.tables.is_empty()
    }
}

/// Dispatches on file extension.
pub struct UniversalParser {
    pub docx_parser: DocxParser,
    pub pdf_parser: PdfParser,
    pub text_parser: TextParser,
}

impl Default for UniversalParser {
    fn default() -> Self {
        Self::new()
    }
}

impl UniversalParser {
    pub fn new() -> Self {
        Self {
            docx_parser: DocxParser,
            pdf_parser: PdfParser,
            text_parser: TextParser,
        }
    }

    pub fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "docx" => self.docx_parser.parse(path),
            "pdf" => self.pdf_parser.parse(path),
            "txt" | "md" | "markdown" => self.text_parser.parse(path),
            _ => Err(BrdError::UnsupportedFormat(
                path.as_ref().display().to_string(),
            )),
        }
    }

    /// Read every input, skipping (and recording) the ones that fail.
    pub fn extract_all<P: AsRef<Path>>(&self, paths: &[P]) -> Extraction {
        let mut extraction = Extraction::default();
        let mut texts = Vec::new();
        let mut table_blocks = Vec::new();

        for (doc_index, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            match self.parse(path) {
                Ok(doc) => {
                    info!(
                        "Extracted {} chars and {} tables from {}",
                        doc.text.len(),
                        doc.tables.len(),
                        path.display()
                    );
                    if !doc.text.trim().is_empty() {
                        texts.push(doc.text);
                    }
                    for (table_index, table) in doc.tables.into_iter().enumerate() {
                        let token = format!("doc{}_t{}", doc_index + 1, table_index + 1);
                        table_blocks.push(format!("[[TABLE_ID:{token}]]\n{}", table.to_markdown()));
                        extraction.tables.insert(token, table);
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    extraction.failures.push((path.to_path_buf(), e.to_string()));
                }
            }
        }

        extraction.requirements = texts.join("\n\n");
        extraction.tables_text = table_blocks.join("\n\n");
        extraction
    }
}

/// Plain UTF-8 text or markdown, taken verbatim.
pub struct TextParser;

impl Parser for TextParser {
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(ExtractedDocument { text, tables: Vec::new() })
    }
}

/// Reads paragraph text and tables from `word/document.xml`.
pub struct DocxParser;

impl Parser for DocxParser {
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument> {
        let file = File::open(path.as_ref())?;
        self.parse_reader(file)
    }
}

impl DocxParser {
    pub fn parse_reader<R: Read + Seek>(&self, reader: R) -> Result<ExtractedDocument> {
        let mut archive = ZipArchive::new(reader)?;

        let mut doc_xml = String::new();
        archive.by_name("word/document.xml")?.read_to_string(&mut doc_xml)?;
        let doc = Document::parse(&doc_xml)?;

        let body = doc
            .root_element()
            .children()
            .find(|n| is_w(n, "body"))
            .ok_or_else(|| BrdError::UnsupportedFormat("document.xml has no w:body".to_string()))?;

        let mut paragraphs = Vec::new();
        let mut tables = Vec::new();
        for node in body.children().filter(Node::is_element) {
            if is_w(&node, "p") {
                let text = self.extract_text_from_paragraph(node);
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            } else if is_w(&node, "tbl") {
                if let Some(table) = self.extract_table(node) {
                    tables.push(table);
                }
            }
        }

        Ok(ExtractedDocument {
            text: paragraphs.join("\n"),
            tables,
        })
    }

    /// Concatenate `w:t` runs; `w:tab` and `w:br` become whitespace.
    fn extract_text_from_paragraph(&self, p_node: Node) -> String {
        let mut text = String::new();
        for n in p_node.descendants().filter(Node::is_element) {
            if is_w(&n, "t") {
                text.push_str(n.text().unwrap_or(""));
            } else if is_w(&n, "tab") {
                text.push('\t');
            } else if is_w(&n, "br") {
                text.push(' ');
            }
        }
        text
    }

    /// Rows of `w:tc` paragraph text. Cell text is flattened to one line so
    /// it can travel through pipe-table markdown.
    fn extract_table(&self, tbl_node: Node) -> Option<Table> {
        let mut rows: Vec<Vec<String>> = tbl_node
            .children()
            .filter(|n| is_w(n, "tr"))
            .map(|tr| {
                tr.children()
                    .filter(|n| is_w(n, "tc"))
                    .map(|tc| {
                        tc.children()
                            .filter(|n| is_w(n, "p"))
                            .map(|p| self.extract_text_from_paragraph(p))
                            .filter(|t| !t.trim().is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                            .replace('|', "/")
                            .trim()
                            .to_string()
                    })
                    .collect()
            })
            .filter(|row: &Vec<String>| !row.is_empty())
            .collect();

        if rows.len() < 2 {
            return None;
        }
        let header = rows.remove(0);
        Some(Table::new(header, rows))
    }
}

fn is_w(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(W_NS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn docx_with_body(body: &str) -> Cursor<Vec<u8>> {
        let xml = format!(r#"<?xml version="1.0"?><w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", FileOptions::default()).unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        cursor
    }

    #[test]
    fn reads_paragraphs_and_tables() {
        let body = concat!(
            "<w:p><w:r><w:t>Login must </w:t></w:r><w:r><w:t>use SSO.</w:t></w:r></w:p>",
            "<w:p/>",
            "<w:tbl>",
            "<w:tr><w:tc><w:p><w:r><w:t>Field</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Type</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>id</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>a|b</w:t></w:r></w:p></w:tc></w:tr>",
            "</w:tbl>",
            "<w:p><w:r><w:t>Second</w:t><w:tab/><w:t>line</w:t></w:r></w:p>",
        );
        let doc = DocxParser.parse_reader(docx_with_body(body)).unwrap();
        assert_eq!(doc.text, "Login must use SSO.\nSecond\tline");
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].header(), ["Field", "Type"]);
        assert_eq!(doc.tables[0].data_rows()[0], vec!["id", "a/b"]);
    }

    #[test]
    fn single_row_table_is_ignored() {
        let body = "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>only</w:t></w:r></w:p></w:tc></w:tr></w:tbl>";
        let doc = DocxParser.parse_reader(docx_with_body(body)).unwrap();
        assert!(doc.tables.is_empty());
    }

    #[test]
    fn missing_document_part_is_an_error() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", FileOptions::default()).unwrap();
        let mut cursor = zip.finish().unwrap();
        cursor.set_position(0);
        assert!(matches!(DocxParser.parse_reader(cursor), Err(BrdError::Zip(_))));
    }

    #[test]
    fn extract_all_skips_unsupported_and_registers_tables() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("notes.txt");
        std::fs::write(&txt, "Customers can reset passwords.").unwrap();
        let sheet = dir.path().join("budget.xlsx");
        std::fs::write(&sheet, b"PK").unwrap();
        let docx = dir.path().join("fields.docx");
        std::fs::write(
            &docx,
            docx_with_body("<w:tbl><w:tr><w:tc><w:p><w:r><w:t>K</w:t></w:r></w:p></w:tc></w:tr><w:tr><w:tc><w:p><w:r><w:t>V</w:t></w:r></w:p></w:tc></w:tr></w:tbl>").into_inner(),
        )
        .unwrap();

        let extraction = UniversalParser::new().extract_all(&[&txt, &sheet, &docx]);
        assert_eq!(extraction.requirements, "Customers can reset passwords.");
        assert_eq!(extraction.failures.len(), 1);
        assert_eq!(extraction.failures[0].0, sheet);
        assert!(extraction.failures[0].1.contains("Unsupported file format"));
        assert!(extraction.tables.contains_key("doc3_t1"));
        assert!(extraction.tables_text.starts_with("[[TABLE_ID:doc3_t1]]\n| K |"));
        assert!(!extraction.is_empty());
    }

    #[test]
    fn pdf_inputs_are_routed_to_pdf_parser() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("SCAN.PDF");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        assert!(matches!(UniversalParser::new().parse(&pdf), Err(BrdError::Pdf(_))));
    }
}
