use crate::core::parser::{ExtractedDocument, Parser};
use crate::error::Result;
use log::debug;
use lopdf::Document;
use std::path::Path;

/// Page text via lopdf. PDFs carry no table structure, so `tables` stays empty.
pub struct PdfParser;

impl Parser for PdfParser {
    fn parse<P: AsRef<Path>>(&self, path: P) -> Result<ExtractedDocument> {
        let doc = Document::load(path.as_ref())?;
        Ok(self.extract(&doc))
    }
}

impl PdfParser {
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<ExtractedDocument> {
        let doc = Document::load_mem(bytes)?;
        Ok(self.extract(&doc))
    }

    /// Non-blank lines of every page, in page order. A page whose content
    /// lopdf cannot decode is skipped rather than failing the whole file.
    fn extract(&self, doc: &Document) -> ExtractedDocument {
        let mut lines = Vec::new();
        for page_num in doc.get_pages().keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(text) => lines.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                ),
                Err(e) => debug!("page {page_num}: no text ({e})"),
            }
        }
        ExtractedDocument {
            text: lines.join("\n"),
            tables: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrdError;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// One Helvetica text line per page.
    fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn reads_text_of_every_page_in_order() {
        let bytes = pdf_with_pages(&["Login must use SSO.", "Sessions expire after 15 minutes."]);
        let doc = PdfParser.parse_bytes(&bytes).unwrap();
        let sso = doc.text.find("Login must use SSO.").unwrap();
        let expiry = doc.text.find("Sessions expire after 15 minutes.").unwrap();
        assert!(sso < expiry);
        assert!(doc.tables.is_empty());
    }

    #[test]
    fn parse_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requirements.pdf");
        std::fs::write(&path, pdf_with_pages(&["Refunds within 5 days."])).unwrap();
        let doc = PdfParser.parse(&path).unwrap();
        assert!(doc.text.contains("Refunds within 5 days."));
    }

    #[test]
    fn truncated_file_is_an_error() {
        assert!(matches!(PdfParser.parse_bytes(b"%PDF-1.4"), Err(BrdError::Pdf(_))));
    }
}
