pub mod core {
    pub mod assembler;
    pub mod bookmarks;
    pub mod document;
    pub mod inline;
    pub mod parser;
    pub mod pdf_parser;
    pub mod segmenter;
    pub mod table;
    pub mod toc;
    pub mod writer;
}

pub mod utils {
    pub mod pipeline;
}

pub mod cache;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;

pub use crate::core::assembler::{assemble, TableRegistry};
pub use crate::core::document::OutputDocument;
pub use crate::core::segmenter::{segment, Section};
pub use crate::core::table::Table;
pub use crate::error::{BrdError, Result};

use serde::{Deserialize, Serialize};

/// Knobs that change how LLM markdown is laid out in the generated document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderOptions {
    /// Text of the title paragraph and `dc:title` document property.
    pub title: String,
    /// Drop trailing table columns whose data cells are all placeholders.
    pub prune_empty_columns: bool,
    /// Ask the word processor to refresh PAGEREF fields when the file is opened.
    pub update_fields_on_open: bool,
    /// Start every top-level section on a fresh page.
    pub page_breaks: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Business Requirements Document".to_string(),
            prune_empty_columns: false,
            update_fields_on_open: false,
            page_breaks: true,
        }
    }
}

/// Render an LLM markdown response into `.docx` bytes.
///
/// `tables` resolves `[[TABLE_ID:<token>]]` markers; `logo` is an optional PNG
/// placed in the page header.
pub fn render_markdown(
    markdown: &str,
    options: &RenderOptions,
    tables: &TableRegistry,
    logo: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let sections = segment(markdown);
    let mut doc = OutputDocument::brd(options);
    if let Some(png) = logo {
        doc.set_logo(png)?;
    }
    assemble(&mut doc, &sections, tables, options);
    crate::core::writer::DocxWriter::new(options).write_to_vec(&doc)
}
