// src/core/document.rs
use crate::core::bookmarks::{BookmarkMap, TocEntry};
use crate::core::inline::TextRun;
use crate::core::table::Table;
use crate::core::toc::build_toc;
use crate::error::{BrdError, Result};
use crate::RenderOptions;
use std::collections::HashSet;

pub const VERSION_HISTORY_COLUMNS: [&str; 5] =
    ["Version", "Date", "Author", "Change description", "Review by"];
pub const SIGN_OFF_COLUMNS: [&str; 5] = [
    "Version",
    "Sign-off Authority",
    "Business Function",
    "Sign-off Date",
    "Email Confirmation",
];
pub const REVIEW_NOTE: &str = "** Review by should be someone from IT function.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
    Title,
    Caption,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered,
}

/// Body-level element of the generated document, in output order.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph {
        style: ParagraphStyle,
        runs: Vec<TextRun>,
    },
    Heading {
        level: u8,
        text: String,
        bookmark: Option<String>,
    },
    ListItem {
        kind: ListKind,
        depth: u8,
        runs: Vec<TextRun>,
    },
    Table(Table),
    TocEntry(TocEntry),
    PageBreak,
}

/// PNG shown in the page header.
#[derive(Debug, Clone, PartialEq)]
pub struct Logo {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

impl Logo {
    /// Read pixel dimensions from the IHDR chunk.
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        if png.len() < 24 || png[..8] != PNG_SIGNATURE || &png[12..16] != b"IHDR" {
            return Err(BrdError::Config("logo must be a PNG image".to_string()));
        }
        let width_px = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
        let height_px = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
        if width_px == 0 || height_px == 0 {
            return Err(BrdError::Config("logo PNG has zero size".to_string()));
        }
        Ok(Self { png, width_px, height_px })
    }
}

/// The assembled document: an ordered list of blocks plus package-level extras.
#[derive(Debug, Clone, Default)]
pub struct OutputDocument {
    pub title: String,
    blocks: Vec<Block>,
    logo: Option<Logo>,
    bookmarks: HashSet<String>,
}

impl OutputDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Title, version history, sign-off matrix and table of contents, ready
    /// for body sections to be appended.
    pub fn brd(options: &RenderOptions) -> Self {
        let mut doc = Self::new(options.title.clone());
        doc.push(Block::Paragraph {
            style: ParagraphStyle::Title,
            runs: vec![TextRun::plain(options.title.clone())],
        });

        doc.push_plain_heading(1, "Version History");
        doc.push(Block::Table(Table::blank_form(&VERSION_HISTORY_COLUMNS, 5)));
        doc.push(Block::Paragraph {
            style: ParagraphStyle::Caption,
            runs: vec![TextRun::plain(REVIEW_NOTE)],
        });

        doc.push_plain_heading(1, "Sign-off Matrix");
        doc.push(Block::Table(Table::blank_form(&SIGN_OFF_COLUMNS, 4)));
        doc.push(Block::PageBreak);

        build_toc(&mut doc, &BookmarkMap::default());
        doc.push(Block::PageBreak);
        doc
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    fn push_plain_heading(&mut self, level: u8, text: &str) {
        self.push(Block::Heading {
            level,
            text: text.to_string(),
            bookmark: None,
        });
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Reserve a bookmark name. Returns false if it is already anchored
    /// elsewhere, since bookmark names must be unique in the package.
    pub fn claim_bookmark(&mut self, name: &str) -> bool {
        self.bookmarks.insert(name.to_string())
    }

    pub fn set_logo(&mut self, png: Vec<u8>) -> Result<()> {
        self.logo = Some(Logo::from_png(png)?);
        Ok(())
    }

    pub fn logo(&self) -> Option<&Logo> {
        self.logo.as_ref()
    }

    pub fn table_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Table(_)))
            .count()
    }

    pub fn headings(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading { text, bookmark, .. } => Some((text.as_str(), bookmark.as_deref())),
            _ => None,
        })
    }
}
