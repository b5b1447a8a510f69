use crate::core::document::{Block, ListKind, Logo, OutputDocument, ParagraphStyle};
use crate::core::inline::{parse_runs, TextRun};
use crate::core::table::Table;
use crate::core::toc::{OoxmlToc, TocEntryBuilder};
use crate::error::Result;
use crate::RenderOptions;
use log::{debug, info};
use quick_xml::escape::escape;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const WP_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PIC_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Numbering instance shared by every bullet item.
const BULLET_NUM_ID: u32 = 1;
const EMU_PER_INCH: u64 = 914_400;
const LOGO_REL_ID: &str = "rIdLogo";
const HEADER_REL_ID: &str = "rIdHeader1";

/// Serializes an [`OutputDocument`] into a WordprocessingML package.
pub struct DocxWriter {
    update_fields_on_open: bool,
}

/// Body XML plus what the package parts around it need to know.
struct Body {
    xml: String,
    /// numIds of numbered-list runs; each restarts at 1.
    numbered_lists: Vec<u32>,
}

impl DocxWriter {
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            update_fields_on_open: options.update_fields_on_open,
        }
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, doc: &OutputDocument, out_path: P) -> Result<()> {
        let bytes = self.write_to_vec(doc)?;
        std::fs::write(out_path.as_ref(), &bytes)?;
        info!("Wrote {} bytes to {}", bytes.len(), out_path.as_ref().display());
        Ok(())
    }

    pub fn write_to_vec(&self, doc: &OutputDocument) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write(doc, &mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Write the whole package; `[Content_Types].xml` goes first.
    pub fn write<W: Write + Seek>(&self, doc: &OutputDocument, sink: W) -> Result<()> {
        let body = render_body(doc.blocks());
        let logo = doc.logo();
        debug!(
            "document body: {} blocks, {} numbered lists, logo: {}",
            doc.blocks().len(),
            body.numbered_lists.len(),
            logo.is_some()
        );

        let mut zip = ZipWriter::new(sink);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let put = |zip: &mut ZipWriter<W>, name: &str, data: &[u8]| -> Result<()> {
            zip.start_file(name, options)?;
            zip.write_all(data)?;
            Ok(())
        };

        put(&mut zip, "[Content_Types].xml", content_types_xml(logo.is_some()).as_bytes())?;
        put(&mut zip, "_rels/.rels", root_rels_xml().as_bytes())?;
        put(&mut zip, "docProps/core.xml", core_props_xml(&doc.title).as_bytes())?;
        put(&mut zip, "docProps/app.xml", app_props_xml().as_bytes())?;
        put(&mut zip, "word/document.xml", document_xml(&body.xml, logo.is_some()).as_bytes())?;
        put(&mut zip, "word/_rels/document.xml.rels", document_rels_xml(logo.is_some()).as_bytes())?;
        put(&mut zip, "word/styles.xml", STYLES_XML.as_bytes())?;
        put(&mut zip, "word/numbering.xml", numbering_xml(&body.numbered_lists).as_bytes())?;
        put(&mut zip, "word/settings.xml", self.settings_xml().as_bytes())?;
        if let Some(logo) = logo {
            put(&mut zip, "word/header1.xml", header_xml(logo).as_bytes())?;
            put(&mut zip, "word/_rels/header1.xml.rels", header_rels_xml().as_bytes())?;
            put(&mut zip, "word/media/logo.png", &logo.png)?;
        }

        zip.finish()?;
        Ok(())
    }

    fn settings_xml(&self) -> String {
        let update = if self.update_fields_on_open {
            r#"<w:updateFields w:val="true"/>"#
        } else {
            ""
        };
        format!(
            r#"{XML_DECL}<w:settings xmlns:w="{W_NS}">{update}<w:defaultTabStop w:val="720"/><w:compat><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat></w:settings>"#
        )
    }
}

/// Text safe for XML 1.0 content: control characters dropped, markup escaped.
fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|&c| matches!(c, '\t' | '\n' | '\r') || c >= ' ')
        .collect();
    escape(cleaned.as_str()).into_owned()
}

fn render_body(blocks: &[Block]) -> Body {
    let mut xml = String::new();
    let mut numbered_lists = Vec::new();
    let mut next_bookmark_id = 0u32;
    let mut prev: Option<&Block> = None;

    for block in blocks {
        match block {
            Block::Paragraph { style, runs } => {
                let style = match style {
                    ParagraphStyle::Normal => None,
                    ParagraphStyle::Title => Some("Title"),
                    ParagraphStyle::Caption => Some("Caption"),
                };
                paragraph(&mut xml, style, None, runs);
            }
            Block::Heading { level, text, bookmark } => {
                let style = format!("Heading{}", (*level).clamp(1, 3));
                xml.push_str(&format!(r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr>"#));
                let anchor = match bookmark {
                    Some(name) => Some(OoxmlToc::new(&mut xml, &mut next_bookmark_id).anchor_start(name)),
                    None => None,
                };
                push_runs(&mut xml, &parse_runs(text));
                if let Some(id) = anchor {
                    OoxmlToc::new(&mut xml, &mut next_bookmark_id).anchor_end(id);
                }
                xml.push_str("</w:p>");
            }
            Block::ListItem { kind, depth, runs } => {
                let num_id = match kind {
                    ListKind::Bullet => BULLET_NUM_ID,
                    ListKind::Numbered => {
                        let continues = matches!(
                            prev,
                            Some(Block::ListItem { kind: ListKind::Numbered, .. })
                        );
                        if !continues || numbered_lists.is_empty() {
                            numbered_lists.push(BULLET_NUM_ID + 1 + numbered_lists.len() as u32);
                        }
                        *numbered_lists.last().unwrap_or(&BULLET_NUM_ID)
                    }
                };
                paragraph(&mut xml, Some("ListParagraph"), Some((num_id, *depth)), runs);
            }
            Block::Table(table) => {
                if matches!(prev, Some(Block::Table(_))) {
                    xml.push_str("<w:p/>");
                }
                table_xml(&mut xml, table);
            }
            Block::TocEntry(entry) => {
                OoxmlToc::new(&mut xml, &mut next_bookmark_id).entry(
                    &entry.label(),
                    entry.bookmark,
                    entry.indent,
                );
            }
            Block::PageBreak => {
                xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
            }
        }
        prev = Some(block);
    }

    Body { xml, numbered_lists }
}

fn paragraph(out: &mut String, style: Option<&str>, numbering: Option<(u32, u8)>, runs: &[TextRun]) {
    out.push_str("<w:p>");
    if style.is_some() || numbering.is_some() {
        out.push_str("<w:pPr>");
        if let Some(style) = style {
            out.push_str(&format!(r#"<w:pStyle w:val="{style}"/>"#));
        }
        if let Some((num_id, ilvl)) = numbering {
            out.push_str(&format!(
                r#"<w:numPr><w:ilvl w:val="{ilvl}"/><w:numId w:val="{num_id}"/></w:numPr>"#
            ));
        }
        out.push_str("</w:pPr>");
    }
    push_runs(out, runs);
    out.push_str("</w:p>");
}

fn push_runs(out: &mut String, runs: &[TextRun]) {
    for run in runs {
        if run.text.is_empty() {
            continue;
        }
        out.push_str("<w:r>");
        if run.bold {
            out.push_str("<w:rPr><w:b/></w:rPr>");
        }
        out.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
            xml_text(&run.text)
        ));
    }
}

fn table_xml(out: &mut String, table: &Table) {
    out.push_str(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="5000" w:type="pct"/><w:tblLook w:val="04A0" w:firstRow="1" w:lastRow="0" w:firstColumn="1" w:lastColumn="0" w:noHBand="0" w:noVBand="1"/></w:tblPr>"#);
    out.push_str("<w:tblGrid>");
    for _ in 0..table.column_count() {
        out.push_str("<w:gridCol/>");
    }
    out.push_str("</w:tblGrid>");

    for (i, row) in table.rows().iter().enumerate() {
        let header = i == 0;
        out.push_str("<w:tr>");
        if header {
            out.push_str("<w:trPr><w:tblHeader/></w:trPr>");
        }
        for cell in row {
            out.push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/>"#);
            if header {
                out.push_str(r#"<w:shd w:val="clear" w:color="auto" w:fill="D9E2F3"/>"#);
            }
            out.push_str("</w:tcPr>");
            let mut runs = parse_runs(cell);
            if header {
                runs.iter_mut().for_each(|r| r.bold = true);
            }
            paragraph(out, None, None, &runs);
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn document_xml(body: &str, has_header: bool) -> String {
    let header_ref = if has_header {
        format!(r#"<w:headerReference w:type="default" r:id="{HEADER_REL_ID}"/>"#)
    } else {
        String::new()
    };
    format!(
        r#"{XML_DECL}<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{body}<w:sectPr>{header_ref}<w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/><w:cols w:space="708"/></w:sectPr></w:body></w:document>"#
    )
}

fn header_xml(logo: &Logo) -> String {
    let cx = EMU_PER_INCH;
    let cy = EMU_PER_INCH * logo.height_px as u64 / logo.width_px as u64;
    format!(
        r#"{XML_DECL}<w:hdr xmlns:w="{W_NS}" xmlns:r="{R_NS}" xmlns:wp="{WP_NS}" xmlns:a="{A_NS}" xmlns:pic="{PIC_NS}"><w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="1" name="Logo"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{PIC_NS}"><pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="logo.png"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{LOGO_REL_ID}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p></w:hdr>"#
    )
}

fn header_rels_xml() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="{LOGO_REL_ID}" Type="{REL_TYPE}/image" Target="media/logo.png"/></Relationships>"#
    )
}

fn content_types_xml(has_logo: bool) -> String {
    let mut out = String::from(XML_DECL);
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    out.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    if has_logo {
        out.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    }
    let overrides = [
        ("/word/document.xml", "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"),
        ("/word/styles.xml", "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"),
        ("/word/numbering.xml", "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"),
        ("/word/settings.xml", "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"),
        ("/docProps/core.xml", "application/vnd.openxmlformats-package.core-properties+xml"),
        ("/docProps/app.xml", "application/vnd.openxmlformats-officedocument.extended-properties+xml"),
    ];
    for (part, content_type) in overrides {
        out.push_str(&format!(r#"<Override PartName="{part}" ContentType="{content_type}"/>"#));
    }
    if has_logo {
        out.push_str(r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#);
    }
    out.push_str("</Types>");
    out
}

fn root_rels_xml() -> String {
    format!(
        r#"{XML_DECL}<Relationships xmlns="{REL_NS}"><Relationship Id="rId1" Type="{REL_TYPE}/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="{REL_TYPE}/extended-properties" Target="docProps/app.xml"/></Relationships>"#
    )
}

fn document_rels_xml(has_header: bool) -> String {
    let mut out = format!(r#"{XML_DECL}<Relationships xmlns="{REL_NS}">"#);
    out.push_str(&format!(r#"<Relationship Id="rId1" Type="{REL_TYPE}/styles" Target="styles.xml"/>"#));
    out.push_str(&format!(r#"<Relationship Id="rId2" Type="{REL_TYPE}/numbering" Target="numbering.xml"/>"#));
    out.push_str(&format!(r#"<Relationship Id="rId3" Type="{REL_TYPE}/settings" Target="settings.xml"/>"#));
    if has_header {
        out.push_str(&format!(r#"<Relationship Id="{HEADER_REL_ID}" Type="{REL_TYPE}/header" Target="header1.xml"/>"#));
    }
    out.push_str("</Relationships>");
    out
}

fn core_props_xml(title: &str) -> String {
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let id = uuid::Uuid::new_v4();
    format!(
        r#"{XML_DECL}<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:identifier>urn:uuid:{id}</dc:identifier><dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified></cp:coreProperties>"#,
        xml_text(title)
    )
}

fn app_props_xml() -> String {
    format!(
        r#"{XML_DECL}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{} {}</Application></Properties>"#,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

fn numbering_xml(numbered_lists: &[u32]) -> String {
    let mut out = format!(r#"{XML_DECL}<w:numbering xmlns:w="{W_NS}">"#);

    out.push_str(r#"<w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/>"#);
    for (ilvl, glyph) in ["\u{2022}", "o", "\u{25aa}"].iter().enumerate() {
        let indent = 720 * (ilvl + 1);
        out.push_str(&format!(
            r#"<w:lvl w:ilvl="{ilvl}"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="{glyph}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#
        ));
    }
    out.push_str("</w:abstractNum>");

    out.push_str(r#"<w:abstractNum w:abstractNumId="1"><w:multiLevelType w:val="hybridMultilevel"/>"#);
    for (ilvl, fmt) in ["decimal", "lowerLetter", "lowerRoman"].iter().enumerate() {
        let indent = 720 * (ilvl + 1);
        let text = format!("%{}.", ilvl + 1);
        out.push_str(&format!(
            r#"<w:lvl w:ilvl="{ilvl}"><w:start w:val="1"/><w:numFmt w:val="{fmt}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{indent}" w:hanging="360"/></w:pPr></w:lvl>"#
        ));
    }
    out.push_str("</w:abstractNum>");

    out.push_str(&format!(
        r#"<w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="0"/></w:num>"#
    ));
    for num_id in numbered_lists {
        out.push_str(&format!(
            r#"<w:num w:numId="{num_id}"><w:abstractNumId w:val="1"/><w:lvlOverride w:ilvl="0"><w:startOverride w:val="1"/></w:lvlOverride></w:num>"#
        ));
    }
    out.push_str("</w:numbering>");
    out
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="264" w:lineRule="auto"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Title">
    <w:name w:val="Title"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:spacing w:after="240"/><w:jc w:val="center"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="1F3864"/><w:sz w:val="48"/><w:szCs w:val="48"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading1">
    <w:name w:val="heading 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="360" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="32"/><w:szCs w:val="32"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading2">
    <w:name w:val="heading 2"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="1"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="2F5496"/><w:sz w:val="28"/><w:szCs w:val="28"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Heading3">
    <w:name w:val="heading 3"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr><w:keepNext/><w:spacing w:before="200" w:after="80"/><w:outlineLvl w:val="2"/></w:pPr>
    <w:rPr><w:b/><w:color w:val="1F3763"/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Caption">
    <w:name w:val="caption"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:qFormat/>
    <w:rPr><w:i/><w:color w:val="44546A"/><w:sz w:val="18"/><w:szCs w:val="18"/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="ListParagraph">
    <w:name w:val="List Paragraph"/>
    <w:basedOn w:val="Normal"/>
    <w:qFormat/>
    <w:pPr><w:spacing w:after="60"/><w:ind w:left="720"/><w:contextualSpacing/></w:pPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="TOC1">
    <w:name w:val="toc 1"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:pPr><w:spacing w:after="100"/></w:pPr>
    <w:rPr><w:b/></w:rPr>
  </w:style>
  <w:style w:type="paragraph" w:styleId="TOC2">
    <w:name w:val="toc 2"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:pPr><w:spacing w:after="100"/></w:pPr>
  </w:style>
  <w:style w:type="character" w:styleId="Hyperlink">
    <w:name w:val="Hyperlink"/>
    <w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr>
  </w:style>
  <w:style w:type="table" w:styleId="TableGrid">
    <w:name w:val="Table Grid"/>
    <w:pPr><w:spacing w:after="0" w:line="240" w:lineRule="auto"/></w:pPr>
    <w:tblPr>
      <w:tblBorders>
        <w:top w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:left w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:bottom w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:right w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:insideH w:val="single" w:sz="4" w:space="0" w:color="auto"/>
        <w:insideV w:val="single" w:sz="4" w:space="0" w:color="auto"/>
      </w:tblBorders>
      <w:tblCellMar><w:left w:w="108" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar>
    </w:tblPr>
  </w:style>
</w:styles>"#;
