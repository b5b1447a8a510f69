use thiserror::Error;

/// Failures that can surface from extraction, the LLM boundary or packaging.
///
/// Markdown parsing never produces one of these: malformed input degrades to
/// plain paragraphs instead.
#[derive(Error, Debug)]
pub enum BrdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("LLM request failed: {0}")]
    Llm(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No API key configured; set BRD_API_KEY or pass --api-key")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BrdError>;
