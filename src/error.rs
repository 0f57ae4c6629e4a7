use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The field registry is malformed (duplicate names, empty boxes, ...).
    #[error("invalid field registry: {0}")]
    Config(String),

    #[error("no layout registered for field `{0}`")]
    UnknownField(String),

    /// The template bytes cannot be used for any row.
    #[error("invalid template: {0}")]
    Template(String),

    /// Composition failed for one row (1-based). Aborts the whole batch.
    #[error("invoice {row}: {source}")]
    Row { row: usize, source: Box<Error> },

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("font error: {0}")]
    Font(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("invalid spreadsheet: {0}")]
    InvalidSheet(String),

    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
