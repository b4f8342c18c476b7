//! `.docx` template engine.
//!
//! - `package` - zip container, keeps every part but the main story as-is
//! - `xml` - owned element tree over quick-xml
//! - `wordml` - paragraph, run and table builders
//! - `template` - placeholder filling and table expansion

pub mod package;
pub mod template;
pub mod wordml;
pub mod xml;

pub use package::DocxDocument;
pub use template::Substitutions;
pub use wordml::RichText;

use thiserror::Error;

/// Errors raised while reading, editing or writing a `.docx` package.
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("invalid docx package: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("I/O error while handling docx: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed document xml: {0}")]
    Xml(String),
    #[error("package has no {0} part")]
    MissingPart(&'static str),
    #[error("document has no w:body element")]
    MissingBody,
}
