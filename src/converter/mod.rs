//! Conversion of office documents to PDF through an external converter.
//!
//! - `libreoffice` - headless LibreOffice driven from the command line
//! - `fonts` - fontconfig setup for bundled fonts

pub mod fonts;
pub mod libreoffice;

pub use libreoffice::LibreOfficeConverter;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("no converter binary found (tried {0})")]
    BinaryNotFound(String),
    #[error("unsupported input format '{0}'")]
    UnsupportedFormat(String),
    #[error("failed to start converter: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("conversion timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("converter exited with {code}: {stderr}")]
    Failed { code: String, stderr: String },
    #[error("converter finished but {} was not produced", .0.display())]
    MissingOutput(PathBuf),
    #[error("I/O error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that turns an office document into `<out_dir>/<stem>.pdf`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input` and return the path of the produced PDF.
    async fn convert(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, ConvertError>;

    /// Human readable description, shown by the health endpoint.
    fn describe(&self) -> String;
}

/// LibreOffice export filter family for an input document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFilter {
    Writer,
    Impress,
    Calc,
}

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "docx", "doc", "odt", "rtf", "pptx", "ppt", "odp", "xlsx", "xls", "ods",
];

impl ExportFilter {
    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "docx" | "doc" | "odt" | "rtf" => Some(ExportFilter::Writer),
            "pptx" | "ppt" | "odp" => Some(ExportFilter::Impress),
            "xlsx" | "xls" | "ods" => Some(ExportFilter::Calc),
            _ => None,
        }
    }

    pub fn for_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::for_extension)
    }

    /// Value for `--convert-to`.
    pub fn convert_to(self) -> &'static str {
        match self {
            ExportFilter::Writer => "pdf:writer_pdf_Export",
            ExportFilter::Impress => "pdf:impress_pdf_Export",
            ExportFilter::Calc => "pdf:calc_pdf_Export",
        }
    }
}

/// Where a converter writes the PDF for `input`.
pub fn expected_output(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out_dir.join(format!("{stem}.pdf"))
}
