mod csv_export;
mod pdf_export;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use csv_export::{encode_csv, DEFAULT_CSV_NAME};
pub use pdf_export::{encode_pdf, PdfFonts, DEFAULT_PDF_NAME, REPORT_TITLE};

use crate::model::PaymentRecord;

pub const NO_DATA_MESSAGE: &str = "No data available to export";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data available to export")]
    NoData,

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load PDF fonts from {dir}: {message}")]
    FontLoad { dir: String, message: String },

    #[error("failed to render PDF: {0}")]
    Pdf(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Csv => DEFAULT_CSV_NAME,
            Self::Pdf => DEFAULT_PDF_NAME,
        }
    }
}

pub fn infer_format_from_path(path: &str) -> Option<ExportFormat> {
    let lower = path.trim().to_lowercase();
    if lower.ends_with(".csv") {
        return Some(ExportFormat::Csv);
    }
    if lower.ends_with(".pdf") {
        return Some(ExportFormat::Pdf);
    }
    None
}

pub fn export_payments(
    rows: &[PaymentRecord],
    format: ExportFormat,
    fonts: &PdfFonts,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => encode_csv(rows),
        ExportFormat::Pdf => encode_pdf(rows, fonts),
    }
}

/// `out` wins; otherwise the format's default name inside `export_dir`
/// (or the working directory).
pub fn resolve_export_path(
    out: Option<&str>,
    export_dir: Option<&Path>,
    format: ExportFormat,
) -> PathBuf {
    match out.map(str::trim).filter(|o| !o.is_empty()) {
        Some(out) => PathBuf::from(out),
        None => match export_dir {
            Some(dir) => dir.join(format.default_file_name()),
            None => PathBuf::from(format.default_file_name()),
        },
    }
}

pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(())
}
