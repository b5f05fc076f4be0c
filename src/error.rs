use std::io;

use thiserror::Error;

use crate::rows::RowId;

/// Errors raised while reading, grouping and exporting keyword rows.
#[derive(Debug, Error)]
pub enum GroupingError {
    #[error("input has no '{field}' column")]
    MissingColumn { field: &'static str },
    #[error("{row}: missing required field '{field}'")]
    MissingField { row: RowId, field: &'static str },
    #[error("{row}: invalid volume '{value}'")]
    InvalidVolume { row: RowId, value: String },
    #[error("invalid color '{value}' at line {line}")]
    InvalidColor { line: usize, value: String },
    #[error("color palette is empty")]
    EmptyPalette,
    #[error(transparent)]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Io(#[from] io::Error),
}
