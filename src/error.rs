use thiserror::Error;

use crate::data::model::Table;

/// Errors raised while loading, filtering or exporting a [`Table`].
#[derive(Error, Debug)]
pub enum TableError {
    /// The input is neither a spreadsheet container nor delimited text.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The container was recognised but its content is malformed.
    #[error("Failed to parse {format}: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// Rows and columns disagree (duplicate names, wrong row width).
    #[error("Invalid table: {0}")]
    InvalidTable(String),

    /// A filter names a column the table does not have.
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    /// Refusing to write a file without any data rows.
    #[error("No data to export")]
    EmptyExport,

    /// The spreadsheet/CSV writer rejected the table.
    #[error("Failed to write {format}: {message}")]
    Write {
        format: &'static str,
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn parse(format: &'static str, message: impl Into<String>) -> Self {
        TableError::Parse {
            format,
            message: message.into(),
        }
    }

    pub(crate) fn write(format: &'static str, message: impl ToString) -> Self {
        TableError::Write {
            format,
            message: message.to_string(),
        }
    }
}

/// Why a sort could not be applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    #[error("Cannot sort by unknown column '{0}'")]
    UnknownColumn(String),

    /// The column holds values with no common ordering (e.g. numbers and text).
    #[error("Cannot sort column '{column}': it mixes values of different types")]
    MixedTypes { column: String },
}

/// Failure of a combined filter + sort request.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error(transparent)]
    Filter(#[from] TableError),

    /// Filtering succeeded but sorting did not; `filtered` holds the
    /// unsorted filter result.
    #[error("{error}")]
    Sort { error: SortError, filtered: Table },
}

pub type Result<T, E = TableError> = std::result::Result<T, E>;
