use thiserror::Error;

/// Errors raised while loading usernames, checking profiles or exporting results.
#[derive(Error, Debug)]
pub enum CheckerError {
    /// The uploaded table has no `ig user` header.
    #[error("Column '{0}' not found in the uploaded file")]
    MissingColumn(String),
    /// A single row could not be read. Counted by the loader, never fatal.
    #[error("row {row} could not be read: {reason}")]
    RowRead { row: usize, reason: String },
    /// Navigation or page read failed for one username.
    #[error("check failed for '{username}': {reason}")]
    ProfileCheck { username: String, reason: String },
    /// Upload mode was invoked without a file.
    #[error("Please upload a CSV file.")]
    NoFileProvided,
    /// The browser session could not be started or driven.
    #[error("browser error: {0}")]
    Browser(String),
    #[error("unsupported file: {0}")]
    UnsupportedFile(String),
    /// Neither the downloads directory nor the home directory could be resolved.
    #[error("could not resolve an output directory")]
    NoOutputDirectory,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, CheckerError>;
