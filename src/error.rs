use thiserror::Error;

#[derive(Error, Debug)]
pub enum BudgieError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File is {size} bytes; the limit is {limit} bytes. Please use a smaller file.")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File contains {rows} rows; the limit is {limit}. Please split into smaller files.")]
    TooManyRows { rows: usize, limit: usize },

    #[error("No header row found in {0}")]
    EmptySource(String),

    #[error("Unsupported file type: {0} (expected .csv or .xlsx)")]
    UnsupportedFile(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown column header: {0}")]
    UnknownHeader(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("No {kind} with ID {id}")]
    RecordNotFound { kind: &'static str, id: String },

    #[error("Invalid entry: {}", .0.join(", "))]
    InvalidEntry(Vec<String>),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, BudgieError>;
