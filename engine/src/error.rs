use thiserror::Error;

pub type Result<T> = std::result::Result<T, RouteBuddyError>;

#[derive(Debug, Error)]
pub enum RouteBuddyError {
    #[error("invalid location: {0}")]
    Validation(#[from] ValidationError),
    #[error("need at least 2 locations to calculate distances, got {0}")]
    InsufficientInput(usize),
    #[error("no distance matrix available, calculate distances first")]
    NoData,
    #[error("failed to parse import file: {0}")]
    Parse(String),
    #[error("location index {index} out of bounds for {len} locations")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("distance matrix is not a square {locations}x{locations} table ({rows} rows)")]
    MatrixShape { rows: usize, locations: usize },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
}

/// Why a single location (or import row) was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("name is empty")]
    EmptyName,
    #[error("{field} {value:?} is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("missing {0} column")]
    MissingColumn(&'static str),
    #[error("malformed row: {0}")]
    Malformed(String),
}
