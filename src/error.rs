use thiserror::Error;

/// Failures raised while decoding an uploaded file into a raw table. Callers
/// treat any of these as "no usable data" for the whole upload.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unreadable workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook contains no worksheets")]
    EmptyWorkbook,
    #[error("unsupported JSON structure (not GeoJSON or a list of records)")]
    UnsupportedJson,
    #[error("unknown text encoding '{0}'")]
    UnknownEncoding(String),
    #[error("input is not valid {0} text")]
    Decode(&'static str),
}
