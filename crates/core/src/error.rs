use crate::models::QaStage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("empty upload: {0}")]
    EmptyUpload(String),

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx parse error: {0}")]
    DocxParse(String),

    #[error("no extractable text in {0}")]
    NoText(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {provider}: {details}")]
    BackendResponse { provider: String, details: String },

    #[error("every provider failed for {model}: {details}")]
    Exhausted { model: String, details: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("dimension mismatch for {model_id}: expected {expected}, got {got}")]
    DimensionMismatch {
        model_id: String,
        expected: usize,
        got: usize,
    },

    #[error("insert rejected: {0}")]
    Rejected(String),

    #[error("corrupt row: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum QaFailure {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A question that could not be answered, tagged with the pipeline stage
/// that was in progress when the failure happened.
#[derive(Debug, Error)]
#[error("question failed during {stage}: {source}")]
pub struct QaError {
    pub stage: QaStage,
    #[source]
    pub source: QaFailure,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
