use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docqa_core::{IngestError, ProviderError, QaError, QaFailure, StoreError};
use serde::Serialize;
use serde_json::{json, Value};

/// Every response, success or failure, uses the same envelope:
/// `{"success": bool, "message": string, "data": ...}`.
pub fn envelope(message: &str, data: impl Serialize) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, message = %self.message, "request rejected");
        }

        let body = Json(json!({
            "success": false,
            "message": self.message,
            "data": null,
        }));
        (self.status, body).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(error: IngestError) -> Self {
        match error {
            IngestError::UnsupportedFileType(_)
            | IngestError::EmptyUpload(_)
            | IngestError::TooLarge { .. }
            | IngestError::PdfParse(_)
            | IngestError::DocxParse(_)
            | IngestError::NoText(_)
            | IngestError::InvalidChunkConfig(_) => Self::bad_request(error.to_string()),
            IngestError::Provider(provider_error) => provider_error.into(),
            IngestError::Store(store_error) => store_error.into(),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::UnknownModel(_) => Self::bad_request(error.to_string()),
            _ => Self::new(StatusCode::BAD_GATEWAY, error.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, error.to_string()),
            _ => Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string()),
        }
    }
}

impl From<QaError> for ApiError {
    fn from(error: QaError) -> Self {
        let message = error.to_string();
        match error.source {
            QaFailure::Provider(ProviderError::UnknownModel(_)) => Self::bad_request(message),
            QaFailure::Provider(_) => Self::new(StatusCode::BAD_GATEWAY, message),
            QaFailure::Store(StoreError::NotFound(_)) => {
                Self::new(StatusCode::NOT_FOUND, message)
            }
            QaFailure::Store(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, message),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        Self::bad_request(format!("invalid multipart request: {error}"))
    }
}
