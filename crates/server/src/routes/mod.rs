pub mod history;
pub mod qa;
pub mod upload;

use crate::error::envelope;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use docqa_core::{HistoryStore, VectorStore};
use serde_json::Value;

pub fn router<S>(state: AppState<S>) -> Router
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    // Multipart bodies carry the file plus some form overhead.
    let body_limit = state.settings.max_file_size + 64 * 1024;

    Router::new()
        .route("/health", get(health))
        .route(
            "/upload/",
            post(upload::upload_document::<S>).get(upload::list_documents::<S>),
        )
        .route("/upload/:id", delete(upload::delete_document::<S>))
        .route("/qa/ask", post(qa::ask::<S>))
        .route("/qa/answers/:id", patch(qa::feedback::<S>))
        .route("/qa/history", get(qa::history::<S>))
        .route(
            "/embedding-test/test-with-file",
            post(embedding_test::test_with_file::<S>),
        )
        .route(
            "/embedding-test/test-with-text",
            post(embedding_test::test_with_text::<S>),
        )
        .route(
            "/embedding-test/available-models",
            get(embedding_test::available_models::<S>),
        )
        .route(
            "/embedding-test/history",
            get(embedding_test::test_history::<S>),
        )
        .route("/history/documents", get(history::document_history::<S>))
        .route(
            "/history/documents/:id",
            delete(history::delete_document::<S>),
        )
        .route("/history/qa", get(history::qa_history::<S>))
        .route("/history/qa/:id", delete(history::delete_qa::<S>))
        .route("/history/statistics", get(history::statistics::<S>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

async fn health() -> Json<Value> {
    envelope("ok", Value::Null)
}
