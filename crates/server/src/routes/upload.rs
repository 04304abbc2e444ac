use crate::error::{envelope, ApiError};
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use docqa_core::{Document, DocumentFilter, HistoryStore, VectorStore};
use serde_json::{json, Value};
use uuid::Uuid;

fn document_summary(document: &Document) -> Value {
    json!({
        "id": document.id,
        "filename": document.filename,
        "filetype": document.filetype.extension(),
        "content_length": document.content.len(),
        "status": document.status,
        "uploaded_at": document.uploaded_at,
    })
}

pub async fn upload_document<S>(
    State(state): State<AppState<S>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut model_name: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::bad_request("file field has no filename"))?;
                let bytes = field.bytes().await?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("model_name") => {
                let value = field.text().await?;
                if !value.trim().is_empty() {
                    model_name = Some(value.trim().to_string());
                }
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| ApiError::bad_request("multipart request is missing a file field"))?;

    tracing::info!(filename = %filename, size = bytes.len(), "upload received");
    let document = state
        .ingestor
        .ingest(&filename, &bytes, model_name.as_deref())
        .await?;
    tracing::info!(document_id = %document.id, "upload processed");

    Ok(envelope("file uploaded", document_summary(&document)))
}

pub async fn list_documents<S>(
    State(state): State<AppState<S>>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let page = state
        .store
        .list_documents(&DocumentFilter::default())
        .await?;

    let documents: Vec<Value> = page.items.iter().map(document_summary).collect();
    Ok(envelope("uploaded documents", documents))
}

pub async fn delete_document<S>(
    State(state): State<AppState<S>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    state.store.delete_document(document_id).await?;
    // Passages cascade with the document; this covers stores without
    // referential cascade.
    state.store.delete_document_passages(document_id).await?;

    tracing::info!(document_id = %document_id, "document deleted");
    Ok(envelope("document deleted", Value::Null))
}
