use crate::error::{envelope, ApiError};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use docqa_core::{DocumentFilter, FileKind, HistoryStore, Page, QaFilter, VectorStore};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct DocumentHistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub filetype: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QaHistoryParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub feedback: Option<bool>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE)
}

fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

fn parse_date(value: &Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| Some(parsed.with_timezone(&Utc)))
            .map_err(|_| {
                ApiError::bad_request(format!("invalid date, expected RFC 3339: {raw}"))
            }),
    }
}

fn pagination<T>(page: &Page<T>) -> Value {
    json!({
        "total": page.total,
        "limit": page.limit,
        "offset": page.offset,
        "has_more": page.has_more(),
    })
}

pub async fn document_history<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<DocumentHistoryParams>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let filetype = params
        .filetype
        .as_deref()
        .map(|raw| {
            FileKind::parse_extension(raw)
                .ok_or_else(|| ApiError::bad_request(format!("unknown filetype: {raw}")))
        })
        .transpose()?;

    let filter = DocumentFilter {
        filetype,
        date_from: parse_date(&params.date_from)?,
        date_to: parse_date(&params.date_to)?,
        limit: clamp_limit(params.limit),
        offset: clamp_offset(params.offset),
    };

    let page = state.store.list_documents(&filter).await?;
    let documents: Vec<Value> = page
        .items
        .iter()
        .map(|document| {
            json!({
                "id": document.id,
                "filename": document.filename,
                "filetype": document.filetype.extension(),
                "content_length": document.content.len(),
                "status": document.status,
                "uploaded_at": document.uploaded_at,
            })
        })
        .collect();

    Ok(envelope(
        "document history",
        json!({
            "documents": documents,
            "pagination": pagination(&page),
        }),
    ))
}

pub async fn qa_history<S>(
    State(state): State<AppState<S>>,
    Query(params): Query<QaHistoryParams>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let filter = QaFilter {
        feedback: params.feedback,
        date_from: parse_date(&params.date_from)?,
        date_to: parse_date(&params.date_to)?,
        limit: clamp_limit(params.limit),
        offset: clamp_offset(params.offset),
    };

    let page = state.store.qa_history(&filter).await?;
    let records: Vec<Value> = page
        .items
        .iter()
        .map(|record| {
            json!({
                "answer_id": record.id,
                "question": record.question,
                "answer": record.answer,
                "is_positive": record.feedback,
                "created_at": record.created_at,
            })
        })
        .collect();

    Ok(envelope(
        "qa history",
        json!({
            "qa_history": records,
            "pagination": pagination(&page),
        }),
    ))
}

pub async fn statistics<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let stats = state.store.statistics().await?;
    Ok(envelope("usage statistics", stats))
}

pub async fn delete_document<S>(
    State(state): State<AppState<S>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    state.store.delete_document(document_id).await?;
    state.store.delete_document_passages(document_id).await?;
    Ok(envelope("document deleted", Value::Null))
}

pub async fn delete_qa<S>(
    State(state): State<AppState<S>>,
    Path(record_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    state.store.delete_qa(record_id).await?;
    Ok(envelope("qa record deleted", Value::Null))
}
