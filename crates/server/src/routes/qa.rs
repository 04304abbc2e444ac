use crate::error::{envelope, ApiError};
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use docqa_core::{HistoryStore, QaFilter, RetrievedPassage, VectorStore};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub is_positive: bool,
}

fn passage_preview(hit: &RetrievedPassage) -> Value {
    let preview: String = hit.text.chars().take(PREVIEW_CHARS).collect();
    json!({
        "filename": hit.filename,
        "similarity": hit.similarity,
        "content_preview": format!("{preview}..."),
    })
}

pub async fn ask<S>(
    State(state): State<AppState<S>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("question is empty"));
    }

    tracing::info!(question_length = request.question.len(), "question received");
    let outcome = state
        .orchestrator
        .ask(request.question.trim(), request.model_name.as_deref())
        .await?;

    Ok(envelope(
        "question answered",
        json!({
            "answer_id": outcome.record.id,
            "question": outcome.record.question,
            "answer": outcome.record.answer,
            "model_name": outcome.record.model_id,
            "relevant_documents": outcome
                .passages
                .iter()
                .map(passage_preview)
                .collect::<Vec<_>>(),
            "created_at": outcome.record.created_at,
        }),
    ))
}

pub async fn feedback<S>(
    State(state): State<AppState<S>>,
    Path(answer_id): Path<Uuid>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    state
        .store
        .set_feedback(answer_id, request.is_positive)
        .await?;

    Ok(envelope(
        "feedback recorded",
        json!({
            "answer_id": answer_id,
            "is_positive": request.is_positive,
        }),
    ))
}

pub async fn history<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    let page = state.store.qa_history(&QaFilter::default()).await?;

    let items: Vec<Value> = page
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

    Ok(envelope("qa history", items))
}
