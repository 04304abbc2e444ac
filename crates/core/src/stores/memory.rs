use crate::error::StoreError;
use crate::models::{
    Document, DocumentFilter, DocumentStats, DocumentStatus, EmbeddingTestRecord, FileKind, Page,
    Passage, QaFilter, QaRecord, QaStats, RetrievedPassage, UsageStatistics,
};
use crate::traits::{HistoryStore, VectorStore};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_mag: f32 = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_mag: f32 = right.iter().map(|value| value * value).sum::<f32>().sqrt();

    if left_mag == 0.0 || right_mag == 0.0 {
        return 0.0;
    }

    f64::from(dot / (left_mag * right_mag))
}

struct StoredPassage {
    passage: Passage,
    embedding: Vec<f32>,
}

#[derive(Default)]
struct MemoryInner {
    documents: Vec<Document>,
    passages: Vec<StoredPassage>,
    qa_records: Vec<QaRecord>,
    embedding_tests: Vec<EmbeddingTestRecord>,
    model_dimensions: HashMap<String, usize>,
}

/// Everything the Postgres store does, held in process memory. Backs the
/// embedding comparison harness and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn insert_passages(
        &self,
        passages: &[Passage],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        if passages.len() != embeddings.len() {
            return Err(StoreError::Rejected(format!(
                "{} passages with {} embeddings",
                passages.len(),
                embeddings.len()
            )));
        }

        let mut inner = self.inner.write().unwrap();
        for (passage, embedding) in passages.iter().zip(embeddings) {
            let declared = *inner
                .model_dimensions
                .entry(passage.model_id.clone())
                .or_insert(passage.dimensions);

            if embedding.len() != declared || passage.dimensions != declared {
                return Err(StoreError::DimensionMismatch {
                    model_id: passage.model_id.clone(),
                    expected: declared,
                    got: embedding.len(),
                });
            }

            inner.passages.push(StoredPassage {
                passage: passage.clone(),
                embedding: embedding.clone(),
            });
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        model_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, StoreError> {
        let inner = self.inner.read().unwrap();

        let filenames: HashMap<Uuid, String> = inner
            .documents
            .iter()
            .map(|document| (document.id, document.filename.clone()))
            .collect();

        let mut scored: Vec<(f64, &StoredPassage)> = inner
            .passages
            .iter()
            .filter(|stored| stored.passage.model_id == model_id)
            .map(|stored| (cosine_similarity(query_vector, &stored.embedding), stored))
            .collect();

        // Stable sort keeps insertion order for equal similarities.
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(similarity, stored)| RetrievedPassage {
                passage_id: stored.passage.id,
                document_id: stored.passage.document_id,
                filename: filenames
                    .get(&stored.passage.document_id)
                    .cloned()
                    .unwrap_or_default(),
                text: stored.passage.text.clone(),
                similarity,
            })
            .collect())
    }

    async fn delete_document_passages(&self, document_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        inner
            .passages
            .retain(|stored| stored.passage.document_id != document_id);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        self.inner.write().unwrap().documents.push(document.clone());
        Ok(())
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let document = inner
            .documents
            .iter_mut()
            .find(|document| document.id == document_id)
            .ok_or_else(|| StoreError::NotFound(format!("document {document_id}")))?;
        document.status = status;
        Ok(())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Page<Document>, StoreError> {
        let inner = self.inner.read().unwrap();

        let mut matching: Vec<Document> = inner
            .documents
            .iter()
            .filter(|document| {
                filter
                    .filetype
                    .map_or(true, |filetype| document.filetype == filetype)
            })
            .filter(|document| {
                filter
                    .date_from
                    .map_or(true, |from| document.uploaded_at >= from)
            })
            .filter(|document| filter.date_to.map_or(true, |to| document.uploaded_at <= to))
            .cloned()
            .collect();

        matching.sort_by(|left, right| right.uploaded_at.cmp(&left.uploaded_at));
        let total = matching.len() as i64;

        Ok(Page {
            items: matching
                .into_iter()
                .skip(filter.offset.max(0) as usize)
                .take(filter.limit.max(0) as usize)
                .collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.documents.len();
        inner.documents.retain(|document| document.id != document_id);
        if inner.documents.len() == before {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }

        inner
            .passages
            .retain(|stored| stored.passage.document_id != document_id);
        Ok(())
    }

    async fn insert_qa(&self, record: &QaRecord) -> Result<(), StoreError> {
        self.inner.write().unwrap().qa_records.push(record.clone());
        Ok(())
    }

    async fn set_feedback(&self, answer_id: Uuid, is_positive: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let record = inner
            .qa_records
            .iter_mut()
            .find(|record| record.id == answer_id)
            .ok_or_else(|| StoreError::NotFound(format!("answer {answer_id}")))?;
        record.feedback = Some(is_positive);
        Ok(())
    }

    async fn qa_history(&self, filter: &QaFilter) -> Result<Page<QaRecord>, StoreError> {
        let inner = self.inner.read().unwrap();

        let mut matching: Vec<QaRecord> = inner
            .qa_records
            .iter()
            .filter(|record| {
                filter
                    .feedback
                    .map_or(true, |feedback| record.feedback == Some(feedback))
            })
            .filter(|record| {
                filter
                    .date_from
                    .map_or(true, |from| record.created_at >= from)
            })
            .filter(|record| filter.date_to.map_or(true, |to| record.created_at <= to))
            .cloned()
            .collect();

        matching.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        let total = matching.len() as i64;

        Ok(Page {
            items: matching
                .into_iter()
                .skip(filter.offset.max(0) as usize)
                .take(filter.limit.max(0) as usize)
                .collect(),
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn delete_qa(&self, record_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().unwrap();
        let before = inner.qa_records.len();
        inner.qa_records.retain(|record| record.id != record_id);
        if inner.qa_records.len() == before {
            return Err(StoreError::NotFound(format!("qa record {record_id}")));
        }
        Ok(())
    }

    async fn insert_embedding_test(&self, record: &EmbeddingTestRecord) -> Result<(), StoreError> {
        self.inner
            .write()
            .unwrap()
            .embedding_tests
            .push(record.clone());
        Ok(())
    }

    async fn embedding_test_history(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingTestRecord>, StoreError> {
        let inner = self.inner.read().unwrap();
        let mut records = inner.embedding_tests.clone();
        records.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }

    async fn statistics(&self) -> Result<UsageStatistics, StoreError> {
        let inner = self.inner.read().unwrap();
        let week_ago = Utc::now() - Duration::days(7);

        let pdf = inner
            .documents
            .iter()
            .filter(|document| document.filetype == FileKind::Pdf)
            .count() as i64;
        let docx = inner
            .documents
            .iter()
            .filter(|document| document.filetype == FileKind::Docx)
            .count() as i64;
        let recent_documents = inner
            .documents
            .iter()
            .filter(|document| document.uploaded_at >= week_ago)
            .count() as i64;

        let total_questions = inner.qa_records.len() as i64;
        let positive = inner
            .qa_records
            .iter()
            .filter(|record| record.feedback == Some(true))
            .count() as i64;
        let negative = inner
            .qa_records
            .iter()
            .filter(|record| record.feedback == Some(false))
            .count() as i64;
        let recent_questions = inner
            .qa_records
            .iter()
            .filter(|record| record.created_at >= week_ago)
            .count() as i64;

        Ok(UsageStatistics {
            documents: DocumentStats {
                total: inner.documents.len() as i64,
                pdf,
                docx,
                recent_7_days: recent_documents,
            },
            qa: QaStats {
                total_questions,
                positive_feedback: positive,
                negative_feedback: negative,
                recent_7_days: recent_questions,
                feedback_rate: if total_questions > 0 {
                    (positive + negative) as f64 / total_questions as f64
                } else {
                    0.0
                },
            },
        })
    }
}
