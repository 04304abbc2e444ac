use crate::error::StoreError;
use crate::models::{
    Document, DocumentFilter, DocumentStatus, EmbeddingTestRecord, Page, Passage, QaFilter,
    QaRecord, RetrievedPassage, UsageStatistics,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persists passages with their vectors. Every embedding must match
    /// its passage's declared dimensions, and those must agree with any
    /// vectors already stored for the same model.
    async fn insert_passages(
        &self,
        passages: &[Passage],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    /// Nearest-neighbour search restricted to passages embedded with
    /// `model_id`. Ranked by similarity; ties break by insertion order.
    async fn search(
        &self,
        query_vector: &[f32],
        model_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, StoreError>;

    async fn delete_document_passages(&self, document_id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError>;

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), StoreError>;

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Page<Document>, StoreError>;

    /// Removes a document and, through the store's cascade, its passages.
    async fn delete_document(&self, document_id: Uuid) -> Result<(), StoreError>;

    async fn insert_qa(&self, record: &QaRecord) -> Result<(), StoreError>;

    async fn set_feedback(&self, answer_id: Uuid, is_positive: bool) -> Result<(), StoreError>;

    async fn qa_history(&self, filter: &QaFilter) -> Result<Page<QaRecord>, StoreError>;

    async fn delete_qa(&self, record_id: Uuid) -> Result<(), StoreError>;

    async fn insert_embedding_test(&self, record: &EmbeddingTestRecord) -> Result<(), StoreError>;

    async fn embedding_test_history(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingTestRecord>, StoreError>;

    async fn statistics(&self) -> Result<UsageStatistics, StoreError>;
}
