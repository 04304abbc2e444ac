use crate::error::StoreError;
use crate::models::{
    Document, DocumentFilter, DocumentStats, DocumentStatus, EmbeddingTestRecord, FileKind, Page,
    Passage, QaFilter, QaRecord, QaStats, RetrievedPassage, UsageStatistics,
};
use crate::traits::{HistoryStore, VectorStore};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::HashSet;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE EXTENSION IF NOT EXISTS vector;

CREATE TABLE IF NOT EXISTS documents (
    id UUID PRIMARY KEY,
    filename TEXT NOT NULL,
    filetype TEXT NOT NULL,
    content TEXT NOT NULL,
    checksum TEXT NOT NULL,
    status TEXT NOT NULL,
    uploaded_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS passages (
    id UUID PRIMARY KEY,
    document_id UUID NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    text TEXT NOT NULL,
    model_id TEXT NOT NULL,
    dimensions INTEGER NOT NULL,
    embedding vector NOT NULL,
    ord BIGSERIAL
);

CREATE INDEX IF NOT EXISTS passages_model_idx ON passages (model_id);
CREATE INDEX IF NOT EXISTS passages_document_idx ON passages (document_id);

CREATE TABLE IF NOT EXISTS qa_records (
    id UUID PRIMARY KEY,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    model_id TEXT NOT NULL,
    passage_ids UUID[] NOT NULL,
    feedback BOOLEAN,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS embedding_tests (
    id UUID PRIMARY KEY,
    question TEXT NOT NULL,
    source TEXT NOT NULL,
    results JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);
"#;

/// PostgreSQL store. Vectors live in an untyped pgvector column; the
/// `model_id` filter plus the per-model dimension check on insert keep
/// the `<=>` comparisons within a single model's vector space.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn declared_dimensions(&self, model_id: &str) -> Result<Option<i32>, StoreError> {
        let declared = sqlx::query_scalar::<_, i32>(
            "SELECT dimensions FROM passages WHERE model_id = $1 LIMIT 1",
        )
        .bind(model_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(declared)
    }
}

fn document_from_row(row: &PgRow) -> Result<Document, StoreError> {
    let filetype_raw: String = row.try_get("filetype")?;
    let filetype = FileKind::parse_extension(&filetype_raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown filetype {filetype_raw}")))?;

    let status_raw: String = row.try_get("status")?;
    let status = DocumentStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown status {status_raw}")))?;

    Ok(Document {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        filetype,
        content: row.try_get("content")?,
        checksum: row.try_get("checksum")?,
        status,
        uploaded_at: row.try_get("uploaded_at")?,
    })
}

fn qa_record_from_row(row: &PgRow) -> Result<QaRecord, StoreError> {
    Ok(QaRecord {
        id: row.try_get("id")?,
        question: row.try_get("question")?,
        answer: row.try_get("answer")?,
        model_id: row.try_get("model_id")?,
        passage_ids: row.try_get("passage_ids")?,
        feedback: row.try_get("feedback")?,
        created_at: row.try_get("created_at")?,
    })
}

fn embedding_test_from_row(row: &PgRow) -> Result<EmbeddingTestRecord, StoreError> {
    let results: Json<serde_json::Value> = row.try_get("results")?;
    Ok(EmbeddingTestRecord {
        id: row.try_get("id")?,
        question: row.try_get("question")?,
        source: row.try_get("source")?,
        results: results.0,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl VectorStore for PostgresStore {
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

        for (passage, embedding) in passages.iter().zip(embeddings) {
            if embedding.len() != passage.dimensions {
                return Err(StoreError::DimensionMismatch {
                    model_id: passage.model_id.clone(),
                    expected: passage.dimensions,
                    got: embedding.len(),
                });
            }
        }

        let models: HashSet<(&str, usize)> = passages
            .iter()
            .map(|passage| (passage.model_id.as_str(), passage.dimensions))
            .collect();
        for (model_id, dimensions) in models {
            if let Some(declared) = self.declared_dimensions(model_id).await? {
                if declared as usize != dimensions {
                    return Err(StoreError::DimensionMismatch {
                        model_id: model_id.to_string(),
                        expected: declared as usize,
                        got: dimensions,
                    });
                }
            }
        }

        let mut tx = self.pool.begin().await?;
        for (passage, embedding) in passages.iter().zip(embeddings) {
            sqlx::query(
                "INSERT INTO passages (id, document_id, seq, text, model_id, dimensions, embedding) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(passage.id)
            .bind(passage.document_id)
            .bind(passage.seq)
            .bind(&passage.text)
            .bind(&passage.model_id)
            .bind(passage.dimensions as i32)
            .bind(Vector::from(embedding.clone()))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        model_id: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedPassage>, StoreError> {
        let rows = sqlx::query(
            "SELECT p.id, p.document_id, d.filename, p.text, \
                    1 - (p.embedding <=> $1) AS similarity \
             FROM passages p \
             JOIN documents d ON d.id = p.document_id \
             WHERE p.model_id = $2 \
             ORDER BY p.embedding <=> $1, p.ord \
             LIMIT $3",
        )
        .bind(Vector::from(query_vector.to_vec()))
        .bind(model_id)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(RetrievedPassage {
                    passage_id: row.try_get("id")?,
                    document_id: row.try_get("document_id")?,
                    filename: row.try_get("filename")?,
                    text: row.try_get("text")?,
                    similarity: row.try_get("similarity")?,
                })
            })
            .collect()
    }

    async fn delete_document_passages(&self, document_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM passages WHERE document_id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PostgresStore {
    async fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (id, filename, filetype, content, checksum, status, uploaded_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(document.id)
        .bind(&document.filename)
        .bind(document.filetype.extension())
        .bind(&document.content)
        .bind(&document.checksum)
        .bind(document.status.as_str())
        .bind(document.uploaded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_document_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE documents SET status = $2 WHERE id = $1")
            .bind(document_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }
        Ok(())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Page<Document>, StoreError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM documents WHERE 1=1");
        push_document_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, filename, filetype, content, checksum, status, uploaded_at \
             FROM documents WHERE 1=1",
        );
        push_document_filters(&mut builder, filter);
        builder.push(" ORDER BY uploaded_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(document_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn delete_document(&self, document_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("document {document_id}")));
        }
        Ok(())
    }

    async fn insert_qa(&self, record: &QaRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO qa_records (id, question, answer, model_id, passage_ids, feedback, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.question)
        .bind(&record.answer)
        .bind(&record.model_id)
        .bind(&record.passage_ids)
        .bind(record.feedback)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_feedback(&self, answer_id: Uuid, is_positive: bool) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE qa_records SET feedback = $2 WHERE id = $1")
            .bind(answer_id)
            .bind(is_positive)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("answer {answer_id}")));
        }
        Ok(())
    }

    async fn qa_history(&self, filter: &QaFilter) -> Result<Page<QaRecord>, StoreError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM qa_records WHERE 1=1");
        push_qa_filters(&mut count_builder, filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, question, answer, model_id, passage_ids, feedback, created_at \
             FROM qa_records WHERE 1=1",
        );
        push_qa_filters(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(filter.limit);
        builder.push(" OFFSET ");
        builder.push_bind(filter.offset);

        let rows = builder.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(qa_record_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }

    async fn delete_qa(&self, record_id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM qa_records WHERE id = $1")
            .bind(record_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("qa record {record_id}")));
        }
        Ok(())
    }

    async fn insert_embedding_test(&self, record: &EmbeddingTestRecord) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO embedding_tests (id, question, source, results, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.id)
        .bind(&record.question)
        .bind(&record.source)
        .bind(Json(&record.results))
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn embedding_test_history(
        &self,
        limit: i64,
    ) -> Result<Vec<EmbeddingTestRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, question, source, results, created_at \
             FROM embedding_tests ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(embedding_test_from_row).collect()
    }

    async fn statistics(&self) -> Result<UsageStatistics, StoreError> {
        let total_documents = self.count("SELECT COUNT(*) FROM documents").await?;
        let pdf = self
            .count("SELECT COUNT(*) FROM documents WHERE filetype = '.pdf'")
            .await?;
        let docx = self
            .count("SELECT COUNT(*) FROM documents WHERE filetype = '.docx'")
            .await?;
        let recent_documents = self
            .count("SELECT COUNT(*) FROM documents WHERE uploaded_at >= now() - interval '7 days'")
            .await?;

        let total_questions = self.count("SELECT COUNT(*) FROM qa_records").await?;
        let positive = self
            .count("SELECT COUNT(*) FROM qa_records WHERE feedback = TRUE")
            .await?;
        let negative = self
            .count("SELECT COUNT(*) FROM qa_records WHERE feedback = FALSE")
            .await?;
        let recent_questions = self
            .count("SELECT COUNT(*) FROM qa_records WHERE created_at >= now() - interval '7 days'")
            .await?;

        Ok(UsageStatistics {
            documents: DocumentStats {
                total: total_documents,
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

impl PostgresStore {
    async fn count(&self, sql: &str) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn push_document_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &DocumentFilter) {
    if let Some(filetype) = filter.filetype {
        builder.push(" AND filetype = ");
        builder.push_bind(filetype.extension());
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND uploaded_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND uploaded_at <= ");
        builder.push_bind(to);
    }
}

fn push_qa_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &QaFilter) {
    if let Some(feedback) = filter.feedback {
        builder.push(" AND feedback = ");
        builder.push_bind(feedback);
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND created_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND created_at <= ");
        builder.push_bind(to);
    }
}
