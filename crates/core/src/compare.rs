use crate::error::StoreError;
use crate::models::EmbeddingTestRecord;
use crate::providers::EmbeddingRegistry;
use crate::stores::cosine_similarity;
use crate::traits::HistoryStore;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

const COMPARE_TOP_K: usize = 3;
const MIN_SENTENCES: usize = 3;

/// Candidate set for text-only comparison runs.
pub const SAMPLE_DOCUMENTS: [&str; 5] = [
    "Artificial intelligence is the field of building computer systems that learn and reason.",
    "Machine learning finds patterns in data to make predictions or classifications.",
    "Deep learning uses layered neural networks to learn complex representations.",
    "Natural language processing lets computers understand and generate human language.",
    "Computer vision extracts meaning from images and video.",
];

/// Naive sentence split used for comparison candidates. Falls back to
/// the whole text when it yields too few sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    let sentences: Vec<String> = text
        .split('.')
        .map(|sentence| sentence.trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .collect();

    if sentences.len() < MIN_SENTENCES {
        vec![text.trim().to_string()]
    } else {
        sentences
    }
}

/// Runs the same question against several embedding models and reports
/// each model's top candidates. Per-model failures become error entries
/// in the result instead of failing the whole run, so one unavailable
/// backend never hides the others.
pub struct ModelComparison {
    registry: Arc<EmbeddingRegistry>,
}

impl ModelComparison {
    pub fn new(registry: Arc<EmbeddingRegistry>) -> Self {
        Self { registry }
    }

    pub async fn compare(&self, question: &str, candidates: &[String], model_ids: &[String]) -> Value {
        let mut results = serde_json::Map::new();

        for model_id in model_ids {
            let entry = match self.compare_one(question, candidates, model_id).await {
                Ok(ranked) => json!({ "status": "success", "results": ranked }),
                Err(error) => json!({ "status": "error", "error": error.to_string() }),
            };
            results.insert(model_id.clone(), entry);
        }

        Value::Object(results)
    }

    async fn compare_one(
        &self,
        question: &str,
        candidates: &[String],
        model_id: &str,
    ) -> Result<Vec<Value>, crate::error::ProviderError> {
        // Comparison runs are pinned to the named model; falling back
        // would measure a different backend than the one requested.
        let mut embedded = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            embedded.push(self.registry.embed_with(model_id, candidate).await?);
        }
        let query = self.registry.embed_with(model_id, question).await?;

        let mut ranked: Vec<(usize, f64)> = embedded
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, cosine_similarity(&query, vector)))
            .collect();
        ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

        Ok(ranked
            .into_iter()
            .take(COMPARE_TOP_K)
            .map(|(index, similarity)| {
                json!({
                    "index": index,
                    "content": candidates[index],
                    "similarity": similarity,
                })
            })
            .collect())
    }

    pub async fn run_and_store<S: HistoryStore>(
        &self,
        store: &S,
        question: &str,
        source: &str,
        candidates: &[String],
        model_ids: &[String],
    ) -> Result<EmbeddingTestRecord, StoreError> {
        let results = self.compare(question, candidates, model_ids).await;

        let record = EmbeddingTestRecord {
            id: Uuid::new_v4(),
            question: question.to_string(),
            source: source.to_string(),
            results,
            created_at: Utc::now(),
        };
        store.insert_embedding_test(&record).await?;

        Ok(record)
    }
}
