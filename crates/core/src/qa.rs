use crate::completion::CompletionProvider;
use crate::error::{ProviderError, QaError, QaFailure};
use crate::models::{QaRecord, QaStage, RetrievedPassage};
use crate::providers::EmbeddingRegistry;
use crate::traits::{HistoryStore, VectorStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

const SYSTEM_PROMPT: &str =
    "You are an assistant that answers questions accurately using only the supplied documents.";
const NO_MATCH_ANSWER: &str = "No relevant documents were found for this question.";
const CONTEXT_PASSAGES: usize = 3;
const CONTEXT_CHARS: usize = 500;
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct QaOutcome {
    pub record: QaRecord,
    pub passages: Vec<RetrievedPassage>,
}

/// Walks one question through the pipeline:
/// received -> embedding -> retrieving -> generating -> answered.
/// A failure stops the walk and reports the stage it happened in.
pub struct QaOrchestrator<S> {
    store: Arc<S>,
    registry: Arc<EmbeddingRegistry>,
    completions: Vec<Arc<dyn CompletionProvider>>,
    top_k: usize,
}

impl<S> QaOrchestrator<S>
where
    S: VectorStore + HistoryStore,
{
    pub fn new(
        store: Arc<S>,
        registry: Arc<EmbeddingRegistry>,
        completions: Vec<Arc<dyn CompletionProvider>>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            registry,
            completions,
            top_k,
        }
    }

    pub async fn ask(&self, question: &str, model_id: Option<&str>) -> Result<QaOutcome, QaError> {
        let embedded = self
            .registry
            .embed(question, model_id)
            .await
            .map_err(|error| fail(QaStage::Embedding, error.into()))?;

        let passages = self
            .store
            .search(&embedded.vector, &embedded.model_id, self.top_k)
            .await
            .map_err(|error| fail(QaStage::Retrieving, error.into()))?;

        let answer = if passages.is_empty() {
            NO_MATCH_ANSWER.to_string()
        } else {
            self.generate(question, &passages)
                .await
                .map_err(|error| fail(QaStage::Generating, error))?
        };

        let record = QaRecord {
            id: Uuid::new_v4(),
            question: question.to_string(),
            answer,
            model_id: embedded.model_id,
            passage_ids: passages.iter().map(|hit| hit.passage_id).collect(),
            feedback: None,
            created_at: Utc::now(),
        };
        self.store
            .insert_qa(&record)
            .await
            .map_err(|error| fail(QaStage::Generating, error.into()))?;

        Ok(QaOutcome { record, passages })
    }

    async fn generate(
        &self,
        question: &str,
        passages: &[RetrievedPassage],
    ) -> Result<String, QaFailure> {
        if self.completions.is_empty() {
            return Ok(extractive_answer(passages));
        }

        let prompt = build_prompt(question, passages);
        let mut failures = Vec::new();

        for provider in &self.completions {
            match provider.complete(SYSTEM_PROMPT, &prompt).await {
                Ok(answer) => return Ok(answer),
                Err(error) => failures.push(format!("{}: {error}", provider.name())),
            }
        }

        Err(QaFailure::Provider(ProviderError::Exhausted {
            model: "chat-completion".to_string(),
            details: failures.join("; "),
        }))
    }
}

fn fail(stage: QaStage, source: QaFailure) -> QaError {
    QaError { stage, source }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn build_prompt(question: &str, passages: &[RetrievedPassage]) -> String {
    let context = passages
        .iter()
        .take(CONTEXT_PASSAGES)
        .enumerate()
        .map(|(index, hit)| {
            format!(
                "Document {}: {}...",
                index + 1,
                truncate_chars(&hit.text, CONTEXT_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Answer the question using the documents below.\n\n\
         Documents:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

/// Answer used when no completion backend is configured: the retrieved
/// passages themselves, with filenames and similarities.
fn extractive_answer(passages: &[RetrievedPassage]) -> String {
    let listing = passages
        .iter()
        .map(|hit| {
            format!(
                "Document: {}\nSimilarity: {:.3}\nContent: {}...",
                hit.filename,
                hit.similarity,
                truncate_chars(&hit.text, PREVIEW_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("Relevant documents were found:\n\n{listing}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::{QaFilter, QaStage};
    use crate::providers::HashedNgramEmbedder;
    use crate::stores::MemoryStore;
    use crate::traits::HistoryStore;
    use async_trait::async_trait;

    struct FakeCompletion {
        fail: bool,
    }

    #[async_trait]
    impl CompletionProvider for FakeCompletion {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn complete(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
        ) -> Result<String, ProviderError> {
            if self.fail {
                return Err(ProviderError::BackendResponse {
                    provider: "fake".to_string(),
                    details: "503".to_string(),
                });
            }
            Ok(format!("generated from: {}", user_prompt.len()))
        }
    }

    fn registry() -> Arc<EmbeddingRegistry> {
        let mut registry = EmbeddingRegistry::new("local-test");
        registry.register(Arc::new(HashedNgramEmbedder::new("local-test", 64)));
        Arc::new(registry)
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        use crate::models::{Document, DocumentStatus, FileKind, Passage};

        let store = Arc::new(MemoryStore::new());
        let document = Document {
            id: uuid::Uuid::new_v4(),
            filename: "manual.pdf".to_string(),
            filetype: FileKind::Pdf,
            content: "hydraulic pump maintenance".to_string(),
            checksum: "checksum".to_string(),
            status: DocumentStatus::Processed,
            uploaded_at: Utc::now(),
        };
        store.insert_document(&document).await.unwrap();

        let embedder = HashedNgramEmbedder::new("local-test", 64);
        let text = "hydraulic pump maintenance schedule".to_string();
        let passage = Passage {
            id: uuid::Uuid::new_v4(),
            document_id: document.id,
            seq: 0,
            text: text.clone(),
            model_id: "local-test".to_string(),
            dimensions: 64,
        };
        store
            .insert_passages(&[passage], &[embedder.embed_sync(&text)])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn empty_store_yields_the_no_match_answer() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = QaOrchestrator::new(store.clone(), registry(), Vec::new(), 5);

        let outcome = orchestrator.ask("any question at all", None).await.unwrap();
        assert_eq!(outcome.record.answer, NO_MATCH_ANSWER);
        assert!(outcome.passages.is_empty());

        // The record is persisted even for empty retrievals.
        let history = store.qa_history(&QaFilter::default()).await.unwrap();
        assert_eq!(history.items.len(), 1);
    }

    #[tokio::test]
    async fn unknown_model_fails_in_the_embedding_stage() {
        let store = Arc::new(MemoryStore::new());
        let orchestrator = QaOrchestrator::new(store, registry(), Vec::new(), 5);

        let error = orchestrator
            .ask("question", Some("no-such-model"))
            .await
            .unwrap_err();
        assert_eq!(error.stage, QaStage::Embedding);
    }

    #[tokio::test]
    async fn completion_failure_is_reported_at_the_generating_stage() {
        let store = seeded_store().await;
        let orchestrator = QaOrchestrator::new(
            store,
            registry(),
            vec![Arc::new(FakeCompletion { fail: true }) as Arc<dyn CompletionProvider>],
            5,
        );

        let error = orchestrator
            .ask("hydraulic pump maintenance", None)
            .await
            .unwrap_err();
        assert_eq!(error.stage, QaStage::Generating);
    }

    #[tokio::test]
    async fn later_completion_provider_rescues_the_answer() {
        let store = seeded_store().await;
        let orchestrator = QaOrchestrator::new(
            store,
            registry(),
            vec![
                Arc::new(FakeCompletion { fail: true }) as Arc<dyn CompletionProvider>,
                Arc::new(FakeCompletion { fail: false }) as Arc<dyn CompletionProvider>,
            ],
            5,
        );

        let outcome = orchestrator
            .ask("hydraulic pump maintenance", None)
            .await
            .unwrap();
        assert!(outcome.record.answer.starts_with("generated from"));
        assert_eq!(outcome.record.passage_ids.len(), 1);
    }

    #[tokio::test]
    async fn no_completion_backend_degrades_to_passage_listing() {
        let store = seeded_store().await;
        let orchestrator = QaOrchestrator::new(store, registry(), Vec::new(), 5);

        let outcome = orchestrator
            .ask("hydraulic pump maintenance", None)
            .await
            .unwrap();
        assert!(outcome.record.answer.contains("manual.pdf"));
        assert!(outcome.record.answer.contains("Similarity"));
    }
}
