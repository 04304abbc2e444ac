pub mod chunking;
pub mod compare;
pub mod completion;
pub mod config;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod models;
pub mod providers;
pub mod qa;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_text, normalize_whitespace};
pub use compare::{split_sentences, ModelComparison, SAMPLE_DOCUMENTS};
pub use completion::{
    completion_providers_from_settings, AzureOpenAiCompletion, CompletionProvider,
    OpenAiCompletion,
};
pub use config::Settings;
pub use error::{IngestError, ProviderError, QaError, QaFailure, StoreError};
pub use extract::{extract_text, DocxTextExtractor, PdfTextExtractor, TextExtractor};
pub use ingest::{digest_bytes, DocumentIngestor};
pub use models::{
    ChunkingConfig, Document, DocumentFilter, DocumentStatus, EmbeddingTestRecord, FileKind,
    ModelInfo, Page, Passage, QaFilter, QaRecord, QaStage, RetrievedPassage, UsageStatistics,
};
pub use providers::{
    builtin_local_models, AzureOpenAiEmbedder, CohereEmbedder, EmbeddingProvider,
    EmbeddingRegistry, HashedNgramEmbedder, OpenAiEmbedder, QueryEmbedding, KNOWN_MODELS,
};
pub use qa::{QaOrchestrator, QaOutcome};
pub use stores::{MemoryStore, PostgresStore};
pub use traits::{HistoryStore, VectorStore};
