use docqa_core::{
    CompletionProvider, DocumentIngestor, EmbeddingRegistry, HistoryStore, ModelComparison,
    QaOrchestrator, Settings, VectorStore,
};
use std::sync::Arc;

pub struct AppState<S> {
    pub store: Arc<S>,
    pub registry: Arc<EmbeddingRegistry>,
    pub ingestor: Arc<DocumentIngestor<S>>,
    pub orchestrator: Arc<QaOrchestrator<S>>,
    pub comparison: Arc<ModelComparison>,
    pub settings: Arc<Settings>,
}

// Manual Clone: the store type itself does not need to be Clone.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            registry: Arc::clone(&self.registry),
            ingestor: Arc::clone(&self.ingestor),
            orchestrator: Arc::clone(&self.orchestrator),
            comparison: Arc::clone(&self.comparison),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<S> AppState<S>
where
    S: VectorStore + HistoryStore + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        registry: Arc<EmbeddingRegistry>,
        completions: Vec<Arc<dyn CompletionProvider>>,
        settings: Arc<Settings>,
    ) -> Self {
        let ingestor = Arc::new(DocumentIngestor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            settings.chunking,
            settings.max_file_size,
        ));
        let orchestrator = Arc::new(QaOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            completions,
            settings.top_k,
        ));
        let comparison = Arc::new(ModelComparison::new(Arc::clone(&registry)));

        Self {
            store,
            registry,
            ingestor,
            orchestrator,
            comparison,
            settings,
        }
    }
}
