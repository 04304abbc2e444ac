mod azure;
mod cohere;
mod local;
mod openai;

pub use azure::AzureOpenAiEmbedder;
pub(crate) use azure::ensure_trailing_slash;
pub use cohere::CohereEmbedder;
pub use local::{builtin_local_models, HashedNgramEmbedder};
pub use openai::OpenAiEmbedder;

use crate::config::Settings;
use crate::error::ProviderError;
use crate::models::ModelInfo;
use async_trait::async_trait;
use std::sync::Arc;

/// Known model ids and their declared dimensionality, whether or not the
/// backing provider is configured in this process.
pub const KNOWN_MODELS: [(&str, usize); 5] = [
    ("text-embedding-ada-002", 1536),
    ("cohere-embed-v3", 1024),
    ("BAAI/bge-large-en-v1.5", 1024),
    ("BAAI/bge-base-en-v1.5", 768),
    ("sentence-transformers/all-MiniLM-L6-v2", 384),
];

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn model_id(&self) -> &str;

    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

#[derive(Debug, Clone)]
pub struct QueryEmbedding {
    pub vector: Vec<f32>,
    pub model_id: String,
}

/// Owns the configured embedding backends and applies the fallback
/// policy: the requested model first, then the remaining providers in
/// registration order. Local models register last so they are the final
/// resort.
pub struct EmbeddingRegistry {
    providers: Vec<Arc<dyn EmbeddingProvider>>,
    default_model: String,
}

impl EmbeddingRegistry {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            providers: Vec::new(),
            default_model: default_model.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new(&settings.default_embedding_model);

        if let Some(api_key) = &settings.openai_api_key {
            registry.register(Arc::new(OpenAiEmbedder::new(
                api_key.clone(),
                "text-embedding-ada-002",
                1536,
            )));
        }

        if let (Some(api_key), Some(endpoint)) = (
            &settings.azure_openai_api_key,
            &settings.azure_openai_endpoint,
        ) {
            if let Ok(embedder) = AzureOpenAiEmbedder::new(
                endpoint,
                api_key.clone(),
                &settings.azure_openai_embedding_deployment,
                &settings.azure_openai_api_version,
                "text-embedding-ada-002",
                1536,
            ) {
                registry.register(Arc::new(embedder));
            }
        }

        if let Some(api_key) = &settings.cohere_api_key {
            registry.register(Arc::new(CohereEmbedder::new(
                api_key.clone(),
                "cohere-embed-v3",
                1024,
            )));
        }

        for model in builtin_local_models() {
            registry.register(Arc::new(model));
        }

        registry
    }

    pub fn register(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        // A reconfigured model id replaces the earlier registration.
        self.providers
            .retain(|existing| existing.model_id() != provider.model_id());
        self.providers.push(provider);
    }

    pub fn get(&self, model_id: &str) -> Option<&Arc<dyn EmbeddingProvider>> {
        self.providers
            .iter()
            .find(|provider| provider.model_id() == model_id)
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn available_models(&self) -> Vec<ModelInfo> {
        let mut models: Vec<ModelInfo> = self
            .providers
            .iter()
            .map(|provider| ModelInfo {
                model_id: provider.model_id().to_string(),
                dimensions: provider.dimensions(),
                available: true,
            })
            .collect();

        for (model_id, dimensions) in KNOWN_MODELS {
            if !models.iter().any(|info| info.model_id == model_id) {
                models.push(ModelInfo {
                    model_id: model_id.to_string(),
                    dimensions,
                    available: false,
                });
            }
        }

        models
    }

    /// Embeds with exactly the named model; no fallback. Used wherever a
    /// model has already been pinned, such as the later chunks of a
    /// document or an explicit comparison run.
    pub async fn embed_with(&self, model_id: &str, text: &str) -> Result<Vec<f32>, ProviderError> {
        let provider = self
            .get(model_id)
            .ok_or_else(|| ProviderError::UnknownModel(model_id.to_string()))?;

        let vector = provider.embed(text).await?;
        if vector.len() != provider.dimensions() {
            return Err(ProviderError::BackendResponse {
                provider: model_id.to_string(),
                details: format!(
                    "returned {} dimensions, declared {}",
                    vector.len(),
                    provider.dimensions()
                ),
            });
        }

        Ok(vector)
    }

    /// Embeds with the requested model (or the default), falling back to
    /// the remaining providers in registration order when a backend
    /// fails. The model actually used is returned with the vector.
    pub async fn embed(
        &self,
        text: &str,
        model_id: Option<&str>,
    ) -> Result<QueryEmbedding, ProviderError> {
        let requested = model_id.unwrap_or(&self.default_model);
        if self.get(requested).is_none() {
            return Err(ProviderError::UnknownModel(requested.to_string()));
        }

        let mut failures = Vec::new();

        match self.embed_with(requested, text).await {
            Ok(vector) => {
                return Ok(QueryEmbedding {
                    vector,
                    model_id: requested.to_string(),
                })
            }
            Err(error) => failures.push(format!("{requested}: {error}")),
        }

        for provider in &self.providers {
            if provider.model_id() == requested {
                continue;
            }
            match self.embed_with(provider.model_id(), text).await {
                Ok(vector) => {
                    return Ok(QueryEmbedding {
                        vector,
                        model_id: provider.model_id().to_string(),
                    })
                }
                Err(error) => failures.push(format!("{}: {error}", provider.model_id())),
            }
        }

        Err(ProviderError::Exhausted {
            model: requested.to_string(),
            details: failures.join("; "),
        })
    }
}
