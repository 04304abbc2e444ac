use crate::error::ProviderError;
use crate::providers::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const COHERE_EMBED_URL: &str = "https://api.cohere.ai/v1/embed";

#[derive(Debug, Serialize)]
struct CohereRequest<'a> {
    model: &'a str,
    texts: Vec<&'a str>,
    input_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CohereResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct CohereEmbedder {
    client: Client,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl CohereEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(COHERE_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&CohereRequest {
                model: &self.model,
                texts: vec![text],
                input_type: "search_document",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                provider: "cohere".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: CohereResponse = response.json().await?;
        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::BackendResponse {
                provider: "cohere".to_string(),
                details: "response contained no embedding".to_string(),
            })
    }
}
