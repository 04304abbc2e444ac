use crate::error::ProviderError;
use crate::providers::openai::{EmbeddingsRequest, EmbeddingsResponse};
use crate::providers::EmbeddingProvider;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Azure OpenAI serves the same embeddings wire format as OpenAI, but
/// routes through a per-deployment URL and authenticates with an
/// `api-key` header instead of a bearer token.
pub struct AzureOpenAiEmbedder {
    client: Client,
    api_key: String,
    url: String,
    model: String,
    dimensions: usize,
}

impl AzureOpenAiEmbedder {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: &str,
        api_version: &str,
        model: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self, ProviderError> {
        let base = Url::parse(endpoint)?;
        let url = format!(
            "{}openai/deployments/{deployment}/embeddings?api-version={api_version}",
            ensure_trailing_slash(base)
        );

        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            url,
            model: model.into(),
            dimensions,
        })
    }
}

pub(crate) fn ensure_trailing_slash(url: Url) -> String {
    let mut rendered = url.to_string();
    if !rendered.ends_with('/') {
        rendered.push('/');
    }
    rendered
}

#[async_trait]
impl EmbeddingProvider for AzureOpenAiEmbedder {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let response = self
            .client
            .post(&self.url)
            .header("api-key", &self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::BackendResponse {
                provider: "azure-openai".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: EmbeddingsResponse = response.json().await?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|row| row.embedding)
            .ok_or_else(|| ProviderError::BackendResponse {
                provider: "azure-openai".to_string(),
                details: "response contained no embedding".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deployment_url_is_built_from_the_endpoint() {
        let embedder = AzureOpenAiEmbedder::new(
            "https://example.openai.azure.com",
            "key",
            "ada-002",
            "2023-05-15",
            "text-embedding-ada-002",
            1536,
        )
        .unwrap();

        assert_eq!(
            embedder.url,
            "https://example.openai.azure.com/openai/deployments/ada-002/embeddings?api-version=2023-05-15"
        );
    }

    #[test]
    fn malformed_endpoint_is_rejected() {
        let result = AzureOpenAiEmbedder::new(
            "not a url",
            "key",
            "ada-002",
            "2023-05-15",
            "text-embedding-ada-002",
            1536,
        );
        assert!(matches!(result, Err(ProviderError::Endpoint(_))));
    }
}
