use crate::config::Settings;
use crate::error::ProviderError;
use crate::providers::ensure_trailing_slash;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_CHAT_MODEL: &str = "gpt-3.5-turbo";
const MAX_COMPLETION_TOKENS: usize = 500;
const TEMPERATURE: f32 = 0.7;

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

async fn post_chat(
    request: reqwest::RequestBuilder,
    provider: &str,
    body: &ChatRequest<'_>,
) -> Result<String, ProviderError> {
    let response = request.json(body).send().await?;

    if !response.status().is_success() {
        return Err(ProviderError::BackendResponse {
            provider: provider.to_string(),
            details: response.status().to_string(),
        });
    }

    let parsed: ChatResponse = response.json().await?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::BackendResponse {
            provider: provider.to_string(),
            details: "response contained no choices".to_string(),
        })
}

pub struct OpenAiCompletion {
    client: Client,
    api_key: String,
    model: String,
}

impl OpenAiCompletion {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletion {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let request = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key);
        post_chat(request, self.name(), &body).await
    }
}

pub struct AzureOpenAiCompletion {
    client: Client,
    api_key: String,
    url: String,
    deployment: String,
}

impl AzureOpenAiCompletion {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
        api_version: &str,
    ) -> Result<Self, ProviderError> {
        let deployment = deployment.into();
        let base = Url::parse(endpoint)?;
        let url = format!(
            "{}openai/deployments/{deployment}/chat/completions?api-version={api_version}",
            ensure_trailing_slash(base)
        );

        Ok(Self {
            client: Client::new(),
            api_key: api_key.into(),
            url,
            deployment,
        })
    }
}

#[async_trait]
impl CompletionProvider for AzureOpenAiCompletion {
    fn name(&self) -> &'static str {
        "azure-openai"
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.deployment,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let request = self.client.post(&self.url).header("api-key", &self.api_key);
        post_chat(request, self.name(), &body).await
    }
}

/// Azure first, plain OpenAI second. An empty list means answers degrade
/// to an extractive listing of the retrieved passages.
pub fn completion_providers_from_settings(settings: &Settings) -> Vec<Arc<dyn CompletionProvider>> {
    let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

    if let (Some(api_key), Some(endpoint)) = (
        &settings.azure_openai_api_key,
        &settings.azure_openai_endpoint,
    ) {
        if let Ok(provider) = AzureOpenAiCompletion::new(
            endpoint,
            api_key.clone(),
            settings.azure_openai_chat_deployment.clone(),
            &settings.azure_openai_api_version,
        ) {
            providers.push(Arc::new(provider));
        }
    }

    if let Some(api_key) = &settings.openai_api_key {
        providers.push(Arc::new(OpenAiCompletion::new(
            api_key.clone(),
            DEFAULT_OPENAI_CHAT_MODEL,
        )));
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn azure_completion_url_targets_the_deployment() {
        let provider = AzureOpenAiCompletion::new(
            "https://example.openai.azure.com/",
            "key",
            "gpt-35-turbo",
            "2023-05-15",
        )
        .unwrap();

        assert_eq!(
            provider.url,
            "https://example.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2023-05-15"
        );
    }

    #[test]
    fn provider_ordering_prefers_azure() {
        let settings = Settings {
            openai_api_key: Some("sk-test".to_string()),
            azure_openai_api_key: Some("azure-key".to_string()),
            azure_openai_endpoint: Some("https://example.openai.azure.com".to_string()),
            ..Settings::default()
        };

        let providers = completion_providers_from_settings(&settings);
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].name(), "azure-openai");
        assert_eq!(providers[1].name(), "openai");
    }
}
