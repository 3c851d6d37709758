use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::{http_client, LlmMetadata, LlmProvider, LlmProviderError};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    response_format: ChatResponseFormat,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponseFormat {
    r#type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

/// Any `/chat/completions` endpoint speaking the OpenAI wire format.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        model: impl Into<String>,
        temperature: f64,
        timeout_secs: u64,
    ) -> Result<Self, LlmProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmProviderError::Config("OpenAI-compatible provider requires an API key".to_string()));
        }
        let model = model.into();
        let base_url = base_url
            .unwrap_or(DEFAULT_OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        info!("OpenAI-compatible provider initialized (model={}, url={})", model, base_url);
        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            client: http_client(timeout_secs)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(system_prompt.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(user_prompt.to_string()),
                },
            ],
            temperature: self.temperature,
            response_format: ChatResponseFormat { r#type: "json_object" },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<ChatResponse>()
            .await?;

        // a null message body reads as an empty JSON object
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmProviderError::Provider("No choices in response".to_string()))?
            .message
            .content
            .unwrap_or_else(|| "{}".to_string());

        let mut metadata = LlmMetadata {
            provider: "openai".to_string(),
            model: self.model.clone(),
            ..Default::default()
        };
        if let Some(usage) = response.usage {
            metadata.tokens_prompt = Some(usage.prompt_tokens);
            metadata.tokens_completion = Some(usage.completion_tokens);
        }

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
