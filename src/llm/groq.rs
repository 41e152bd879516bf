use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::core::errors::GenerationError;
use super::provider::GenerationProvider;
use super::types::GenerationRequest;

/// Client for Groq's OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct GroqProvider {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    client: Client,
}

impl GroqProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl GenerationProvider for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::Auth);
        };

        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": request.model_id,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "top_p": request.top_p,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Provider(err.to_string())
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GenerationError::Auth,
                StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimit,
                _ => GenerationError::Provider(format!("{}: {}", status, detail)),
            });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|err| GenerationError::Provider(err.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .trim()
            .to_string();

        if content.is_empty() {
            return Err(GenerationError::Empty);
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_api_key_is_auth_error() {
        let provider = GroqProvider::new(
            "https://api.groq.com/openai/v1".to_string(),
            None,
            Duration::from_secs(5),
        );
        let request = GenerationRequest {
            prompt: "oi".to_string(),
            model_id: "test".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 16,
        };

        let result = provider.generate(request).await;
        assert!(matches!(result, Err(GenerationError::Auth)));
    }
}
