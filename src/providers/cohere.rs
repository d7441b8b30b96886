use crate::config::ChatConfig;
use crate::providers::traits::ChatProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Reply used when the model answers with empty text.
pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a reply.";

/// Cohere `v1/chat` client.
pub struct CohereProvider {
    base_url: String,
    credential: Option<String>,
    model: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    message: &'a str,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    text: Option<String>,
}

impl CohereProvider {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credential: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client: crate::config::build_upstream_client("chat.cohere", config.timeout_secs, 10),
        }
    }
}

#[async_trait]
impl ChatProvider for CohereProvider {
    fn name(&self) -> &str {
        "cohere"
    }

    fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    async fn reply(&self, message: &str) -> anyhow::Result<String> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            anyhow::anyhow!("Cohere API key not set. Set COHERE_API_KEY or edit config.toml.")
        })?;

        let request = ChatRequest {
            model: &self.model,
            message,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat", self.base_url))
            .header("Authorization", format!("Bearer {credential}"))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(super::api_error("Cohere", response).await);
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response
            .text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer, key: Option<&str>) -> CohereProvider {
        CohereProvider::new(&ChatConfig {
            api_key: key.map(ToString::to_string),
            api_url: format!("{}/", server.uri()),
            ..ChatConfig::default()
        })
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let provider = CohereProvider::new(&ChatConfig {
            api_key: Some("   ".into()),
            ..ChatConfig::default()
        });
        assert!(!provider.has_credential());
    }

    #[tokio::test]
    async fn sends_model_message_and_sampling_settings() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_json(serde_json::json!({
                "model": "command-r",
                "message": "hello there",
                "temperature": 0.7,
                "max_tokens": 300
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"text": "General Kenobi"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider_for(&server, Some("test-key"))
            .reply("hello there")
            .await
            .unwrap();
        assert_eq!(reply, "General Kenobi");
    }

    #[tokio::test]
    async fn empty_text_falls_back_to_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"text": ""})))
            .mount(&server)
            .await;

        let reply = provider_for(&server, Some("k")).reply("hi").await.unwrap();
        assert_eq!(reply, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn upstream_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api token"))
            .mount(&server)
            .await;

        let err = provider_for(&server, Some("k")).reply("hi").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Cohere API error (401"), "{message}");
        assert!(message.contains("invalid api token"), "{message}");
    }

    #[tokio::test]
    async fn missing_key_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        assert!(provider_for(&server, None).reply("hi").await.is_err());
    }
}
