use crate::config::LlmConfig;
use crate::error::{Result, TabletalkError};
use crate::llm::model::{ChatModel, ChatRequest, ChatResponse, Message, Usage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct CompletionBody<'a> {
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// azure openai chat completions client
pub struct AzureOpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                TabletalkError::Configuration(format!("failed to build http client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint, self.config.deployment, self.config.api_version
        )
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiClient {
    fn model_id(&self) -> &str {
        &self.config.deployment
    }

    #[tracing::instrument(skip(self, request), fields(llm.model = %self.config.deployment, message_count = request.messages.len()))]
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = CompletionBody {
            messages: &request.messages,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TabletalkError::Synthesis(format!("model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TabletalkError::Synthesis(format!(
                "model service returned {}: {}",
                status, error_text
            )));
        }

        let reply: CompletionReply = response
            .json()
            .await
            .map_err(|e| TabletalkError::Synthesis(format!("invalid model response: {}", e)))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                TabletalkError::Synthesis("model response contained no choices".to_string())
            })?;

        tracing::debug!(chars = content.len(), "received completion");

        Ok(ChatResponse {
            content,
            usage: reply.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LlmConfig {
        LlmConfig::new(
            Some("https://unit.openai.azure.com".into()),
            Some("key".into()),
        )
        .unwrap()
    }

    #[test]
    fn test_completions_url_layout() {
        let client = AzureOpenAiClient::new(config().with_deployment("gpt-test")).unwrap();
        assert_eq!(
            client.completions_url(),
            "https://unit.openai.azure.com/openai/deployments/gpt-test/chat/completions?api-version=2024-02-15-preview"
        );
        assert_eq!(client.model_id(), "gpt-test");
    }

    #[test]
    fn test_body_serialization() {
        let messages = vec![Message::system("rules"), Message::user("question")];
        let body = CompletionBody {
            messages: &messages,
            temperature: 0.2,
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "question");
    }

    #[test]
    fn test_reply_parsing() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "SELECT 1"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let reply: CompletionReply = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("SELECT 1"));
        assert_eq!(reply.usage.total_tokens, 12);
    }
}
