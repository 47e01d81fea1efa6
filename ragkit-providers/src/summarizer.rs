//! OpenAI-compatible summarizer
//!
//! Drives the page-summary enhancer through a chat-completions endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ragkit_core::enhance::Summarizer;
use ragkit_core::error::{Error, Result};

use crate::HttpConfig;

const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

const SYSTEM_PROMPT: &str = "Summarize the following document page in at most \
200 words. Focus on the core statements and keep concrete names and numbers.";

/// Client for an OpenAI-compatible `/chat/completions` endpoint
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    /// Create a summarizer using `model`
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_URL, api_key, model)
    }

    /// Create a summarizer against a custom endpoint
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url: String = base_url.into();
        Ok(Self {
            client: HttpConfig::inference().build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
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
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::internal(format!(
                "summarizer endpoint returned {}: {}",
                status, detail
            )));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::internal("summarizer returned no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_format() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "page text",
            }],
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], json!("gpt-4o-mini"));
        assert_eq!(value["messages"][0]["role"], json!("user"));
    }

    #[test]
    fn test_response_parsing() {
        let body = json!({
            "choices": [ { "message": { "content": "a summary" } } ]
        });
        let parsed: ChatResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "a summary");
    }
}
