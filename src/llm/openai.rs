use crate::config::{ImageConfig, LlmConfig};
use crate::error::{PodgenError, PodgenResult};
use crate::fetch;
use crate::llm::{ChatMessage, ImageGenerator, TextGenerator};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// OpenAI-compatible chat completion and image generation client.
///
/// Requires `OPENAI_API_KEY` when built with [`OpenAiClient::from_env`].
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    image_size: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, llm: &LlmConfig, image: &ImageConfig) -> Self {
        let agent = fetch::agent(Duration::from_secs(llm.timeout_secs));

        Self {
            agent,
            api_key,
            api_base: llm.api_base.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            image_size: image.size.clone(),
        }
    }

    pub fn from_env(llm: &LlmConfig, image: &ImageConfig) -> PodgenResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PodgenError::Generation(
                "OPENAI_API_KEY env var not set. Get your API key from https://platform.openai.com"
                    .into(),
            )
        })?;

        if api_key.is_empty() {
            return Err(PodgenError::Generation(
                "OPENAI_API_KEY env var is empty".into(),
            ));
        }

        Ok(Self::new(api_key, llm, image))
    }

    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<String, String> {
        let url = format!("{}/{path}", self.api_base);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body.to_string().as_bytes())
            .map_err(|e| format!("request to {url} failed: {e}"))?;

        response
            .into_body()
            .read_to_string()
            .map_err(|e| format!("failed to read response from {url}: {e}"))
    }
}

impl TextGenerator for OpenAiClient {
    fn complete(&self, messages: &[ChatMessage]) -> PodgenResult<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        debug!(
            "Chat completion: model={}, {} message(s)",
            self.model,
            messages.len()
        );

        let raw = self
            .post_json("chat/completions", &body)
            .map_err(PodgenError::Generation)?;
        parse_chat_response(&raw)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl ImageGenerator for OpenAiClient {
    fn generate_image(&self, prompt: &str) -> PodgenResult<String> {
        let body = serde_json::json!({
            "prompt": prompt,
            "n": 1,
            "size": self.image_size,
        });

        debug!("Image generation: size={}", self.image_size);

        let raw = self
            .post_json("images/generations", &body)
            .map_err(PodgenError::Image)?;
        parse_image_response(&raw)
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    url: Option<String>,
}

/// Extract the first choice's text from a `/chat/completions` response body.
fn parse_chat_response(json: &str) -> PodgenResult<String> {
    let parsed: ChatResponse = serde_json::from_str(json)
        .map_err(|e| PodgenError::Generation(format!("unexpected completion payload: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| PodgenError::Generation("completion contained no text".into()))
}

/// Extract the first image URL from an `/images/generations` response body.
fn parse_image_response(json: &str) -> PodgenResult<String> {
    let parsed: ImageResponse = serde_json::from_str(json)
        .map_err(|e| PodgenError::Image(format!("unexpected image payload: {e}")))?;

    parsed
        .data
        .into_iter()
        .find_map(|d| d.url)
        .ok_or_else(|| PodgenError::Image("response contained no image URL".into()))
}
