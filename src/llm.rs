use crate::config::LlmConfig;
use crate::error::{BrdError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// String-in, string-out text generation.
pub trait TextGenerator {
    /// Identifies the backing model; part of the memo key.
    fn model(&self) -> &str;

    fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for OpenAI-compatible `/chat/completions` endpoints
/// (Groq, OpenAI, Azure-style gateways).
pub struct ChatCompletionClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrdError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }
}

impl TextGenerator for ChatCompletionClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };
        debug!("POST {} ({} prompt chars)", self.endpoint, prompt.len());
        let started = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| BrdError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BrdError::Llm(format!("API returned {status}: {}", truncate(&body, 300))));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| BrdError::Llm(format!("unexpected response body: {e}")))?;
        let text = extract_content(parsed)?;
        info!(
            "LLM {} answered {} chars in {} ms",
            self.model,
            text.len(),
            started.elapsed().as_millis()
        );
        Ok(text)
    }
}

fn extract_content(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| BrdError::Llm("response contained no message content".to_string()))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
