//! OpenAI API client
//!
//! Chat completions for the conversation core, plus the file upload and
//! fine-tuning job endpoints used by `sensei fine-tune`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, multipart, Client};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::completion::{CompletionClient, RequestOptions};
use super::error::{SenseiError, SenseiResult};
use super::message::Message;
use crate::config::OpenAiConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API Client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Response from the chat completions endpoint
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: Option<ResponseMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An uploaded file
#[derive(Debug, Deserialize)]
pub struct FileObject {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub bytes: u64,
}

/// A fine-tuning job
#[derive(Debug, Deserialize)]
pub struct FineTuneJob {
    pub id: String,
    pub model: String,
    pub status: String,
    pub training_file: String,
    pub fine_tuned_model: Option<String>,
}

impl ChatCompletionResponse {
    /// First choice as an assistant message.
    pub fn into_answer(self) -> SenseiResult<Message> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or(SenseiError::AnswerMissing)?;
        if let Some(reason) = &choice.finish_reason {
            debug!(finish_reason = %reason, "chat completion finished");
        }
        let content = choice
            .message
            .and_then(|message| message.content)
            .ok_or(SenseiError::AnswerMissing)?;

        Ok(Message::assistant(content))
    }
}

impl OpenAiClient {
    pub fn with_options(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("code-sensei/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from the configured environment variable
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Self::with_options(
            api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Upload a JSONL training file
    pub async fn upload_training_file(&self, path: &Path) -> Result<FileObject> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "training.jsonl".to_string());

        let form = multipart::Form::new()
            .text("purpose", "fine-tune")
            .part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.url("files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to upload training file")?;

        parse_json(response).await
    }

    /// Start a fine-tuning job on an uploaded file
    pub async fn create_fine_tune(&self, training_file: &str, model: &str) -> Result<FineTuneJob> {
        let response = self
            .client
            .post(self.url("fine_tuning/jobs"))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": model,
                "training_file": training_file,
            }))
            .send()
            .await
            .context("Failed to create fine-tuning job")?;

        parse_json(response).await
    }

    /// Look up a fine-tuning job
    pub async fn get_fine_tune(&self, id: &str) -> Result<FineTuneJob> {
        let response = self
            .client
            .get(self.url(&format!("fine_tuning/jobs/{}", id)))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .context("Failed to retrieve fine-tuning job")?;

        parse_json(response).await
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, messages: &[Message], options: &RequestOptions) -> SenseiResult<Message> {
        let body = request_body(messages, options);
        debug!(messages = messages.len(), "sending chat completion request");

        let response = self
            .client
            .post(self.url("chat/completions"))
            .header(header::CONTENT_TYPE, "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SenseiError::CompletionTransport {
                status: status.as_u16(),
                body: pretty_body(&error_text),
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }
        completion.into_answer()
    }
}

/// Request options with the messages added.
fn request_body(messages: &[Message], options: &RequestOptions) -> Value {
    let mut body = options.clone();
    body.insert(
        "messages".to_string(),
        serde_json::to_value(messages).unwrap_or(Value::Array(Vec::new())),
    );
    Value::Object(body)
}

/// Indented JSON when the body parses, the raw text otherwise.
fn pretty_body(text: &str) -> String {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| serde_json::to_string_pretty(&v).ok())
        .unwrap_or_else(|| text.to_string())
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Status: {}, Data: {}", status.as_u16(), pretty_body(&error_text));
    }
    response
        .json()
        .await
        .context("Failed to parse OpenAI response")
}
