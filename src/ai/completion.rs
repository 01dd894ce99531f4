//! Completion client seam
//!
//! The conversation core only needs "send these messages, get one assistant
//! message back". Request options are a sparse JSON map layered over a base
//! request; keys are passed through to the API as-is.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::SenseiResult;
use super::message::Message;

/// Request parameters sent alongside the messages (model, temperature, ...)
pub type RequestOptions = Map<String, Value>;

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `messages` and return the assistant's reply.
    async fn complete(&self, messages: &[Message], options: &RequestOptions) -> SenseiResult<Message>;
}

/// Base request for a model and sampling temperature.
pub fn base_request(model: &str, temperature: f64) -> RequestOptions {
    let mut request = RequestOptions::new();
    request.insert("model".to_string(), Value::from(model));
    request.insert("temperature".to_string(), Value::from(temperature));
    request
}

/// `overrides` applied on top of `base`, key by key.
pub fn merge_options(base: &RequestOptions, overrides: &RequestOptions) -> RequestOptions {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Parse `key=value` pairs into request options. Values that parse as JSON
/// keep their type, anything else is sent as a string.
pub fn parse_overrides<'a>(pairs: impl IntoIterator<Item = &'a str>) -> anyhow::Result<RequestOptions> {
    let mut options = RequestOptions::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw));
        options.insert(key.trim().to_string(), value);
    }
    Ok(options)
}
