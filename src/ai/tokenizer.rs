//! Token counting for chat messages
//!
//! Counts are exact for the configured model's BPE encoding. The encoder is
//! loaded per call and dropped before returning, so no encoder state is kept
//! between calls or shared across threads.

use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use super::error::{SenseiError, SenseiResult};
use super::message::Message;

/// Anything that can size a set of messages in tokens.
pub trait TokenCounter: Send + Sync {
    /// Sum of the token counts of each message's content.
    fn count_tokens(&self, messages: &[Message]) -> SenseiResult<usize>;

    /// Token count of each message, in order.
    fn count_each(&self, messages: &[Message]) -> SenseiResult<Vec<usize>> {
        messages
            .iter()
            .map(|m| self.count_tokens(std::slice::from_ref(m)))
            .collect()
    }
}

/// Exact counter backed by tiktoken encodings
#[derive(Debug, Clone)]
pub struct TiktokenCounter {
    model: String,
}

impl TiktokenCounter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    /// Build a counter, failing early if the model has no encoding.
    pub fn for_model(model: impl Into<String>) -> SenseiResult<Self> {
        let counter = Self::new(model);
        counter.encoder()?;
        Ok(counter)
    }

    fn encoder(&self) -> SenseiResult<CoreBPE> {
        get_bpe_from_model(&self.model)
            .map_err(|_| SenseiError::UnsupportedModel(self.model.clone()))
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, messages: &[Message]) -> SenseiResult<usize> {
        let encoder = self.encoder()?;
        Ok(messages
            .iter()
            .map(|m| encoder.encode_ordinary(&m.content).len())
            .sum())
    }

    fn count_each(&self, messages: &[Message]) -> SenseiResult<Vec<usize>> {
        let encoder = self.encoder()?;
        Ok(messages
            .iter()
            .map(|m| encoder.encode_ordinary(&m.content).len())
            .collect())
    }
}
