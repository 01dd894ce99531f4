//! Error taxonomy for the conversation core

use thiserror::Error;

pub type SenseiResult<T> = std::result::Result<T, SenseiError>;

#[derive(Debug, Error)]
pub enum SenseiError {
    /// No encoding table is registered for the model
    #[error("No tokenizer encoding is registered for model '{0}'")]
    UnsupportedModel(String),

    /// Fixed context plus the new question exceed the usable budget and no
    /// past conversation is left to evict
    #[error(
        "No past conversations that can be erased ({total} tokens > {usable} usable). \
         Please reduce the number of files to be loaded."
    )]
    BudgetExhausted { total: usize, usable: usize },

    /// The completion API rejected the request
    #[error("Status: {status}, Data: {body}")]
    CompletionTransport { status: u16, body: String },

    /// The request never produced a response
    #[error("Error with completion API request: {0}")]
    CompletionRequest(String),

    #[error("The completion API returned no answer")]
    AnswerMissing,

    #[error(
        "Invalid budget limits: hard ceiling {hard_ceiling} must exceed safety buffer \
         {safety_buffer}, and the buffer must be positive"
    )]
    InvalidLimits {
        hard_ceiling: usize,
        safety_buffer: usize,
    },
}

impl From<reqwest::Error> for SenseiError {
    fn from(err: reqwest::Error) -> Self {
        SenseiError::CompletionRequest(err.to_string())
    }
}
