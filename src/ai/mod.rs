//! Conversation core and AI provider integration

pub mod budget;
pub mod completion;
pub mod error;
pub mod finetune;
pub mod message;
pub mod openai;
pub mod sensei;
pub mod tokenizer;

pub use completion::RequestOptions;
pub use message::Message;
pub use openai::OpenAiClient;
pub use sensei::Sensei;
