//! Question answering over a loaded codebase
//!
//! `Sensei` owns one conversation: it trims the history to the token budget,
//! sends the assembled prompt to the completion client, and records the
//! exchange once an answer arrives.

use anyhow::Context;
use tracing::{debug, info};

use super::budget::{self, BudgetLimits, ConversationState, ReduceInfo};
use super::completion::{base_request, merge_options, CompletionClient, RequestOptions};
use super::error::SenseiResult;
use super::finetune::FINE_TUNED_PREAMBLE;
use super::message::Message;
use super::openai::OpenAiClient;
use super::tokenizer::{TiktokenCounter, TokenCounter};
use crate::config::Config;
use crate::index::SourceFile;

/// Result of one `ask`
#[derive(Debug, Clone, PartialEq)]
pub struct AskOutcome {
    pub answer: String,
    /// Tokens in the prompt plus the answer
    pub num_tokens: usize,
    pub reduce_info: ReduceInfo,
}

pub struct Sensei {
    client: Box<dyn CompletionClient>,
    counter: Box<dyn TokenCounter>,
    state: ConversationState,
    base_request: RequestOptions,
}

impl Sensei {
    pub fn new(
        client: Box<dyn CompletionClient>,
        counter: Box<dyn TokenCounter>,
        state: ConversationState,
        base_request: RequestOptions,
    ) -> Self {
        Self {
            client,
            counter,
            state,
            base_request,
        }
    }

    /// Build from configuration, using the OpenAI API and tiktoken.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = OpenAiClient::from_config(&config.openai)?;
        let counter = TiktokenCounter::for_model(&config.model.name)?;
        let limits = BudgetLimits::new(config.budget.max_context_tokens, config.budget.safety_buffer)
            .context("Invalid [budget] configuration")?;
        let preamble = config.conversation.preamble_messages();

        Ok(Self::new(
            Box::new(client),
            Box::new(counter),
            ConversationState::new(preamble, limits),
            base_request(&config.model.name, config.model.temperature),
        ))
    }

    /// Build a session for `ask_with_fine_tuned`. That path never counts
    /// tokens, so the configured model needs no tokenizer encoding.
    pub fn for_fine_tuned(config: &Config) -> anyhow::Result<Self> {
        let client = OpenAiClient::from_config(&config.openai)?;

        Ok(Self::new(
            Box::new(client),
            Box::new(TiktokenCounter::new(&config.model.name)),
            ConversationState::new(Vec::new(), BudgetLimits::default()),
            base_request(&config.model.name, config.model.temperature),
        ))
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Use `files` as the conversation's file context.
    pub fn add_file_context(&mut self, files: &[SourceFile]) {
        self.state.add_file_context(files);
        debug!(files = files.len(), "file context replaced");
    }

    /// Drop trailing files until the base context fits in `max_base_tokens`.
    pub fn truncate_file_context(&mut self, max_base_tokens: usize) -> SenseiResult<usize> {
        self.state
            .truncate_file_context(self.counter.as_ref(), max_base_tokens)
    }

    /// Tokens used by the preamble and file context.
    pub fn base_token_count(&self) -> SenseiResult<usize> {
        budget::base_token_count(&self.state, self.counter.as_ref())
    }

    pub fn clear_history(&mut self) {
        self.state.clear_history();
    }

    /// Ask a question with the file context and as much history as fits.
    ///
    /// Eviction and the new exchange are applied together once the client
    /// has answered; on any error the history is exactly as before the call.
    pub async fn ask(&mut self, question: &str, options: &RequestOptions) -> SenseiResult<AskOutcome> {
        let question = Message::user(question);

        let reduce_info = budget::plan_eviction(
            &self.state,
            self.counter.as_ref(),
            std::slice::from_ref(&question),
        )?;
        let mut messages = budget::assemble_planned_prompt(&self.state, &question, &reduce_info);
        let request = merge_options(&self.base_request, options);

        let answer = self.client.complete(&messages, &request).await?;

        messages.push(answer.clone());
        let num_tokens = self.counter.count_tokens(&messages)?;

        budget::apply_eviction(&mut self.state, &reduce_info);
        let answer_text = answer.content.clone();
        self.state.push_exchange(question, answer);

        info!(
            num_tokens,
            evicted_count = reduce_info.evicted_count,
            evicted_tokens = reduce_info.evicted_tokens,
            "answered question"
        );

        Ok(AskOutcome {
            answer: answer_text,
            num_tokens,
            reduce_info,
        })
    }

    /// Ask a fine-tuned model directly. No file context and no budgeting:
    /// the prompt is a fixed system message, the history and the question.
    pub async fn ask_with_fine_tuned(&mut self, question: &str, model: &str) -> SenseiResult<String> {
        let question = Message::user(question);

        let mut messages = Vec::with_capacity(self.state.history().len() + 2);
        messages.push(Message::system(FINE_TUNED_PREAMBLE));
        messages.extend(self.state.history().iter().cloned());
        messages.push(question.clone());

        let mut overrides = RequestOptions::new();
        overrides.insert("model".to_string(), model.into());
        let request = merge_options(&self.base_request, &overrides);

        let answer = self.client.complete(&messages, &request).await?;
        let answer_text = answer.content.clone();
        self.state.push_exchange(question, answer);

        Ok(answer_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::budget::tests::{words, WordCounter};
    use crate::ai::error::SenseiError;
    use crate::ai::message::Role;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<(Vec<Message>, RequestOptions)>>>;

    /// Replies from a script and records every request
    struct ScriptedClient {
        replies: Mutex<VecDeque<SenseiResult<Message>>>,
        calls: Calls,
    }

    impl ScriptedClient {
        fn new(replies: Vec<SenseiResult<Message>>) -> (Self, Calls) {
            let calls = Calls::default();
            let client = Self {
                replies: Mutex::new(replies.into()),
                calls: calls.clone(),
            };
            (client, calls)
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, messages: &[Message], options: &RequestOptions) -> SenseiResult<Message> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), options.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SenseiError::AnswerMissing))
        }
    }

    fn make_sensei(replies: Vec<SenseiResult<Message>>, hard: usize, buffer: usize) -> (Sensei, Calls) {
        let (client, calls) = ScriptedClient::new(replies);
        let state = ConversationState::new(
            vec![Message::system(words(10))],
            BudgetLimits::new(hard, buffer).unwrap(),
        );
        let sensei = Sensei::new(
            Box::new(client),
            Box::new(WordCounter),
            state,
            base_request("gpt-3.5-turbo", 0.6),
        );
        (sensei, calls)
    }

    #[tokio::test]
    async fn test_ask_records_exchange() {
        let (mut sensei, calls) = make_sensei(vec![Ok(Message::assistant(words(3)))], 100, 10);

        let outcome = sensei.ask(&words(5), &RequestOptions::new()).await.unwrap();

        assert_eq!(outcome.answer, words(3));
        assert_eq!(outcome.num_tokens, 18);
        assert_eq!(outcome.reduce_info, ReduceInfo::default());

        let history = sensei.state().history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.len(), 2);
        assert_eq!(calls[0].1["model"], json!("gpt-3.5-turbo"));
    }

    #[tokio::test]
    async fn test_options_override_base_request() {
        let (mut sensei, calls) = make_sensei(vec![Ok(Message::assistant("ok"))], 100, 10);
        let mut options = RequestOptions::new();
        options.insert("temperature".to_string(), json!(0.8));
        options.insert("presence_penalty".to_string(), json!(0.8));

        sensei.ask("hi", &options).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1["temperature"], json!(0.8));
        assert_eq!(calls[0].1["presence_penalty"], json!(0.8));
        assert_eq!(calls[0].1["model"], json!("gpt-3.5-turbo"));
    }

    #[tokio::test]
    async fn test_history_is_sent_and_evicted() {
        let replies = (0..4).map(|_| Ok(Message::assistant(words(25)))).collect();
        let (mut sensei, calls) = make_sensei(replies, 100, 10);

        for _ in 0..3 {
            sensei.ask(&words(5), &RequestOptions::new()).await.unwrap();
        }
        // 10 + 3 * 30 + 5 = 105 with the next question
        let outcome = sensei.ask(&words(5), &RequestOptions::new()).await.unwrap();

        assert_eq!(outcome.reduce_info.evicted_count, 2);
        assert_eq!(outcome.reduce_info.evicted_tokens, 30);

        let calls = calls.lock().unwrap();
        let last_prompt = &calls[3].0;
        assert_eq!(last_prompt.first().unwrap().role, Role::System);
        assert_eq!(last_prompt.last().unwrap(), &Message::user(words(5)));
        assert_eq!(last_prompt.len(), 1 + 4 + 1);
        assert_eq!(sensei.state().history().len(), 6);
    }

    #[tokio::test]
    async fn test_scenario_d_transport_error_leaves_history() {
        let replies = vec![
            Ok(Message::assistant("first")),
            Err(SenseiError::CompletionTransport {
                status: 500,
                body: "boom".to_string(),
            }),
        ];
        let (mut sensei, _) = make_sensei(replies, 100, 10);

        sensei.ask("one", &RequestOptions::new()).await.unwrap();
        let err = sensei.ask("two", &RequestOptions::new()).await.unwrap_err();

        assert!(matches!(err, SenseiError::CompletionTransport { status: 500, .. }));
        assert_eq!(sensei.state().history().len(), 2);
        assert_eq!(sensei.state().history()[0].content, "one");
    }

    #[tokio::test]
    async fn test_failed_ask_does_not_evict() {
        let replies = vec![
            Ok(Message::assistant(words(40))),
            Err(SenseiError::CompletionRequest("connection reset".to_string())),
        ];
        let (mut sensei, calls) = make_sensei(replies, 100, 10);

        sensei.ask(&words(5), &RequestOptions::new()).await.unwrap();
        // 10 + 45 + 40 > 90, so this call has to evict before sending
        let err = sensei.ask(&words(40), &RequestOptions::new()).await.unwrap_err();

        assert!(matches!(err, SenseiError::CompletionRequest(_)));
        assert_eq!(calls.lock().unwrap()[1].0.len(), 2 + 1);
        assert_eq!(sensei.state().history().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_answer_leaves_history() {
        let (mut sensei, _) = make_sensei(vec![Err(SenseiError::AnswerMissing)], 100, 10);

        let err = sensei.ask("q", &RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, SenseiError::AnswerMissing));
        assert!(sensei.state().history().is_empty());
    }

    #[tokio::test]
    async fn test_budget_exhausted_skips_client() {
        let (mut sensei, calls) = make_sensei(vec![Ok(Message::assistant("never"))], 20, 5);
        sensei.add_file_context(&[SourceFile::new("big.rs".into(), words(20))]);

        let err = sensei.ask("q", &RequestOptions::new()).await.unwrap_err();
        assert!(matches!(err, SenseiError::BudgetExhausted { .. }));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fine_tuned_bypasses_context() {
        let (mut sensei, calls) = make_sensei(vec![Ok(Message::assistant("ft"))], 20, 5);
        sensei.add_file_context(&[SourceFile::new("big.rs".into(), words(50))]);

        let answer = sensei
            .ask_with_fine_tuned("q", "curie:ft-example")
            .await
            .unwrap();
        assert_eq!(answer, "ft");

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0.len(), 2);
        assert_eq!(calls[0].0[0].content, FINE_TUNED_PREAMBLE);
        assert_eq!(calls[0].1["model"], json!("curie:ft-example"));
        assert_eq!(sensei.state().history().len(), 2);
    }

    #[tokio::test]
    async fn test_fine_tuned_session_without_tokenizer() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "from the tuned model"}}]
            })))
            .mount(&mock_server)
            .await;

        std::env::set_var("SENSEI_FINE_TUNE_TEST_KEY", "test-key");
        let mut config = Config::default();
        config.model.name = "my-local-model".to_string();
        config.model.fine_tuned = Some("curie:ft-x".to_string());
        config.openai.api_key_env = "SENSEI_FINE_TUNE_TEST_KEY".to_string();
        config.openai.base_url = mock_server.uri();

        let err = Sensei::from_config(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<SenseiError>(),
            Some(SenseiError::UnsupportedModel(_))
        ));

        let mut sensei = Sensei::for_fine_tuned(&config).unwrap();
        let answer = sensei.ask_with_fine_tuned("hi", "curie:ft-x").await.unwrap();
        assert_eq!(answer, "from the tuned model");

        let requests = mock_server.received_requests().await.unwrap();
        let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(sent["model"], "curie:ft-x");
    }

    #[test]
    fn test_base_token_count() {
        let (mut sensei, _) = make_sensei(Vec::new(), 100, 10);
        sensei.add_file_context(&[SourceFile::new("a.rs".into(), "fn a ( )")]);

        // "File: a.rs, Code: fn a ( )" is 7 words
        assert_eq!(sensei.base_token_count().unwrap(), 17);
    }
}
