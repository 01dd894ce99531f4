//! Conversation context budgeting
//!
//! Keeps the prompt sent to the completion API inside the model's context
//! window. The prompt is always laid out as
//! `preamble ++ file context ++ history ++ question`; when it does not fit,
//! the oldest history messages are evicted one at a time until it does.

use std::collections::VecDeque;

use tracing::debug;

use super::error::{SenseiError, SenseiResult};
use super::message::Message;
use super::tokenizer::TokenCounter;
use crate::index::SourceFile;

/// Context window of gpt-3.5-turbo
pub const DEFAULT_HARD_CEILING: usize = 4096;

/// Room kept free so the prompt never touches the ceiling
pub const DEFAULT_SAFETY_BUFFER: usize = 400;

/// Token limits for a conversation. `hard_ceiling > safety_buffer > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetLimits {
    hard_ceiling: usize,
    safety_buffer: usize,
}

impl BudgetLimits {
    pub fn new(hard_ceiling: usize, safety_buffer: usize) -> SenseiResult<Self> {
        if safety_buffer == 0 || hard_ceiling <= safety_buffer {
            return Err(SenseiError::InvalidLimits {
                hard_ceiling,
                safety_buffer,
            });
        }
        Ok(Self {
            hard_ceiling,
            safety_buffer,
        })
    }

    pub fn hard_ceiling(&self) -> usize {
        self.hard_ceiling
    }

    pub fn safety_buffer(&self) -> usize {
        self.safety_buffer
    }

    /// Tokens available to the assembled prompt
    pub fn usable(&self) -> usize {
        self.hard_ceiling - self.safety_buffer
    }
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            hard_ceiling: DEFAULT_HARD_CEILING,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
        }
    }
}

/// What an eviction pass removed from the history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReduceInfo {
    pub evicted_count: usize,
    pub evicted_tokens: usize,
}

/// Everything that goes into one conversation's prompts
#[derive(Debug, Clone)]
pub struct ConversationState {
    preamble: Vec<Message>,
    file_context: Vec<Message>,
    history: VecDeque<Message>,
    limits: BudgetLimits,
}

impl ConversationState {
    pub fn new(preamble: Vec<Message>, limits: BudgetLimits) -> Self {
        Self {
            preamble,
            file_context: Vec::new(),
            history: VecDeque::new(),
            limits,
        }
    }

    pub fn file_context(&self) -> &[Message] {
        &self.file_context
    }

    pub fn history(&self) -> &VecDeque<Message> {
        &self.history
    }

    /// Replace the file context with one system message per source file.
    pub fn add_file_context(&mut self, files: &[SourceFile]) {
        self.file_context = files.iter().map(file_message).collect();
    }

    /// Append a completed exchange. Both halves land or neither does.
    pub fn push_exchange(&mut self, question: Message, answer: Message) {
        self.history.reserve(2);
        self.history.push_back(question);
        self.history.push_back(answer);
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Drop trailing file-context entries until the base count is at most
    /// `max_base_tokens`. Returns how many entries were dropped.
    pub fn truncate_file_context(
        &mut self,
        counter: &dyn TokenCounter,
        max_base_tokens: usize,
    ) -> SenseiResult<usize> {
        let mut base = base_token_count(self, counter)?;
        let sizes = counter.count_each(&self.file_context)?;
        let mut dropped = 0;

        for size in sizes.iter().rev() {
            if base <= max_base_tokens {
                break;
            }
            self.file_context.pop();
            base -= size;
            dropped += 1;
        }

        Ok(dropped)
    }
}

/// Message content for one source file
pub fn file_message(file: &SourceFile) -> Message {
    Message::system(format!("File: {}, Code: {}", file.path.display(), file.body))
}

/// Tokens taken by the preamble and file context together.
pub fn base_token_count(state: &ConversationState, counter: &dyn TokenCounter) -> SenseiResult<usize> {
    Ok(counter.count_tokens(&state.preamble)? + counter.count_tokens(&state.file_context)?)
}

/// Work out how many of the oldest history messages must go for the fixed
/// context, the history and `additional` to fit in the usable budget.
///
/// Does not touch the state. Fails with [`SenseiError::BudgetExhausted`] when
/// evicting the whole history is still not enough.
pub fn plan_eviction(
    state: &ConversationState,
    counter: &dyn TokenCounter,
    additional: &[Message],
) -> SenseiResult<ReduceInfo> {
    let base_tokens = base_token_count(state, counter)?;
    let additional_tokens = counter.count_tokens(additional)?;
    let history: Vec<Message> = state.history.iter().cloned().collect();
    let history_sizes = counter.count_each(&history)?;
    let history_tokens: usize = history_sizes.iter().sum();
    let usable = state.limits.usable();

    let mut total = base_tokens + history_tokens + additional_tokens;
    let mut info = ReduceInfo::default();
    let mut sizes = history_sizes.into_iter();

    while total > usable {
        let Some(size) = sizes.next() else {
            debug!(total, usable, "history exhausted before prompt fit");
            return Err(SenseiError::BudgetExhausted { total, usable });
        };
        total -= size;
        info.evicted_count += 1;
        info.evicted_tokens += size;
    }

    debug!(
        base_tokens,
        history_tokens,
        additional_tokens,
        total_tokens = base_tokens + history_tokens + additional_tokens,
        history_len = state.history.len(),
        evicted_count = info.evicted_count,
        evicted_tokens = info.evicted_tokens,
        "planned history eviction"
    );

    Ok(info)
}

/// Remove the messages a plan selected, oldest first.
pub fn apply_eviction(state: &mut ConversationState, plan: &ReduceInfo) {
    let count = plan.evicted_count.min(state.history.len());
    state.history.drain(..count);
}

/// Evict the oldest history messages until the fixed context, the history and
/// `additional` fit in the usable budget.
///
/// Already fitting is a no-op returning `ReduceInfo::default()`. On
/// [`SenseiError::BudgetExhausted`] the history is left untouched.
#[allow(dead_code)]
pub fn reduce_to_fit(
    state: &mut ConversationState,
    counter: &dyn TokenCounter,
    additional: &[Message],
) -> SenseiResult<ReduceInfo> {
    let plan = plan_eviction(state, counter, additional)?;
    apply_eviction(state, &plan);
    Ok(plan)
}

/// Full prompt for `question` in the fixed order preamble, file context,
/// history, question.
#[allow(dead_code)]
pub fn assemble_prompt(state: &ConversationState, question: &Message) -> Vec<Message> {
    assemble_planned_prompt(state, question, &ReduceInfo::default())
}

/// Like [`assemble_prompt`], leaving out the history messages `plan` would
/// evict.
pub fn assemble_planned_prompt(
    state: &ConversationState,
    question: &Message,
    plan: &ReduceInfo,
) -> Vec<Message> {
    let kept = state.history.len().saturating_sub(plan.evicted_count);
    let mut prompt =
        Vec::with_capacity(state.preamble.len() + state.file_context.len() + kept + 1);
    prompt.extend(state.preamble.iter().cloned());
    prompt.extend(state.file_context.iter().cloned());
    prompt.extend(state.history.iter().skip(plan.evicted_count).cloned());
    prompt.push(question.clone());
    prompt
}
