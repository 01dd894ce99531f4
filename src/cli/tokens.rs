//! Tokens command - size the file context without calling the API

use anyhow::{Context, Result};

use super::{load_sources, SourceArgs};
use crate::ai::budget::{self, BudgetLimits, ConversationState};
use crate::ai::tokenizer::{TiktokenCounter, TokenCounter};
use crate::config::Config;
use crate::ui::{self, theme::colors};

pub fn run(config: Config, sources: SourceArgs, per_file: bool) -> Result<()> {
    let files = load_sources(&config, &sources)?;
    let counter = TiktokenCounter::for_model(&config.model.name)?;
    let limits = BudgetLimits::new(config.budget.max_context_tokens, config.budget.safety_buffer)
        .context("Invalid [budget] configuration")?;

    let mut state = ConversationState::new(config.conversation.preamble_messages(), limits);
    state.add_file_context(&files);

    if per_file {
        let sizes = counter.count_each(state.file_context())?;
        println!();
        for (file, size) in files.iter().zip(sizes) {
            println!(
                "{}  {:>7}{}  {}",
                colors::AI_ACCENT, size, colors::RESET, file.path.display()
            );
        }
    } else {
        ui::print_loaded_files(files.iter().map(|f| f.path.as_path()));
    }

    let base = budget::base_token_count(&state, &counter)?;
    ui::print_token_count("Base token count", base);
    ui::print_muted(&format!(
        "Usable budget: {} ({} - {} buffer)",
        limits.usable(),
        limits.hard_ceiling(),
        limits.safety_buffer()
    ));

    if base > limits.usable() {
        ui::print_warning("The file context alone exceeds the budget; load fewer files");
    }

    Ok(())
}
