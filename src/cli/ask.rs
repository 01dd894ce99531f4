//! Ask command - one question about your codebase

use anyhow::Result;

use super::chat::prepare;
use super::SourceArgs;
use crate::ai::RequestOptions;
use crate::config::Config;
use crate::ui;

pub async fn run(config: Config, question: &str, sources: SourceArgs, options: RequestOptions) -> Result<()> {
    let mut sensei = prepare(&config, &sources)?;

    let pb = ui::spinner("Sensei is thinking...");
    let result = sensei.ask(question, &options).await;
    pb.finish_and_clear();

    let outcome = result?;
    ui::print_ai_message(&outcome.answer);

    if config.verbose {
        ui::print_muted(&format!("Current token count: {}", outcome.num_tokens));
    }

    Ok(())
}
