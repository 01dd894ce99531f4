//! Fine-tune command - train a model on the codebase and chat with it

use anyhow::{Context, Result};
use std::path::Path;

use super::{load_sources, SourceArgs};
use crate::ai::finetune::write_training_file;
use crate::ai::{OpenAiClient, Sensei};
use crate::config::Config;
use crate::ui::{self, print_ai_message, print_error, print_success};

/// Write a JSONL training file from the loaded sources
pub fn prepare(config: Config, sources: SourceArgs, output: &str) -> Result<()> {
    let files = load_sources(&config, &sources)?;
    if files.is_empty() {
        ui::print_warning("No files matched; nothing to write");
        return Ok(());
    }

    let count = write_training_file(Path::new(output), &files)?;
    print_success(&format!("Wrote {} training record(s) to {}", count, output));
    Ok(())
}

pub async fn upload(config: Config, file: &str) -> Result<()> {
    let client = OpenAiClient::from_config(&config.openai)?;

    let pb = ui::spinner("Uploading training file...");
    let result = client.upload_training_file(Path::new(file)).await;
    pb.finish_and_clear();

    let uploaded = result?;
    print_success(&format!(
        "Uploaded {} ({} bytes) as {}",
        uploaded.filename, uploaded.bytes, uploaded.id
    ));
    ui::print_muted(&format!("Next: sensei fine-tune create {}", uploaded.id));
    Ok(())
}

pub async fn create(config: Config, training_file: &str, model: Option<&str>) -> Result<()> {
    let client = OpenAiClient::from_config(&config.openai)?;
    let model = model.unwrap_or(&config.model.fine_tune_base);

    let job = client.create_fine_tune(training_file, model).await?;
    print_success(&format!("Created fine-tuning job {} ({})", job.id, job.status));
    Ok(())
}

pub async fn status(config: Config, id: &str) -> Result<()> {
    let client = OpenAiClient::from_config(&config.openai)?;
    let job = client.get_fine_tune(id).await?;

    println!();
    ui::print_muted(&format!("Job:           {}", job.id));
    ui::print_muted(&format!("Base model:    {}", job.model));
    ui::print_muted(&format!("Training file: {}", job.training_file));
    ui::print_muted(&format!("Status:        {}", job.status));
    if let Some(model) = job.fine_tuned_model {
        print_success(&format!("Fine-tuned model: {}", model));
    }
    Ok(())
}

/// Chat with a fine-tuned model, one line per question
pub async fn chat(config: Config, model: Option<&str>) -> Result<()> {
    let model = model
        .map(str::to_string)
        .or_else(|| config.model.fine_tuned.clone())
        .context("No fine-tuned model given; pass --model or set [model].fine_tuned")?;
    let mut sensei = Sensei::for_fine_tuned(&config)?;

    ui::print_muted(&format!("Chatting with {} (Ctrl-D to exit)", model));

    let mut line = String::new();
    loop {
        ui::theme::print_prompt();
        line.clear();
        if std::io::stdin().read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        match sensei.ask_with_fine_tuned(question, &model).await {
            Ok(answer) => print_ai_message(&answer),
            Err(e) => print_error(&e.to_string()),
        }
    }

    Ok(())
}
