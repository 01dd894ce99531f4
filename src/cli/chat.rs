//! Interactive chat about a loaded codebase

use anyhow::Result;
use std::io;

use super::{load_sources, SourceArgs};
use crate::ai::{RequestOptions, Sensei};
use crate::config::Config;
use crate::ui::theme::{colors, print_divider, print_prompt, symbols};
use crate::ui::{self, print_ai_message, print_error, print_muted, print_success};

/// Print help information
fn print_help() {
    println!();
    println!(
        "{}{}  Available Commands:{}",
        colors::PRIMARY, colors::BOLD, colors::RESET
    );
    println!("{}  /help{}    - Show this help message", colors::FG, colors::MUTED);
    println!("{}  /clear{}   - Forget past questions and answers", colors::FG, colors::MUTED);
    println!("{}  /tokens{}  - Show the base token count", colors::FG, colors::MUTED);
    println!("{}  /exit{}    - Exit the chat", colors::FG, colors::MUTED);
    println!("{}", colors::RESET);
}

fn print_banner(model: &str) {
    println!();
    println!(
        "{}{}  {} Code Sensei v{} - {}{}",
        colors::AI_ACCENT,
        colors::BOLD,
        symbols::AI_ICON,
        env!("CARGO_PKG_VERSION"),
        model,
        colors::RESET
    );
    print_muted("Commands: /help, /clear, /tokens, /exit");
    print_muted("Press Enter twice to send your question");
    print_divider();
}

/// Read multi-line input from user
fn read_input() -> Option<String> {
    print_prompt();

    let mut lines = Vec::new();

    loop {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {
                let trimmed = line.trim_end();
                if trimmed.is_empty() {
                    if !lines.is_empty() {
                        break;
                    }
                } else {
                    lines.push(trimmed.to_string());
                }
            }
            Err(_) => return None,
        }
    }

    let input = lines.join("\n").trim().to_string();
    if input.is_empty() {
        None
    } else {
        Some(input)
    }
}

/// Build a `Sensei` with the file context loaded and trimmed to the base cap.
pub fn prepare(config: &Config, sources: &SourceArgs) -> Result<Sensei> {
    let files = load_sources(config, sources)?;
    if files.is_empty() {
        ui::print_warning("No files matched; answering without file context");
    } else {
        ui::print_loaded_files(files.iter().map(|f| f.path.as_path()));
    }

    let mut sensei = Sensei::from_config(config)?;
    sensei.add_file_context(&files);

    if let Some(max_base_tokens) = config.budget.max_base_tokens {
        let dropped = sensei.truncate_file_context(max_base_tokens)?;
        if dropped > 0 {
            ui::print_warning(&format!(
                "Dropped {} file(s) to keep the base context under {} tokens",
                dropped, max_base_tokens
            ));
        }
    }

    ui::print_token_count("Base token count", sensei.base_token_count()?);
    Ok(sensei)
}

/// Handle slash commands. `Some(true)` means exit.
fn handle_command(input: &str, sensei: &mut Sensei) -> Option<bool> {
    if !input.starts_with('/') {
        return None;
    }

    match input.to_lowercase().as_str() {
        "/exit" | "/quit" | "/q" => {
            print_success("Goodbye!");
            Some(true)
        }
        "/help" | "/h" | "/?" => {
            print_help();
            Some(false)
        }
        "/clear" | "/c" => {
            sensei.clear_history();
            print_success("Conversation cleared");
            Some(false)
        }
        "/tokens" | "/t" => {
            match sensei.base_token_count() {
                Ok(count) => ui::print_token_count("Base token count", count),
                Err(e) => print_error(&e.to_string()),
            }
            print_muted(&format!(
                "{} past message(s) in the conversation",
                sensei.state().history().len()
            ));
            Some(false)
        }
        _ => {
            print_error(&format!("Unknown command: {}", input));
            print_muted("Type /help for available commands");
            Some(false)
        }
    }
}

/// Main chat loop
pub async fn run(config: Config, sources: SourceArgs, options: RequestOptions) -> Result<()> {
    let mut sensei = prepare(&config, &sources)?;
    print_banner(&config.model.name);

    loop {
        let input = match read_input() {
            Some(i) => i,
            None => {
                println!();
                break;
            }
        };

        if let Some(should_break) = handle_command(&input, &mut sensei) {
            if should_break {
                break;
            }
            continue;
        }

        let pb = ui::spinner("Sensei is thinking...");
        let result = sensei.ask(&input, &options).await;
        pb.finish_and_clear();

        match result {
            Ok(outcome) => {
                print_ai_message(&outcome.answer);
                if config.verbose {
                    print_muted(&format!("Current token count: {}", outcome.num_tokens));
                    print_muted(&format!(
                        "Evicted {} past message(s), {} token(s)",
                        outcome.reduce_info.evicted_count, outcome.reduce_info.evicted_tokens
                    ));
                }
            }
            Err(e) => print_error(&e.to_string()),
        }
    }

    Ok(())
}
