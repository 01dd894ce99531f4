//! Info command - show version, configuration and API key status

use anyhow::Result;

use crate::ai::tokenizer::TiktokenCounter;
use crate::config::{self, Config};

pub fn run(config: &Config) -> Result<()> {
    println!("Code Sensei v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("System Information:");
    println!("  OS: {} {}", std::env::consts::OS, std::env::consts::ARCH);

    println!();
    println!("Configuration:");
    println!("  Config dir: {}", config::config_dir());
    println!("  Model: {} ({})", config.model.name, tokenizer_status(&config.model.name));
    println!(
        "  Budget: {} tokens, {} buffer",
        config.budget.max_context_tokens, config.budget.safety_buffer
    );

    println!();
    println!("API:");
    println!("  Endpoint: {}", config.openai.base_url);
    check_api_key(&config.openai.api_key_env);

    Ok(())
}

fn tokenizer_status(model: &str) -> &'static str {
    if TiktokenCounter::for_model(model).is_ok() {
        "tokenizer available"
    } else {
        "no tokenizer"
    }
}

fn check_api_key(env_var: &str) {
    let status = if std::env::var(env_var).is_ok() {
        "configured"
    } else {
        "not configured"
    };
    println!("  {}: {}", env_var, status);
}
