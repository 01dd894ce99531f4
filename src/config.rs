//! Configuration management for Code Sensei

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ai::budget::{DEFAULT_HARD_CEILING, DEFAULT_SAFETY_BUFFER};
use crate::ai::openai::DEFAULT_BASE_URL;
use crate::ai::Message;

const DEFAULT_PREAMBLE: &str = "You are a programming teacher. The user will ask questions about code; \
answer them. The code you know is as follows.";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub budget: BudgetConfig,
    pub openai: OpenAiConfig,
    pub files: FilesConfig,
    pub conversation: ConversationConfig,
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Chat model, also selects the tokenizer encoding
    pub name: String,
    pub temperature: f64,
    /// Model used by `fine-tune chat`
    pub fine_tuned: Option<String>,
    /// Base model for new fine-tuning jobs
    pub fine_tune_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub max_context_tokens: usize,
    pub safety_buffer: usize,
    /// Drop trailing files until preamble + files fit in this many tokens
    pub max_base_tokens: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key_env: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Gitignore-style patterns skipped in addition to `.gitignore`
    pub ignore_patterns: Vec<String>,
    /// Glob matched against file names
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// System messages sent before the file context
    pub preamble: Vec<String>,
}

impl ConversationConfig {
    pub fn preamble_messages(&self) -> Vec<Message> {
        self.preamble.iter().map(Message::system).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            budget: BudgetConfig::default(),
            openai: OpenAiConfig::default(),
            files: FilesConfig::default(),
            conversation: ConversationConfig::default(),
            verbose: false,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gpt-3.5-turbo".to_string(),
            temperature: 0.6,
            fine_tuned: None,
            fine_tune_base: "davinci-002".to_string(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: DEFAULT_HARD_CEILING,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
            max_base_tokens: None,
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                ".git".to_string(),
                ".idea".to_string(),
                "package-lock.json".to_string(),
            ],
            pattern: "*".to_string(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            preamble: vec![DEFAULT_PREAMBLE.to_string()],
        }
    }
}

/// Get the configuration file path
fn config_path() -> Result<PathBuf> {
    let config_dir = directories::ProjectDirs::from("dev", "sensei", "code-sensei")
        .context("Failed to determine config directory")?
        .config_dir()
        .to_path_buf();

    Ok(config_dir.join("config.toml"))
}

/// Config directory for display
pub fn config_dir() -> String {
    directories::ProjectDirs::from("dev", "sensei", "code-sensei")
        .map(|p| p.config_dir().to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Load configuration from file or use defaults
pub fn load_config(custom_path: Option<&str>) -> Result<Config> {
    let path = if let Some(p) = custom_path {
        PathBuf::from(p)
    } else {
        config_path()?
    };

    if path.exists() {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    } else {
        Ok(Config::default())
    }
}

/// Initialize configuration file with defaults
pub fn init_config() -> Result<()> {
    let path = config_path()?;

    if path.exists() {
        println!("Configuration file already exists at {:?}", path);
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let content = toml::to_string_pretty(&Config::default())
        .context("Failed to serialize default config")?;

    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config to {:?}", path))?;

    println!("Configuration initialized at {:?}", path);
    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .context("Failed to serialize config")?;
    println!("{}", content);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [model]
            name = "gpt-4"

            [budget]
            max_context_tokens = 8192
            "#,
        )
        .unwrap();

        assert_eq!(config.model.name, "gpt-4");
        assert_eq!(config.model.temperature, 0.6);
        assert_eq!(config.budget.max_context_tokens, 8192);
        assert_eq!(config.budget.safety_buffer, 400);
        assert_eq!(config.files.pattern, "*");
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.conversation.preamble, vec![DEFAULT_PREAMBLE.to_string()]);
        assert_eq!(parsed.files.ignore_patterns.len(), 3);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_persona_preamble() {
        let config: Config = toml::from_str(
            r#"
            [conversation]
            preamble = ["You are a cheerful character.", "Always answer in rhymes."]
            "#,
        )
        .unwrap();

        let messages = config.conversation.preamble_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], Message::system("Always answer in rhymes."));
    }
}
