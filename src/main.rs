//! Code Sensei - ask questions about your codebase
//!
//! Loads source files as chat context and keeps every request inside the
//! model's context window by forgetting the oldest parts of the conversation.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

mod ai;
mod cli;
mod config;
mod index;
mod ui;

use ai::completion::parse_overrides;
use cli::SourceArgs;

/// Code Sensei - a programming teacher that has read your code
#[derive(Parser)]
#[command(name = "sensei")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ask questions about your codebase", long_about = None)]
struct Cli {
    /// Enable verbose logging and token statistics
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SENSEI_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive session over the loaded files
    Chat {
        #[command(flatten)]
        sources: SourceArgs,

        /// Request parameter overrides, e.g. --set temperature=0.8
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Ask a single question about your codebase
    Ask {
        /// The question to ask
        question: String,

        /// Base directory to load files from
        #[arg(short, long, default_value = ".")]
        dir: String,

        /// Glob matched against file names
        #[arg(short, long)]
        pattern: Option<String>,

        /// Request parameter overrides, e.g. --set temperature=0.8
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,
    },

    /// Show the token count of the file context without calling the API
    Tokens {
        #[command(flatten)]
        sources: SourceArgs,

        /// Show the token count of each file
        #[arg(long)]
        per_file: bool,
    },

    /// Fine-tune a model on your codebase
    #[command(subcommand)]
    FineTune(FineTuneCommands),

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize configuration file
        #[arg(long)]
        init: bool,
    },

    /// Show version and system info
    Info,
}

#[derive(Subcommand)]
enum FineTuneCommands {
    /// Write a JSONL training file from the loaded files
    Prepare {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output file
        #[arg(short, long, default_value = "models/training.jsonl")]
        output: String,
    },

    /// Upload a training file
    Upload {
        /// JSONL file to upload
        file: String,
    },

    /// Start a fine-tuning job
    Create {
        /// Id of the uploaded training file
        training_file: String,

        /// Base model (overrides [model].fine_tune_base)
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Show a fine-tuning job
    Status {
        /// Job id
        id: String,
    },

    /// Chat with a fine-tuned model
    Chat {
        /// Fine-tuned model id (overrides [model].fine_tuned)
        #[arg(short, long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;
    config.verbose = cli.verbose;

    debug!("Code Sensei v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Chat { sources, overrides }) => {
            let options = parse_overrides(overrides.iter().map(String::as_str))?;
            cli::chat::run(config, sources, options).await?;
        }
        Some(Commands::Ask { question, dir, pattern, overrides }) => {
            let options = parse_overrides(overrides.iter().map(String::as_str))?;
            let sources = SourceArgs {
                base_dir: dir,
                target_dir: None,
                pattern,
            };
            cli::ask::run(config, &question, sources, options).await?;
        }
        Some(Commands::Tokens { sources, per_file }) => {
            cli::tokens::run(config, sources, per_file)?;
        }
        Some(Commands::FineTune(command)) => match command {
            FineTuneCommands::Prepare { sources, output } => {
                cli::finetune::prepare(config, sources, &output)?;
            }
            FineTuneCommands::Upload { file } => {
                cli::finetune::upload(config, &file).await?;
            }
            FineTuneCommands::Create { training_file, model } => {
                cli::finetune::create(config, &training_file, model.as_deref()).await?;
            }
            FineTuneCommands::Status { id } => {
                cli::finetune::status(config, &id).await?;
            }
            FineTuneCommands::Chat { model } => {
                cli::finetune::chat(config, model.as_deref()).await?;
            }
        },
        Some(Commands::Config { show, init }) => {
            if init {
                config::init_config()?;
            } else if show {
                config::show_config(&config)?;
            }
        }
        Some(Commands::Info) => {
            cli::info::run(&config)?;
        }
        None => {
            // Default: chat about the current directory
            let sources = SourceArgs {
                base_dir: ".".to_string(),
                target_dir: None,
                pattern: None,
            };
            cli::chat::run(config, sources, ai::RequestOptions::new()).await?;
        }
    }

    Ok(())
}
