//! Terminal styling shared by the CLI commands

use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

/// ANSI color codes from the design system
pub mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const PRIMARY: &str = "\x1b[38;2;100;181;246m";      // #64B5F6
    pub const SUCCESS: &str = "\x1b[38;2;165;214;167m";      // #A5D6A7
    pub const WARNING: &str = "\x1b[38;2;255;245;157m";      // #FFF59D
    pub const ERROR: &str = "\x1b[38;2;239;154;154m";        // #EF9A9A
    pub const AI_ACCENT: &str = "\x1b[38;2;255;202;40m";     // #FFCA28
    pub const MUTED: &str = "\x1b[38;2;84;110;122m";         // #546E7A
    pub const FG: &str = "\x1b[38;2;212;212;215m";           // #D4D4D7
}

pub mod symbols {
    pub const AI_ICON: &str = "󰌤";
    pub const USER_ICON: &str = ">";
    pub const FILE: &str = "";
    pub const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    pub const SUCCESS: &str = "󰄂";
    pub const WARNING: &str = "⚠";
    pub const ERROR: &str = "󰅚";
    pub const DIVIDER: &str = "─";
}

/// Spinner shown while something slow runs
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg:.dim}") {
        pb.set_style(style.tick_strings(&symbols::SPINNER));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn print_divider() {
    println!(
        "{}{}{}",
        colors::MUTED,
        symbols::DIVIDER.repeat(55),
        colors::RESET
    );
}

/// Print the files that make up the context
pub fn print_loaded_files<'a>(paths: impl IntoIterator<Item = &'a std::path::Path>) {
    println!(
        "\n{}{}  Loaded files:{}",
        colors::PRIMARY, colors::BOLD, colors::RESET
    );
    for path in paths {
        println!(
            "{}  {} {}{}{}",
            colors::MUTED, symbols::FILE, colors::FG, path.display(), colors::RESET
        );
    }
}

pub fn print_token_count(label: &str, count: usize) {
    println!(
        "\n{}  {}: {}{}{}",
        colors::MUTED, label, colors::AI_ACCENT, count, colors::RESET
    );
}

/// Print AI response bubble
pub fn print_ai_message(content: &str) {
    println!();
    println!(
        "{}{}  {} Sensei {}",
        colors::AI_ACCENT, colors::BOLD, symbols::AI_ICON, colors::RESET
    );
    for line in content.lines() {
        println!("{}  │ {}{}", colors::MUTED, colors::FG, line);
    }
    println!("{}  ╰{}─{}", colors::MUTED, symbols::DIVIDER.repeat(50), colors::RESET);
}

/// Print the prompt marker and flush
pub fn print_prompt() {
    print!(
        "\n{}  {} {}",
        colors::PRIMARY, symbols::USER_ICON, colors::RESET
    );
    io::stdout().flush().ok();
}

pub fn print_error(message: &str) {
    println!(
        "\n{}  {} Error: {}{}",
        colors::ERROR, symbols::ERROR, message, colors::RESET
    );
}

pub fn print_warning(message: &str) {
    println!(
        "\n{}  {} {}{}",
        colors::WARNING, symbols::WARNING, message, colors::RESET
    );
}

pub fn print_success(message: &str) {
    println!(
        "\n{}  {} {}{}",
        colors::SUCCESS, symbols::SUCCESS, message, colors::RESET
    );
}

pub fn print_muted(message: &str) {
    println!("{}  {}{}", colors::MUTED, message, colors::RESET);
}
