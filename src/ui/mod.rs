//! Terminal output for Code Sensei

pub mod theme;

pub use theme::{
    print_ai_message, print_error, print_loaded_files, print_muted, print_success,
    print_token_count, print_warning, spinner,
};
