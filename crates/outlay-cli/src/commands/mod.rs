//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, read_statement)
//! - `analyze` - In-memory analysis and per-session detection output
//! - `import` - Statement import and preview
//! - `sessions` - Session listing, deletion, purge
//! - `serve` - Web server command

pub mod analyze;
pub mod core;
pub mod import;
pub mod serve;
pub mod sessions;

// Re-export command functions for main.rs
pub use analyze::*;
pub use core::*;
pub use import::*;
pub use serve::*;
pub use sessions::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
