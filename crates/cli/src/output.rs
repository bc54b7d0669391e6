//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use ros_lib::columns::{Cell, Tone};
use ros_lib::views::PaginationView;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print `value` as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Cell text colored by its tone
pub fn paint(cell: &Cell) -> String {
    match cell.tone {
        Tone::Normal => cell.text.clone(),
        Tone::Good => cell.text.green().to_string(),
        Tone::Muted => cell.text.dimmed().to_string(),
    }
}

/// Footer line of a paged table
pub fn page_footer(pagination: &PaginationView, noun: &str) -> String {
    format!(
        "Page {} of {} ({} {})",
        pagination.page,
        pagination.total_pages(),
        pagination.item_count,
        noun
    )
}
