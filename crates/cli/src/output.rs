//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: f64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    if bytes >= GB {
        format!("{:.2}Gi", bytes / GB)
    } else if bytes >= MB {
        format!("{:.2}Mi", bytes / MB)
    } else if bytes >= KB {
        format!("{:.2}Ki", bytes / KB)
    } else {
        format!("{}B", bytes)
    }
}

/// Format CPU cores as human-readable string
pub fn format_cpu(cores: f64) -> String {
    if cores >= 1.0 {
        format!("{:.1}", cores)
    } else {
        format!("{}m", (cores * 1000.0).round())
    }
}

/// Color an outcome label
pub fn color_outcome(outcome: &str) -> String {
    match outcome {
        "scaled" => outcome.green().to_string(),
        "intact" => outcome.dimmed().to_string(),
        "failed" => outcome.red().to_string(),
        _ => outcome.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512B");
        assert_eq!(format_bytes(805306368.0), "768.00Mi");
        assert_eq!(format_bytes(2.0 * 1024.0 * 1024.0 * 1024.0), "2.00Gi");
    }

    #[test]
    fn test_format_cpu() {
        assert_eq!(format_cpu(1.5), "1.5");
        assert_eq!(format_cpu(0.25), "250m");
        assert_eq!(format_cpu(0.0), "0m");
    }
}
