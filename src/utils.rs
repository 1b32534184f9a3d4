//! Helpers shared by the command-line front ends.

use crate::constants::{PROGRESS_BAR_TEMPLATE, PROGRESS_SPINNER_TEMPLATE};
use crate::formats::SourceFormat;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Check if a file path has an extension accepted for uploads
pub fn is_image_file(path: &Path) -> bool {
    SourceFormat::from_path(path).is_some()
}

/// Create a progress spinner with consistent styling
pub fn create_progress_spinner(message: &str) -> ProgressBar {
    if crate::logger::is_quiet() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template(PROGRESS_SPINNER_TEMPLATE) {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb
}

pub fn create_progress_bar(len: u64) -> ProgressBar {
    if crate::logger::is_quiet() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Format file size in human-readable format
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Compression ratio as a percentage (positive means reduction, negative means increase)
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    ((original_size as f64 - compressed_size as f64) / original_size as f64) * 100.0
}

/// Prints the result size and whether it landed within `budget`.
pub fn print_compression_result(original_size: u64, compressed_size: u64, budget: u64) {
    let ratio = calculate_compression_ratio(original_size, compressed_size);

    crate::info!(
        "📈 Compressed size: {} ({})",
        compressed_size,
        format_file_size(compressed_size)
    );

    match (ratio > 0.0, compressed_size <= budget) {
        (true, true) => crate::info!("✅ Reduced by {:.1}%, within the {} budget", ratio, format_file_size(budget)),
        (false, true) => crate::info!("✅ Within the {} budget ({:+.1}% size change)", format_file_size(budget), -ratio),
        (_, false) => crate::warn!(
            "Still above the {} budget, kept the smallest encoding ({:.1}% reduction)",
            format_file_size(budget),
            ratio
        ),
    }
}
