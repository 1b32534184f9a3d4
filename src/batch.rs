use crate::compressor::ImageCompressor;
use crate::error::{CompressionError, Result};
use crate::processing::process_image_pipeline;
use crate::utils::{calculate_compression_ratio, create_progress_bar, format_file_size, is_image_file};
use glob::glob;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use walkdir::WalkDir;

/// Totals for one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total_files: usize,
    pub processed: usize,
    pub failed: usize,
    pub over_budget: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl BatchSummary {
    pub fn compression_ratio(&self) -> f64 {
        calculate_compression_ratio(self.bytes_before, self.bytes_after)
    }
}

/// Compresses every upload-format image under `input` into `output`.
///
/// Files are independent: each one runs on its own rayon task and a failure
/// is reported and counted without stopping the batch.
pub fn batch_compress_images(
    input: &str,
    output: &Path,
    compressor: &ImageCompressor,
    recursive: bool,
) -> Result<BatchSummary> {
    crate::info!("🚀 Starting batch compression...");
    crate::info!("📁 Input: {}", input);
    crate::info!("📁 Output: {:?}", output);

    let start_time = Instant::now();

    let image_files = collect_image_files(input, recursive)?;
    let total_files = image_files.len();

    if total_files == 0 {
        crate::warn!("No image files found in the input path");
        return Ok(BatchSummary::default());
    }

    crate::info!("📊 Found {} image files to process", total_files);
    crate::info!(
        "⚙️  Using {} parallel threads for processing",
        rayon::current_num_threads().min(total_files)
    );

    fs::create_dir_all(output)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output.to_path_buf()))?;

    let progress = create_progress_bar(total_files as u64);

    let processed_count = AtomicUsize::new(0);
    let over_budget_count = AtomicUsize::new(0);
    let total_size_before = AtomicU64::new(0);
    let total_size_after = AtomicU64::new(0);
    let budget = compressor.config().max_bytes;

    let failed_count = image_files
        .par_iter()
        .map(|input_path| {
            let result = process_image_pipeline(input_path, output, compressor);
            progress.inc(1);
            match result {
                Ok((output_path, before_size, after_size)) => {
                    crate::verbose!("{:?} -> {:?}", input_path, output_path);
                    total_size_before.fetch_add(before_size, Ordering::Relaxed);
                    total_size_after.fetch_add(after_size, Ordering::Relaxed);
                    processed_count.fetch_add(1, Ordering::Relaxed);
                    if after_size > budget {
                        over_budget_count.fetch_add(1, Ordering::Relaxed);
                    }
                    0
                }
                Err(e) => {
                    log::debug!("batch item {:?} failed: {:?}", input_path, e);
                    progress.suspend(|| {
                        crate::error!("Failed to process {:?}: {}", input_path, e);
                    });
                    1
                }
            }
        })
        .sum::<usize>();

    progress.finish_with_message("✅ Batch compression complete");

    let summary = BatchSummary {
        total_files,
        processed: processed_count.load(Ordering::Relaxed),
        failed: failed_count,
        over_budget: over_budget_count.load(Ordering::Relaxed),
        bytes_before: total_size_before.load(Ordering::Relaxed),
        bytes_after: total_size_after.load(Ordering::Relaxed),
    };

    let elapsed_time = start_time.elapsed();

    crate::info!("\n📊 Batch Compression Summary:");
    crate::info!("  📁 Total files processed: {}", summary.processed);
    crate::info!(
        "  📊 Total original size: {}",
        format_file_size(summary.bytes_before)
    );
    crate::info!(
        "  📊 Total compressed size: {}",
        format_file_size(summary.bytes_after)
    );
    crate::info!(
        "  🎯 Overall compression ratio: {:.1}%",
        summary.compression_ratio()
    );
    crate::info!("  ⏱️  Total time: {:?}", elapsed_time);
    if summary.over_budget > 0 {
        crate::warn!(
            "{} file(s) still above the {} budget",
            summary.over_budget,
            format_file_size(budget)
        );
    }
    if summary.failed > 0 {
        crate::warn!("Failed files: {}", summary.failed);
    }

    Ok(summary)
}

/// Collects files with an upload extension from a file, a directory or a
/// glob pattern. Hidden entries are skipped when walking directories.
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();
    let input_path = Path::new(input);

    if input_path.is_file() {
        if is_image_file(input_path) {
            image_files.push(input_path.to_path_buf());
        }
    } else if input_path.is_dir() {
        let walker = if recursive {
            WalkDir::new(input_path)
        } else {
            WalkDir::new(input_path).max_depth(1)
        };

        for entry in walker
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_image_file(path) {
                image_files.push(path.to_path_buf());
            }
        }
    } else if let Ok(glob_pattern) = glob(input) {
        for entry in glob_pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                image_files.push(entry);
            }
        }
    } else {
        return Err(CompressionError::NoImageFilesFound(input.to_string()));
    }

    Ok(image_files)
}
