use anyhow::{Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::ExitCode;
use tour_media::cli::{Args, Commands};
use tour_media::{
    batch_compress_images, compress_image, logger, print_image_info, validate_file_exists,
    CompressionError, CompressorConfig, ImageCompressor, MediaUploadHandler,
};

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    match args.command {
        Commands::Compress {
            input,
            output,
            max_bytes,
        } => {
            let compressor = build_compressor(max_bytes)?;
            compress_image(&input, &output, &compressor)
                .with_context(|| format!("failed to compress {}", input.display()))?;
        }
        Commands::Batch {
            input,
            output,
            max_bytes,
            threads,
            recursive,
        } => {
            setup_thread_pool(threads);
            let compressor = build_compressor(max_bytes)?;
            batch_compress_images(&input, &output, &compressor, recursive)?;
        }
        Commands::Store {
            input,
            root,
            station,
            max_bytes,
        } => {
            let compressor = build_compressor(max_bytes)?;
            return store_upload(&input, MediaUploadHandler::new(root, compressor), station);
        }
        Commands::Info { input, max_bytes } => {
            let compressor = build_compressor(max_bytes)?;
            print_image_info(&input, compressor.config().max_bytes)
                .with_context(|| format!("failed to analyze {}", input.display()))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn build_compressor(max_bytes: Option<u64>) -> Result<ImageCompressor> {
    let config = CompressorConfig::new(max_bytes)?;
    Ok(ImageCompressor::new(config))
}

fn setup_thread_pool(threads: Option<usize>) {
    if let Some(num_threads) = threads {
        ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .unwrap_or_else(|e| {
                tour_media::warn!("Failed to set thread pool size: {}", e);
            });
    }
}

/// Upload failures print only the admin-facing message; the full error goes
/// to the debug log.
fn store_upload(input: &Path, handler: MediaUploadHandler, station: u32) -> Result<ExitCode> {
    validate_file_exists(input)?;
    let file_name = input
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CompressionError::UnsupportedExtension(input.display().to_string()))?;

    tour_media::info!("📤 Storing {:?} for station {}", input, station);

    let reader = BufReader::new(File::open(input)?);
    match handler.store(station, file_name, reader) {
        Ok(stored) => {
            tour_media::info!("✅ Stored: {:?}", stored.path);
            tour_media::info!("📦 Size: {} bytes", stored.size);
            println!("{}", stored.url);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            log::debug!("upload of {:?} failed: {:?}", input, e);
            tour_media::error!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}
