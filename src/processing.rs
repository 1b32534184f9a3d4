use crate::compressor::{CompressedImage, ImageCompressor};
use crate::error::{CompressionError, Result};
use crate::formats::{normalized_extension, SourceFormat};
use crate::utils::{create_progress_spinner, format_file_size, print_compression_result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Validates that a file exists at the given path.
///
/// # Example
/// ```
/// use std::path::Path;
/// use tour_media::validate_file_exists;
///
/// let result = validate_file_exists(Path::new("nonexistent.jpg"));
/// assert!(result.is_err());
/// ```
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CompressionError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Reads an image file and returns its bytes and lower-cased dotted extension.
///
/// # Returns
/// * `Ok((bytes, extension))`
/// * `Err(CompressionError::UnsupportedExtension)` - If the extension is not an upload format
/// * `Err(CompressionError::FileNotFound)` - If the file does not exist
pub fn load_upload(input_path: &Path) -> Result<(Vec<u8>, String)> {
    validate_file_exists(input_path)?;

    let extension = input_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(normalized_extension)
        .filter(|ext| SourceFormat::from_extension(ext).is_some())
        .ok_or_else(|| {
            CompressionError::UnsupportedExtension(input_path.display().to_string())
        })?;

    let raw = fs::read(input_path)?;
    Ok((raw, extension))
}

/// Output file name: the input stem plus the extension of the encoding that
/// was actually produced. `index > 0` adds a `-{index}` suffix to the stem.
pub fn output_file_name(input_path: &Path, compressed: &CompressedImage, index: usize) -> Result<String> {
    let file_stem = input_path
        .file_stem()
        .ok_or_else(|| CompressionError::FileNotFound(input_path.to_path_buf()))?
        .to_string_lossy();

    Ok(match index {
        0 => format!("{}{}", file_stem, compressed.file_extension()),
        n => format!("{}-{}{}", file_stem, n, compressed.file_extension()),
    })
}

/// Writes `compressed` into `output_dir` without replacing any existing file.
///
/// The content goes to a temp file first and is then moved to the first free
/// name (`x.jpg`, `x-1.jpg`, `x-2.jpg`, ...). The move fails if the target
/// exists, so parallel writers sharing a stem each get their own file.
pub fn write_output(input_path: &Path, output_dir: &Path, compressed: &CompressedImage) -> Result<PathBuf> {
    let mut tmp = NamedTempFile::new_in(output_dir)?;
    tmp.write_all(compressed.content())?;
    tmp.as_file().sync_all()?;

    let mut index = 0;
    loop {
        let output_path = output_dir.join(output_file_name(input_path, compressed, index)?);
        match tmp.persist_noclobber(&output_path) {
            Ok(_) => return Ok(output_path),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                log::debug!("{:?} exists, trying the next suffix", output_path);
                tmp = e.file;
                index += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Load -> compress -> save. Returns the output path and both sizes.
pub fn process_image_pipeline(
    input_path: &Path,
    output_dir: &Path,
    compressor: &ImageCompressor,
) -> Result<(PathBuf, u64, u64)> {
    let (raw, extension) = load_upload(input_path)?;
    let original_size = raw.len() as u64;

    let compressed = compressor.compress_bytes(raw, &extension)?;

    fs::create_dir_all(output_dir)
        .map_err(|_| CompressionError::DirectoryCreationFailed(output_dir.to_path_buf()))?;
    let output_path = write_output(input_path, output_dir, &compressed)?;

    Ok((output_path, original_size, compressed.len() as u64))
}

pub fn compress_image(input: &Path, output_dir: &Path, compressor: &ImageCompressor) -> Result<PathBuf> {
    crate::info!("🗜️  Compressing image: {:?}", input);
    crate::info!("📁 Output directory: {:?}", output_dir);
    crate::verbose!("Byte budget: {}", format_file_size(compressor.config().max_bytes));

    let pb = create_progress_spinner("Compressing...");
    let result = process_image_pipeline(input, output_dir, compressor);
    pb.finish_and_clear();

    let (output_path, original_size, compressed_size) = result?;

    crate::info!(
        "📊 Original size: {} ({})",
        original_size,
        format_file_size(original_size)
    );
    crate::info!("💾 Written: {:?}", output_path);
    print_compression_result(original_size, compressed_size, compressor.config().max_bytes);

    Ok(output_path)
}
