use crate::compressor::{decode_rgba, has_transparency};
use crate::error::Result;
use crate::formats::{resolve_target_format, TargetFormat};
use crate::processing::load_upload;
use crate::utils::format_file_size;
use std::path::Path;

/// What the compressor would see and decide for a file
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    pub extension: String,
    pub detected_format: Option<image::ImageFormat>,
    pub has_transparency: bool,
    pub target: TargetFormat,
}

impl ImageInfo {
    pub fn megapixels(&self) -> f64 {
        (self.width as u64 * self.height as u64) as f64 / 1_000_000.0
    }

    pub fn exceeds_budget(&self, max_bytes: u64) -> bool {
        self.file_size > max_bytes
    }
}

pub fn analyze_image(input_path: &Path) -> Result<ImageInfo> {
    let (raw, extension) = load_upload(input_path)?;
    let image = decode_rgba(&raw)?;
    let transparent = has_transparency(&image);

    Ok(ImageInfo {
        width: image.width(),
        height: image.height(),
        file_size: raw.len() as u64,
        detected_format: image::guess_format(&raw).ok(),
        target: resolve_target_format(&extension, transparent),
        has_transparency: transparent,
        extension,
    })
}

/// Prints the analysis of `input_path`, checking its size against `max_bytes`.
pub fn print_image_info(input_path: &Path, max_bytes: u64) -> Result<ImageInfo> {
    let info = analyze_image(input_path)?;

    crate::info!("📋 Image: {:?}", input_path);
    crate::info!("  📏 Dimensions: {}x{} pixels ({:.2} MP)", info.width, info.height, info.megapixels());
    crate::info!("  📦 File size: {} ({} bytes)", format_file_size(info.file_size), info.file_size);
    crate::info!("  🎭 Extension: {} (content: {:?})", info.extension, info.detected_format);
    crate::info!("  🫥 Transparency: {}", if info.has_transparency { "yes" } else { "no" });
    crate::info!("  🎯 Target format: {}", info.target);

    if info.exceeds_budget(max_bytes) {
        crate::info!(
            "  💡 Above the {} budget, compression will step down quality until it fits",
            format_file_size(max_bytes)
        );
    } else {
        crate::info!("  ✅ Already within the {} budget", format_file_size(max_bytes));
    }

    Ok(info)
}
