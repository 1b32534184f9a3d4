//! Prints the encoded size at every ladder level for one image.
//!
//! ```text
//! cargo run --example inspect_ladder -- kirche.png
//! ```

use anyhow::{bail, Context, Result};
use image::DynamicImage;
use std::path::PathBuf;
use tour_media::compressor::{decode_rgba, encode_jpeg};
use tour_media::constants::{DEFAULT_MAX_UPLOAD_BYTES, JPEG_QUALITY_LADDER, PNG_PALETTE_LADDER};
use tour_media::quantize::encode_palette_png;
use tour_media::utils::format_file_size;
use tour_media::{flatten_on_white, has_transparency, load_upload, resolve_target_format, TargetFormat};

fn main() -> Result<()> {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        bail!("usage: inspect_ladder <image>");
    };

    let (raw, extension) = load_upload(&path).with_context(|| format!("cannot load {:?}", path))?;
    let image = decode_rgba(&raw)?;
    let transparent = has_transparency(&image);
    let target = resolve_target_format(&extension, transparent);

    println!(
        "{:?}: {}x{}, {}, target {}",
        path,
        image.width(),
        image.height(),
        format_file_size(raw.len() as u64),
        target
    );

    let mark = |len: usize| if len as u64 <= DEFAULT_MAX_UPLOAD_BYTES { "fits" } else { "over" };

    match target {
        TargetFormat::Jpeg => {
            let rgb = if transparent {
                flatten_on_white(&image)
            } else {
                DynamicImage::ImageRgba8(image).into_rgb8()
            };
            for quality in JPEG_QUALITY_LADDER {
                let len = encode_jpeg(&rgb, quality)?.len();
                println!("  q{:<3} {:>12}  {}", quality, format_file_size(len as u64), mark(len));
            }
        }
        TargetFormat::Png => {
            for colors in PNG_PALETTE_LADDER {
                let len = encode_palette_png(&image, colors, true)?.len();
                println!("  {:>3} colors {:>12}  {}", colors, format_file_size(len as u64), mark(len));
            }
        }
        TargetFormat::Unchanged => println!("  stored as is"),
    }

    Ok(())
}
