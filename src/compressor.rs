//! Size-bounded recompression of uploaded images.
//!
//! The compressor decodes an upload, decides between JPEG and palette PNG
//! from the original extension and the presence of transparency, and then
//! walks a fixed ladder of quality levels or palette sizes until an encoding
//! fits the byte budget. When nothing fits, the smallest encoding wins.

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, JPEG_QUALITY_LADDER, PNG_PALETTE_LADDER};
use crate::error::{CompressionError, Result};
use crate::formats::{resolve_target_format, TargetFormat};
use crate::quantize::encode_palette_png;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage, RgbaImage};
use std::io::Read;
use std::ops::ControlFlow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressorConfig {
    /// Largest acceptable encoded size in bytes
    pub max_bytes: u64,
    /// Run oxipng over each palette PNG attempt
    pub optimize_png: bool,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            optimize_png: true,
        }
    }
}

impl CompressorConfig {
    pub fn new(max_bytes: Option<u64>) -> Result<Self> {
        let max_bytes = max_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);
        if max_bytes == 0 {
            return Err(CompressionError::InvalidBudget(max_bytes));
        }

        Ok(Self {
            max_bytes,
            ..Self::default()
        })
    }

    pub fn with_png_optimization(mut self, enabled: bool) -> Self {
        self.optimize_png = enabled;
        self
    }
}

/// Encoded image together with the extension that matches its encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedImage {
    content: Vec<u8>,
    file_extension: String,
}

impl CompressedImage {
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Dotted extension: `.jpg`, `.png`, or the original one for pass-through.
    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_parts(self) -> (Vec<u8>, String) {
        (self.content, self.file_extension)
    }
}

/// Result of walking a compression ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOutcome<L> {
    /// Level that produced `bytes`
    pub level: L,
    pub bytes: Vec<u8>,
    /// Encodings performed before stopping
    pub attempts: usize,
    pub within_budget: bool,
}

/// Encodes at each level in order and stops at the first encoding no larger
/// than `budget`. If none fits, returns the smallest one; ties keep the
/// earlier level.
pub fn select_best<L, F>(levels: &[L], budget: u64, mut encode: F) -> Result<SearchOutcome<L>>
where
    L: Copy,
    F: FnMut(L) -> Result<Vec<u8>>,
{
    let folded = levels.iter().copied().enumerate().try_fold(
        None,
        |best: Option<SearchOutcome<L>>, (index, level)| {
            let bytes = match encode(level) {
                Ok(bytes) => bytes,
                Err(e) => return ControlFlow::Break(Err(e)),
            };
            let within_budget = bytes.len() as u64 <= budget;
            let candidate = SearchOutcome {
                level,
                bytes,
                attempts: index + 1,
                within_budget,
            };

            if within_budget {
                return ControlFlow::Break(Ok(candidate));
            }

            ControlFlow::Continue(match best {
                Some(best) if best.bytes.len() <= candidate.bytes.len() => Some(best),
                _ => Some(candidate),
            })
        },
    );

    match folded {
        ControlFlow::Break(result) => result,
        ControlFlow::Continue(Some(best)) => Ok(SearchOutcome {
            attempts: levels.len(),
            ..best
        }),
        ControlFlow::Continue(None) => Err(CompressionError::EmptyLadder),
    }
}

/// True when any pixel is not fully opaque.
pub fn has_transparency(image: &RgbaImage) -> bool {
    image.pixels().any(|pixel| pixel.0[3] < u8::MAX)
}

/// Composites the image over an opaque white background.
pub fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    image
        .write_with_encoder(encoder)
        .map_err(CompressionError::JpegEncode)?;
    Ok(buf)
}

pub fn decode_rgba(raw: &[u8]) -> Result<RgbaImage> {
    let image = image::load_from_memory(raw).map_err(CompressionError::ImageDecode)?;
    Ok(image.into_rgba8())
}

/// Station photo compressor. Holds no per-call state, so one instance can
/// serve concurrent uploads.
#[derive(Debug, Clone, Default)]
pub struct ImageCompressor {
    config: CompressorConfig,
}

impl ImageCompressor {
    pub fn new(config: CompressorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompressorConfig {
        &self.config
    }

    /// Reads the whole stream and compresses it. `original_extension` is the
    /// lower-cased dotted extension of the uploaded file.
    pub fn compress<R: Read>(&self, mut reader: R, original_extension: &str) -> Result<CompressedImage> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        self.compress_bytes(raw, original_extension)
    }

    pub fn compress_bytes(&self, raw: Vec<u8>, original_extension: &str) -> Result<CompressedImage> {
        let image = decode_rgba(&raw)?;
        let transparent = has_transparency(&image);
        let target = resolve_target_format(original_extension, transparent);

        log::debug!(
            "decoded {}x{} image ({} bytes, ext {:?}, transparent: {}) -> {}",
            image.width(),
            image.height(),
            raw.len(),
            original_extension,
            transparent,
            target
        );

        match target {
            TargetFormat::Jpeg => {
                let rgb = if transparent {
                    flatten_on_white(&image)
                } else {
                    DynamicImage::ImageRgba8(image).into_rgb8()
                };
                let content = self.encode_jpeg_within_budget(&rgb)?;
                Ok(CompressedImage {
                    content,
                    file_extension: ".jpg".to_string(),
                })
            }
            TargetFormat::Png => {
                let content = self.encode_png_within_budget(&image)?;
                Ok(CompressedImage {
                    content,
                    file_extension: ".png".to_string(),
                })
            }
            TargetFormat::Unchanged => Ok(CompressedImage {
                content: raw,
                file_extension: original_extension.to_string(),
            }),
        }
    }

    /// JPEG quality search over [`JPEG_QUALITY_LADDER`].
    pub fn encode_jpeg_within_budget(&self, image: &RgbImage) -> Result<Vec<u8>> {
        let outcome = select_best(&JPEG_QUALITY_LADDER, self.config.max_bytes, |quality| {
            let bytes = encode_jpeg(image, quality)?;
            log::debug!("jpeg quality {} -> {} bytes", quality, bytes.len());
            Ok(bytes)
        })?;
        self.log_outcome("jpeg quality", &outcome);
        Ok(outcome.bytes)
    }

    /// Palette PNG search over [`PNG_PALETTE_LADDER`]. Every attempt quantizes
    /// the original bitmap, never a previously reduced one.
    pub fn encode_png_within_budget(&self, image: &RgbaImage) -> Result<Vec<u8>> {
        let optimize = self.config.optimize_png;
        let outcome = select_best(&PNG_PALETTE_LADDER, self.config.max_bytes, |colors| {
            let bytes = encode_palette_png(image, colors, optimize)?;
            log::debug!("png palette {} -> {} bytes", colors, bytes.len());
            Ok(bytes)
        })?;
        self.log_outcome("png palette", &outcome);
        Ok(outcome.bytes)
    }

    fn log_outcome<L: std::fmt::Display>(&self, what: &str, outcome: &SearchOutcome<L>) {
        if outcome.within_budget {
            log::debug!(
                "{} {} fits {} byte budget after {} attempt(s)",
                what,
                outcome.level,
                self.config.max_bytes,
                outcome.attempts
            );
        } else {
            log::warn!(
                "no {} level fits {} bytes, keeping smallest ({} at {} bytes)",
                what,
                self.config.max_bytes,
                outcome.level,
                outcome.bytes.len()
            );
        }
    }
}
