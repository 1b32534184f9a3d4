//! Palette reduction and 8-bit indexed PNG encoding.

use crate::constants::{LIBDEFLATER_HIGH_LEVEL, NEUQUANT_SAMPLE_FACTOR};
use crate::error::{CompressionError, Result};
use color_quant::NeuQuant;
use image::RgbaImage;
use oxipng::{Deflaters, Options};

/// An image reduced to at most 256 colours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    /// RGBA palette entries
    pub palette: Vec<[u8; 4]>,
    /// One palette index per pixel, row-major
    pub indices: Vec<u8>,
}

impl IndexedImage {
    pub fn palette_rgb(&self) -> Vec<u8> {
        self.palette.iter().flat_map(|c| [c[0], c[1], c[2]]).collect()
    }

    /// Alpha values for the `tRNS` chunk, trimmed after the last non-opaque
    /// entry. Empty when the palette is fully opaque.
    pub fn palette_alpha(&self) -> Vec<u8> {
        let len = self
            .palette
            .iter()
            .rposition(|c| c[3] < u8::MAX)
            .map_or(0, |last| last + 1);
        self.palette[..len].iter().map(|c| c[3]).collect()
    }
}

/// Quantizes `image` to `max_colors` colours (clamped to 2..=256).
///
/// Never mutates the input, so every call starts from the original pixels.
/// NeuQuant with a fixed sample factor has no randomness: the same input and
/// colour count always produce the same palette and indices. Fully
/// transparent pixels get a reserved last palette entry so a few of them
/// cannot be averaged away into an opaque colour. At 2 colours that leaves
/// the network a single entry.
pub fn quantize(image: &RgbaImage, max_colors: usize) -> IndexedImage {
    let colors = max_colors.clamp(2, 256);
    let (width, height) = image.dimensions();

    if image.as_raw().is_empty() {
        return IndexedImage {
            width,
            height,
            palette: vec![[0, 0, 0, 0]; colors],
            indices: Vec::new(),
        };
    }

    let has_clear = image.pixels().any(|pixel| pixel.0[3] == 0);
    let network_colors = if has_clear { colors - 1 } else { colors };

    let quantizer = NeuQuant::new(NEUQUANT_SAMPLE_FACTOR, network_colors, image.as_raw());
    let mut palette: Vec<[u8; 4]> = quantizer
        .color_map_rgba()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();

    let clear_index = palette.len() as u8;
    if has_clear {
        palette.push([0, 0, 0, 0]);
    }

    let indices = image
        .pixels()
        .map(|pixel| {
            if has_clear && pixel.0[3] == 0 {
                clear_index
            } else {
                quantizer.index_of(&pixel.0) as u8
            }
        })
        .collect();

    IndexedImage {
        width,
        height,
        palette,
        indices,
    }
}

/// Writes an 8-bit palette PNG with the strongest zlib setting.
pub fn encode_indexed_png(indexed: &IndexedImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, indexed.width, indexed.height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_palette(indexed.palette_rgb());

        let alpha = indexed.palette_alpha();
        if !alpha.is_empty() {
            encoder.set_trns(alpha);
        }

        let mut writer = encoder.write_header()?;
        writer.write_image_data(&indexed.indices)?;
        writer.finish()?;
    }
    Ok(buf)
}

/// Lossless re-compression of an indexed PNG with oxipng.
///
/// Colour type and bit depth reductions are off so the result stays an 8-bit
/// palette image. oxipng returns the input unchanged when it cannot shrink it.
pub fn optimize_png(data: &[u8]) -> Result<Vec<u8>> {
    let mut options = Options::from_preset(2);
    options.deflate = Deflaters::Libdeflater {
        compression: LIBDEFLATER_HIGH_LEVEL,
    };
    options.bit_depth_reduction = false;
    options.color_type_reduction = false;

    oxipng::optimize_from_memory(data, &options)
        .map_err(|e| CompressionError::PngOptimization(e.to_string()))
}

/// Quantize, encode and optionally optimize in one step.
pub fn encode_palette_png(image: &RgbaImage, max_colors: usize, optimize: bool) -> Result<Vec<u8>> {
    let indexed = quantize(image, max_colors);
    let encoded = encode_indexed_png(&indexed)?;
    if optimize {
        optimize_png(&encoded)
    } else {
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba};

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let alpha = if x < 4 && y < 4 { 0 } else { 255 };
            Rgba([(x * 7 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8, alpha])
        })
    }

    #[test]
    fn test_quantize_respects_palette_size() {
        let img = gradient(64, 48);
        for colors in [256, 96, 32] {
            let indexed = quantize(&img, colors);
            assert_eq!(indexed.palette.len(), colors);
            assert_eq!(indexed.indices.len(), 64 * 48);
            assert!(indexed.indices.iter().all(|&i| (i as usize) < colors));
        }
    }

    #[test]
    fn test_quantize_is_deterministic() {
        let img = gradient(40, 40);
        let first = encode_indexed_png(&quantize(&img, 128)).unwrap();
        let second = encode_indexed_png(&quantize(&img, 128)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_quantize_does_not_touch_input() {
        let img = gradient(32, 32);
        let before = img.clone();
        let _ = quantize(&img, 32);
        assert_eq!(img, before);
    }

    #[test]
    fn test_indexed_png_is_palette_png() {
        let img = gradient(30, 20);
        let data = encode_indexed_png(&quantize(&img, 64)).unwrap();

        assert_eq!(&data[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        // IHDR: bit depth at offset 24, colour type at 25 (3 = indexed)
        assert_eq!(data[24], 8);
        assert_eq!(data[25], 3);

        let decoded = image::load_from_memory(&data).unwrap();
        assert_eq!(decoded.dimensions(), (30, 20));
    }

    #[test]
    fn test_transparency_survives_quantization() {
        let img = gradient(32, 32);
        let data = encode_indexed_png(&quantize(&img, 64)).unwrap();
        let decoded = image::load_from_memory(&data).unwrap().to_rgba8();
        assert!(decoded.pixels().any(|p| p.0[3] < 255));
    }

    #[test]
    fn test_single_clear_pixel_keeps_own_entry() {
        let mut img = RgbaImage::from_fn(64, 64, |x, y| Rgba([x as u8 * 4, y as u8 * 4, 90, 255]));
        img.put_pixel(10, 10, Rgba([0, 0, 0, 0]));

        let indexed = quantize(&img, 32);
        assert_eq!(indexed.palette.len(), 32);
        let clear = indexed.indices[10 * 64 + 10] as usize;
        assert_eq!(indexed.palette[clear][3], 0);
        assert_eq!(indexed.indices.iter().filter(|&&i| i as usize == clear).count(), 1);
    }

    #[test]
    fn test_two_colours_with_clear_pixel() {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([200, 10, 10, 255]));
        img.put_pixel(3, 3, Rgba([0, 0, 0, 0]));

        let indexed = quantize(&img, 2);
        assert_eq!(indexed.palette.len(), 2);
        assert_eq!(indexed.palette[1], [0, 0, 0, 0]);
        assert_eq!(indexed.indices[3 * 16 + 3], 1);
        assert!(indexed.indices.iter().enumerate().all(|(i, &p)| i == 3 * 16 + 3 || p == 0));

        let data = encode_indexed_png(&indexed).unwrap();
        let decoded = image::load_from_memory(&data).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(3, 3).0[3], 0);
    }

    #[test]
    fn test_palette_alpha_trimmed() {
        let indexed = IndexedImage {
            width: 1,
            height: 1,
            palette: vec![[0, 0, 0, 0], [1, 1, 1, 128], [2, 2, 2, 255]],
            indices: vec![0],
        };
        assert_eq!(indexed.palette_alpha(), vec![0, 128]);

        let opaque = IndexedImage {
            palette: vec![[0, 0, 0, 255]; 4],
            ..indexed
        };
        assert!(opaque.palette_alpha().is_empty());
    }

    #[test]
    fn test_optimize_png_keeps_palette_and_size() {
        let img = gradient(48, 48);
        let raw = encode_indexed_png(&quantize(&img, 96)).unwrap();
        let optimized = optimize_png(&raw).unwrap();

        assert!(optimized.len() <= raw.len());
        assert_eq!(optimized[25], 3);
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.dimensions(), (48, 48));
    }
}
