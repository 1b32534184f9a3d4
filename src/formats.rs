//! Upload formats and the format decision table
//!
//! `SourceFormat` is the single allow-list for uploads: anything it cannot
//! parse is rejected before compression. `TargetFormat` is what the
//! compressor actually writes.

use crate::error::{CompressionError, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Formats accepted for station photo uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 3] = [SourceFormat::Jpeg, SourceFormat::Png, SourceFormat::Gif];

    /// Parses a dotted or bare extension, case-insensitively.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(SourceFormat::Jpeg),
            "png" => Some(SourceFormat::Png),
            "gif" => Some(SourceFormat::Gif),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Dotted extensions that map to this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SourceFormat::Jpeg => &[".jpg", ".jpeg"],
            SourceFormat::Png => &[".png"],
            SourceFormat::Gif => &[".gif"],
        }
    }

    pub fn allowed_extensions() -> Vec<&'static str> {
        Self::ALL.iter().flat_map(|f| f.extensions().iter().copied()).collect()
    }
}

impl FromStr for SourceFormat {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_extension(s).ok_or_else(|| CompressionError::UnsupportedExtension(s.to_string()))
    }
}

/// Encoding chosen for the compressed output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    /// Lossy JPEG, searched over quality levels
    Jpeg,
    /// 8-bit palette PNG, searched over palette sizes
    Png,
    /// Original bytes returned as-is
    Unchanged,
}

impl TargetFormat {
    /// Dotted extension written for this format, `None` for pass-through.
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            TargetFormat::Jpeg => Some(".jpg"),
            TargetFormat::Png => Some(".png"),
            TargetFormat::Unchanged => None,
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetFormat::Jpeg => "JPEG",
            TargetFormat::Png => "PNG (palette)",
            TargetFormat::Unchanged => "unchanged",
        };
        write!(f, "{}", name)
    }
}

/// Decision table keyed by the original extension and whether any pixel is
/// not fully opaque. JPEG sources stay JPEG; PNG and GIF keep a palette PNG
/// only when they need alpha. Unknown extensions pass through.
pub fn resolve_target_format(original_extension: &str, has_transparency: bool) -> TargetFormat {
    match (SourceFormat::from_extension(original_extension), has_transparency) {
        (Some(SourceFormat::Jpeg), _) => TargetFormat::Jpeg,
        (Some(SourceFormat::Png), true) | (Some(SourceFormat::Gif), true) => TargetFormat::Png,
        (Some(SourceFormat::Png), false) | (Some(SourceFormat::Gif), false) => TargetFormat::Jpeg,
        (None, _) => TargetFormat::Unchanged,
    }
}

/// Lower-cased dotted extension of a file name, e.g. `"Photo.JPG"` -> `".jpg"`.
pub fn normalized_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_format_from_extension() {
        assert_eq!(SourceFormat::from_extension(".jpg"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension("JPEG"), Some(SourceFormat::Jpeg));
        assert_eq!(SourceFormat::from_extension(".PNG"), Some(SourceFormat::Png));
        assert_eq!(SourceFormat::from_extension("gif"), Some(SourceFormat::Gif));

        assert_eq!(SourceFormat::from_extension(".webp"), None);
        assert_eq!(SourceFormat::from_extension(".mp3"), None);
        assert_eq!(SourceFormat::from_extension(""), None);
    }

    #[test]
    fn test_source_format_from_str_error() {
        let result = ".bmp".parse::<SourceFormat>();
        assert!(matches!(result, Err(CompressionError::UnsupportedExtension(ext)) if ext == ".bmp"));
    }

    #[test]
    fn test_allowed_extensions() {
        assert_eq!(
            SourceFormat::allowed_extensions(),
            vec![".jpg", ".jpeg", ".png", ".gif"]
        );
    }

    #[test]
    fn test_decision_table() {
        assert_eq!(resolve_target_format(".jpg", false), TargetFormat::Jpeg);
        assert_eq!(resolve_target_format(".jpg", true), TargetFormat::Jpeg);
        assert_eq!(resolve_target_format(".jpeg", true), TargetFormat::Jpeg);
        assert_eq!(resolve_target_format(".png", true), TargetFormat::Png);
        assert_eq!(resolve_target_format(".png", false), TargetFormat::Jpeg);
        assert_eq!(resolve_target_format(".gif", true), TargetFormat::Png);
        assert_eq!(resolve_target_format(".gif", false), TargetFormat::Jpeg);
        assert_eq!(resolve_target_format(".bmp", true), TargetFormat::Unchanged);
        assert_eq!(resolve_target_format(".webp", false), TargetFormat::Unchanged);
    }

    #[test]
    fn test_normalized_extension() {
        assert_eq!(normalized_extension("Burg.JPG"), Some(".jpg".to_string()));
        assert_eq!(normalized_extension("a.b.Png"), Some(".png".to_string()));
        assert_eq!(normalized_extension("README"), None);
    }

    #[test]
    fn test_target_format_extension() {
        assert_eq!(TargetFormat::Jpeg.extension(), Some(".jpg"));
        assert_eq!(TargetFormat::Png.extension(), Some(".png"));
        assert_eq!(TargetFormat::Unchanged.extension(), None);
        assert_eq!(format!("{}", TargetFormat::Png), "PNG (palette)");
    }
}
