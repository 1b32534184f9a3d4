use crate::compressor::ImageCompressor;
use crate::constants::{STATION_UPLOADS_DIR, UPLOADS_DIR};
use crate::error::{CompressionError, Result};
use crate::formats::{normalized_extension, SourceFormat};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// A compressed upload that has been written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub station_id: u32,
    pub file_name: String,
    pub path: PathBuf,
    /// Public URL stored on the media item, e.g. `/uploads/stations/7/<uuid>.jpg`
    pub url: String,
    pub size: u64,
}

/// Accepts station photo uploads, compresses them and stores the result
/// below `{root}/uploads/stations/{station_id}/`.
#[derive(Debug, Clone)]
pub struct MediaUploadHandler {
    root: PathBuf,
    compressor: ImageCompressor,
}

impl MediaUploadHandler {
    pub fn new(root: impl Into<PathBuf>, compressor: ImageCompressor) -> Self {
        Self {
            root: root.into(),
            compressor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn station_dir(&self, station_id: u32) -> PathBuf {
        self.root
            .join(UPLOADS_DIR)
            .join(STATION_UPLOADS_DIR)
            .join(station_id.to_string())
    }

    /// Validates, compresses and persists one upload.
    ///
    /// # Arguments
    /// * `station_id` - Station the photo belongs to
    /// * `uploaded_file_name` - Client-side file name, only its extension is used
    /// * `reader` - Upload body
    ///
    /// # Returns
    /// * `Ok(StoredMedia)` - Where the file went and its public URL
    /// * `Err(CompressionError::UnsupportedExtension)` - Extension outside the allow-list
    /// * `Err(CompressionError)` - Any decode, encode or I/O failure; nothing is written
    pub fn store<R: Read>(
        &self,
        station_id: u32,
        uploaded_file_name: &str,
        mut reader: R,
    ) -> Result<StoredMedia> {
        let extension = validate_upload_extension(uploaded_file_name)?;

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        if raw.is_empty() {
            return Err(CompressionError::EmptyUpload);
        }

        let compressed = self.compressor.compress_bytes(raw, &extension)?;

        let dir = self.station_dir(station_id);
        fs::create_dir_all(&dir).map_err(|_| CompressionError::DirectoryCreationFailed(dir.clone()))?;

        let file_name = format!("{}{}", Uuid::new_v4(), compressed.file_extension());
        let path = dir.join(&file_name);
        write_atomically(&dir, &path, compressed.content())?;

        log::info!(
            "stored {} ({} bytes) for station {}",
            path.display(),
            compressed.len(),
            station_id
        );

        Ok(StoredMedia {
            station_id,
            url: media_url(station_id, &file_name),
            file_name,
            path,
            size: compressed.len() as u64,
        })
    }
}

/// Lower-cased extension of `file_name` if it is on the upload allow-list.
pub fn validate_upload_extension(file_name: &str) -> Result<String> {
    match normalized_extension(file_name) {
        Some(ext) if SourceFormat::from_extension(&ext).is_some() => Ok(ext),
        Some(ext) => Err(CompressionError::UnsupportedExtension(ext)),
        None => Err(CompressionError::UnsupportedExtension(file_name.to_string())),
    }
}

pub fn media_url(station_id: u32, file_name: &str) -> String {
    format!("/{}/{}/{}/{}", UPLOADS_DIR, STATION_UPLOADS_DIR, station_id, file_name)
}

/// Writes to a temp file in `dir` and renames it into place, so `path` only
/// ever holds a complete file.
fn write_atomically(dir: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist_noclobber(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32, transparent_corner: bool) -> Vec<u8> {
        let mut img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 3) as u8, (y * 3) as u8, 90, 255])
        });
        if transparent_corner {
            img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        }
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        match fs::read_dir(dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn test_validate_upload_extension() {
        assert_eq!(validate_upload_extension("Burg.JPG").unwrap(), ".jpg");
        assert_eq!(validate_upload_extension("karte.jpeg").unwrap(), ".jpeg");
        assert_eq!(validate_upload_extension("logo.png").unwrap(), ".png");
        assert_eq!(validate_upload_extension("anim.gif").unwrap(), ".gif");

        assert!(matches!(
            validate_upload_extension("audio.mp3"),
            Err(CompressionError::UnsupportedExtension(ext)) if ext == ".mp3"
        ));
        assert!(matches!(
            validate_upload_extension("noext"),
            Err(CompressionError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn test_media_url() {
        assert_eq!(media_url(7, "abc.jpg"), "/uploads/stations/7/abc.jpg");
    }

    #[test]
    fn test_station_dir() {
        let handler = MediaUploadHandler::new("/srv/www", ImageCompressor::default());
        assert_eq!(
            handler.station_dir(3),
            PathBuf::from("/srv/www/uploads/stations/3")
        );
    }

    #[test]
    fn test_store_opaque_png_as_jpeg() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());

        let stored = handler
            .store(12, "Ruine.PNG", png_bytes(40, 30, false).as_slice())
            .unwrap();

        assert!(stored.file_name.ends_with(".jpg"));
        assert_eq!(stored.url, format!("/uploads/stations/12/{}", stored.file_name));
        assert_eq!(stored.path, handler.station_dir(12).join(&stored.file_name));

        let written = fs::read(&stored.path).unwrap();
        assert_eq!(written.len() as u64, stored.size);
        let decoded = image::load_from_memory(&written).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
    }

    #[test]
    fn test_store_transparent_png_as_png() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());

        let stored = handler
            .store(1, "wappen.png", png_bytes(32, 32, true).as_slice())
            .unwrap();

        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(files_in(&handler.station_dir(1)), vec![stored.path.clone()]);
    }

    #[test]
    fn test_store_names_are_unique() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());
        let data = png_bytes(16, 16, false);

        let first = handler.store(2, "a.png", data.as_slice()).unwrap();
        let second = handler.store(2, "a.png", data.as_slice()).unwrap();
        assert_ne!(first.file_name, second.file_name);
        assert_eq!(files_in(&handler.station_dir(2)).len(), 2);
    }

    #[test]
    fn test_store_rejects_extension_before_reading() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());

        let result = handler.store(5, "clip.mp4", png_bytes(8, 8, false).as_slice());
        assert!(matches!(result, Err(CompressionError::UnsupportedExtension(_))));
        assert!(!handler.station_dir(5).exists());
    }

    #[test]
    fn test_store_undecodable_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());

        let err = handler
            .store(9, "foto.jpg", &b"\xFF\xD8 truncated garbage"[..])
            .unwrap_err();

        assert!(matches!(err, CompressionError::ImageDecode(_)));
        assert_eq!(err.user_message(), "The image could not be processed.");
        assert!(files_in(&handler.station_dir(9)).is_empty());
    }

    #[test]
    fn test_store_empty_upload() {
        let temp_dir = TempDir::new().unwrap();
        let handler = MediaUploadHandler::new(temp_dir.path(), ImageCompressor::default());

        let result = handler.store(4, "leer.jpg", std::io::empty());
        assert!(matches!(result, Err(CompressionError::EmptyUpload)));
    }
}
