pub mod logger;

pub mod batch;
pub mod cli;
pub mod compressor;
pub mod constants;
pub mod error;
pub mod formats;
pub mod info;
pub mod processing;
pub mod quantize;
pub mod upload;
pub mod utils;

pub use batch::{batch_compress_images, collect_image_files, BatchSummary};
pub use compressor::{
    flatten_on_white, has_transparency, select_best, CompressedImage, CompressorConfig,
    ImageCompressor, SearchOutcome,
};
pub use error::{CompressionError, Result};
pub use formats::{resolve_target_format, SourceFormat, TargetFormat};
pub use info::{analyze_image, print_image_info, ImageInfo};
pub use processing::{compress_image, load_upload, process_image_pipeline, validate_file_exists};
pub use upload::{media_url, validate_upload_extension, MediaUploadHandler, StoredMedia};
