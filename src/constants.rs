/// Largest encoded size a station photo may have after compression (500 KiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 500 * 1024;

/// JPEG qualities tried in order until an encoding fits the budget.
pub const JPEG_QUALITY_LADDER: [u8; 9] = [90, 82, 75, 68, 60, 52, 45, 38, 32];

/// Palette sizes tried in order until an encoding fits the budget.
pub const PNG_PALETTE_LADDER: [usize; 7] = [256, 192, 128, 96, 64, 48, 32];

/// NeuQuant sampling factor. 1 samples every pixel; 10 is the usual
/// trade-off between speed and palette quality.
pub const NEUQUANT_SAMPLE_FACTOR: i32 = 10;

pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;

/// Upload paths are `{root}/uploads/stations/{station_id}/{file}`.
pub const UPLOADS_DIR: &str = "uploads";
pub const STATION_UPLOADS_DIR: &str = "stations";

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} {msg}";
pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub const USER_MESSAGE_NOT_PROCESSED: &str = "The image could not be processed.";
pub const USER_MESSAGE_NOT_ALLOWED: &str = "The selected file type is not allowed.";
