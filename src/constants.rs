// Casefile Media Constants
// Bump PIPELINE_VERSION whenever commit output for the same input and EditSpec changes.

pub const PIPELINE_VERSION: u32 = 1;

// Provenance tags stored in media_assets.version
pub const VERSION_ORIGINAL: &str = "original";
pub const VERSION_DERIVED_PREFIX: &str = "derived-v";

// Paths
pub const PATH_DB_SEPARATOR: char = '/';
pub const CASEFILE_FOLDER: &str = ".casefile";
pub const DB_FILENAME: &str = "casefile.db";
pub const ORIGINALS_FOLDER: &str = "originals";
pub const DERIVED_FOLDER: &str = "derived";
pub const STAGING_FOLDER: &str = "staging";

// Derived asset naming: edited_<timestamp>_<suffix>_<source stem>.<ext>
pub const DERIVED_PREFIX: &str = "edited_";
pub const DERIVED_SUFFIX_BYTES: usize = 4;
pub const DERIVED_NAME_ATTEMPTS: usize = 16;
pub const STAGING_EXTENSION: &str = "part";

// Encoding
pub const DERIVED_FORMAT: &str = "jpeg";
pub const DERIVED_EXTENSION: &str = "jpg";
pub const DERIVED_MIME_TYPE: &str = "image/jpeg";
pub const DERIVED_JPEG_QUALITY: u8 = 85;

// Preview working copy (longest edge, pixels)
pub const PREVIEW_MAX_EDGE: u32 = 1280;

// Orphan sweep: derived files younger than this are left alone, a commit may
// still be between rename and record write.
pub const ORPHAN_GRACE_SECONDS: u64 = 600;

// EditSpec domains
pub const ROTATION_LIMIT_DEGREES: f32 = 360.0;
pub const ADJUSTMENT_MIN: f32 = 0.0;
pub const ADJUSTMENT_MAX: f32 = 200.0;
pub const ADJUSTMENT_IDENTITY: f32 = 100.0;
pub const CROP_MIN_EXTENT: f32 = 1.0;

// Hashing
pub const HASH_ALGORITHM: &str = "blake3";
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB

// Video extensions (recorded but never transformed)
pub const VIDEO_EXTENSIONS: [&str; 10] = [
    "mp4", "mov", "avi", "mkv", "m4v", "webm", "mts", "m2ts", "3gp", "wmv",
];

// Image extensions accepted by import
pub const IMAGE_EXTENSIONS: [&str; 8] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp",
];
