// File discovery for import

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::constants::{CASEFILE_FOLDER, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS};
use crate::db::schema::MediaType;
use crate::error::{MediaError, Result};

/// Discover importable files under `source_path` (or the file itself),
/// sorted by path. Library metadata folders are skipped.
pub fn discover_media_files(source_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if source_path.is_file() {
        if media_type_for(source_path).is_some() {
            files.push(source_path.to_path_buf());
        }
    } else if source_path.is_dir() {
        for entry in WalkDir::new(source_path)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| e.file_name() != CASEFILE_FOLDER)
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && media_type_for(path).is_some() {
                files.push(path.to_path_buf());
            }
        }
    } else {
        return Err(MediaError::InvalidPath(format!(
            "{} does not exist",
            source_path.display()
        )));
    }

    files.sort();
    Ok(files)
}

/// Media type by extension, `None` for anything not importable
pub fn media_type_for(path: &Path) -> Option<MediaType> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaType::Video)
    } else {
        None
    }
}

/// Best-effort MIME type for a video container
pub fn video_mime_type(path: &Path) -> String {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mts" | "m2ts" => "video/mp2t",
        "3gp" => "video/3gpp",
        "wmv" => "video/x-ms-wmv",
        _ => "application/octet-stream",
    }
    .to_string()
}
