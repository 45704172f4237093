// Import module
//
// Brings original files into the library: verified copy into originals/,
// header probe for dimensions and format, BLAKE3 hash, and an "original"
// asset record. Identical content already in the library is not imported
// twice.

pub mod copy;
pub mod discover;

use std::fs;
use std::path::Path;

use image::ImageReader;
use rusqlite::Connection;
use serde::Serialize;

use crate::constants::{ORIGINALS_FOLDER, VERSION_ORIGINAL};
use crate::db::schema::{self, MediaAsset, MediaType, NewMediaAsset};
use crate::error::{MediaError, Result};
use crate::hash::compute_full_hash;
use crate::pipeline::encode;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub directory: String,
    pub tags: Vec<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub asset: MediaAsset,
    /// True when the content was already in the library and nothing was copied
    pub duplicate: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub total_files: usize,
    pub imported: Vec<i64>,
    pub skipped: usize,
    pub failed: usize,
}

struct Probe {
    media_type: MediaType,
    width: u32,
    height: u32,
    mime_type: String,
    original_format: String,
}

fn probe(source: &Path) -> Result<Probe> {
    let media_type = discover::media_type_for(source).ok_or_else(|| {
        MediaError::InvalidPath(format!("Unsupported file type: {}", source.display()))
    })?;

    match media_type {
        MediaType::Image => {
            let reader = ImageReader::open(source)?.with_guessed_format()?;
            let format = reader.format();
            let (width, height) = reader
                .into_dimensions()
                .map_err(|e| MediaError::DecodeFailure(format!("{}: {}", source.display(), e)))?;
            Ok(Probe {
                media_type,
                width,
                height,
                mime_type: encode::mime_type(format),
                original_format: encode::format_name(format),
            })
        }
        // Videos are recorded without decoding; they are never transformed.
        MediaType::Video => Ok(Probe {
            media_type,
            width: 0,
            height: 0,
            mime_type: discover::video_mime_type(source),
            original_format: source
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default(),
        }),
    }
}

/// Import one file as an original asset.
pub fn import_original(
    conn: &Connection,
    library_root: &Path,
    source: &Path,
    options: &ImportOptions,
) -> Result<ImportOutcome> {
    if !source.is_file() {
        return Err(MediaError::InvalidPath(format!("Not a file: {}", source.display())));
    }

    let probe = probe(source)?;

    let source_hash = compute_full_hash(source)?;
    if let Some(existing) = schema::find_asset_by_hash(conn, &source_hash)? {
        log::info!("Skipping {}: same content as asset {}", source.display(), existing.id);
        return Ok(ImportOutcome { asset: existing, duplicate: true });
    }

    let dest = copy::copy_file_to_originals(source, &library_root.join(ORIGINALS_FOLDER))?;
    let relative = copy::library_relative(library_root, &dest)?;
    let size_bytes = fs::metadata(&dest)?.len() as i64;

    let new_asset = NewMediaAsset {
        path: relative.clone(),
        thumbnail_path: relative.clone(),
        width: probe.width,
        height: probe.height,
        size_bytes,
        mime_type: probe.mime_type,
        original_format: probe.original_format,
        media_type: probe.media_type,
        directory: options.directory.clone(),
        tags: options.tags.clone(),
        alt_text: options.alt_text.clone(),
        description: options.description.clone(),
        optimized: false,
        version: VERSION_ORIGINAL.to_string(),
        edited_from: None,
        edits: None,
        content_hash: Some(source_hash),
        pipeline_version: None,
    };

    let id = match schema::insert_asset(conn, &new_asset) {
        Ok(id) => id,
        Err(e) => {
            if let Err(rm) = fs::remove_file(&dest) {
                log::warn!("Failed to remove copied file {}: {}", dest.display(), rm);
            }
            return Err(e);
        }
    };

    let asset = schema::get_asset(conn, id)?.ok_or(MediaError::NotFound(id))?;
    log::info!(
        "Imported {} as asset {} ({} {}x{})",
        source.display(),
        asset.id,
        asset.media_type,
        asset.width,
        asset.height
    );
    Ok(ImportOutcome { asset, duplicate: false })
}

/// Import every supported file under `source_path`. Per-file failures are
/// logged and counted; they do not stop the run.
pub fn import_path(
    conn: &Connection,
    library_root: &Path,
    source_path: &Path,
    options: &ImportOptions,
) -> Result<ImportResult> {
    let files = discover::discover_media_files(source_path)?;
    let mut result = ImportResult { total_files: files.len(), ..Default::default() };

    for file in &files {
        match import_original(conn, library_root, file, options) {
            Ok(outcome) if outcome.duplicate => result.skipped += 1,
            Ok(outcome) => result.imported.push(outcome.asset.id),
            Err(e) => {
                log::warn!("Import failed for {}: {}", file.display(), e);
                result.failed += 1;
            }
        }
    }

    log::info!(
        "Import finished: {} files, {} imported, {} skipped, {} failed",
        result.total_files,
        result.imported.len(),
        result.skipped,
        result.failed
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_library_folders, open_library_db_connection};
    use image::{ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;

    fn png(path: &Path, w: u32, h: u32, shade: u8) {
        RgbaImage::from_pixel(w, h, Rgba([shade, shade, shade, 255]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_import_image_records_original() {
        let lib = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        init_library_folders(lib.path()).unwrap();
        let conn = open_library_db_connection(lib.path()).unwrap();
        let file = src.path().join("porch.png");
        png(&file, 64, 32, 10);

        let options = ImportOptions {
            directory: "case-9".to_string(),
            tags: vec!["porch".to_string()],
            ..Default::default()
        };
        let outcome = import_original(&conn, lib.path(), &file, &options).unwrap();
        let asset = outcome.asset;

        assert!(!outcome.duplicate);
        assert_eq!((asset.width, asset.height), (64, 32));
        assert_eq!(asset.media_type, MediaType::Image);
        assert_eq!(asset.mime_type, "image/png");
        assert_eq!(asset.version, "original");
        assert!(!asset.optimized);
        assert!(asset.edited_from.is_none());
        assert!(asset.path.starts_with("originals/"));
        assert!(lib.path().join(&asset.path).exists());
        assert_eq!(asset.content_hash, Some(compute_full_hash(&file).unwrap()));
    }

    #[test]
    fn test_import_same_content_twice() {
        let lib = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let conn = open_library_db_connection(lib.path()).unwrap();
        let file = src.path().join("a.png");
        png(&file, 8, 8, 200);

        let first = import_original(&conn, lib.path(), &file, &ImportOptions::default()).unwrap();
        let second = import_original(&conn, lib.path(), &file, &ImportOptions::default()).unwrap();
        assert!(second.duplicate);
        assert_eq!(first.asset.id, second.asset.id);
        assert_eq!(schema::count_assets(&conn).unwrap(), 1);
    }

    #[test]
    fn test_import_video_without_decoding() {
        let lib = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let conn = open_library_db_connection(lib.path()).unwrap();
        let file = src.path().join("walkthrough.MOV");
        fs::write(&file, b"opaque container bytes").unwrap();

        let asset = import_original(&conn, lib.path(), &file, &ImportOptions::default())
            .unwrap()
            .asset;
        assert_eq!(asset.media_type, MediaType::Video);
        assert_eq!(asset.mime_type, "video/quicktime");
        assert_eq!((asset.width, asset.height), (0, 0));
    }

    #[test]
    fn test_import_path_counts() {
        let lib = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let conn = open_library_db_connection(lib.path()).unwrap();
        png(&src.path().join("one.png"), 4, 4, 1);
        png(&src.path().join("two.png"), 4, 4, 2);
        fs::write(src.path().join("broken.jpg"), b"garbage").unwrap();
        fs::write(src.path().join("notes.txt"), b"ignored").unwrap();

        let result = import_path(&conn, lib.path(), src.path(), &ImportOptions::default()).unwrap();
        assert_eq!(result.total_files, 3);
        assert_eq!(result.imported.len(), 2);
        assert_eq!(result.failed, 1);
    }
}
