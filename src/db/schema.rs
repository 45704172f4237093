// Database schema types and query helpers

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::edit::EditSpec;
use crate::error::{MediaError, Result};

// ----- MediaType -----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }
}

impl FromStr for MediaType {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            other => Err(MediaError::Other(format!("Unknown media type: {}", other))),
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ----- MediaAsset -----

/// A stored media asset. Rows with `edited_from` set are pipeline output and
/// never change after creation, apart from free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: i64,
    /// Library-relative path of the stored bytes
    pub path: String,
    pub thumbnail_path: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: i64,
    pub mime_type: String,
    pub original_format: String,
    pub media_type: MediaType,
    pub directory: String,
    pub tags: Vec<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub optimized: bool,
    pub version: String,
    pub edited_from: Option<i64>,
    pub edits: Option<EditSpec>,
    pub content_hash: Option<String>,
    pub pipeline_version: Option<i32>,
    pub uploaded_at: String,
    pub updated_at: String,
}

impl MediaAsset {
    pub fn is_derived(&self) -> bool {
        self.edited_from.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewMediaAsset {
    pub path: String,
    pub thumbnail_path: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: i64,
    pub mime_type: String,
    pub original_format: String,
    pub media_type: MediaType,
    pub directory: String,
    pub tags: Vec<String>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub optimized: bool,
    pub version: String,
    pub edited_from: Option<i64>,
    pub edits: Option<EditSpec>,
    pub content_hash: Option<String>,
    pub pipeline_version: Option<i32>,
}

/// Free-form metadata changes. `None` leaves a field as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdate {
    pub tags: Option<Vec<String>>,
    pub alt_text: Option<String>,
    pub description: Option<String>,
    pub directory: Option<String>,
}

impl MetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none()
            && self.alt_text.is_none()
            && self.description.is_none()
            && self.directory.is_none()
    }
}

const ASSET_COLUMNS: &str = "id, path, thumbnail_path, width, height, size_bytes, mime_type,
    original_format, media_type, directory, tags, alt_text, description, optimized, version,
    edited_from, edits, content_hash, pipeline_version, uploaded_at, updated_at";

fn conversion_error(col: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(err))
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<MediaAsset> {
    let media_type: String = row.get(8)?;
    let tags: String = row.get(10)?;
    let edits: Option<String> = row.get(16)?;

    Ok(MediaAsset {
        id: row.get(0)?,
        path: row.get(1)?,
        thumbnail_path: row.get(2)?,
        width: row.get(3)?,
        height: row.get(4)?,
        size_bytes: row.get(5)?,
        mime_type: row.get(6)?,
        original_format: row.get(7)?,
        media_type: media_type.parse().map_err(|e| conversion_error(8, e))?,
        directory: row.get(9)?,
        tags: serde_json::from_str(&tags).map_err(|e| conversion_error(10, e))?,
        alt_text: row.get(11)?,
        description: row.get(12)?,
        optimized: row.get(13)?,
        version: row.get(14)?,
        edited_from: row.get(15)?,
        edits: edits
            .map(|json| EditSpec::from_json(&json))
            .transpose()
            .map_err(|e| conversion_error(16, e))?,
        content_hash: row.get(17)?,
        pipeline_version: row.get(18)?,
        uploaded_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn insert_asset(conn: &Connection, asset: &NewMediaAsset) -> Result<i64> {
    let tags = serde_json::to_string(&asset.tags)?;
    let edits = asset.edits.as_ref().map(EditSpec::to_json).transpose()?;
    let now = now_timestamp();

    conn.execute(
        "INSERT INTO media_assets (path, thumbnail_path, width, height, size_bytes, mime_type,
            original_format, media_type, directory, tags, alt_text, description, optimized,
            version, edited_from, edits, content_hash, pipeline_version, uploaded_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?19)",
        params![
            asset.path,
            asset.thumbnail_path,
            asset.width,
            asset.height,
            asset.size_bytes,
            asset.mime_type,
            asset.original_format,
            asset.media_type.as_str(),
            asset.directory,
            tags,
            asset.alt_text,
            asset.description,
            asset.optimized,
            asset.version,
            asset.edited_from,
            edits,
            asset.content_hash,
            asset.pipeline_version,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_asset(conn: &Connection, id: i64) -> Result<Option<MediaAsset>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM media_assets WHERE id = ?1", ASSET_COLUMNS),
        params![id],
        asset_from_row,
    ).optional()?;
    Ok(result)
}

/// An asset whose stored bytes hash to `content_hash`, lowest id first.
pub fn find_asset_by_hash(conn: &Connection, content_hash: &str) -> Result<Option<MediaAsset>> {
    let result = conn.query_row(
        &format!("SELECT {} FROM media_assets WHERE content_hash = ?1 ORDER BY id ASC LIMIT 1", ASSET_COLUMNS),
        params![content_hash],
        asset_from_row,
    ).optional()?;
    Ok(result)
}

pub fn list_assets(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<MediaAsset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM media_assets ORDER BY id DESC LIMIT ?1 OFFSET ?2",
        ASSET_COLUMNS
    ))?;
    let assets = stmt
        .query_map(params![limit, offset], asset_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(assets)
}

pub fn count_assets(conn: &Connection) -> Result<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM media_assets", [], |row| row.get(0))?;
    Ok(count)
}

/// Direct children of an asset, oldest first.
pub fn list_derived_from(conn: &Connection, source_id: i64) -> Result<Vec<MediaAsset>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM media_assets WHERE edited_from = ?1 ORDER BY id ASC",
        ASSET_COLUMNS
    ))?;
    let assets = stmt
        .query_map(params![source_id], asset_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(assets)
}

/// Walk `edited_from` from `id` back to its original. The first element is
/// the asset itself, the last is the root. Every step must point to a
/// strictly earlier asset.
pub fn get_lineage(conn: &Connection, id: i64) -> Result<Vec<MediaAsset>> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(id);

    while let Some(current_id) = next {
        if !seen.insert(current_id) {
            return Err(MediaError::Lineage(format!("cycle at asset {}", current_id)));
        }
        let asset = get_asset(conn, current_id)?.ok_or(MediaError::NotFound(current_id))?;
        if let Some(parent) = asset.edited_from {
            if parent >= asset.id {
                return Err(MediaError::Lineage(format!(
                    "asset {} points to later asset {}",
                    asset.id, parent
                )));
            }
        }
        next = asset.edited_from;
        chain.push(asset);
    }

    Ok(chain)
}

pub fn update_asset_metadata(conn: &Connection, id: i64, update: &MetadataUpdate) -> Result<()> {
    let tags = update.tags.as_ref().map(serde_json::to_string).transpose()?;
    let changed = conn.execute(
        "UPDATE media_assets
         SET tags = COALESCE(?1, tags),
             alt_text = COALESCE(?2, alt_text),
             description = COALESCE(?3, description),
             directory = COALESCE(?4, directory),
             updated_at = ?5
         WHERE id = ?6",
        params![
            tags,
            update.alt_text,
            update.description,
            update.directory,
            now_timestamp(),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(MediaError::NotFound(id));
    }
    Ok(())
}

/// Every stored path (asset and thumbnail) referenced by a record.
pub fn list_referenced_paths(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare("SELECT path, thumbnail_path FROM media_assets")?;
    let mut paths = HashSet::new();
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (path, thumb) = row?;
        paths.insert(path);
        paths.insert(thumb);
    }
    Ok(paths)
}

// ----- Settings (KV) -----

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    ).optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}
