// Per-library pipeline settings
// Stored as JSON in the library DB settings KV table under "pipeline".
// Missing keys fall back to the constants defaults.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::constants::{DERIVED_JPEG_QUALITY, ORPHAN_GRACE_SECONDS, PREVIEW_MAX_EDGE};
use crate::db::schema;
use crate::error::{MediaError, Result};

const PIPELINE_SETTINGS_KEY: &str = "pipeline";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineSettings {
    /// JPEG quality for derived assets (1-100)
    pub jpeg_quality: u8,
    /// Longest edge of the preview working copy
    pub preview_max_edge: u32,
    /// Minimum age before the sweep may delete an unreferenced derived file
    pub orphan_grace_seconds: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            jpeg_quality: DERIVED_JPEG_QUALITY,
            preview_max_edge: PREVIEW_MAX_EDGE,
            orphan_grace_seconds: ORPHAN_GRACE_SECONDS,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(MediaError::Other(format!(
                "jpegQuality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.preview_max_edge == 0 {
            return Err(MediaError::Other("previewMaxEdge must be positive".to_string()));
        }
        Ok(())
    }
}

/// Load settings, falling back to defaults when none are stored.
pub fn load_pipeline_settings(conn: &Connection) -> Result<PipelineSettings> {
    match schema::get_setting(conn, PIPELINE_SETTINGS_KEY)? {
        Some(json) => {
            let settings: PipelineSettings = serde_json::from_str(&json)?;
            settings.validate()?;
            Ok(settings)
        }
        None => Ok(PipelineSettings::default()),
    }
}

pub fn save_pipeline_settings(conn: &Connection, settings: &PipelineSettings) -> Result<()> {
    settings.validate()?;
    let json = serde_json::to_string(settings)?;
    schema::set_setting(conn, PIPELINE_SETTINGS_KEY, &json)
}

/// Apply a single `key=value` change (camelCase key) and persist it.
pub fn set_pipeline_setting(conn: &Connection, key: &str, value: &str) -> Result<PipelineSettings> {
    let current = load_pipeline_settings(conn)?;
    let mut json = serde_json::to_value(&current)?;
    let parsed: serde_json::Value = serde_json::from_str(value)
        .map_err(|e| MediaError::Other(format!("Invalid value for {}: {}", key, e)))?;

    match json.as_object_mut() {
        Some(obj) if obj.contains_key(key) => {
            obj.insert(key.to_string(), parsed);
        }
        _ => return Err(MediaError::Other(format!("Unknown setting: {}", key))),
    }

    let updated: PipelineSettings = serde_json::from_value(json)?;
    save_pipeline_settings(conn, &updated)?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_test_db;

    #[test]
    fn test_defaults_when_unset() {
        let conn = open_test_db();
        assert_eq!(load_pipeline_settings(&conn).unwrap(), PipelineSettings::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let conn = open_test_db();
        schema::set_setting(&conn, PIPELINE_SETTINGS_KEY, r#"{"jpegQuality": 70}"#).unwrap();
        let settings = load_pipeline_settings(&conn).unwrap();
        assert_eq!(settings.jpeg_quality, 70);
        assert_eq!(settings.preview_max_edge, PREVIEW_MAX_EDGE);
    }

    #[test]
    fn test_set_single_setting() {
        let conn = open_test_db();
        let updated = set_pipeline_setting(&conn, "orphanGraceSeconds", "30").unwrap();
        assert_eq!(updated.orphan_grace_seconds, 30);
        assert_eq!(load_pipeline_settings(&conn).unwrap().orphan_grace_seconds, 30);
    }

    #[test]
    fn test_rejects_unknown_and_invalid() {
        let conn = open_test_db();
        assert!(set_pipeline_setting(&conn, "nope", "1").is_err());
        assert!(set_pipeline_setting(&conn, "jpegQuality", "0").is_err());
        assert!(set_pipeline_setting(&conn, "jpegQuality", "300").is_err());
        assert_eq!(load_pipeline_settings(&conn).unwrap(), PipelineSettings::default());
    }
}
