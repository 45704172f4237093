// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.

use rusqlite::Connection;
use anyhow::Result;

/// All migrations in order. Each migration is a SQL string.
const MIGRATIONS: &[&str] = &[
    // Migration 1: Initial schema
    r#"
    -- Media assets (originals and pipeline-derived versions)
    CREATE TABLE media_assets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL UNIQUE,
        thumbnail_path TEXT NOT NULL,
        width INTEGER NOT NULL,
        height INTEGER NOT NULL,
        size_bytes INTEGER NOT NULL,
        mime_type TEXT NOT NULL,
        original_format TEXT NOT NULL,
        media_type TEXT NOT NULL CHECK (media_type IN ('image', 'video')),
        directory TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '[]',
        alt_text TEXT,
        description TEXT,
        optimized INTEGER NOT NULL DEFAULT 0,
        version TEXT NOT NULL,
        edited_from INTEGER REFERENCES media_assets(id),
        edits TEXT,
        content_hash TEXT,
        pipeline_version INTEGER,
        uploaded_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        CHECK ((edited_from IS NULL) = (edits IS NULL))
    );

    -- Derived assets are append-only: only free-form metadata may change.
    CREATE TRIGGER media_assets_derived_immutable
    BEFORE UPDATE OF path, thumbnail_path, width, height, size_bytes, mime_type,
                     original_format, media_type, optimized, version, edited_from,
                     edits, content_hash, pipeline_version
    ON media_assets
    WHEN OLD.edited_from IS NOT NULL
    BEGIN
        SELECT RAISE(ABORT, 'derived media assets are immutable');
    END;

    -- Lineage is fixed at creation; an original never gains a parent.
    CREATE TRIGGER media_assets_lineage_fixed
    BEFORE UPDATE OF edited_from ON media_assets
    WHEN NEW.edited_from IS NOT OLD.edited_from
    BEGIN
        SELECT RAISE(ABORT, 'lineage cannot be changed');
    END;

    -- Key/value settings (JSON values)
    CREATE TABLE settings (
        key TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    );

    CREATE INDEX idx_media_assets_edited_from ON media_assets(edited_from);
    CREATE INDEX idx_media_assets_directory ON media_assets(directory);
    CREATE INDEX idx_media_assets_content_hash ON media_assets(content_hash);
    "#,
];

/// Get current schema version from database
fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row(
        "PRAGMA user_version",
        [],
        |row| row.get(0)
    )?;
    Ok(version)
}

/// Run all pending migrations (crash-safe)
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = MIGRATIONS.len() as u32;

    // Refuse to open a DB created by a newer build
    if current_version > target_version {
        anyhow::bail!(
            "Database schema version {} is newer than this build supports (max {}). Please upgrade.",
            current_version,
            target_version
        );
    }

    if current_version == target_version {
        return Ok(());
    }

    // Apply pending migrations one-by-one, each with its version bump in one transaction
    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            migration, migration_version
        ))?;

        log::info!("Applied migration {}", migration_version);
    }

    Ok(())
}
