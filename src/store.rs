// Asset store boundary
//
// The commit pipeline only needs fetch, append-only create and metadata
// updates. SqliteAssetStore is the library-DB implementation; each unit of
// work opens its own, connections are not shared across threads.

use std::path::Path;

use rusqlite::Connection;

use crate::db::{self, schema};
use crate::db::schema::{MediaAsset, MetadataUpdate, NewMediaAsset};
use crate::error::{MediaError, Result};

pub trait AssetStore {
    fn get_asset(&self, id: i64) -> Result<Option<MediaAsset>>;

    /// Append a new asset and return it as stored.
    fn create_asset(&self, asset: &NewMediaAsset) -> Result<MediaAsset>;

    /// Tags, alt text, description and directory only.
    fn update_asset_metadata(&self, id: i64, update: &MetadataUpdate) -> Result<()>;
}

pub struct SqliteAssetStore {
    conn: Connection,
}

impl SqliteAssetStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the library DB under `library_root`.
    pub fn open(library_root: &Path) -> Result<Self> {
        let conn = db::open_library_db_connection(library_root)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl AssetStore for SqliteAssetStore {
    fn get_asset(&self, id: i64) -> Result<Option<MediaAsset>> {
        schema::get_asset(&self.conn, id)
    }

    fn create_asset(&self, asset: &NewMediaAsset) -> Result<MediaAsset> {
        if let Some(parent) = asset.edited_from {
            if schema::get_asset(&self.conn, parent)?.is_none() {
                return Err(MediaError::Lineage(format!("parent asset {} does not exist", parent)));
            }
        }
        let id = schema::insert_asset(&self.conn, asset)?;
        schema::get_asset(&self.conn, id)?.ok_or(MediaError::NotFound(id))
    }

    fn update_asset_metadata(&self, id: i64, update: &MetadataUpdate) -> Result<()> {
        schema::update_asset_metadata(&self.conn, id, update)
    }
}

impl std::fmt::Debug for SqliteAssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAssetStore")
            .field("path", &self.conn.path())
            .finish()
    }
}
