// Casefile Media - Library Entry Point
//
// Media transformation and versioning core. Two boundaries face callers:
// interactive preview (pure, in-memory) and commit (persists a new derived
// asset). Everything else here supports those two.

pub mod constants;
pub mod error;
pub mod db;
pub mod hash;
pub mod edit;
pub mod preview;
pub mod pipeline;
pub mod store;
pub mod settings;
pub mod ingest;
pub mod session;

use std::path::Path;

use image::RgbaImage;

pub use db::schema::{MediaAsset, MediaType, MetadataUpdate, NewMediaAsset};
pub use edit::history::HistoryManager;
pub use edit::{CropRect, EditSpec, Filter};
pub use error::{MediaError, Result, ValidationError};
pub use preview::{PreviewFrame, ViewTransform};
pub use session::EditSession;
pub use settings::PipelineSettings;
pub use store::{AssetStore, SqliteAssetStore};

/// Preview boundary: render `spec` over in-memory pixels.
pub fn preview_transform(source: &RgbaImage, spec: &EditSpec) -> Result<PreviewFrame> {
    Ok(preview::render(source, spec)?)
}

/// Commit boundary: apply `spec` to asset `source_id` in the library at
/// `library_root`, using a fresh connection and the library's settings.
pub fn commit_transform(library_root: &Path, source_id: i64, spec: &EditSpec) -> Result<MediaAsset> {
    let store = SqliteAssetStore::open(library_root)?;
    let settings = settings::load_pipeline_settings(store.connection())?;
    pipeline::commit_transform(&store, library_root, source_id, spec, &settings)
}

pub fn get_asset(library_root: &Path, id: i64) -> Result<MediaAsset> {
    let store = SqliteAssetStore::open(library_root)?;
    store.get_asset(id)?.ok_or(MediaError::NotFound(id))
}

/// Metadata-only path; the redirect target for `NoOpEdit`.
pub fn update_asset_metadata(library_root: &Path, id: i64, update: &MetadataUpdate) -> Result<MediaAsset> {
    let store = SqliteAssetStore::open(library_root)?;
    store.update_asset_metadata(id, update)?;
    store.get_asset(id)?.ok_or(MediaError::NotFound(id))
}

/// `id` followed by each ancestor back to its original.
pub fn lineage(library_root: &Path, id: i64) -> Result<Vec<MediaAsset>> {
    let store = SqliteAssetStore::open(library_root)?;
    db::schema::get_lineage(store.connection(), id)
}

/// Direct derived children of `id`, oldest first.
pub fn derived_from(library_root: &Path, id: i64) -> Result<Vec<MediaAsset>> {
    let store = SqliteAssetStore::open(library_root)?;
    db::schema::list_derived_from(store.connection(), id)
}

/// Check an asset's stored bytes against its recorded hash and dimensions.
pub fn verify_asset_bytes(library_root: &Path, id: i64) -> Result<pipeline::AssetCheck> {
    let asset = get_asset(library_root, id)?;
    pipeline::verify_asset_bytes(library_root, &asset)
}

/// Remove staging leftovers and unreferenced derived files.
pub fn sweep_orphans(library_root: &Path, dry_run: bool) -> Result<pipeline::storage::SweepReport> {
    let store = SqliteAssetStore::open(library_root)?;
    let settings = settings::load_pipeline_settings(store.connection())?;
    let referenced = db::schema::list_referenced_paths(store.connection())?;
    pipeline::storage::sweep_orphans(
        library_root,
        &referenced,
        std::time::Duration::from_secs(settings.orphan_grace_seconds),
        dry_run,
    )
}
