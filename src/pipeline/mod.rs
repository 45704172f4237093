// Commit pipeline
//
// Turns a stored image plus an EditSpec into a new immutable derived asset.
// Stages run in a fixed order: geometry (rotate, crop), tone (brightness,
// contrast, saturation), filter, encode, persist, record. The source asset
// and its bytes are never modified.

pub mod adjust;
pub mod encode;
pub mod filters;
pub mod geometry;
pub mod storage;

use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use crate::constants::{
    DERIVED_FORMAT, DERIVED_MIME_TYPE, PIPELINE_VERSION, VERSION_DERIVED_PREFIX,
};
use crate::db::schema::{MediaAsset, MediaType, NewMediaAsset};
use crate::edit::geometry::{output_dimensions, resolve_crop};
use crate::edit::EditSpec;
use crate::error::{MediaError, Result};
use crate::hash::{compute_hash_from_bytes, verify_hash};
use crate::settings::PipelineSettings;
use crate::store::AssetStore;

/// Provenance tag for assets written by this pipeline version
pub fn derived_version() -> String {
    format!("{}{}", VERSION_DERIVED_PREFIX, PIPELINE_VERSION)
}

/// Read the stored bytes of an asset. A missing file is reported as the
/// asset not being found.
pub fn read_asset_bytes(library_root: &Path, asset: &MediaAsset) -> Result<Vec<u8>> {
    match fs::read(library_root.join(&asset.path)) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Asset {} bytes missing at {}", asset.id, asset.path);
            Err(MediaError::NotFound(asset.id))
        }
        Err(e) => Err(e.into()),
    }
}

fn map_validation(err: crate::error::ValidationError) -> MediaError {
    if err.is_crop() {
        MediaError::InvalidCrop(err.to_string())
    } else {
        MediaError::Validation(err)
    }
}

/// Encoded output of a transform, before anything touches disk.
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Run the pixel stages on decoded source bytes and encode the result.
pub fn render_derived(source_bytes: &[u8], spec: &EditSpec, jpeg_quality: u8) -> Result<RenderedImage> {
    let started = Instant::now();
    let decoded = encode::decode(source_bytes)?;
    let dims = decoded.pixels.dimensions();
    spec.validate(dims).map_err(map_validation)?;
    log::debug!(
        "decode {} {}x{} in {:?}",
        encode::format_name(decoded.format),
        dims.0,
        dims.1,
        started.elapsed()
    );

    let rotated = geometry::rotate(&decoded.pixels, spec.rotation);
    let img = match &spec.crop {
        Some(crop) => {
            let rect = resolve_crop(crop, rotated.dimensions()).map_err(MediaError::InvalidCrop)?;
            geometry::crop(&rotated, rect)
        }
        None => rotated,
    };
    log::debug!("geometry -> {}x{} at {:?}", img.width(), img.height(), started.elapsed());

    let img = adjust::apply_tone(img, spec.brightness, spec.contrast, spec.saturation);
    let img = filters::apply_filter(img, spec.filter);
    let (width, height) = img.dimensions();

    let bytes = encode::encode_jpeg(&img, jpeg_quality)?;
    let encoded_dims = encode::probe_dimensions(&bytes)
        .map_err(|e| MediaError::EncodeFailure(format!("encoded output unreadable: {}", e)))?;
    if encoded_dims != (width, height) {
        return Err(MediaError::EncodeFailure(format!(
            "encoded {}x{}, expected {}x{}",
            encoded_dims.0, encoded_dims.1, width, height
        )));
    }
    log::debug!("encode {} bytes at {:?}", bytes.len(), started.elapsed());

    Ok(RenderedImage { bytes, width, height })
}

/// Apply `spec` to asset `source_id` and record the result as a new asset.
///
/// Fails with `NoOpEdit` for an identity spec, `NotImplemented` for video,
/// `InvalidCrop` when the crop cannot be resolved. On any failure no record
/// exists and no derived file is left behind.
pub fn commit_transform(
    store: &dyn AssetStore,
    library_root: &Path,
    source_id: i64,
    spec: &EditSpec,
    settings: &PipelineSettings,
) -> Result<MediaAsset> {
    let started = Instant::now();

    let source = store
        .get_asset(source_id)?
        .ok_or(MediaError::NotFound(source_id))?;

    if source.media_type == MediaType::Video {
        return Err(MediaError::NotImplemented(format!(
            "video transforms (asset {})",
            source_id
        )));
    }

    let source_bytes = read_asset_bytes(library_root, &source)?;

    if spec.is_identity() {
        return Err(MediaError::NoOpEdit);
    }

    let rendered = render_derived(&source_bytes, spec, settings.jpeg_quality)?;
    let content_hash = compute_hash_from_bytes(&rendered.bytes);

    let file = storage::persist_derived(library_root, &source.path, &rendered.bytes)?;

    let new_asset = NewMediaAsset {
        path: file.relative_path.clone(),
        thumbnail_path: file.relative_path.clone(),
        width: rendered.width,
        height: rendered.height,
        size_bytes: file.size_bytes as i64,
        mime_type: DERIVED_MIME_TYPE.to_string(),
        original_format: DERIVED_FORMAT.to_string(),
        media_type: MediaType::Image,
        directory: source.directory.clone(),
        tags: source.tags.clone(),
        alt_text: source.alt_text.clone(),
        description: source.description.clone(),
        optimized: true,
        version: derived_version(),
        edited_from: Some(source.id),
        edits: Some(*spec),
        content_hash: Some(content_hash),
        pipeline_version: Some(PIPELINE_VERSION as i32),
    };

    let created = match store.create_asset(&new_asset) {
        Ok(asset) => asset,
        Err(e) => {
            log::warn!("Record write failed for {}, removing file: {}", file.relative_path, e);
            storage::remove_persisted(&file);
            return Err(e);
        }
    };

    log::info!(
        "Committed asset {} from {} ({}x{} -> {}x{}, {} bytes) in {:?}",
        created.id,
        source.id,
        source.width,
        source.height,
        created.width,
        created.height,
        created.size_bytes,
        started.elapsed()
    );

    Ok(created)
}

/// Result of checking an asset's stored bytes against its record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCheck {
    pub hash_matches: Option<bool>,
    pub dimensions_match: Option<bool>,
}

impl AssetCheck {
    pub fn is_ok(&self) -> bool {
        self.hash_matches != Some(false) && self.dimensions_match != Some(false)
    }
}

/// Compare stored bytes with the recorded hash and, for images, the recorded
/// dimensions. Checks that have nothing to compare against are `None`.
pub fn verify_asset_bytes(library_root: &Path, asset: &MediaAsset) -> Result<AssetCheck> {
    let path = library_root.join(&asset.path);
    if !path.exists() {
        return Err(MediaError::NotFound(asset.id));
    }

    let hash_matches = match &asset.content_hash {
        Some(expected) => Some(verify_hash(&path, expected)?),
        None => None,
    };

    let dimensions_match = match asset.media_type {
        MediaType::Image => {
            let bytes = fs::read(&path)?;
            let dims = encode::probe_dimensions(&bytes)?;
            Some(dims == (asset.width, asset.height))
        }
        MediaType::Video => None,
    };

    Ok(AssetCheck { hash_matches, dimensions_match })
}

/// Dimensions a commit of `spec` would produce for a `width` x `height` source.
pub fn expected_output_dimensions(width: u32, height: u32, spec: &EditSpec) -> Result<(u32, u32)> {
    spec.validate((width, height)).map_err(map_validation)?;
    output_dimensions(width, height, spec.rotation, spec.crop.as_ref()).map_err(MediaError::InvalidCrop)
}
