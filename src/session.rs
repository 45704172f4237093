// Edit session
//
// One per editing UI. Holds a preview-sized working copy of the source and
// the undo/redo history; consumed by commit or dropped on cancel.

use std::path::Path;

use image::{imageops, RgbaImage};

use crate::db::schema::{MediaAsset, MediaType};
use crate::edit::history::HistoryManager;
use crate::edit::EditSpec;
use crate::error::{MediaError, Result};
use crate::pipeline::{self, encode};
use crate::preview::{self, PreviewFrame};
use crate::settings::PipelineSettings;
use crate::store::AssetStore;

#[derive(Debug)]
pub struct EditSession {
    source_id: i64,
    full_dims: (u32, u32),
    working: RgbaImage,
    history: HistoryManager,
}

/// Downscale so the longest edge is at most `max_edge`. Smaller images are
/// returned unchanged.
pub fn working_copy(img: RgbaImage, max_edge: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if longest <= max_edge || max_edge == 0 {
        return img;
    }
    let scale = max_edge as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    imageops::resize(&img, nw, nh, imageops::FilterType::Triangle)
}

impl EditSession {
    /// Start a session over already-decoded pixels.
    pub fn from_image(source_id: i64, full_dims: (u32, u32), working: RgbaImage) -> Self {
        Self {
            source_id,
            full_dims,
            working,
            history: HistoryManager::default(),
        }
    }

    /// Load and downscale the source asset.
    pub fn open(
        store: &dyn AssetStore,
        library_root: &Path,
        source_id: i64,
        settings: &PipelineSettings,
    ) -> Result<Self> {
        let source: MediaAsset = store
            .get_asset(source_id)?
            .ok_or(MediaError::NotFound(source_id))?;
        if source.media_type == MediaType::Video {
            return Err(MediaError::NotImplemented(format!("video editing (asset {})", source_id)));
        }

        let bytes = pipeline::read_asset_bytes(library_root, &source)?;
        let decoded = encode::decode(&bytes)?;
        let full_dims = decoded.pixels.dimensions();
        let working = working_copy(decoded.pixels, settings.preview_max_edge);
        log::debug!(
            "Edit session for asset {}: {}x{} working copy of {}x{}",
            source_id,
            working.width(),
            working.height(),
            full_dims.0,
            full_dims.1
        );

        Ok(Self::from_image(source_id, full_dims, working))
    }

    pub fn source_id(&self) -> i64 {
        self.source_id
    }

    pub fn full_dimensions(&self) -> (u32, u32) {
        self.full_dims
    }

    pub fn working(&self) -> &RgbaImage {
        &self.working
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn current_spec(&self) -> &EditSpec {
        self.history.current()
    }

    /// Validate and preview `spec`, then record it. A rejected spec leaves
    /// the history unchanged.
    pub fn apply(&mut self, spec: EditSpec) -> Result<PreviewFrame> {
        let frame = preview::render_scaled(&self.working, &spec, self.full_dims)?;
        self.history.push(spec);
        Ok(frame)
    }

    pub fn undo(&mut self) -> Result<Option<PreviewFrame>> {
        match self.history.undo() {
            Some(_) => self.render().map(Some),
            None => Ok(None),
        }
    }

    pub fn redo(&mut self) -> Result<Option<PreviewFrame>> {
        match self.history.redo() {
            Some(_) => self.render().map(Some),
            None => Ok(None),
        }
    }

    /// Preview of the current history entry
    pub fn render(&self) -> Result<PreviewFrame> {
        Ok(preview::render_scaled(&self.working, self.history.current(), self.full_dims)?)
    }

    pub fn into_spec(self) -> EditSpec {
        *self.history.current()
    }

    /// Commit the current spec against the full-resolution source.
    pub fn commit(
        self,
        store: &dyn AssetStore,
        library_root: &Path,
        settings: &PipelineSettings,
    ) -> Result<MediaAsset> {
        let source_id = self.source_id;
        let spec = self.into_spec();
        pipeline::commit_transform(store, library_root, source_id, &spec, settings)
    }
}
