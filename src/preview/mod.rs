// Preview engine
//
// Fast approximation of an edit for live feedback. Tone and filter are baked
// into a copy of the source pixels; rotation and crop are returned as a view
// transform (affine matrix + clip) for the display layer to apply. Nothing
// here touches disk or the asset store.

pub mod presets;
pub mod tone;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::edit::geometry::{rotated_dimensions, rotation_matrix};
use crate::edit::EditSpec;
use crate::error::ValidationError;

/// Clip rectangle on the rotated canvas, in (fractional) canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Display-layer geometry for a preview frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewTransform {
    pub rotation_degrees: f32,
    /// `[a, b, c, d, e, f]`: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`
    pub matrix: [f64; 6],
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub clip: Option<ClipRect>,
}

impl ViewTransform {
    pub fn for_spec(width: u32, height: u32, spec: &EditSpec) -> Self {
        let (canvas_width, canvas_height) = rotated_dimensions(width, height, spec.rotation);
        let clip = spec.crop.map(|c| ClipRect {
            x: c.x as f64 / 100.0 * canvas_width as f64,
            y: c.y as f64 / 100.0 * canvas_height as f64,
            width: c.width as f64 / 100.0 * canvas_width as f64,
            height: c.height as f64 / 100.0 * canvas_height as f64,
        });
        Self {
            rotation_degrees: spec.rotation,
            matrix: rotation_matrix(width, height, spec.rotation),
            canvas_width,
            canvas_height,
            clip,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.rotation_degrees == 0.0 && self.clip.is_none()
    }

    /// Size of the visible viewport after clipping.
    pub fn viewport_size(&self) -> (f64, f64) {
        match self.clip {
            Some(c) => (c.width, c.height),
            None => (self.canvas_width as f64, self.canvas_height as f64),
        }
    }
}

/// Output of a preview render.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    /// Tone- and filter-adjusted pixels, same size as the input buffer.
    pub pixels: RgbaImage,
    pub view: ViewTransform,
}

impl PreviewFrame {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Rasterize the view transform into a new buffer. Used when a consumer
    /// cannot apply the matrix itself (CLI export, snapshot tests).
    pub fn bake(&self) -> RgbaImage {
        let rotated = crate::pipeline::geometry::rotate(&self.pixels, self.view.rotation_degrees);
        match self.view.clip {
            Some(c) => {
                let (w, h) = rotated.dimensions();
                let x = (c.x.round() as u32).min(w.saturating_sub(1));
                let y = (c.y.round() as u32).min(h.saturating_sub(1));
                let cw = (c.width.round() as u32).clamp(1, w - x);
                let ch = (c.height.round() as u32).clamp(1, h - y);
                image::imageops::crop_imm(&rotated, x, y, cw, ch).to_image()
            }
            None => rotated,
        }
    }
}

/// Render a preview of `spec` over `source`. Idempotent and side-effect free.
pub fn render(source: &RgbaImage, spec: &EditSpec) -> Result<PreviewFrame, ValidationError> {
    render_scaled(source, spec, source.dimensions())
}

/// Render over a downscaled working copy while validating against the
/// full-resolution dimensions the commit pipeline will see.
pub fn render_scaled(
    working: &RgbaImage,
    spec: &EditSpec,
    full_dims: (u32, u32),
) -> Result<PreviewFrame, ValidationError> {
    spec.validate(full_dims)?;
    let (w, h) = working.dimensions();
    if w == 0 || h == 0 {
        return Err(ValidationError::EmptySource(w, h));
    }

    let mut pixels = working.clone();
    let tone = tone::ToneCurve::new(spec.brightness, spec.contrast, spec.saturation);
    let preset = presets::preset_for(spec.filter);

    if !tone.is_identity() || preset.is_some() {
        for px in pixels.pixels_mut() {
            let [r, g, b, a] = px.0;
            let mut rgb = tone.apply([r, g, b]);
            if let Some(preset) = preset {
                rgb = preset(rgb);
            }
            px.0 = [
                tone::to_channel(rgb[0]),
                tone::to_channel(rgb[1]),
                tone::to_channel(rgb[2]),
                a,
            ];
        }
    }

    Ok(PreviewFrame {
        pixels,
        view: ViewTransform::for_spec(w, h, spec),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{CropRect, Filter};
    use image::Rgba;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 90, 200])
        })
    }

    #[test]
    fn test_identity_render_is_unchanged() {
        let src = gradient(16, 8);
        let frame = render(&src, &EditSpec::default()).unwrap();
        assert_eq!(frame.pixels, src);
        assert!(frame.view.is_identity());
    }

    #[test]
    fn test_render_is_idempotent() {
        let src = gradient(16, 8);
        let spec = EditSpec {
            brightness: 130.0,
            contrast: 80.0,
            saturation: 150.0,
            filter: Filter::Warm,
            ..EditSpec::default()
        };
        let a = render(&src, &spec).unwrap();
        let b = render(&src, &spec).unwrap();
        assert_eq!(a.pixels, b.pixels);
        assert_eq!(a.view, b.view);
    }

    #[test]
    fn test_alpha_untouched() {
        let src = gradient(8, 8);
        let spec = EditSpec { brightness: 180.0, filter: Filter::Sepia, ..EditSpec::default() };
        let frame = render(&src, &spec).unwrap();
        for (a, b) in src.pixels().zip(frame.pixels.pixels()) {
            assert_eq!(a.0[3], b.0[3]);
        }
    }

    #[test]
    fn test_brightness_is_monotonic() {
        let src = gradient(32, 32);
        let steps = [0.0, 25.0, 50.0, 75.0, 100.0];
        for pair in steps.windows(2) {
            let lo = render(&src, &EditSpec { brightness: pair[0], ..EditSpec::default() }).unwrap();
            let hi = render(&src, &EditSpec { brightness: pair[1], ..EditSpec::default() }).unwrap();
            for (l, h) in lo.pixels.pixels().zip(hi.pixels.pixels()) {
                for c in 0..3 {
                    assert!(l.0[c] <= h.0[c], "brightness {} vs {}", pair[0], pair[1]);
                }
            }
        }
    }

    #[test]
    fn test_geometry_is_view_only() {
        let src = gradient(100, 50);
        let spec = EditSpec {
            rotation: 90.0,
            crop: Some(CropRect::new(0.0, 0.0, 100.0, 50.0)),
            ..EditSpec::default()
        };
        let frame = render(&src, &spec).unwrap();
        assert_eq!(frame.pixels, src);
        assert_eq!((frame.view.canvas_width, frame.view.canvas_height), (50, 100));
        assert_eq!(frame.view.viewport_size(), (50.0, 50.0));

        let baked = frame.bake();
        assert_eq!(baked.dimensions(), (50, 50));
    }

    #[test]
    fn test_invalid_spec_rejected_before_render() {
        let src = gradient(10, 10);
        let spec = EditSpec { brightness: 250.0, ..EditSpec::default() };
        assert!(render(&src, &spec).is_err());
    }

    #[test]
    fn test_render_scaled_validates_against_full_size() {
        let working = gradient(20, 20);
        let spec = EditSpec {
            crop: Some(CropRect::new(0.0, 0.0, 2.0, 2.0)),
            ..EditSpec::default()
        };
        // 2% of 20px rounds to 0, but the full-size source has room.
        assert!(render(&working, &spec).is_err());
        let frame = render_scaled(&working, &spec, (2000, 2000)).unwrap();
        assert!(frame.view.clip.is_some());
    }
}
