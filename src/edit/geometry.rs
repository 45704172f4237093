// Geometry shared by the preview view transform and the commit pipeline.

use serde::{Deserialize, Serialize};

use super::CropRect;

// Trig on exact right angles leaves ~1e-13 residue; snap before ceil.
const SNAP_EPSILON: f64 = 1e-6;

/// Integer pixel rectangle on a concrete canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Normalize degrees into [0, 360).
pub fn normalize_degrees(degrees: f32) -> f32 {
    let d = degrees.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

/// Number of clockwise quarter turns when the angle is an exact multiple of 90.
pub fn quarter_turns(degrees: f32) -> Option<u8> {
    let d = normalize_degrees(degrees);
    if d % 90.0 == 0.0 {
        Some((d / 90.0) as u8)
    } else {
        None
    }
}

fn snap_ceil(value: f64) -> u32 {
    let rounded = value.round();
    let v = if (value - rounded).abs() < SNAP_EPSILON { rounded } else { value.ceil() };
    v.max(1.0) as u32
}

/// Canvas size that fully contains a `width` x `height` image rotated by
/// `degrees` about its center.
pub fn rotated_dimensions(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    match quarter_turns(degrees) {
        Some(0) | Some(2) => (width, height),
        Some(_) => (height, width),
        None => {
            let (sin, cos) = (degrees as f64).to_radians().sin_cos();
            let (w, h) = (width as f64, height as f64);
            let new_w = w * cos.abs() + h * sin.abs();
            let new_h = w * sin.abs() + h * cos.abs();
            (snap_ceil(new_w), snap_ceil(new_h))
        }
    }
}

/// 2x3 affine matrix `[a, b, c, d, e, f]` mapping source pixel coordinates
/// onto the rotated canvas: `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
/// Positive degrees rotate clockwise in image (y-down) space.
pub fn rotation_matrix(width: u32, height: u32, degrees: f32) -> [f64; 6] {
    let (canvas_w, canvas_h) = rotated_dimensions(width, height, degrees);
    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let (cx, cy) = (width as f64 / 2.0, height as f64 / 2.0);
    let (ncx, ncy) = (canvas_w as f64 / 2.0, canvas_h as f64 / 2.0);

    // translate(-c) -> rotate -> translate(nc)
    let e = ncx - (cos * cx - sin * cy);
    let f = ncy - (sin * cx + cos * cy);
    [cos, sin, -sin, cos, e, f]
}

/// Resolve a percentage crop against the current canvas, rounding to whole
/// pixels. Errors describe why the rectangle is unusable.
pub fn resolve_crop(crop: &CropRect, canvas: (u32, u32)) -> Result<PixelRect, String> {
    let (w, h) = canvas;
    if crop.width <= 0.0 || crop.height <= 0.0 {
        return Err(format!(
            "non-positive extent {}% x {}%",
            crop.width, crop.height
        ));
    }
    if crop.x < 0.0 || crop.y < 0.0 {
        return Err(format!("negative origin {}%, {}%", crop.x, crop.y));
    }
    if crop.x + crop.width > 100.0 || crop.y + crop.height > 100.0 {
        return Err(format!(
            "rectangle extends past 100% ({}%, {}%)",
            crop.x + crop.width,
            crop.y + crop.height
        ));
    }

    let to_px = |pct: f32, extent: u32| ((pct as f64 / 100.0) * extent as f64).round() as i64;
    let x0 = to_px(crop.x, w);
    let y0 = to_px(crop.y, h);
    let x1 = to_px(crop.x + crop.width, w);
    let y1 = to_px(crop.y + crop.height, h);

    if x1 <= x0 || y1 <= y0 {
        return Err(format!(
            "empty pixel rectangle ({}..{}, {}..{})",
            x0, x1, y0, y1
        ));
    }
    if x1 > w as i64 || y1 > h as i64 {
        return Err(format!(
            "pixel rectangle ({}..{}, {}..{}) outside {}x{}",
            x0, x1, y0, y1, w, h
        ));
    }

    Ok(PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Final output dimensions of a spec's geometry (rotation, then crop).
pub fn output_dimensions(
    width: u32,
    height: u32,
    degrees: f32,
    crop: Option<&CropRect>,
) -> Result<(u32, u32), String> {
    let canvas = rotated_dimensions(width, height, degrees);
    match crop {
        Some(c) => resolve_crop(c, canvas).map(|r| (r.width, r.height)),
        None => Ok(canvas),
    }
}
