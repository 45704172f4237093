// Commit geometry: rotation onto an expanded canvas, then crop.

use image::{imageops, Rgba, RgbaImage};

use crate::edit::geometry::{quarter_turns, rotated_dimensions, PixelRect};

/// Rotate clockwise by `degrees` about the center. The canvas grows to hold
/// the whole rotated image; uncovered pixels are transparent. Right angles
/// are exact pixel transposes, other angles use bilinear sampling.
pub fn rotate(src: &RgbaImage, degrees: f32) -> RgbaImage {
    match quarter_turns(degrees) {
        Some(0) => src.clone(),
        Some(1) => imageops::rotate90(src),
        Some(2) => imageops::rotate180(src),
        Some(3) => imageops::rotate270(src),
        _ => rotate_arbitrary(src, degrees),
    }
}

fn rotate_arbitrary(src: &RgbaImage, degrees: f32) -> RgbaImage {
    let (w, h) = src.dimensions();
    let (nw, nh) = rotated_dimensions(w, h, degrees);
    let (sin, cos) = (degrees as f64).to_radians().sin_cos();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (ncx, ncy) = (nw as f64 / 2.0, nh as f64 / 2.0);

    RgbaImage::from_fn(nw, nh, |x, y| {
        // Inverse-map the destination pixel center into source space.
        let dx = x as f64 + 0.5 - ncx;
        let dy = y as f64 + 0.5 - ncy;
        let sx = cos * dx + sin * dy + cx;
        let sy = -sin * dx + cos * dy + cy;
        sample_bilinear(src, sx - 0.5, sy - 0.5)
    })
}

fn texel(src: &RgbaImage, x: i64, y: i64) -> [f64; 4] {
    if x < 0 || y < 0 || x >= src.width() as i64 || y >= src.height() as i64 {
        return [0.0; 4];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    // premultiplied so transparent neighbours do not darken edges
    let a = p[3] as f64 / 255.0;
    [p[0] as f64 * a, p[1] as f64 * a, p[2] as f64 * a, p[3] as f64]
}

fn sample_bilinear(src: &RgbaImage, x: f64, y: f64) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let taps = [
        (texel(src, x0, y0), (1.0 - fx) * (1.0 - fy)),
        (texel(src, x0 + 1, y0), fx * (1.0 - fy)),
        (texel(src, x0, y0 + 1), (1.0 - fx) * fy),
        (texel(src, x0 + 1, y0 + 1), fx * fy),
    ];

    let mut acc = [0.0f64; 4];
    for (t, weight) in taps {
        for c in 0..4 {
            acc[c] += t[c] * weight;
        }
    }

    let alpha = acc[3];
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let unpremul = 255.0 / alpha;
    Rgba([
        (acc[0] * unpremul).round().clamp(0.0, 255.0) as u8,
        (acc[1] * unpremul).round().clamp(0.0, 255.0) as u8,
        (acc[2] * unpremul).round().clamp(0.0, 255.0) as u8,
        alpha.round().clamp(0.0, 255.0) as u8,
    ])
}

/// Extract `rect`, which the caller has already resolved against `src`.
pub fn crop(src: &RgbaImage, rect: PixelRect) -> RgbaImage {
    imageops::crop_imm(src, rect.x, rect.y, rect.width, rect.height).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(w: u32, h: u32) -> RgbaImage {
        // Red top-left pixel, opaque gray elsewhere.
        let mut img = RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img
    }

    #[test]
    fn test_quarter_turn_swaps_dimensions() {
        let src = marked(40, 20);
        let out = rotate(&src, 90.0);
        assert_eq!(out.dimensions(), (20, 40));
        // clockwise: top-left moves to top-right
        assert_eq!(out.get_pixel(19, 0).0, [255, 0, 0, 255]);

        let out = rotate(&src, -90.0);
        assert_eq!(out.dimensions(), (20, 40));
        assert_eq!(out.get_pixel(0, 39).0, [255, 0, 0, 255]);
    }

    #[test]
    fn test_full_turn_is_identity() {
        let src = marked(8, 4);
        assert_eq!(rotate(&src, 360.0), src);
        assert_eq!(rotate(&src, 0.0), src);
    }

    #[test]
    fn test_arbitrary_angle_expands_with_transparent_corners() {
        let src = RgbaImage::from_pixel(100, 100, Rgba([10, 200, 30, 255]));
        let out = rotate(&src, 45.0);
        assert_eq!(out.dimensions(), (142, 142));
        assert_eq!(out.get_pixel(0, 0).0[3], 0);
        let center = out.get_pixel(71, 71).0;
        assert_eq!(center, [10, 200, 30, 255]);
    }

    #[test]
    fn test_crop_extracts_region() {
        let src = marked(10, 10);
        let out = crop(&src, PixelRect { x: 0, y: 0, width: 3, height: 2 });
        assert_eq!(out.dimensions(), (3, 2));
        assert_eq!(out.get_pixel(0, 0).0, [255, 0, 0, 255]);
    }
}
