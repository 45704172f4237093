// Commit tone adjustments: brightness -> contrast -> saturation.
//
// Not bit-identical to the preview math; each stage moves in the same
// direction as its preview counterpart when the percentage increases.

use image::{imageops, RgbaImage};

use crate::constants::ADJUSTMENT_IDENTITY;

// Rec. 709 luma weights
const LUMA_R: f32 = 0.2126;
const LUMA_G: f32 = 0.7152;
const LUMA_B: f32 = 0.0722;

pub fn luma709(r: f32, g: f32, b: f32) -> f32 {
    LUMA_R * r + LUMA_G * g + LUMA_B * b
}

/// Multiply RGB by `percent / 100`, alpha untouched.
pub fn brightness(img: &mut RgbaImage, percent: f32) {
    if percent == ADJUSTMENT_IDENTITY {
        return;
    }
    let gain = percent / 100.0;
    let mut table = [0u8; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = (i as f32 * gain).round().clamp(0.0, 255.0) as u8;
    }
    for px in img.pixels_mut() {
        for c in 0..3 {
            px.0[c] = table[px.0[c] as usize];
        }
    }
}

/// Percent 100 = unchanged, 0 = flat gray, 200 = doubled contrast.
pub fn contrast(img: &RgbaImage, percent: f32) -> RgbaImage {
    if percent == ADJUSTMENT_IDENTITY {
        return img.clone();
    }
    imageops::contrast(img, percent - ADJUSTMENT_IDENTITY)
}

/// Scale chroma around Rec. 709 luma; 0 = grayscale.
pub fn saturation(img: &mut RgbaImage, percent: f32) {
    if percent == ADJUSTMENT_IDENTITY {
        return;
    }
    let k = percent / 100.0;
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let l = luma709(r, g, b);
        px.0[0] = (l + (r - l) * k).round().clamp(0.0, 255.0) as u8;
        px.0[1] = (l + (g - l) * k).round().clamp(0.0, 255.0) as u8;
        px.0[2] = (l + (b - l) * k).round().clamp(0.0, 255.0) as u8;
    }
}

/// Apply all three stages in order.
pub fn apply_tone(img: RgbaImage, brightness_pct: f32, contrast_pct: f32, saturation_pct: f32) -> RgbaImage {
    let mut img = img;
    brightness(&mut img, brightness_pct);
    let mut img = contrast(&img, contrast_pct);
    saturation(&mut img, saturation_pct);
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(rgb: [u8; 3]) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }

    #[test]
    fn test_identity_leaves_pixels() {
        let src = solid([12, 140, 250]);
        assert_eq!(apply_tone(src.clone(), 100.0, 100.0, 100.0), src);
    }

    #[test]
    fn test_brightness_monotonic() {
        let src = solid([90, 160, 220]);
        let mut prev = [0u8; 3];
        for pct in [0.0, 20.0, 50.0, 80.0, 100.0, 150.0, 200.0] {
            let out = apply_tone(src.clone(), pct, 100.0, 100.0);
            let p = out.get_pixel(0, 0).0;
            for c in 0..3 {
                assert!(p[c] >= prev[c], "brightness {} channel {}", pct, c);
            }
            prev = [p[0], p[1], p[2]];
        }
    }

    #[test]
    fn test_contrast_spreads_from_mid() {
        let src = solid([64, 128, 192]);
        let low = contrast(&src, 50.0).get_pixel(0, 0).0;
        let high = contrast(&src, 150.0).get_pixel(0, 0).0;
        assert!(high[0] < low[0]);
        assert!(high[2] > low[2]);
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        let mut img = solid([200, 50, 90]);
        saturation(&mut img, 0.0);
        let p = img.get_pixel(1, 1).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[1], p[2]);
        assert_eq!(p[3], 255);
    }
}
