// Commit filter recipes. Fixed and deterministic: the same input and filter
// always produce the same bytes for a given PIPELINE_VERSION.

use image::{imageops, DynamicImage, RgbaImage};

use crate::edit::Filter;

use super::adjust::{self, luma709};

// Additive tint over luma for the sepia family
const SEPIA_TINT: [f32; 3] = [38.0, 14.0, -22.0];
// Channel gains for temperature shifts
const COOL_GAIN: [f32; 3] = [0.88, 0.97, 1.12];
const WARM_GAIN: [f32; 3] = [1.12, 1.03, 0.88];
const TEMPERATURE_LIFT: f32 = 8.0;

pub fn apply_filter(img: RgbaImage, filter: Filter) -> RgbaImage {
    match filter {
        Filter::Normal => img,
        Filter::Grayscale => grayscale(&img),
        Filter::Sepia => sepia(img, 1.0),
        Filter::Vintage => vintage(img),
        Filter::Cool => temperature(img, COOL_GAIN, 2),
        Filter::Warm => temperature(img, WARM_GAIN, 0),
    }
}

fn grayscale(img: &RgbaImage) -> RgbaImage {
    DynamicImage::ImageLumaA8(imageops::grayscale_alpha(img)).to_rgba8()
}

/// Blend `strength` of a luma-plus-tint sepia over the original.
fn sepia(mut img: RgbaImage, strength: f32) -> RgbaImage {
    for px in img.pixels_mut() {
        let [r, g, b, _] = px.0;
        let src = [r as f32, g as f32, b as f32];
        let l = luma709(src[0], src[1], src[2]);
        for c in 0..3 {
            let toned = (l + SEPIA_TINT[c]).clamp(0.0, 255.0);
            let mixed = src[c] + (toned - src[c]) * strength;
            px.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
        }
    }
    img
}

fn vintage(img: RgbaImage) -> RgbaImage {
    let mut img = sepia(img, 0.6);
    adjust::saturation(&mut img, 70.0);
    adjust::contrast(&img, 85.0)
}

/// Scale channels by `gain` and lift channel `lift` slightly.
fn temperature(mut img: RgbaImage, gain: [f32; 3], lift: usize) -> RgbaImage {
    let mut tables = [[0u8; 256]; 3];
    for (c, table) in tables.iter_mut().enumerate() {
        let offset = if c == lift { TEMPERATURE_LIFT } else { 0.0 };
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = (i as f32 * gain[c] + offset).round().clamp(0.0, 255.0) as u8;
        }
    }
    for px in img.pixels_mut() {
        for c in 0..3 {
            px.0[c] = tables[c][px.0[c] as usize];
        }
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn sample() -> RgbaImage {
        RgbaImage::from_fn(8, 8, |x, y| Rgba([(x * 30) as u8, (y * 30) as u8, 120, 255]))
    }

    #[test]
    fn test_normal_is_passthrough() {
        assert_eq!(apply_filter(sample(), Filter::Normal), sample());
    }

    #[test]
    fn test_recipes_are_stable() {
        for filter in Filter::ALL {
            assert_eq!(apply_filter(sample(), filter), apply_filter(sample(), filter));
        }
    }

    #[test]
    fn test_grayscale_keeps_alpha() {
        let mut img = sample();
        img.put_pixel(0, 0, Rgba([200, 10, 10, 40]));
        let out = apply_filter(img, Filter::Grayscale);
        let p = out.get_pixel(0, 0).0;
        assert_eq!(p[0], p[1]);
        assert_eq!(p[3], 40);
    }

    #[test]
    fn test_family_direction_matches_preview() {
        let gray = RgbaImage::from_pixel(2, 2, Rgba([120, 120, 120, 255]));
        let s = apply_filter(gray.clone(), Filter::Sepia).get_pixel(0, 0).0;
        assert!(s[0] > s[1] && s[1] > s[2]);
        let c = apply_filter(gray.clone(), Filter::Cool).get_pixel(0, 0).0;
        assert!(c[2] > c[0]);
        let w = apply_filter(gray, Filter::Warm).get_pixel(0, 0).0;
        assert!(w[0] > w[2]);
    }
}
