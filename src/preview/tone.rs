// Preview tone math: brightness -> contrast -> saturation, per pixel.
//
// Brightness and contrast act on each channel independently, so both are
// folded into one 256-entry table. Saturation mixes channels and runs after.

use crate::constants::ADJUSTMENT_IDENTITY;

/// Contrast factor `259(c+255) / (255(259-c))` for a contrast offset `c`
/// (0 = unchanged). The pole at c = 259 maps to the identity factor.
pub fn contrast_factor(contrast: f32) -> f32 {
    let denominator = 255.0 * (259.0 - contrast);
    if denominator == 0.0 {
        return 1.0;
    }
    let factor = 259.0 * (contrast + 255.0) / denominator;
    if factor.is_finite() { factor } else { 1.0 }
}

#[inline]
fn clamp_channel(value: f32) -> f32 {
    value.clamp(0.0, 255.0)
}

/// Round a working value back to an 8-bit channel.
#[inline]
pub fn to_channel(value: f32) -> u8 {
    clamp_channel(value).round() as u8
}

/// Rec. 601 luma, as used by the preview saturation step.
#[inline]
pub fn luma(rgb: [f32; 3]) -> f32 {
    0.299 * rgb[0] + 0.587 * rgb[1] + 0.114 * rgb[2]
}

#[derive(Debug, Clone)]
pub struct ToneCurve {
    table: [f32; 256],
    saturation: f32,
    identity: bool,
}

impl ToneCurve {
    pub fn new(brightness: f32, contrast: f32, saturation: f32) -> Self {
        let gain = brightness / 100.0;
        // Percent domain: 100 = unchanged, so the formula sees the offset.
        let factor = contrast_factor(contrast - ADJUSTMENT_IDENTITY);
        let mut table = [0.0f32; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let brightened = clamp_channel(i as f32 * gain);
            *slot = clamp_channel(factor * (brightened - 128.0) + 128.0);
        }
        let identity = brightness == ADJUSTMENT_IDENTITY
            && contrast == ADJUSTMENT_IDENTITY
            && saturation == ADJUSTMENT_IDENTITY;
        Self {
            table,
            saturation: saturation / 100.0,
            identity,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    pub fn apply(&self, rgb: [u8; 3]) -> [f32; 3] {
        let contrasted = [
            self.table[rgb[0] as usize],
            self.table[rgb[1] as usize],
            self.table[rgb[2] as usize],
        ];
        let gray = luma(contrasted);
        contrasted.map(|c| clamp_channel(gray + (c - gray) * self.saturation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contrast_identity_factor() {
        assert_eq!(contrast_factor(0.0), 1.0);
        assert_eq!(contrast_factor(259.0), 1.0);
        assert!(contrast_factor(100.0) > 1.0);
        assert!(contrast_factor(-100.0) < 1.0);
    }

    #[test]
    fn test_contrast_pole_never_panics() {
        let curve = ToneCurve::new(100.0, 359.0, 100.0);
        let out = curve.apply([10, 128, 250]);
        assert_eq!(out.map(to_channel), [10, 128, 250]);
    }

    #[test]
    fn test_brightness_scales_and_clamps() {
        let curve = ToneCurve::new(200.0, 100.0, 100.0);
        let out = curve.apply([50, 200, 0]).map(to_channel);
        assert_eq!(out, [100, 255, 0]);
    }

    #[test]
    fn test_zero_saturation_is_gray() {
        let curve = ToneCurve::new(100.0, 100.0, 0.0);
        let out = curve.apply([200, 40, 90]).map(to_channel);
        assert_eq!(out[0], out[1]);
        assert_eq!(out[1], out[2]);
    }

    #[test]
    fn test_full_identity_flag() {
        assert!(ToneCurve::new(100.0, 100.0, 100.0).is_identity());
        assert!(!ToneCurve::new(100.0, 101.0, 100.0).is_identity());
    }
}
