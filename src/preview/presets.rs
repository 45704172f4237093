// Preview filter presets. Approximations of the commit recipes in
// pipeline::filters; same family per filter, not pixel-identical.

use crate::edit::Filter;

use super::tone::luma;

pub type Preset = fn([f32; 3]) -> [f32; 3];

pub fn preset_for(filter: Filter) -> Option<Preset> {
    match filter {
        Filter::Normal => None,
        Filter::Grayscale => Some(grayscale),
        Filter::Sepia => Some(sepia),
        Filter::Vintage => Some(vintage),
        Filter::Cool => Some(cool),
        Filter::Warm => Some(warm),
    }
}

fn grayscale(rgb: [f32; 3]) -> [f32; 3] {
    let l = luma(rgb);
    [l, l, l]
}

fn sepia([r, g, b]: [f32; 3]) -> [f32; 3] {
    [
        (0.393 * r + 0.769 * g + 0.189 * b).min(255.0),
        (0.349 * r + 0.686 * g + 0.168 * b).min(255.0),
        (0.272 * r + 0.534 * g + 0.131 * b).min(255.0),
    ]
}

fn vintage(rgb: [f32; 3]) -> [f32; 3] {
    let toned = sepia(rgb);
    let mut out = [0.0; 3];
    for i in 0..3 {
        let mixed = 0.5 * rgb[i] + 0.5 * toned[i];
        // lifted blacks, softened whites
        out[i] = 20.0 + mixed * 0.85;
    }
    out
}

fn cool([r, g, b]: [f32; 3]) -> [f32; 3] {
    [(r * 0.9).max(0.0), g, (b * 1.1 + 10.0).min(255.0)]
}

fn warm([r, g, b]: [f32; 3]) -> [f32; 3] {
    [(r * 1.1 + 10.0).min(255.0), g, (b * 0.9).max(0.0)]
}
