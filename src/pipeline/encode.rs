// Decode source bytes and encode derived JPEGs

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage, RgbaImage};

use crate::error::{MediaError, Result};

/// A decoded source plus the container format it came in.
pub struct DecodedImage {
    pub pixels: RgbaImage,
    pub format: Option<ImageFormat>,
}

pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let format = image::guess_format(bytes).ok();
    let img = image::load_from_memory(bytes)
        .map_err(|e| MediaError::DecodeFailure(e.to_string()))?;
    Ok(DecodedImage { pixels: img.to_rgba8(), format })
}

/// Composite over opaque white. JPEG has no alpha channel.
pub fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let a = a as u32;
        let over = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([over(r), over(g), over(b)])
    })
}

pub fn encode_jpeg(img: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = DynamicImage::ImageRgb8(flatten_on_white(img));
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| MediaError::EncodeFailure(e.to_string()))?;
    Ok(bytes)
}

/// Read width and height from the container header without decoding pixels.
pub fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| MediaError::DecodeFailure(e.to_string()))?
        .into_dimensions()
        .map_err(|e| MediaError::DecodeFailure(e.to_string()))
}

pub fn format_name(format: Option<ImageFormat>) -> String {
    format
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("unknown")
        .to_string()
}

pub fn mime_type(format: Option<ImageFormat>) -> String {
    format
        .map(|f| f.to_mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_png() {
        let src = RgbaImage::from_pixel(12, 7, Rgba([1, 2, 3, 255]));
        let decoded = decode(&png_bytes(&src)).unwrap();
        assert_eq!(decoded.pixels.dimensions(), (12, 7));
        assert_eq!(decoded.format, Some(ImageFormat::Png));
        assert_eq!(format_name(decoded.format), "png");
        assert_eq!(mime_type(decoded.format), "image/png");
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode(b"definitely not an image").err().unwrap();
        assert!(matches!(err, MediaError::DecodeFailure(_)));
    }

    #[test]
    fn test_probe_unreadable_header_is_decode_failure() {
        let err = probe_dimensions(b"").err().unwrap();
        assert!(matches!(err, MediaError::DecodeFailure(_)));
        let err = probe_dimensions(b"\x89PNG\r\n\x1a\n truncated").err().unwrap();
        assert!(matches!(err, MediaError::DecodeFailure(_)));
    }

    #[test]
    fn test_transparent_flattens_to_white() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0]));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [255, 255, 255]);
        let img = RgbaImage::from_pixel(2, 2, Rgba([10, 20, 30, 255]));
        assert_eq!(flatten_on_white(&img).get_pixel(0, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_encoded_jpeg_reports_dimensions() {
        let img = RgbaImage::from_pixel(33, 17, Rgba([200, 100, 50, 255]));
        let bytes = encode_jpeg(&img, 85).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(probe_dimensions(&bytes).unwrap(), (33, 17));
    }
}
