//! Best-effort image normalization before transmission.
//!
//! The recognition service charges by upload size and rejects very large
//! images, so rasters are downsized and recompressed before the network
//! call. PDFs pass through unchanged. Normalization must never fail the
//! pipeline: any decode or encode problem returns the original bytes.

use crate::types::DocumentKind;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

/// Longest allowed edge of a transmitted raster.
const MAX_DIMENSION: u32 = 2000;

/// JPEG re-encode quality.
const JPEG_QUALITY: u8 = 85;

/// Normalize uploaded content for transmission.
///
/// PDF content is returned unchanged. Raster content is decoded, downscaled
/// to fit within 2000x2000 (aspect ratio preserved, Lanczos3 resampling),
/// flattened onto an opaque white background when an alpha channel is
/// present, converted to RGB8 otherwise, and re-encoded as quality-85 JPEG.
///
/// Decode or encode failures return the input unchanged.
pub fn normalize(bytes: &[u8]) -> Vec<u8> {
    if DocumentKind::sniff(bytes).is_pdf() {
        return bytes.to_vec();
    }

    match try_normalize_raster(bytes) {
        Ok(normalized) => normalized,
        Err(e) => {
            tracing::debug!("image normalization failed, passing original bytes through: {}", e);
            bytes.to_vec()
        }
    }
}

fn try_normalize_raster(bytes: &[u8]) -> std::result::Result<Vec<u8>, image::ImageError> {
    let mut img = image::load_from_memory(bytes)?;

    if img.width() > MAX_DIMENSION || img.height() > MAX_DIMENSION {
        img = img.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3);
    }

    let rgb = flatten_to_rgb(&img);

    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}

/// Composite any alpha channel over opaque white and return 3-channel RGB.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut rgb = RgbImage::from_pixel(rgba.width(), rgba.height(), image::Rgb([255, 255, 255]));
        for (x, y, pixel) in rgba.enumerate_pixels() {
            let alpha = pixel[3] as u32;
            let out = rgb.get_pixel_mut(x, y);
            for c in 0..3 {
                let fg = pixel[c] as u32;
                let bg = out[c] as u32;
                out[c] = ((fg * alpha + bg * (255 - alpha)) / 255) as u8;
            }
        }
        rgb
    } else {
        img.to_rgb8()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_pdf_passes_through_unchanged() {
        let pdf = b"%PDF-1.4 fake document".to_vec();
        assert_eq!(normalize(&pdf), pdf);
    }

    #[test]
    fn test_undecodable_bytes_pass_through_unchanged() {
        let garbage = vec![0u8; 64];
        assert_eq!(normalize(&garbage), garbage);
    }

    #[test]
    fn test_rgba_flattened_to_rgb_jpeg() {
        let mut rgba = RgbaImage::new(8, 8);
        for pixel in rgba.pixels_mut() {
            *pixel = Rgba([200, 10, 10, 128]);
        }
        let input = png_bytes(&DynamicImage::ImageRgba8(rgba));

        let out = normalize(&input);
        let decoded = image::load_from_memory(&out).unwrap();
        // JPEG carries no alpha channel.
        assert!(!decoded.color().has_alpha());
        assert_eq!(DocumentKind::sniff(&out), DocumentKind::Jpeg);
    }

    #[test]
    fn test_fully_transparent_pixel_becomes_white() {
        let rgba = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        let input = png_bytes(&DynamicImage::ImageRgba8(rgba));

        let out = normalize(&input);
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        let px = decoded.get_pixel(0, 0);
        // JPEG is lossy; allow a small tolerance around pure white.
        assert!(px[0] > 250 && px[1] > 250 && px[2] > 250, "pixel was {:?}", px);
    }

    #[test]
    fn test_oversized_image_downscaled_preserving_aspect() {
        let wide = RgbImage::new(3000, 1000);
        let input = png_bytes(&DynamicImage::ImageRgb8(wide));

        let out = normalize(&input);
        let decoded = image::load_from_memory(&out).unwrap();
        assert!(decoded.width() <= 2000);
        assert!(decoded.height() <= 2000);
        // 3:1 aspect ratio survives the downscale (rounding aside).
        assert_eq!(decoded.width(), 2000);
        assert!((666..=667).contains(&decoded.height()));
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let small = RgbImage::new(100, 50);
        let input = png_bytes(&DynamicImage::ImageRgb8(small));

        let out = normalize(&input);
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }
}
