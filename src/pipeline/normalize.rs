//! Image normalisation: decode, bound, flatten and re-encode as JPEG.
//!
//! Decoding and resampling are CPU-bound, so [`normalize`] moves the work
//! onto the blocking pool with `spawn_blocking`. PDFs are returned untouched.
//!
//! The bounding box caps the longest edge regardless of the source size: a
//! 12-megapixel phone photo comes out at 2048 px on its long side, a
//! 640 × 480 screenshot comes out at 640 × 480.

use crate::error::VaultError;
use crate::pipeline::ingress::{FileKind, IMAGE_JPEG};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// Bounds applied by the normaliser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeLimits {
    pub max_dimension: u32,
    pub thumbnail_dimension: u32,
    pub jpeg_quality: u8,
}

/// Output of the normaliser.
#[derive(Debug, Clone)]
pub struct NormalizedFile {
    pub bytes: Bytes,
    pub content_type: &'static str,
    /// Pixel dimensions, `None` for PDFs.
    pub dimensions: Option<(u32, u32)>,
    /// Small JPEG preview, images only.
    pub thumbnail: Option<Bytes>,
}

impl NormalizedFile {
    pub fn is_image(&self) -> bool {
        self.dimensions.is_some()
    }
}

/// Normalise an accepted upload.
///
/// Images come back as JPEG bounded by `limits.max_dimension`, with a
/// thumbnail. PDFs come back byte-for-byte. Any decode or encode failure is
/// [`VaultError::ProcessingFailed`].
pub async fn normalize(
    bytes: Bytes,
    kind: FileKind,
    limits: NormalizeLimits,
) -> Result<NormalizedFile, VaultError> {
    if !kind.is_image() {
        return Ok(NormalizedFile {
            bytes,
            content_type: kind.content_type(),
            dimensions: None,
            thumbnail: None,
        });
    }

    tokio::task::spawn_blocking(move || normalize_image_blocking(&bytes, limits))
        .await
        .map_err(|e| VaultError::Internal(format!("Normalise task panicked: {}", e)))?
}

fn normalize_image_blocking(
    bytes: &[u8],
    limits: NormalizeLimits,
) -> Result<NormalizedFile, VaultError> {
    let img = image::load_from_memory(bytes).map_err(|e| VaultError::ProcessingFailed {
        detail: format!("could not decode image: {}", e),
    })?;
    let (src_w, src_h) = img.dimensions();

    let bounded = fit_within(&img, limits.max_dimension);
    let dimensions = bounded.dimensions();
    let encoded = encode_jpeg(&bounded, limits.jpeg_quality)?;
    debug!(
        "Normalised {}x{} → {}x{} px, {} bytes JPEG",
        src_w,
        src_h,
        dimensions.0,
        dimensions.1,
        encoded.len()
    );

    let thumb = fit_within(&bounded, limits.thumbnail_dimension);
    let thumbnail = encode_jpeg(&thumb, limits.jpeg_quality)?;

    Ok(NormalizedFile {
        bytes: Bytes::from(encoded),
        content_type: IMAGE_JPEG,
        dimensions: Some(dimensions),
        thumbnail: Some(Bytes::from(thumbnail)),
    })
}

/// Scale `img` down to fit a `max × max` box. Never upscales.
fn fit_within(img: &DynamicImage, max: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max && h <= max {
        return img.clone();
    }
    // `resize` keeps the aspect ratio and fits inside the box.
    img.resize(max, max, FilterType::Lanczos3)
}

/// JPEG has no alpha channel; flatten to RGB before encoding.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, VaultError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| VaultError::ProcessingFailed {
            detail: format!("could not encode JPEG: {}", e),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    const LIMITS: NormalizeLimits = NormalizeLimits {
        max_dimension: 2048,
        thumbnail_dimension: 300,
        jpeg_quality: 85,
    };

    fn png_bytes(w: u32, h: u32) -> Bytes {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([20, 40, 200, 128])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        Bytes::from(buf)
    }

    #[tokio::test]
    async fn large_image_is_bounded_with_aspect_ratio() {
        let out = normalize(png_bytes(4000, 3000), FileKind::Png, LIMITS)
            .await
            .expect("normalise");
        let (w, h) = out.dimensions.unwrap();
        assert_eq!(w.max(h), 2048);
        let ratio_in = 4000.0 / 3000.0;
        let ratio_out = w as f64 / h as f64;
        assert!((ratio_in - ratio_out).abs() < 0.01, "{w}x{h}");

        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (w, h));
        assert_eq!(out.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn tall_image_is_bounded_on_height() {
        let out = normalize(png_bytes(1000, 5000), FileKind::Png, LIMITS)
            .await
            .unwrap();
        let (w, h) = out.dimensions.unwrap();
        assert_eq!(h, 2048);
        assert!((w as i64 - 410).abs() <= 1, "{w}x{h}");
    }

    #[tokio::test]
    async fn small_image_is_not_upscaled() {
        let out = normalize(png_bytes(640, 480), FileKind::Png, LIMITS)
            .await
            .unwrap();
        assert_eq!(out.dimensions, Some((640, 480)));
    }

    #[tokio::test]
    async fn thumbnail_is_bounded() {
        let out = normalize(png_bytes(1200, 600), FileKind::Png, LIMITS)
            .await
            .unwrap();
        let thumb = image::load_from_memory(out.thumbnail.as_ref().unwrap()).unwrap();
        assert_eq!(thumb.dimensions(), (300, 150));
    }

    #[tokio::test]
    async fn pdf_passes_through() {
        let pdf = Bytes::from_static(b"%PDF-1.7\n%fake");
        let out = normalize(pdf.clone(), FileKind::Pdf, LIMITS).await.unwrap();
        assert_eq!(out.bytes, pdf);
        assert_eq!(out.content_type, "application/pdf");
        assert!(out.thumbnail.is_none());
        assert!(!out.is_image());
    }

    #[tokio::test]
    async fn corrupt_image_fails_processing() {
        let err = normalize(Bytes::from_static(b"\xFF\xD8not a jpeg"), FileKind::Jpeg, LIMITS)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::ProcessingFailed { .. }), "{err}");
    }
}
