// ABOUTME: Signature capture unit — turns drawn strokes or uploaded images
// ABOUTME: into a normalized, size-bounded JPEG signature artifact

use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::workflow::SignerRole;

/// Uploads and encoded artifacts above this ceiling are rejected, never
/// silently truncated.
pub const MAX_SIGNATURE_BYTES: usize = 5 * 1024 * 1024;

const CANVAS_WIDTH: u32 = 600;
const CANVAS_HEIGHT: u32 = 200;
// Device-pixel-ratio equivalent, capped at 2x to bound output size.
const RASTER_SCALE: u32 = 2;
const PEN_RADIUS: f32 = 3.0;
const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A captured signature: normalized raster bytes plus the role they belong
/// to. Value object only; persistence is the caller's responsibility.
#[derive(Debug, Clone)]
pub struct SignatureArtifact {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub role: SignerRole,
}

/// Render accumulated pointer strokes onto a white raster canvas and encode
/// the result. An empty drawing cannot be encoded into a signature.
pub fn capture_from_strokes(strokes: &[Vec<Point>], role: SignerRole) -> Result<SignatureArtifact> {
    if strokes.iter().all(|s| s.is_empty()) {
        return Err(AppError::ArtifactEncodingFailed(
            "empty signature drawing".to_string(),
        ));
    }

    let width = CANVAS_WIDTH * RASTER_SCALE;
    let height = CANVAS_HEIGHT * RASTER_SCALE;
    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

    let scale = RASTER_SCALE as f32;
    for stroke in strokes {
        match stroke.as_slice() {
            [] => {}
            [single] => stamp(&mut canvas, single.x * scale, single.y * scale),
            points => {
                for pair in points.windows(2) {
                    draw_segment(&mut canvas, pair[0], pair[1], scale);
                }
            }
        }
    }

    let bytes = encode_jpeg(&canvas)?;
    ensure_within_ceiling(bytes.len())?;

    Ok(SignatureArtifact {
        bytes,
        content_type: "image/jpeg",
        width,
        height,
        role,
    })
}

/// Validate and normalize an uploaded signature image. The declared MIME
/// type must be an image type; the input and the re-encoded output must
/// both fit under the ceiling.
pub fn capture_from_upload(
    bytes: &[u8],
    declared_mime: &str,
    role: SignerRole,
) -> Result<SignatureArtifact> {
    if !declared_mime.starts_with("image/") {
        return Err(AppError::InvalidArtifactType(declared_mime.to_string()));
    }
    ensure_within_ceiling(bytes.len())?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| AppError::ArtifactEncodingFailed(e.to_string()))?;

    // Flatten any alpha channel onto white so transparent PNG signatures
    // stay legible on the printed document.
    let rgba = decoded.to_rgba8();
    let mut flattened = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, px) in rgba.enumerate_pixels() {
        let alpha = px[3] as u16;
        let blend = |fg: u8| ((fg as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(px[0]), blend(px[1]), blend(px[2])]));
    }

    let encoded = encode_jpeg(&flattened)?;
    ensure_within_ceiling(encoded.len())?;

    Ok(SignatureArtifact {
        bytes: encoded,
        content_type: "image/jpeg",
        width: flattened.width(),
        height: flattened.height(),
        role,
    })
}

/// The size gate of the capture unit: exactly at the ceiling is accepted,
/// one byte over is an error.
pub fn ensure_within_ceiling(size: usize) -> Result<()> {
    if size > MAX_SIGNATURE_BYTES {
        return Err(AppError::ArtifactTooLarge {
            size,
            limit: MAX_SIGNATURE_BYTES,
        });
    }
    Ok(())
}

fn encode_jpeg(img: &RgbImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    encoder
        .encode(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
        .map_err(|e| AppError::ArtifactEncodingFailed(e.to_string()))?;
    if buf.is_empty() {
        return Err(AppError::ArtifactEncodingFailed(
            "encoder produced no bytes".to_string(),
        ));
    }
    Ok(buf)
}

fn draw_segment(canvas: &mut RgbImage, from: Point, to: Point, scale: f32) {
    let (x0, y0) = (from.x * scale, from.y * scale);
    let (x1, y1) = (to.x * scale, to.y * scale);
    let distance = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    let steps = distance.ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp(canvas, x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
    }
}

fn stamp(canvas: &mut RgbImage, cx: f32, cy: f32) {
    let radius = PEN_RADIUS * RASTER_SCALE as f32 / 2.0;
    let r = radius.ceil() as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx * dx + dy * dy) as f32 > radius * radius {
                continue;
            }
            let x = cx as i32 + dx;
            let y = cy as i32 + dy;
            if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
                canvas.put_pixel(x as u32, y as u32, Rgb([20, 20, 40]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_strokes() -> Vec<Vec<Point>> {
        vec![
            vec![
                Point { x: 50.0, y: 100.0 },
                Point { x: 150.0, y: 80.0 },
                Point { x: 250.0, y: 120.0 },
            ],
            vec![Point { x: 300.0, y: 100.0 }, Point { x: 400.0, y: 90.0 }],
        ]
    }

    fn tiny_png() -> Vec<u8> {
        let img = RgbImage::from_pixel(12, 8, Rgb([10, 10, 10]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_capture_from_strokes_produces_jpeg() {
        let artifact = capture_from_strokes(&sample_strokes(), SignerRole::Client).unwrap();
        assert_eq!(artifact.content_type, "image/jpeg");
        assert_eq!(artifact.width, CANVAS_WIDTH * RASTER_SCALE);
        assert_eq!(artifact.height, CANVAS_HEIGHT * RASTER_SCALE);
        // JPEG SOI marker
        assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8]);
        assert!(artifact.bytes.len() <= MAX_SIGNATURE_BYTES);
        // The drawn artifact must decode back into a valid image
        assert!(image::load_from_memory(&artifact.bytes).is_ok());
    }

    #[test]
    fn test_empty_drawing_is_an_encoding_failure() {
        let err = capture_from_strokes(&[], SignerRole::Client).unwrap_err();
        assert!(matches!(err, AppError::ArtifactEncodingFailed(_)));

        let err = capture_from_strokes(&[vec![]], SignerRole::Repairer).unwrap_err();
        assert!(matches!(err, AppError::ArtifactEncodingFailed(_)));
    }

    #[test]
    fn test_upload_rejects_non_image_mime() {
        let err =
            capture_from_upload(&tiny_png(), "application/pdf", SignerRole::Client).unwrap_err();
        assert!(matches!(err, AppError::InvalidArtifactType(_)));
    }

    #[test]
    fn test_upload_normalizes_png_to_jpeg() {
        let artifact = capture_from_upload(&tiny_png(), "image/png", SignerRole::Repairer).unwrap();
        assert_eq!(artifact.content_type, "image/jpeg");
        assert_eq!(&artifact.bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(artifact.width, 12);
        assert_eq!(artifact.height, 8);
    }

    #[test]
    fn test_undecodable_upload_is_an_encoding_failure() {
        let garbage = vec![0u8; 64];
        let err = capture_from_upload(&garbage, "image/png", SignerRole::Client).unwrap_err();
        assert!(matches!(err, AppError::ArtifactEncodingFailed(_)));
    }

    #[test]
    fn test_size_ceiling_boundary() {
        assert!(ensure_within_ceiling(MAX_SIGNATURE_BYTES).is_ok());
        let err = ensure_within_ceiling(MAX_SIGNATURE_BYTES + 1).unwrap_err();
        assert!(matches!(err, AppError::ArtifactTooLarge { .. }));
    }

    #[test]
    fn test_oversized_upload_rejected_before_decode() {
        let oversized = vec![0u8; MAX_SIGNATURE_BYTES + 1];
        let err = capture_from_upload(&oversized, "image/png", SignerRole::Client).unwrap_err();
        assert!(matches!(err, AppError::ArtifactTooLarge { .. }));
    }
}
