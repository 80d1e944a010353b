/// Badge image rendering
///
/// Renders a badge payload into a PNG served as a `data:` URI. A kiosk
/// or front-desk screen must keep working even when the image pipeline
/// is broken, so any render fault degrades to a visibly striped
/// placeholder instead of an error.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use thiserror::Error;

use super::payload::BadgePayload;

/// Pixels per QR module
const MODULE_SCALE: u32 = 8;

/// Quiet zone around the code, in modules
const QUIET_ZONE: u32 = 4;

/// Placeholder edge length in pixels
const PLACEHOLDER_SIZE: u32 = 240;

/// Last-resort 1x1 PNG, used only if even the placeholder fails to encode
const FALLBACK_PIXEL_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Badge rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    /// Payload could not be serialized
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// QR matrix generation failed (e.g., data too large)
    #[error("QR encoding failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    /// PNG encoding failed
    #[error("PNG encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Renders a badge payload as a PNG data URI
///
/// Never fails: a render fault is logged and the striped placeholder is
/// returned instead, so callers can always embed the result in an
/// `<img src=…>` without a fallback path of their own.
pub fn badge_data_uri(payload: &BadgePayload) -> String {
    match render_badge(payload) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(member_code = %payload.member_id, error = %e, "Badge render failed, serving placeholder");
            placeholder_data_uri()
        }
    }
}

/// Renders a badge payload as a PNG data URI, surfacing faults
///
/// # Errors
///
/// Returns an error if serialization, QR generation, or PNG encoding
/// fails
pub fn render_badge(payload: &BadgePayload) -> Result<String, RenderError> {
    let json = payload.to_json()?;
    let png = qr_png_bytes(&json)?;
    Ok(data_uri(&png))
}

fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

/// Renders arbitrary text into a scaled QR code PNG
fn qr_png_bytes(data: &str) -> Result<Vec<u8>, RenderError> {
    let code = QrCode::new(data.as_bytes())?;
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let size = (modules + 2 * QUIET_ZONE) * MODULE_SCALE;

    let img = ImageBuffer::from_fn(size, size, |x, y| {
        let mx = (x / MODULE_SCALE) as i64 - QUIET_ZONE as i64;
        let my = (y / MODULE_SCALE) as i64 - QUIET_ZONE as i64;

        let in_code =
            mx >= 0 && my >= 0 && (mx as u32) < modules && (my as u32) < modules;
        let dark = in_code && colors[(my as u32 * modules + mx as u32) as usize] == Color::Dark;

        Luma([if dark { 0u8 } else { 255u8 }])
    });

    encode_png(img)
}

/// A deliberately ugly diagonal-stripe square with a black border, so a
/// badge that failed to render is obvious at a glance rather than a
/// blank box.
fn placeholder_data_uri() -> String {
    let img = ImageBuffer::from_fn(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, |x, y| {
        let border = x < 8 || y < 8 || x >= PLACEHOLDER_SIZE - 8 || y >= PLACEHOLDER_SIZE - 8;
        let stripe = (x + y) / 16 % 2 == 0;

        Luma([if border {
            0u8
        } else if stripe {
            190u8
        } else {
            255u8
        }])
    });

    match encode_png(img) {
        Ok(png) => data_uri(&png),
        Err(e) => {
            tracing::error!(error = %e, "Placeholder render failed");
            FALLBACK_PIXEL_URI.to_string()
        }
    }
}

fn encode_png(img: ImageBuffer<Luma<u8>, Vec<u8>>) -> Result<Vec<u8>, RenderError> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_render_produces_png_data_uri() {
        let payload = BadgePayload::new("MEM001", Uuid::new_v4(), "Dana Park", Utc::now());
        let uri = badge_data_uri(&payload);

        let encoded = uri
            .strip_prefix("data:image/png;base64,")
            .expect("data URI prefix");
        let bytes = BASE64.decode(encoded).expect("valid base64");
        // PNG magic
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }

    #[test]
    fn test_placeholder_is_a_png_data_uri() {
        let uri = placeholder_data_uri();
        let encoded = uri
            .strip_prefix("data:image/png;base64,")
            .expect("data URI prefix");
        let bytes = BASE64.decode(encoded).expect("valid base64");
        assert_eq!(&bytes[..4], &[0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_oversized_payload_falls_back_to_placeholder() {
        // QR version 40 tops out around 3 KB; a payload far beyond that
        // must degrade, not error.
        let mut payload = BadgePayload::new("MEM001", Uuid::new_v4(), "Dana Park", Utc::now());
        payload.name = "x".repeat(8000);

        let uri = badge_data_uri(&payload);
        assert_eq!(uri, placeholder_data_uri());
    }
}
