//! Image detection and token pricing.
//!
//! Images are priced from their pixel dimensions the way vision models tile
//! them: fit within 2048×2048, scale so the short side is 768, then charge
//! 170 tokens per 512-px tile plus a fixed 85.

use std::path::Path;

use contextfit_core::EngineError;

/// Extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "pdf"];

/// Dimensions assumed when the header cannot be read.
pub const DEFAULT_DIMENSIONS: (u32, u32) = (1024, 1024);

const MAX_DIMENSION: f64 = 2048.0;
const SHORT_SIDE: f64 = 768.0;
const TILE: f64 = 512.0;
const TOKENS_PER_TILE: usize = 170;
const BASE_TOKENS: usize = 85;

/// Whether `path` has an image extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Token cost of an image with the given pixel dimensions.
///
/// Returns `None` only for a zero-sized image.
pub fn image_tokens(width: u32, height: u32) -> Option<usize> {
    if width == 0 || height == 0 {
        return None;
    }
    let (mut w, mut h) = (f64::from(width), f64::from(height));

    let longest = w.max(h);
    if longest > MAX_DIMENSION {
        let scale = MAX_DIMENSION / longest;
        // Thin strips keep at least one pixel on each side.
        w = (w * scale).floor().max(1.0);
        h = (h * scale).floor().max(1.0);
    }

    let scale = SHORT_SIDE / w.min(h);
    w = (w * scale).floor().max(1.0);
    h = (h * scale).floor().max(1.0);

    let tiles = (w / TILE).ceil() as usize * (h / TILE).ceil() as usize;
    Some(tiles * TOKENS_PER_TILE + BASE_TOKENS)
}

/// Token cost of the image at `path`.
pub fn token_count_image(path: &Path) -> Result<usize, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, &e))?;
    let (width, height) = dimensions(&bytes).unwrap_or(DEFAULT_DIMENSIONS);
    image_tokens(width, height).ok_or_else(|| EngineError::Image {
        path: path.to_path_buf(),
        reason: format!("degenerate dimensions {width}x{height}"),
    })
}

/// Pixel dimensions from a PNG, GIF, BMP or JPEG header.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    png_dimensions(bytes)
        .or_else(|| gif_dimensions(bytes))
        .or_else(|| bmp_dimensions(bytes))
        .or_else(|| jpeg_dimensions(bytes))
}

fn be_u16(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 2)?;
    Some(u32::from(u16::from_be_bytes([b[0], b[1]])))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 2)?;
    Some(u32::from(u16::from_le_bytes([b[0], b[1]])))
}

fn be_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn le_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let b = bytes.get(at..at + 4)?;
    Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    const SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
    if !bytes.starts_with(SIGNATURE) || bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    Some((be_u32(bytes, 16)?, be_u32(bytes, 20)?))
}

fn gif_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
        return None;
    }
    Some((le_u16(bytes, 6)?, le_u16(bytes, 8)?))
}

fn bmp_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if !bytes.starts_with(b"BM") {
        return None;
    }
    // Negative height marks a top-down bitmap.
    let width = le_i32(bytes, 18)?.unsigned_abs();
    let height = le_i32(bytes, 22)?.unsigned_abs();
    Some((width, height))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut at = 2;
    while at + 4 <= bytes.len() {
        if bytes[at] != 0xFF {
            at += 1;
            continue;
        }
        let marker = bytes[at + 1];
        match marker {
            0xFF => at += 1,
            0xD8 | 0x01 | 0xD0..=0xD7 => at += 2,
            // Start of frame, excluding DHT, JPG and DAC.
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = be_u16(bytes, at + 5)?;
                let width = be_u16(bytes, at + 7)?;
                return Some((width, height));
            }
            0xD9 | 0xDA => return None,
            _ => at += 2 + be_u16(bytes, at + 2)? as usize,
        }
    }
    None
}
