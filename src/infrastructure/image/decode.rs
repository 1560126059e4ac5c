//! Image decoding for local files and downloaded bytes.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::domain::ports::{CacheError, CacheResult};

/// Largest encoded payload accepted for decoding.
pub const MAX_IMAGE_BYTES: usize = 64 * 1024 * 1024;

/// Largest accepted side length in pixels.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

fn check_dimensions(width: u32, height: u32) -> CacheResult<()> {
    if width == 0 || height == 0 {
        return Err(CacheError::DecodeError("image has no pixels".to_string()));
    }
    if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
        return Err(CacheError::DecodeError(format!(
            "image too large: {width}x{height}"
        )));
    }
    Ok(())
}

/// Decodes an image file, sniffing the format from its contents.
///
/// # Errors
/// Returns error if the file cannot be read or is not a supported image.
pub fn decode_file(path: &Path) -> CacheResult<DynamicImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| CacheError::IoError(format!("Failed to read {}: {e}", path.display())))?;
    decode_bytes(&bytes)
}

/// Decodes an in-memory image.
///
/// # Errors
/// Returns error if the payload is oversized or not a supported image.
pub fn decode_bytes(bytes: &[u8]) -> CacheResult<DynamicImage> {
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(CacheError::DecodeError(format!(
            "payload too large: {} bytes",
            bytes.len()
        )));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CacheError::DecodeError(format!("Failed to sniff format: {e}")))?;
    if let Ok((width, height)) = reader.into_dimensions() {
        check_dimensions(width, height)?;
    }

    image::load_from_memory(bytes)
        .map_err(|e| CacheError::DecodeError(format!("Failed to decode image: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::new_rgb8(width, height)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_bytes() {
        let img = decode_bytes(&png_bytes(40, 20)).unwrap();
        assert_eq!(img.width(), 40);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode_bytes(b"definitely not an image");
        assert!(matches!(result, Err(CacheError::DecodeError(_))));
    }

    #[test]
    fn test_decode_file_sniffs_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("picture.bin");
        std::fs::write(&path, png_bytes(12, 7)).unwrap();

        let img = decode_file(&path).unwrap();
        assert_eq!((img.width(), img.height()), (12, 7));
    }

    #[test]
    fn test_decode_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = decode_file(&dir.path().join("nope.png"));
        assert!(matches!(result, Err(CacheError::IoError(_))));
    }
}
