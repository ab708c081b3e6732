//! Placeholder thumbnails shown when a capture fails.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::error::{Result, ThumbnailError};

/// Encode a flat-colored PNG as a data URL.
pub fn fallback_thumbnail(width: u32, height: u32, color: [u8; 4]) -> Result<String> {
    let img = RgbaImage::from_pixel(width.max(1), height.max(1), Rgba(color));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(buf.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::decode_data_url;

    #[test]
    fn test_fallback_has_requested_size_and_color() {
        let url = fallback_thumbnail(200, 150, [10, 20, 30, 255]).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let blob = decode_data_url(&url).unwrap();
        let img = image::load_from_memory_with_format(&blob.bytes, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(img.dimensions(), (200, 150));
        assert_eq!(img.get_pixel(199, 149), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = fallback_thumbnail(20, 10, [0, 0, 0, 255]).unwrap();
        let b = fallback_thumbnail(20, 10, [0, 0, 0, 255]).unwrap();
        assert_eq!(a, b);
    }
}
