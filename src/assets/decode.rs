use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Decoded source image as premultiplied RGBA8.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 bytes, tightly packed, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> KenBurnsResult<SourceImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| KenBurnsError::image_decode(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(KenBurnsError::image_decode("image has zero width or height"));
    }

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(SourceImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

/// Read and decode the image at `path`.
///
/// A missing file is an invalid request; an unreadable or corrupt one is a decode error.
pub fn load_source_image(path: &Path) -> KenBurnsResult<SourceImage> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => KenBurnsError::invalid_request(format!(
            "source image '{}' does not exist",
            path.display()
        )),
        _ => KenBurnsError::image_decode(format!(
            "failed to read source image '{}': {e}",
            path.display()
        )),
    })?;
    decode_image(&bytes).map_err(|e| match e {
        KenBurnsError::ImageDecode(msg) => {
            KenBurnsError::image_decode(format!("'{}': {msg}", path.display()))
        }
        other => other,
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
