/// A composited frame as RGBA8 pixels.
///
/// Frames are fully opaque (the compositor paints an opaque background first), so the bytes are
/// valid both as premultiplied and as straight alpha.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// RGBA of the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.data.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}
