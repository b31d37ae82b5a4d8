use crate::foundation::error::{KenBurnsError, KenBurnsResult};

pub use kurbo::{Affine, Vec2};

/// Zero-based frame position within one render.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Rational frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be > 0.
    pub den: u32,
}

impl Fps {
    /// Build a validated frame rate.
    pub fn new(num: u32, den: u32) -> KenBurnsResult<Self> {
        if den == 0 {
            return Err(KenBurnsError::invalid_request("fps den must be > 0"));
        }
        if num == 0 {
            return Err(KenBurnsError::invalid_request("fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole frames per second.
    pub fn from_rate(rate: u32) -> KenBurnsResult<Self> {
        Self::new(rate, 1)
    }

    /// Frames per second as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Number of whole frames that fit into `secs`.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * self.as_f64()).floor().max(0.0) as u64
    }
}

/// Fixed output raster size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// 1280x720, the default output size.
    pub const HD: Self = Self {
        width: 1280,
        height: 720,
    };

    /// Check that the canvas can be encoded as yuv420p.
    pub fn validate(self) -> KenBurnsResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(KenBurnsError::invalid_request(
                "canvas width/height must be non-zero",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(KenBurnsError::invalid_request(
                "canvas width/height must be even (required for yuv420p output)",
            ));
        }
        if u16::try_from(self.width).is_err() || u16::try_from(self.height).is_err() {
            return Err(KenBurnsError::invalid_request(
                "canvas width/height must fit in u16",
            ));
        }
        Ok(())
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::HD
    }
}

/// Crop-and-scale window into the source image for one instant.
///
/// Offsets are expressed in scaled source pixels: the source is scaled first, then shifted by
/// `-offset` so that the canvas origin lands on `(offset_x, offset_y)` of the scaled image.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Horizontal offset into the scaled image.
    pub offset_x: f64,
    /// Vertical offset into the scaled image.
    pub offset_y: f64,
    /// Uniform source scale, > 0.
    pub scale: f64,
}

impl Viewport {
    /// Componentwise linear interpolation; `e = 0` yields `self`, `e = 1` yields `other`.
    pub fn lerp(self, other: Self, e: f64) -> Self {
        fn mix(a: f64, b: f64, e: f64) -> f64 {
            if e >= 1.0 { b } else { a + (b - a) * e }
        }

        Self {
            offset_x: mix(self.offset_x, other.offset_x, e),
            offset_y: mix(self.offset_y, other.offset_y, e),
            scale: mix(self.scale, other.scale, e),
        }
    }

    /// Source-pixel space to canvas space.
    pub fn to_affine(self) -> Affine {
        // T(-offset) * S(scale): scale first, then translate.
        Affine::translate(Vec2::new(-self.offset_x, -self.offset_y)) * Affine::scale(self.scale)
    }
}
