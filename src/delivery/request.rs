use std::path::PathBuf;

use crate::animation::frames::total_frame_count;
use crate::animation::kind::AnimationKind;
use crate::foundation::core::Fps;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Frame rate used when a request does not name one.
pub const DEFAULT_FRAME_RATE: u32 = 30;

/// Duration at speed 1.0 for speed-based requests.
pub const BASE_DURATION_SECS: f64 = 6.0;

/// Shortest duration a speed-based request resolves to.
pub const MIN_SPEED_DURATION_SECS: f64 = 2.0;

fn default_frame_rate() -> u32 {
    DEFAULT_FRAME_RATE
}

/// Upper bounds applied to every request before pipeline work starts.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RequestLimits {
    /// Longest accepted duration, seconds.
    pub max_duration_secs: f64,
    /// Highest accepted frame rate.
    pub max_frame_rate: u32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_duration_secs: 60.0,
            max_frame_rate: 120,
        }
    }
}

/// One still-image-to-video render.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RenderRequest {
    /// Image to animate.
    pub source_image: PathBuf,
    /// Camera motion.
    pub animation: AnimationKind,
    /// Output length in seconds.
    pub duration_secs: f64,
    /// Output frames per second.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// When set, `source_image` is a temporary upload owned by this request and is deleted once
    /// decoded.
    #[serde(default)]
    pub source_is_upload: bool,
}

impl RenderRequest {
    /// Request at the default frame rate.
    pub fn new(
        source_image: impl Into<PathBuf>,
        animation: AnimationKind,
        duration_secs: f64,
    ) -> Self {
        Self {
            source_image: source_image.into(),
            animation,
            duration_secs,
            frame_rate: DEFAULT_FRAME_RATE,
            source_is_upload: false,
        }
    }

    /// Like [`RenderRequest::new`], with the animation given by name or alias.
    pub fn parse(
        source_image: impl Into<PathBuf>,
        animation: &str,
        duration_secs: f64,
    ) -> KenBurnsResult<Self> {
        Ok(Self::new(
            source_image,
            AnimationKind::parse(animation)?,
            duration_secs,
        ))
    }

    /// Request whose duration is derived from a playback speed: `max(2, 6 / speed)` seconds.
    pub fn from_speed(
        source_image: impl Into<PathBuf>,
        animation: AnimationKind,
        speed: f64,
    ) -> KenBurnsResult<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(KenBurnsError::invalid_request(format!(
                "speed must be a positive number, got {speed}"
            )));
        }
        let duration = (BASE_DURATION_SECS / speed).max(MIN_SPEED_DURATION_SECS);
        Ok(Self::new(source_image, animation, duration))
    }

    /// Override the frame rate.
    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    /// Mark the source as a temporary upload.
    pub fn as_upload(mut self) -> Self {
        self.source_is_upload = true;
        self
    }

    /// Reject malformed or out-of-bounds parameters.
    pub fn validate(&self, limits: &RequestLimits) -> KenBurnsResult<()> {
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(KenBurnsError::invalid_request(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration_secs
            )));
        }
        if self.duration_secs > limits.max_duration_secs {
            return Err(KenBurnsError::invalid_request(format!(
                "duration {}s exceeds the maximum of {}s",
                self.duration_secs, limits.max_duration_secs
            )));
        }
        if self.frame_rate == 0 {
            return Err(KenBurnsError::invalid_request("frame rate must be > 0"));
        }
        if self.frame_rate > limits.max_frame_rate {
            return Err(KenBurnsError::invalid_request(format!(
                "frame rate {} exceeds the maximum of {}",
                self.frame_rate, limits.max_frame_rate
            )));
        }
        if self.total_frames() == 0 {
            return Err(KenBurnsError::invalid_request(format!(
                "duration {}s at {} fps yields no frames",
                self.duration_secs, self.frame_rate
            )));
        }
        if self.source_image.as_os_str().is_empty() {
            return Err(KenBurnsError::invalid_request("source image path is empty"));
        }
        Ok(())
    }

    /// Output frame rate.
    pub fn fps(&self) -> KenBurnsResult<Fps> {
        Fps::from_rate(self.frame_rate)
    }

    /// `floor(duration_secs * frame_rate)`; 0 when the frame rate is invalid.
    pub fn total_frames(&self) -> u64 {
        match self.fps() {
            Ok(fps) => total_frame_count(self.duration_secs, fps),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/delivery/request.rs"]
mod tests;
