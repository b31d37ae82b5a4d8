use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::KenBurnsResult;
use crate::render::frame::FrameRGBA;

/// Raw pixel layout of frames handed to a sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, opaque.
    #[default]
    Rgba8,
}

impl PixelFormat {
    /// Name understood by `ffmpeg -pix_fmt`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Rgba8 => "rgba",
        }
    }

    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
        }
    }
}

/// Configuration provided to a [`FrameSink`] at the start of a render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Layout of pushed frames.
    pub pixel_format: PixelFormat,
    /// Number of frames that will be pushed. Used for progress reporting.
    pub total_frames: u64,
}

impl SinkConfig {
    /// Expected byte length of one frame.
    pub fn frame_len(&self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.pixel_format.bytes_per_pixel())
    }
}

/// Sink contract for consuming rendered frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order, after
/// exactly one `begin`. `end` flushes and waits for the encoder. Dropping a sink without calling
/// `end` aborts the encode.
pub trait FrameSink: Send {
    /// Start encoding with `cfg`.
    fn begin(&mut self, cfg: SinkConfig) -> KenBurnsResult<()>;
    /// Submit the next frame. May block on encoder backpressure.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> KenBurnsResult<()>;
    /// Close input and wait for the encoded output to be complete.
    fn end(&mut self) -> KenBurnsResult<()>;
}

/// Progress callback, called with the encoded fraction in `0.0..=1.0`.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Builds sinks for the two delivery targets.
pub trait EncoderFactory: Send + Sync {
    /// Sink that writes a complete video file to `out_path`, reporting progress as it goes.
    fn file_sink(&self, out_path: &Path, on_progress: ProgressFn)
    -> KenBurnsResult<Box<dyn FrameSink>>;

    /// Sink that streams encoded bytes into `writer` as they are produced.
    fn stream_sink(&self, writer: Box<dyn Write + Send>) -> KenBurnsResult<Box<dyn FrameSink>>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in push order.
    pub frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config passed to the last `begin`.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// `true` once `end` has been called.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> KenBurnsResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> KenBurnsResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> KenBurnsResult<()> {
        self.ended = true;
        Ok(())
    }
}
