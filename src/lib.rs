//! kenburns turns a single still image into a short pan/zoom video.
//!
//! # Pipeline overview
//!
//! 1. **Resolve**: `AnimationKind + source size -> AnimationPlan` (start and end viewports that
//!    cover the canvas)
//! 2. **Generate**: `AnimationPlan + duration + fps -> Frame*` (eased interpolation, one viewport
//!    per frame, computed lazily)
//! 3. **Composite**: `Viewport -> FrameRGBA` (CPU raster of the source through the viewport)
//! 4. **Encode**: stream frames into a [`FrameSink`], by default the system `ffmpeg` binary
//!
//! Finished renders are delivered either synchronously into a caller-provided writer
//! ([`StreamingRenderer`]) or asynchronously through a job id that is polled and downloaded later
//! ([`JobService`]). [`Delivery`] selects one of the two from [`ServiceConfig`].
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Bounded memory**: at most `channel_capacity` composited frames wait for the encoder.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod animation;
mod assets;
mod delivery;
mod encode;
mod foundation;
mod jobs;
mod render;

/// Layered service configuration.
pub mod config;

pub use animation::ease::ease;
pub use animation::frames::{Frame, FrameGenerator, Frames, total_frame_count};
pub use animation::kind::AnimationKind;
pub use animation::plan::{AnimationPlan, MARGIN_FACTOR, ZOOM_FACTOR, cover_scale};
pub use assets::decode::{SourceImage, decode_image, load_source_image};
pub use config::ServiceConfig;
pub use delivery::request::{
    BASE_DURATION_SECS, DEFAULT_FRAME_RATE, MIN_SPEED_DURATION_SECS, RenderRequest, RequestLimits,
};
pub use delivery::streaming::{StreamState, StreamingRenderer};
pub use delivery::{Accepted, Delivery, DeliveryMode};
pub use encode::ffmpeg::{
    FfmpegEncoder, FfmpegOpts, FfmpegSink, OutputTarget, ProgressEvent, build_args,
    is_ffmpeg_on_path, is_program_available, parse_progress_line,
};
pub use encode::sink::{
    EncoderFactory, FrameSink, InMemorySink, PixelFormat, ProgressFn, SinkConfig,
};
pub use foundation::clock::{Clock, FakeClock, SystemClock};
pub use foundation::core::{Affine, Canvas, Fps, FrameIndex, Vec2, Viewport};
pub use foundation::error::{KenBurnsError, KenBurnsResult};
pub use foundation::fs::{ensure_dir, ensure_parent_dir, file_exists, remove_file_quiet};
pub use jobs::registry::{
    JobId, JobRegistry, JobSnapshot, JobStatus, MAX_IN_FLIGHT_PROGRESS, output_file_name,
    output_path, progress_percent,
};
pub use jobs::service::{JobOutput, JobService};
pub use render::compositor::FrameCompositor;
pub use render::frame::FrameRGBA;
pub use render::pipeline::{PreparedRender, RenderStats, render_to_sink};
