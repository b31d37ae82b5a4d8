//! Encoding sinks.
//!
//! Sinks consume composited frames in index order. The default implementation streams raw RGBA
//! into a system `ffmpeg` process.

pub(crate) mod ffmpeg;
pub(crate) mod sink;
