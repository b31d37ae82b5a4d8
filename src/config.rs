//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then `KENBURNS_*`
//! environment variables, then whatever the caller (usually the CLI) sets last.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::delivery::DeliveryMode;
use crate::delivery::request::{DEFAULT_FRAME_RATE, RequestLimits};
use crate::encode::ffmpeg::FfmpegOpts;
use crate::foundation::core::Canvas;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "KENBURNS_";

/// Runtime configuration for the render service.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Output raster size.
    pub canvas: Canvas,
    /// Frame rate used when a request does not set one.
    pub frame_rate: u32,
    /// How finished renders reach the caller.
    pub delivery: DeliveryMode,
    /// Directory for async job outputs. Created on demand.
    pub output_dir: PathBuf,
    /// Prefix joined with the job id to form download URLs.
    pub download_prefix: String,
    /// How long finished job outputs are retained, seconds.
    pub retention_secs: u64,
    /// Frames that may wait between compositor and encoder.
    pub channel_capacity: usize,
    /// Longest accepted request duration, seconds.
    pub max_duration_secs: f64,
    /// Highest accepted request frame rate.
    pub max_frame_rate: u32,
    /// Encoder settings.
    pub ffmpeg: FfmpegOpts,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let limits = RequestLimits::default();
        Self {
            canvas: Canvas::HD,
            frame_rate: DEFAULT_FRAME_RATE,
            delivery: DeliveryMode::default(),
            output_dir: PathBuf::from("renders"),
            download_prefix: "/download/".to_owned(),
            retention_secs: 600,
            channel_capacity: 1,
            max_duration_secs: limits.max_duration_secs,
            max_frame_rate: limits.max_frame_rate,
            ffmpeg: FfmpegOpts::default(),
        }
    }
}

impl ServiceConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_reader<R: std::io::Read>(r: R) -> KenBurnsResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| KenBurnsError::invalid_request(format!("parse config JSON: {e}")))
    }

    /// Parse a config from a JSON file on disk.
    pub fn from_json_path(path: impl AsRef<Path>) -> KenBurnsResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            KenBurnsError::invalid_request(format!("open config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Apply `KENBURNS_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> KenBurnsResult<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `KENBURNS_*` overrides read through `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> KenBurnsResult<()> {
        let get = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        };

        if let Some((key, v)) = get("CANVAS_WIDTH") {
            self.canvas.width = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("CANVAS_HEIGHT") {
            self.canvas.height = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("FRAME_RATE") {
            self.frame_rate = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("DELIVERY") {
            self.delivery = parse_env(&key, &v)?;
        }
        if let Some((_, v)) = get("OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some((_, v)) = get("DOWNLOAD_PREFIX") {
            self.download_prefix = v;
        }
        if let Some((key, v)) = get("RETENTION_SECS") {
            self.retention_secs = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("CHANNEL_CAPACITY") {
            self.channel_capacity = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("MAX_DURATION_SECS") {
            self.max_duration_secs = parse_env(&key, &v)?;
        }
        if let Some((key, v)) = get("MAX_FRAME_RATE") {
            self.max_frame_rate = parse_env(&key, &v)?;
        }
        if let Some((_, v)) = get("FFMPEG") {
            self.ffmpeg.program = v;
        }
        if let Some((_, v)) = get("CODEC") {
            self.ffmpeg.codec = v;
        }
        if let Some((key, v)) = get("CRF") {
            self.ffmpeg.crf = Some(parse_env(&key, &v)?);
        }
        if let Some((_, v)) = get("PRESET") {
            self.ffmpeg.preset = Some(v);
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> KenBurnsResult<()> {
        self.canvas.validate()?;
        if self.frame_rate == 0 {
            return Err(KenBurnsError::invalid_request("frame_rate must be > 0"));
        }
        if self.frame_rate > self.max_frame_rate {
            return Err(KenBurnsError::invalid_request(format!(
                "frame_rate {} exceeds max_frame_rate {}",
                self.frame_rate, self.max_frame_rate
            )));
        }
        if self.channel_capacity == 0 {
            return Err(KenBurnsError::invalid_request(
                "channel_capacity must be > 0",
            ));
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(KenBurnsError::invalid_request(
                "max_duration_secs must be a positive number",
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(KenBurnsError::invalid_request("output_dir must be set"));
        }
        if self.ffmpeg.program.is_empty() || self.ffmpeg.codec.is_empty() {
            return Err(KenBurnsError::invalid_request(
                "ffmpeg program and codec must be set",
            ));
        }
        Ok(())
    }

    /// Retention window for finished jobs.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// Request bounds derived from this config.
    pub fn limits(&self) -> RequestLimits {
        RequestLimits {
            max_duration_secs: self.max_duration_secs,
            max_frame_rate: self.max_frame_rate,
        }
    }
}

fn parse_env<T>(key: &str, value: &str) -> KenBurnsResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| KenBurnsError::invalid_request(format!("{key}='{value}': {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
