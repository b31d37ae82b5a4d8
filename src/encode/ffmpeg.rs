use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::encode::sink::{EncoderFactory, FrameSink, ProgressFn, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::foundation::fs::ensure_parent_dir;
use crate::render::frame::FrameRGBA;

/// Encoder settings passed through to `ffmpeg`.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FfmpegOpts {
    /// Executable to run. Resolved through `PATH` when not absolute.
    pub program: String,
    /// Video codec (`-c:v`).
    pub codec: String,
    /// Output pixel format (`-pix_fmt`).
    pub pixel_format: String,
    /// Constant rate factor, when set.
    pub crf: Option<u8>,
    /// Encoder preset, when set.
    pub preset: Option<String>,
}

impl Default for FfmpegOpts {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_owned(),
            codec: "libx264".to_owned(),
            pixel_format: "yuv420p".to_owned(),
            crf: None,
            preset: None,
        }
    }
}

/// Parsed line of `ffmpeg -progress` output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `frame=N`: frames encoded so far.
    Frame(u64),
    /// `progress=end`: the encoder has finished.
    End,
}

/// Parse one `key=value` line of `-progress` output; unrelated keys yield `None`.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let (key, value) = line.trim().split_once('=')?;
    match key.trim() {
        "frame" => value.trim().parse().ok().map(ProgressEvent::Frame),
        "progress" if value.trim() == "end" => Some(ProgressEvent::End),
        _ => None,
    }
}

enum Output {
    File {
        path: PathBuf,
        on_progress: ProgressFn,
    },
    Stream {
        writer: Option<Box<dyn Write + Send>>,
    },
}

impl Output {
    fn target(&self) -> OutputTarget<'_> {
        match self {
            Self::File { path, .. } => OutputTarget::File(path),
            Self::Stream { .. } => OutputTarget::Stream,
        }
    }
}

/// Where `ffmpeg` writes its container.
#[derive(Clone, Copy, Debug)]
pub enum OutputTarget<'a> {
    /// Seekable MP4 file, with progress reported on stdout.
    File(&'a Path),
    /// Fragmented MP4 on stdout.
    Stream,
}

/// Full `ffmpeg` argument list for raw frames described by `cfg`.
pub fn build_args(opts: &FfmpegOpts, cfg: &SinkConfig, target: OutputTarget<'_>) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        cfg.pixel_format.ffmpeg_name(),
        "-s",
    ]
    .iter()
    .map(|s| (*s).to_owned())
    .collect();
    args.push(format!("{}x{}", cfg.width, cfg.height));
    // Rational input rate must precede `-i` for rawvideo.
    args.push("-r".to_owned());
    args.push(format!("{}/{}", cfg.fps.num, cfg.fps.den));
    args.extend(["-i", "pipe:0", "-an", "-c:v"].map(str::to_owned));
    args.push(opts.codec.clone());
    args.push("-pix_fmt".to_owned());
    args.push(opts.pixel_format.clone());
    if let Some(crf) = opts.crf {
        args.push("-crf".to_owned());
        args.push(crf.to_string());
    }
    if let Some(preset) = &opts.preset {
        args.push("-preset".to_owned());
        args.push(preset.clone());
    }

    match target {
        OutputTarget::File(path) => {
            args.extend(
                ["-movflags", "+faststart", "-progress", "pipe:1", "-nostats"].map(str::to_owned),
            );
            args.push(path.to_string_lossy().into_owned());
        }
        OutputTarget::Stream => {
            args.extend(
                [
                    "-movflags",
                    "frag_keyframe+empty_moov+default_base_moof",
                    "-f",
                    "mp4",
                    "pipe:1",
                ]
                .map(str::to_owned),
            );
        }
    }
    args
}

/// Sink that spawns `ffmpeg` and streams raw frames to its stdin.
///
/// Dropping the sink before a successful [`FrameSink::end`] kills the child process.
pub struct FfmpegSink {
    opts: FfmpegOpts,
    output: Output,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    stdout_pump: Option<JoinHandle<std::io::Result<()>>>,

    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Sink encoding into the file at `path`.
    pub fn to_file(opts: FfmpegOpts, path: impl Into<PathBuf>, on_progress: ProgressFn) -> Self {
        Self::with_output(
            opts,
            Output::File {
                path: path.into(),
                on_progress,
            },
        )
    }

    /// Sink streaming fragmented MP4 bytes into `writer`.
    pub fn to_writer(opts: FfmpegOpts, writer: Box<dyn Write + Send>) -> Self {
        Self::with_output(
            opts,
            Output::Stream {
                writer: Some(writer),
            },
        )
    }

    fn with_output(opts: FfmpegOpts, output: Output) -> Self {
        Self {
            opts,
            output,
            child: None,
            stdin: None,
            stderr_drain: None,
            stdout_pump: None,
            cfg: None,
            last_idx: None,
        }
    }

    fn spawn_stdout_pump(
        &mut self,
        stdout: std::process::ChildStdout,
        total_frames: u64,
    ) -> KenBurnsResult<JoinHandle<std::io::Result<()>>> {
        match &mut self.output {
            Output::File { on_progress, .. } => {
                let on_progress = on_progress.clone();
                Ok(std::thread::spawn(move || {
                    let reader = BufReader::new(stdout);
                    for line in reader.lines() {
                        match parse_progress_line(&line?) {
                            Some(ProgressEvent::Frame(n)) if total_frames > 0 => {
                                on_progress((n as f64 / total_frames as f64).clamp(0.0, 1.0));
                            }
                            Some(ProgressEvent::End) => on_progress(1.0),
                            _ => {}
                        }
                    }
                    Ok(())
                }))
            }
            Output::Stream { writer } => {
                let mut writer = writer
                    .take()
                    .ok_or_else(|| KenBurnsError::encoding("stream sink can only be started once"))?;
                Ok(std::thread::spawn(move || {
                    let mut stdout = stdout;
                    // On a writer error the pipe is dropped, which makes ffmpeg exit on EPIPE.
                    std::io::copy(&mut stdout, &mut writer)?;
                    writer.flush()
                }))
            }
        }
    }

    /// Kill the child and collect whatever diagnostics are available.
    fn abort(&mut self, reason: String) -> KenBurnsError {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let output_err = self
            .stdout_pump
            .take()
            .and_then(|h| h.join().ok())
            .and_then(|r| r.err());
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .and_then(|r| r.ok())
            .unwrap_or_default();
        self.cfg = None;

        let mut msg = reason;
        if let Some(e) = output_err {
            msg.push_str(&format!("; output writer failed: {e}"));
        }
        let stderr = String::from_utf8_lossy(&stderr);
        if !stderr.trim().is_empty() {
            msg.push_str(&format!("; ffmpeg: {}", stderr.trim()));
        }
        tracing::warn!(reason = %msg, "ffmpeg encode aborted");
        KenBurnsError::encoding(msg)
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> KenBurnsResult<()> {
        if self.child.is_some() {
            return Err(KenBurnsError::encoding("ffmpeg sink already started"));
        }
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(KenBurnsError::invalid_request("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(KenBurnsError::invalid_request(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(KenBurnsError::invalid_request(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        if let Output::File { path, .. } = &self.output {
            ensure_parent_dir(path)?;
        }

        let args = build_args(&self.opts, &cfg, self.output.target());
        tracing::debug!(program = %self.opts.program, ?args, "spawning ffmpeg");

        let mut child = Command::new(&self.opts.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                KenBurnsError::encoding(format!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.opts.program
                ))
            })?;

        let (Some(stdin), Some(stdout), Some(mut stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(KenBurnsError::encoding("failed to open ffmpeg pipes"));
        };

        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;

        match self.spawn_stdout_pump(stdout, cfg.total_frames) {
            Ok(pump) => {
                self.stdout_pump = Some(pump);
                Ok(())
            }
            Err(e) => Err(self.abort(e.to_string())),
        }
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> KenBurnsResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| KenBurnsError::encoding("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(KenBurnsError::encoding(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width != cfg.width || frame.height != cfg.height {
            return Err(KenBurnsError::encoding(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width, frame.height, cfg.width, cfg.height
            )));
        }
        if frame.data.len() != cfg.frame_len() {
            return Err(KenBurnsError::encoding(
                "frame.data size mismatch with width*height*4",
            ));
        }
        self.last_idx = Some(idx);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(KenBurnsError::encoding("ffmpeg sink is already finalized"));
        };
        if let Err(e) = stdin.write_all(&frame.data) {
            return Err(self.abort(format!(
                "failed to write frame {} to ffmpeg stdin: {e}",
                idx.0
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> KenBurnsResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| KenBurnsError::encoding("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| KenBurnsError::encoding(format!("failed to wait for ffmpeg: {e}")))?;
        let pump_res = match self.stdout_pump.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| KenBurnsError::encoding("ffmpeg stdout thread panicked"))?,
            None => Ok(()),
        };
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| KenBurnsError::encoding("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| KenBurnsError::encoding(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        self.cfg = None;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(KenBurnsError::encoding(format!(
                "ffmpeg exited with status {status}: {}",
                stderr.trim()
            )));
        }
        pump_res.map_err(|e| KenBurnsError::encoding(format!("failed to write encoded output: {e}")))
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            tracing::debug!("killing unfinished ffmpeg process");
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// [`EncoderFactory`] backed by the system `ffmpeg`.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    opts: FfmpegOpts,
}

impl FfmpegEncoder {
    /// Factory using `opts` for every sink it builds.
    pub fn new(opts: FfmpegOpts) -> Self {
        Self { opts }
    }

    /// Options passed to every sink.
    pub fn opts(&self) -> &FfmpegOpts {
        &self.opts
    }
}

impl EncoderFactory for FfmpegEncoder {
    fn file_sink(
        &self,
        out_path: &Path,
        on_progress: ProgressFn,
    ) -> KenBurnsResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::to_file(
            self.opts.clone(),
            out_path,
            on_progress,
        )))
    }

    fn stream_sink(&self, writer: Box<dyn Write + Send>) -> KenBurnsResult<Box<dyn FrameSink>> {
        Ok(Box::new(FfmpegSink::to_writer(self.opts.clone(), writer)))
    }
}

/// Return `true` when `program -version` runs successfully.
pub fn is_program_available(program: &str) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_program_available("ffmpeg")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
