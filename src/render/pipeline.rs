use std::sync::mpsc;

use crate::animation::frames::FrameGenerator;
use crate::animation::plan::AnimationPlan;
use crate::assets::decode::SourceImage;
use crate::assets::upload::SourceFile;
use crate::delivery::request::RenderRequest;
use crate::encode::sink::{FrameSink, PixelFormat, SinkConfig};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::render::compositor::FrameCompositor;
use crate::render::frame::FrameRGBA;

/// Render statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct RenderStats {
    /// Frames in the render.
    pub frames_total: u64,
    /// Frames accepted by the sink.
    pub frames_encoded: u64,
}

/// Decoded source plus resolved plan, ready to render.
///
/// Building one consumes the request's upload: the source file guard is dropped as soon as the
/// image is decoded.
#[derive(Clone, Debug)]
pub struct PreparedRender {
    source: SourceImage,
    frames: FrameGenerator,
    fps: Fps,
}

impl PreparedRender {
    /// Decode the source image and resolve the animation for `canvas`.
    pub fn prepare(request: &RenderRequest, canvas: Canvas) -> KenBurnsResult<Self> {
        Self::from_source(SourceFile::for_request(request), request, canvas)
    }

    /// Like [`Self::prepare`], consuming a source guard the caller took ownership of earlier.
    ///
    /// The guard is released on every path out of this function.
    #[tracing::instrument(skip_all, fields(animation = %request.animation, source = %request.source_image.display()))]
    pub(crate) fn from_source(
        source: SourceFile,
        request: &RenderRequest,
        canvas: Canvas,
    ) -> KenBurnsResult<Self> {
        canvas.validate()?;
        let fps = request.fps()?;
        let source = source.decode()?;
        FrameCompositor::check_source(&source)?;
        let plan = AnimationPlan::resolve(request.animation, source.width, source.height, canvas)?;
        let frames = FrameGenerator::for_duration(plan, request.duration_secs, fps);
        tracing::debug!(
            width = source.width,
            height = source.height,
            frames = frames.len(),
            "render prepared"
        );
        Ok(Self {
            source,
            frames,
            fps,
        })
    }

    /// Decoded source image.
    pub fn source(&self) -> &SourceImage {
        &self.source
    }

    /// Resolved start/end viewports.
    pub fn plan(&self) -> &AnimationPlan {
        self.frames.plan()
    }

    /// Per-frame viewports.
    pub fn frames(&self) -> &FrameGenerator {
        &self.frames
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.fps
    }

    /// Sink configuration matching this render.
    pub fn sink_config(&self) -> SinkConfig {
        let canvas = self.plan().canvas;
        SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
            pixel_format: PixelFormat::Rgba8,
            total_frames: self.frames.len(),
        }
    }

    /// Composite frame `index` on its own, outside any sink.
    pub fn render_frame(&self, index: u64) -> KenBurnsResult<FrameRGBA> {
        let frame = self.frames.frame_at(index).ok_or_else(|| {
            KenBurnsError::invalid_request(format!(
                "frame {index} is out of range (render has {} frames)",
                self.frames.len()
            ))
        })?;
        FrameCompositor::new(&self.source, self.plan().canvas)?.compose(&frame.viewport)
    }
}

#[derive(Debug)]
struct FrameMsg {
    idx: FrameIndex,
    frame: FrameRGBA,
}

enum ProduceError {
    Compose(KenBurnsError),
    EncoderGone,
}

/// Composite every frame of `prepared` and feed it to `sink`.
///
/// Frames are produced on the calling thread and handed to an encoder thread over a channel
/// bounded by `channel_capacity`, so at most that many frames wait while the sink is busy. The
/// sink is finalized only when every frame arrived; on any failure it is left unfinished for its
/// owner to drop.
#[tracing::instrument(skip_all, fields(frames = prepared.frames.len(), fps = prepared.fps.num))]
pub fn render_to_sink(
    prepared: &PreparedRender,
    sink: &mut dyn FrameSink,
    channel_capacity: usize,
) -> KenBurnsResult<RenderStats> {
    let total = prepared.frames.len();
    if total == 0 {
        return Err(KenBurnsError::invalid_request("render has no frames"));
    }
    let cfg = prepared.sink_config();
    let mut compositor = FrameCompositor::new(&prepared.source, prepared.plan().canvas)?;
    let cap = channel_capacity.max(1);

    std::thread::scope(|scope| -> KenBurnsResult<RenderStats> {
        let (tx, rx) = mpsc::sync_channel::<FrameMsg>(cap);
        let sink_ref: &mut dyn FrameSink = sink;

        let enc = scope.spawn(move || -> KenBurnsResult<u64> {
            sink_ref.begin(cfg)?;
            let mut encoded = 0u64;
            for msg in rx {
                sink_ref.push_frame(msg.idx, &msg.frame)?;
                encoded += 1;
            }
            if encoded != total {
                return Err(KenBurnsError::encoding(format!(
                    "render stopped after {encoded} of {total} frames"
                )));
            }
            sink_ref.end()?;
            Ok(encoded)
        });

        let produce_res = (|| -> Result<(), ProduceError> {
            for frame in &prepared.frames {
                let rgba = compositor
                    .compose(&frame.viewport)
                    .map_err(ProduceError::Compose)?;
                tracing::trace!(frame = frame.index.0, "composited");
                tx.send(FrameMsg {
                    idx: frame.index,
                    frame: rgba,
                })
                .map_err(|_| ProduceError::EncoderGone)?;
            }
            Ok(())
        })();

        drop(tx);
        let enc_res = enc
            .join()
            .map_err(|_| KenBurnsError::encoding("encoder thread panicked"))?;

        match produce_res {
            Err(ProduceError::Compose(e)) => Err(e),
            Err(ProduceError::EncoderGone) => match enc_res {
                Err(e) => Err(e),
                Ok(_) => Err(KenBurnsError::encoding(
                    "encoder thread stopped accepting frames",
                )),
            },
            Ok(()) => {
                let frames_encoded = enc_res?;
                tracing::debug!(frames_encoded, "render finished");
                Ok(RenderStats {
                    frames_total: total,
                    frames_encoded,
                })
            }
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
