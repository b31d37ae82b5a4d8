use std::io::Write;
use std::sync::Arc;

use crate::assets::upload::SourceFile;
use crate::config::ServiceConfig;
use crate::delivery::request::{RenderRequest, RequestLimits};
use crate::encode::sink::{EncoderFactory, FrameSink, SinkConfig};
use crate::foundation::core::{Canvas, FrameIndex};
use crate::foundation::error::KenBurnsResult;
use crate::render::frame::FrameRGBA;
use crate::render::pipeline::{PreparedRender, RenderStats, render_to_sink};

/// Progress of one synchronous stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Decoding the source and opening the encoder.
    Initializing,
    /// Frames are flowing to the client.
    Streaming,
    /// Input closed, waiting for the encoder to flush.
    Finalizing,
    /// The full video reached the writer.
    Done,
    /// The encoder or the writer failed; the encode was abandoned.
    Failed,
}

/// Sink decorator that tracks [`StreamState`] transitions.
pub(crate) struct StagedSink {
    inner: Box<dyn FrameSink>,
    state: StreamState,
}

impl StagedSink {
    pub(crate) fn new(inner: Box<dyn FrameSink>) -> Self {
        Self {
            inner,
            state: StreamState::Initializing,
        }
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    fn track<T>(&mut self, res: KenBurnsResult<T>) -> KenBurnsResult<T> {
        if res.is_err() {
            self.state = StreamState::Failed;
        }
        res
    }
}

impl FrameSink for StagedSink {
    fn begin(&mut self, cfg: SinkConfig) -> KenBurnsResult<()> {
        let res = self.inner.begin(cfg);
        if res.is_ok() {
            self.state = StreamState::Streaming;
        }
        self.track(res)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> KenBurnsResult<()> {
        let res = self.inner.push_frame(idx, frame);
        self.track(res)
    }

    fn end(&mut self) -> KenBurnsResult<()> {
        self.state = StreamState::Finalizing;
        let res = self.inner.end();
        if res.is_ok() {
            self.state = StreamState::Done;
        }
        self.track(res)
    }
}

/// Synchronous delivery: encode straight into the caller's writer.
#[derive(Clone)]
pub struct StreamingRenderer {
    encoder: Arc<dyn EncoderFactory>,
    canvas: Canvas,
    limits: RequestLimits,
    channel_capacity: usize,
}

impl StreamingRenderer {
    /// Renderer using the canvas, limits and channel capacity from `config`.
    pub fn new(config: &ServiceConfig, encoder: Arc<dyn EncoderFactory>) -> KenBurnsResult<Self> {
        config.validate()?;
        Ok(Self {
            encoder,
            canvas: config.canvas,
            limits: config.limits(),
            channel_capacity: config.channel_capacity,
        })
    }

    /// Render `request` and stream the encoded video into `writer`.
    ///
    /// Returns once the encoder has flushed everything. A writer error, such as a client
    /// disconnect, aborts the encode and is returned as an encoding failure.
    #[tracing::instrument(skip_all, fields(animation = %request.animation))]
    pub fn stream<W>(&self, request: RenderRequest, writer: W) -> KenBurnsResult<RenderStats>
    where
        W: Write + Send + 'static,
    {
        // Own the upload first so a rejected request still releases it.
        let source = SourceFile::for_request(&request);
        request.validate(&self.limits)?;
        let prepared = PreparedRender::from_source(source, &request, self.canvas)?;

        let mut sink = StagedSink::new(self.encoder.stream_sink(Box::new(writer))?);
        let res = render_to_sink(&prepared, &mut sink, self.channel_capacity);
        match &res {
            Ok(stats) => tracing::info!(frames = stats.frames_encoded, "stream finished"),
            Err(e) => tracing::warn!(state = ?sink.state(), error = %e, "stream failed"),
        }
        res
    }
}

#[cfg(test)]
#[path = "../../tests/unit/delivery/streaming.rs"]
mod tests;
