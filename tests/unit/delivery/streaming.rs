use super::*;
use crate::animation::kind::AnimationKind;
use crate::encode::sink::{InMemorySink, ProgressFn};
use crate::foundation::error::KenBurnsError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

struct BrokenPipe;

impl Write for BrokenPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "client went away",
        ))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes each frame index as 8 little-endian bytes.
struct IndexSink {
    writer: Box<dyn Write + Send>,
}

impl FrameSink for IndexSink {
    fn begin(&mut self, _cfg: SinkConfig) -> KenBurnsResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, _frame: &FrameRGBA) -> KenBurnsResult<()> {
        self.writer
            .write_all(&idx.0.to_le_bytes())
            .map_err(|e| KenBurnsError::encoding(e.to_string()))
    }

    fn end(&mut self) -> KenBurnsResult<()> {
        self.writer
            .flush()
            .map_err(|e| KenBurnsError::encoding(e.to_string()))
    }
}

struct IndexEncoder;

impl EncoderFactory for IndexEncoder {
    fn file_sink(&self, _out: &Path, _p: ProgressFn) -> KenBurnsResult<Box<dyn FrameSink>> {
        Err(KenBurnsError::encoding("file output not supported"))
    }

    fn stream_sink(&self, writer: Box<dyn Write + Send>) -> KenBurnsResult<Box<dyn FrameSink>> {
        Ok(Box::new(IndexSink { writer }))
    }
}

fn small_config() -> ServiceConfig {
    ServiceConfig {
        canvas: Canvas {
            width: 32,
            height: 18,
        },
        ..ServiceConfig::default()
    }
}

fn source(dir: &Path) -> PathBuf {
    let path = dir.join("src.png");
    image::RgbaImage::from_pixel(40, 30, image::Rgba([10, 200, 30, 255]))
        .save(&path)
        .unwrap();
    path
}

#[test]
fn staged_sink_walks_the_happy_path() {
    let mut sink = StagedSink::new(Box::new(InMemorySink::new()));
    assert_eq!(sink.state(), StreamState::Initializing);
    sink.begin(SinkConfig {
        width: 2,
        height: 2,
        fps: crate::foundation::core::Fps::from_rate(30).unwrap(),
        pixel_format: Default::default(),
        total_frames: 1,
    })
    .unwrap();
    assert_eq!(sink.state(), StreamState::Streaming);
    sink.end().unwrap();
    assert_eq!(sink.state(), StreamState::Done);
}

#[test]
fn streams_every_frame_into_the_writer() {
    let dir = tempfile::tempdir().unwrap();
    let buf = SharedBuf::default();
    let renderer = StreamingRenderer::new(&small_config(), Arc::new(IndexEncoder)).unwrap();

    let req = RenderRequest::new(source(dir.path()), AnimationKind::PanTopToBottom, 1.0)
        .with_frame_rate(12);
    let stats = renderer.stream(req, buf.clone()).unwrap();

    assert_eq!(stats.frames_total, 12);
    assert_eq!(stats.frames_encoded, 12);
    let bytes = buf.0.lock().unwrap();
    assert_eq!(bytes.len(), 12 * 8);
    assert_eq!(&bytes[88..96], &11u64.to_le_bytes());
}

#[test]
fn writer_failure_is_an_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = StreamingRenderer::new(&small_config(), Arc::new(IndexEncoder)).unwrap();
    let req = RenderRequest::new(source(dir.path()), AnimationKind::ZoomIn, 1.0);

    let err = renderer.stream(req, BrokenPipe).unwrap_err();
    assert!(matches!(err, KenBurnsError::Encoding(_)));
    assert!(err.to_string().contains("client went away"));
}

#[test]
fn invalid_requests_never_reach_the_encoder() {
    let renderer = StreamingRenderer::new(&small_config(), Arc::new(IndexEncoder)).unwrap();
    let buf = SharedBuf::default();
    let req = RenderRequest::new("whatever.png", AnimationKind::Static, 120.0);
    let err = renderer.stream(req, buf.clone()).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
    assert!(buf.0.lock().unwrap().is_empty());
}
