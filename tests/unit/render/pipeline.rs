use super::*;
use crate::animation::kind::AnimationKind;
use crate::encode::sink::InMemorySink;
use std::path::{Path, PathBuf};

const CANVAS: Canvas = Canvas {
    width: 64,
    height: 36,
};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let img = image::RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x * 255 / width) as u8, (y * 255 / height) as u8, 128, 255])
    });
    img.save(&path).unwrap();
    path
}

/// Accepts `fail_at` frames, then rejects the next one.
struct FailingSink {
    fail_at: u64,
    pushed: u64,
    ended: bool,
}

impl FrameSink for FailingSink {
    fn begin(&mut self, _cfg: SinkConfig) -> KenBurnsResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, _frame: &FrameRGBA) -> KenBurnsResult<()> {
        if self.pushed == self.fail_at {
            return Err(KenBurnsError::encoding("sink full"));
        }
        self.pushed += 1;
        Ok(())
    }

    fn end(&mut self) -> KenBurnsResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[test]
fn renders_every_frame_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "src.png", 80, 60);
    let req = RenderRequest::new(&path, AnimationKind::PanLeftToRight, 1.0).with_frame_rate(10);
    let prepared = PreparedRender::prepare(&req, CANVAS).unwrap();

    let mut sink = InMemorySink::new();
    let stats = render_to_sink(&prepared, &mut sink, 1).unwrap();

    assert_eq!(
        stats,
        RenderStats {
            frames_total: 10,
            frames_encoded: 10,
        }
    );
    assert!(sink.is_ended());
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height, cfg.total_frames), (64, 36, 10));
    for (i, (idx, frame)) in sink.frames.iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!((frame.width, frame.height), (64, 36));
    }
    assert_ne!(sink.frames[0].1.data, sink.frames[9].1.data);
    assert!(path.exists(), "caller-owned source must be kept");
}

#[test]
fn upload_is_deleted_after_prepare() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "upload.png", 40, 40);
    let req = RenderRequest::new(&path, AnimationKind::Static, 1.0).as_upload();

    let prepared = PreparedRender::prepare(&req, CANVAS).unwrap();
    assert!(!path.exists());
    assert_eq!(prepared.source().width, 40);
    assert_eq!(prepared.plan().start, prepared.plan().end);
}

#[test]
fn missing_source_is_invalid_request() {
    let req = RenderRequest::new("/nonexistent/kenburns.png", AnimationKind::ZoomIn, 1.0);
    let err = PreparedRender::prepare(&req, CANVAS).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
}

#[test]
fn corrupt_source_is_decode_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"\x89PNG not really").unwrap();
    let req = RenderRequest::new(&path, AnimationKind::ZoomIn, 1.0);
    let err = PreparedRender::prepare(&req, CANVAS).unwrap_err();
    assert!(matches!(err, KenBurnsError::ImageDecode(_)));
}

#[test]
fn sink_failure_aborts_without_finalizing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "src.png", 80, 60);
    let req = RenderRequest::new(&path, AnimationKind::ZoomOut, 2.0).with_frame_rate(10);
    let prepared = PreparedRender::prepare(&req, CANVAS).unwrap();

    let mut sink = FailingSink {
        fail_at: 3,
        pushed: 0,
        ended: false,
    };
    let err = render_to_sink(&prepared, &mut sink, 1).unwrap_err();
    assert!(err.to_string().contains("sink full"));
    assert_eq!(sink.pushed, 3);
    assert!(!sink.ended);
}

#[test]
fn single_frame_matches_pipeline_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "src.png", 80, 60);
    let req = RenderRequest::new(&path, AnimationKind::ZoomIn, 0.5).with_frame_rate(10);
    let prepared = PreparedRender::prepare(&req, CANVAS).unwrap();

    let mut sink = InMemorySink::new();
    render_to_sink(&prepared, &mut sink, 4).unwrap();
    assert_eq!(prepared.render_frame(4).unwrap(), sink.frames[4].1);

    let err = prepared.render_frame(5).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
}
