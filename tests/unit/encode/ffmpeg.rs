use super::*;
use crate::encode::sink::PixelFormat;
use crate::foundation::core::Fps;
use std::sync::{Arc, Mutex};

fn cfg(width: u32, height: u32) -> SinkConfig {
    SinkConfig {
        width,
        height,
        fps: Fps::from_rate(30).unwrap(),
        pixel_format: PixelFormat::Rgba8,
        total_frames: 3,
    }
}

fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> FrameRGBA {
    FrameRGBA {
        width,
        height,
        data: rgba.repeat((width * height) as usize),
    }
}

fn noop_progress() -> ProgressFn {
    Arc::new(|_| {})
}

#[test]
fn parses_progress_keys() {
    assert_eq!(parse_progress_line("frame=42"), Some(ProgressEvent::Frame(42)));
    assert_eq!(parse_progress_line(" frame= 7 \n"), Some(ProgressEvent::Frame(7)));
    assert_eq!(parse_progress_line("progress=end"), Some(ProgressEvent::End));
    assert_eq!(parse_progress_line("progress=continue"), None);
    assert_eq!(parse_progress_line("fps=29.97"), None);
    assert_eq!(parse_progress_line("frame=abc"), None);
    assert_eq!(parse_progress_line("garbage"), None);
}

#[test]
fn file_args_report_progress_and_end_with_path() {
    let opts = FfmpegOpts {
        crf: Some(23),
        preset: Some("veryfast".to_owned()),
        ..FfmpegOpts::default()
    };
    let args = build_args(&opts, &cfg(1280, 720), OutputTarget::File(Path::new("out/a.mp4")));

    let joined = args.join(" ");
    assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1280x720 -r 30/1 -i pipe:0"));
    assert!(joined.contains("-c:v libx264 -pix_fmt yuv420p"));
    assert!(joined.contains("-crf 23"));
    assert!(joined.contains("-preset veryfast"));
    assert!(joined.contains("-progress pipe:1 -nostats"));
    assert_eq!(args.last().map(String::as_str), Some("out/a.mp4"));
}

#[test]
fn stream_args_use_fragmented_mp4_on_stdout() {
    let args = build_args(&FfmpegOpts::default(), &cfg(640, 360), OutputTarget::Stream);
    let joined = args.join(" ");
    assert!(joined.contains("frag_keyframe+empty_moov+default_base_moof"));
    assert!(joined.contains("-f mp4"));
    assert!(!joined.contains("-crf"));
    assert!(!joined.contains("-progress"));
    assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
}

#[test]
fn begin_rejects_odd_dimensions_before_spawning() {
    let mut sink = FfmpegSink::to_file(
        FfmpegOpts {
            program: "definitely-not-a-real-ffmpeg".to_owned(),
            ..FfmpegOpts::default()
        },
        std::env::temp_dir().join("kenburns-odd.mp4"),
        noop_progress(),
    );
    let err = sink.begin(cfg(11, 10)).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
}

#[test]
fn missing_program_is_an_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut sink = FfmpegSink::to_file(
        FfmpegOpts {
            program: "definitely-not-a-real-ffmpeg".to_owned(),
            ..FfmpegOpts::default()
        },
        dir.path().join("out.mp4"),
        noop_progress(),
    );
    let err = sink.begin(cfg(16, 16)).unwrap_err();
    assert!(matches!(err, KenBurnsError::Encoding(_)));
    assert!(err.to_string().contains("failed to spawn"));
}

#[test]
fn push_before_begin_fails() {
    let mut sink = FfmpegSink::to_writer(FfmpegOpts::default(), Box::new(Vec::<u8>::new()));
    let err = sink
        .push_frame(FrameIndex(0), &solid_frame(2, 2, [0, 0, 0, 255]))
        .unwrap_err();
    assert!(err.to_string().contains("not started"));
    assert!(sink.end().is_err());
}

#[test]
fn ffmpeg_file_encode_reports_progress() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested").join("out.mp4");
    let seen = Arc::new(Mutex::new(Vec::<f64>::new()));
    let seen_cb = seen.clone();

    let mut sink = FfmpegEncoder::default()
        .file_sink(
            &out,
            Arc::new(move |f| seen_cb.lock().unwrap().push(f)),
        )
        .unwrap();
    sink.begin(cfg(16, 16)).unwrap();
    for i in 0..3 {
        sink.push_frame(FrameIndex(i), &solid_frame(16, 16, [200, 10, 10, 255]))
            .unwrap();
    }
    sink.end().unwrap();

    assert!(std::fs::metadata(&out).unwrap().len() > 0);
    let seen = seen.lock().unwrap();
    assert!(seen.iter().all(|f| (0.0..=1.0).contains(f)));
    assert_eq!(seen.last().copied(), Some(1.0));
}

#[test]
fn ffmpeg_rejects_out_of_order_frames() {
    if !is_ffmpeg_on_path() {
        return;
    }
    let mut sink = FfmpegSink::to_writer(FfmpegOpts::default(), Box::new(std::io::sink()));
    sink.begin(cfg(16, 16)).unwrap();
    let frame = solid_frame(16, 16, [0, 0, 0, 255]);
    sink.push_frame(FrameIndex(1), &frame).unwrap();
    assert!(sink.push_frame(FrameIndex(1), &frame).is_err());
    drop(sink);
}
