use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_match_documented_values() {
    let cfg = ServiceConfig::default();
    assert_eq!(cfg.canvas, Canvas::HD);
    assert_eq!(cfg.frame_rate, 30);
    assert_eq!(cfg.delivery, DeliveryMode::Streaming);
    assert_eq!(cfg.output_dir, PathBuf::from("renders"));
    assert_eq!(cfg.download_prefix, "/download/");
    assert_eq!(cfg.retention(), Duration::from_secs(600));
    assert_eq!(cfg.channel_capacity, 1);
    assert_eq!(cfg.limits(), RequestLimits::default());
    assert_eq!(cfg.ffmpeg.codec, "libx264");
    assert_eq!(cfg.ffmpeg.pixel_format, "yuv420p");
    assert!(cfg.validate().is_ok());
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg = ServiceConfig::from_reader(
        r#"{"delivery":"async","retention_secs":30,"ffmpeg":{"crf":20}}"#.as_bytes(),
    )
    .unwrap();
    assert_eq!(cfg.delivery, DeliveryMode::Jobs);
    assert_eq!(cfg.retention_secs, 30);
    assert_eq!(cfg.ffmpeg.crf, Some(20));
    assert_eq!(cfg.ffmpeg.codec, "libx264");
    assert_eq!(cfg.canvas, Canvas::HD);
}

#[test]
fn json_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kenburns.json");
    std::fs::write(&path, r#"{"canvas":{"width":640,"height":360}}"#).unwrap();
    let cfg = ServiceConfig::from_json_path(&path).unwrap();
    assert_eq!((cfg.canvas.width, cfg.canvas.height), (640, 360));

    let err = ServiceConfig::from_json_path(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
}

#[test]
fn env_overrides_apply_on_top() {
    let mut cfg = ServiceConfig::default();
    cfg.apply_env_from(env(&[
        ("KENBURNS_CANVAS_WIDTH", "854"),
        ("KENBURNS_CANVAS_HEIGHT", "480"),
        ("KENBURNS_DELIVERY", "jobs"),
        ("KENBURNS_OUTPUT_DIR", "/tmp/out"),
        ("KENBURNS_RETENTION_SECS", "5"),
        ("KENBURNS_PRESET", "ultrafast"),
        ("KENBURNS_FRAME_RATE", " "),
    ]))
    .unwrap();
    assert_eq!((cfg.canvas.width, cfg.canvas.height), (854, 480));
    assert_eq!(cfg.delivery, DeliveryMode::Jobs);
    assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
    assert_eq!(cfg.retention_secs, 5);
    assert_eq!(cfg.ffmpeg.preset.as_deref(), Some("ultrafast"));
    assert_eq!(cfg.frame_rate, 30, "blank values are ignored");
}

#[test]
fn bad_env_values_name_the_variable() {
    let mut cfg = ServiceConfig::default();
    let err = cfg
        .apply_env_from(env(&[("KENBURNS_CHANNEL_CAPACITY", "lots")]))
        .unwrap_err();
    assert!(err.to_string().contains("KENBURNS_CHANNEL_CAPACITY"));
}

#[test]
fn validate_rejects_unusable_settings() {
    let odd = ServiceConfig {
        canvas: Canvas {
            width: 1281,
            height: 720,
        },
        ..ServiceConfig::default()
    };
    assert!(odd.validate().is_err());

    let zero_cap = ServiceConfig {
        channel_capacity: 0,
        ..ServiceConfig::default()
    };
    assert!(zero_cap.validate().is_err());

    let zero_fps = ServiceConfig {
        frame_rate: 0,
        ..ServiceConfig::default()
    };
    assert!(zero_fps.validate().is_err());
}
