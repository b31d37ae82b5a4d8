use super::*;

fn req(duration: f64) -> RenderRequest {
    RenderRequest::new("in.png", AnimationKind::ZoomIn, duration)
}

#[test]
fn defaults_to_thirty_fps() {
    let r = req(2.0);
    assert_eq!(r.frame_rate, 30);
    assert_eq!(r.total_frames(), 60);
    assert!(!r.source_is_upload);
    assert!(r.validate(&RequestLimits::default()).is_ok());
}

#[test]
fn parse_accepts_aliases_and_rejects_unknown() {
    let r = RenderRequest::parse("in.png", "lr", 3.0).unwrap();
    assert_eq!(r.animation, AnimationKind::PanLeftToRight);

    let err = RenderRequest::parse("in.png", "spiral", 3.0).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidAnimationKind(_)));
}

#[test]
fn speed_maps_to_duration_with_floor() {
    let slow = RenderRequest::from_speed("in.png", AnimationKind::Static, 1.0).unwrap();
    assert_eq!(slow.duration_secs, 6.0);
    let half = RenderRequest::from_speed("in.png", AnimationKind::Static, 0.5).unwrap();
    assert_eq!(half.duration_secs, 12.0);
    let fast = RenderRequest::from_speed("in.png", AnimationKind::Static, 10.0).unwrap();
    assert_eq!(fast.duration_secs, 2.0);

    assert!(RenderRequest::from_speed("in.png", AnimationKind::Static, 0.0).is_err());
    assert!(RenderRequest::from_speed("in.png", AnimationKind::Static, f64::NAN).is_err());
}

#[test]
fn validate_enforces_limits() {
    let limits = RequestLimits::default();
    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY, 61.0, 0.01] {
        let err = req(bad).validate(&limits).unwrap_err();
        assert!(matches!(err, KenBurnsError::InvalidRequest(_)), "{bad}");
    }
    assert!(req(60.0).validate(&limits).is_ok());

    assert!(req(2.0).with_frame_rate(0).validate(&limits).is_err());
    assert!(req(2.0).with_frame_rate(121).validate(&limits).is_err());
    assert!(req(2.0).with_frame_rate(120).validate(&limits).is_ok());
    assert!(
        RenderRequest::new("", AnimationKind::Static, 2.0)
            .validate(&limits)
            .is_err()
    );
}

#[test]
fn deserializes_with_defaults() {
    let r: RenderRequest = serde_json::from_str(
        r#"{"source_image":"a.jpg","animation":"zoomOut","duration_secs":4.5}"#,
    )
    .unwrap();
    assert_eq!(r.animation, AnimationKind::ZoomOut);
    assert_eq!(r.frame_rate, 30);
    assert_eq!(r.total_frames(), 135);
    assert!(r.as_upload().source_is_upload);
}
