use super::*;

#[test]
fn canonical_names_parse_back() {
    for kind in AnimationKind::ALL {
        assert_eq!(AnimationKind::parse(kind.as_str()).unwrap(), kind);
        assert_eq!(kind.to_string(), kind.as_str());
    }
}

#[test]
fn front_end_aliases_are_accepted() {
    assert_eq!(
        AnimationKind::parse("lr").unwrap(),
        AnimationKind::PanLeftToRight
    );
    assert_eq!(
        AnimationKind::parse("panV").unwrap(),
        AnimationKind::PanTopToBottom
    );
    assert_eq!(
        "zoomOut".parse::<AnimationKind>().unwrap(),
        AnimationKind::ZoomOut
    );
}

#[test]
fn unknown_identifier_is_rejected() {
    let err = AnimationKind::parse("spiral").unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidAnimationKind(_)));
    assert!(err.to_string().contains("spiral"));
}

#[test]
fn serde_uses_kebab_case_and_aliases() {
    let kind: AnimationKind = serde_json::from_str("\"pan-bottom-to-top\"").unwrap();
    assert_eq!(kind, AnimationKind::PanBottomToTop);
    let kind: AnimationKind = serde_json::from_str("\"zoomIn\"").unwrap();
    assert_eq!(kind, AnimationKind::ZoomIn);
    assert_eq!(
        serde_json::to_string(&AnimationKind::Static).unwrap(),
        "\"static\""
    );
}
