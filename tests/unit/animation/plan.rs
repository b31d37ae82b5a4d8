use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn every_kind_covers_the_canvas() {
    let sizes = [(800, 600), (4000, 1000), (300, 2000), (1280, 720), (1, 1)];
    for (sw, sh) in sizes {
        for kind in AnimationKind::ALL {
            let plan = AnimationPlan::resolve(kind, sw, sh, Canvas::HD).unwrap();
            assert!(plan.covers_canvas(&plan.start), "{kind} {sw}x{sh} start");
            assert!(plan.covers_canvas(&plan.end), "{kind} {sw}x{sh} end");
            assert!(plan.start.scale >= cover_scale(sw, sh, Canvas::HD));
        }
    }
}

#[test]
fn pan_left_to_right_moves_x_across_full_range() {
    let plan = AnimationPlan::resolve(AnimationKind::PanLeftToRight, 800, 600, Canvas::HD).unwrap();
    let scale = plan.start.scale;
    assert!(approx(scale, 1.6 * MARGIN_FACTOR));
    assert_eq!(plan.start.offset_x, 0.0);
    assert!(approx(plan.end.offset_x, 800.0 * scale - 1280.0));
    assert!(approx(plan.start.offset_y, (600.0 * scale - 720.0) / 2.0));
    assert_eq!(plan.start.offset_y, plan.end.offset_y);
    assert_eq!(plan.start.scale, plan.end.scale);
}

#[test]
fn reversed_pans_swap_endpoints() {
    let lr = AnimationPlan::resolve(AnimationKind::PanLeftToRight, 800, 600, Canvas::HD).unwrap();
    let rl = AnimationPlan::resolve(AnimationKind::PanRightToLeft, 800, 600, Canvas::HD).unwrap();
    assert_eq!(lr.start, rl.end);
    assert_eq!(lr.end, rl.start);

    let tb = AnimationPlan::resolve(AnimationKind::PanTopToBottom, 800, 600, Canvas::HD).unwrap();
    let bt = AnimationPlan::resolve(AnimationKind::PanBottomToTop, 800, 600, Canvas::HD).unwrap();
    assert_eq!(tb.start.offset_y, 0.0);
    assert!(approx(tb.end.offset_y, 600.0 * tb.start.scale - 720.0));
    assert_eq!(tb.start, bt.end);
    assert_eq!(tb.start.offset_x, tb.end.offset_x);
}

#[test]
fn zooms_stay_centered_and_ramp_scale() {
    let zin = AnimationPlan::resolve(AnimationKind::ZoomIn, 800, 600, Canvas::HD).unwrap();
    assert!(approx(zin.end.scale, zin.start.scale * ZOOM_FACTOR));
    for vp in [zin.start, zin.end] {
        assert!(approx(vp.offset_x, (800.0 * vp.scale - 1280.0) / 2.0));
        assert!(approx(vp.offset_y, (600.0 * vp.scale - 720.0) / 2.0));
    }

    let zout = AnimationPlan::resolve(AnimationKind::ZoomOut, 800, 600, Canvas::HD).unwrap();
    assert_eq!(zout.start, zin.end);
    assert_eq!(zout.end, zin.start);
}

#[test]
fn static_start_equals_end() {
    let plan = AnimationPlan::resolve(AnimationKind::Static, 640, 480, Canvas::HD).unwrap();
    assert_eq!(plan.start, plan.end);
}

#[test]
fn named_resolution_rejects_unknown_kinds() {
    assert!(AnimationPlan::resolve_named("zoom-in", 10, 10, Canvas::HD).is_ok());
    let err = AnimationPlan::resolve_named("dolly", 10, 10, Canvas::HD).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidAnimationKind(_)));
}

#[test]
fn zero_sized_source_is_invalid() {
    let err = AnimationPlan::resolve(AnimationKind::Static, 0, 10, Canvas::HD).unwrap_err();
    assert!(matches!(err, KenBurnsError::InvalidRequest(_)));
}
