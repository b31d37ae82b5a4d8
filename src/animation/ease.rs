/// Symmetric ease-in-out quadratic shared by every animation.
///
/// Input is clamped to `[0, 1]`; `NaN` maps to `0`.
pub fn ease(t: f64) -> f64 {
    if t.is_nan() {
        return 0.0;
    }
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
