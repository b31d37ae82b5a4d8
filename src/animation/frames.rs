use crate::animation::ease::ease;
use crate::animation::plan::AnimationPlan;
use crate::foundation::core::{Fps, FrameIndex, Viewport};

/// One frame's transform. Produced and consumed without retention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Zero-based position in the render.
    pub index: FrameIndex,
    /// Crop window for this frame.
    pub viewport: Viewport,
}

/// `floor(duration_secs * fps)`.
pub fn total_frame_count(duration_secs: f64, fps: Fps) -> u64 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 0;
    }
    fps.secs_to_frames_floor(duration_secs)
}

/// Lazy, restartable frame sequence for one plan.
///
/// Each frame is a pure function of its index: `t = i / (n - 1)` so the last frame lands exactly
/// on the end viewport (`t = 0` for a single-frame render), then `viewport = lerp(start, end,
/// ease(t))`.
#[derive(Clone, Debug)]
pub struct FrameGenerator {
    plan: AnimationPlan,
    total: u64,
}

impl FrameGenerator {
    /// Generator emitting exactly `total` frames.
    pub fn new(plan: AnimationPlan, total: u64) -> Self {
        Self { plan, total }
    }

    /// Generator for `duration_secs` at `fps`.
    pub fn for_duration(plan: AnimationPlan, duration_secs: f64, fps: Fps) -> Self {
        Self::new(plan, total_frame_count(duration_secs, fps))
    }

    /// The plan frames are interpolated from.
    pub fn plan(&self) -> &AnimationPlan {
        &self.plan
    }

    /// Number of frames in the sequence.
    pub fn len(&self) -> u64 {
        self.total
    }

    /// `true` when no frames would be emitted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Normalized time of frame `index`, before easing.
    pub fn time_at(&self, index: u64) -> f64 {
        if self.total <= 1 {
            return 0.0;
        }
        let last = (self.total - 1) as f64;
        (index as f64 / last).min(1.0)
    }

    /// Frame `index`, or `None` past the end.
    pub fn frame_at(&self, index: u64) -> Option<Frame> {
        if index >= self.total {
            return None;
        }
        let e = ease(self.time_at(index));
        Some(Frame {
            index: FrameIndex(index),
            viewport: self.plan.start.lerp(self.plan.end, e),
        })
    }

    /// Iterate all frames in index order.
    pub fn iter(&self) -> Frames<'_> {
        Frames {
            generator: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a FrameGenerator {
    type Item = Frame;
    type IntoIter = Frames<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`FrameGenerator::iter`].
#[derive(Clone, Debug)]
pub struct Frames<'a> {
    generator: &'a FrameGenerator,
    next: u64,
}

impl Iterator for Frames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let frame = self.generator.frame_at(self.next)?;
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.generator.total.saturating_sub(self.next);
        let left = usize::try_from(left).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Frames<'_> {}

#[cfg(test)]
#[path = "../../tests/unit/animation/frames.rs"]
mod tests;
