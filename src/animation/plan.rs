use crate::animation::kind::AnimationKind;
use crate::foundation::core::{Canvas, Viewport};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};

/// Inflation applied on top of the cover scale so pans have room to travel.
pub const MARGIN_FACTOR: f64 = 1.1;

/// Scale ratio between the two ends of a zoom.
pub const ZOOM_FACTOR: f64 = 1.25;

/// Start and end viewports for one render.
///
/// Both viewports cover the canvas in both axes: `scale * source >= canvas`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct AnimationPlan {
    /// Viewport at progress 0.
    pub start: Viewport,
    /// Viewport at progress 1.
    pub end: Viewport,
    /// Output raster size.
    pub canvas: Canvas,
    /// Source image width in pixels.
    pub source_width: u32,
    /// Source image height in pixels.
    pub source_height: u32,
}

impl AnimationPlan {
    /// Resolve `kind` against a `source_width x source_height` image.
    pub fn resolve(
        kind: AnimationKind,
        source_width: u32,
        source_height: u32,
        canvas: Canvas,
    ) -> KenBurnsResult<Self> {
        if source_width == 0 || source_height == 0 {
            return Err(KenBurnsError::invalid_request(
                "source image width/height must be non-zero",
            ));
        }
        if canvas.width == 0 || canvas.height == 0 {
            return Err(KenBurnsError::invalid_request(
                "canvas width/height must be non-zero",
            ));
        }

        let sw = f64::from(source_width);
        let sh = f64::from(source_height);
        let cw = f64::from(canvas.width);
        let ch = f64::from(canvas.height);

        let base = cover_scale(source_width, source_height, canvas) * MARGIN_FACTOR;
        let max_x = |scale: f64| (sw * scale - cw).max(0.0);
        let max_y = |scale: f64| (sh * scale - ch).max(0.0);
        let centered = |scale: f64| Viewport {
            offset_x: max_x(scale) / 2.0,
            offset_y: max_y(scale) / 2.0,
            scale,
        };

        let center = centered(base);
        let (start, end) = match kind {
            AnimationKind::PanLeftToRight => (
                Viewport {
                    offset_x: 0.0,
                    ..center
                },
                Viewport {
                    offset_x: max_x(base),
                    ..center
                },
            ),
            AnimationKind::PanRightToLeft => (
                Viewport {
                    offset_x: max_x(base),
                    ..center
                },
                Viewport {
                    offset_x: 0.0,
                    ..center
                },
            ),
            AnimationKind::PanTopToBottom => (
                Viewport {
                    offset_y: 0.0,
                    ..center
                },
                Viewport {
                    offset_y: max_y(base),
                    ..center
                },
            ),
            AnimationKind::PanBottomToTop => (
                Viewport {
                    offset_y: max_y(base),
                    ..center
                },
                Viewport {
                    offset_y: 0.0,
                    ..center
                },
            ),
            AnimationKind::ZoomIn => (center, centered(base * ZOOM_FACTOR)),
            AnimationKind::ZoomOut => (centered(base * ZOOM_FACTOR), center),
            AnimationKind::Static => (center, center),
        };

        Ok(Self {
            start,
            end,
            canvas,
            source_width,
            source_height,
        })
    }

    /// Resolve from a textual animation identifier.
    pub fn resolve_named(
        name: &str,
        source_width: u32,
        source_height: u32,
        canvas: Canvas,
    ) -> KenBurnsResult<Self> {
        Self::resolve(
            AnimationKind::parse(name)?,
            source_width,
            source_height,
            canvas,
        )
    }

    /// `true` when the scaled source, shifted by the viewport offsets, spans the whole canvas.
    pub fn covers_canvas(&self, vp: &Viewport) -> bool {
        const EPS: f64 = 1e-6;
        let w = f64::from(self.source_width) * vp.scale;
        let h = f64::from(self.source_height) * vp.scale;
        let cw = f64::from(self.canvas.width);
        let ch = f64::from(self.canvas.height);
        vp.offset_x >= -EPS
            && vp.offset_y >= -EPS
            && vp.offset_x + cw <= w + EPS
            && vp.offset_y + ch <= h + EPS
    }
}

/// Smallest uniform scale at which the source covers the canvas in both axes.
pub fn cover_scale(source_width: u32, source_height: u32, canvas: Canvas) -> f64 {
    let sx = f64::from(canvas.width) / f64::from(source_width);
    let sy = f64::from(canvas.height) / f64::from(source_height);
    sx.max(sy)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/plan.rs"]
mod tests;
