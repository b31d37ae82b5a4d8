use std::sync::Arc;

use crate::assets::decode::SourceImage;
use crate::foundation::core::{Affine, Canvas, Viewport};
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::render::frame::FrameRGBA;

const BACKGROUND_RGBA: [u8; 4] = [0, 0, 0, 255];

/// CPU compositor that renders viewports of one source image into canvas-sized frames.
///
/// The source paint, raster context and target pixmap are built once and reused for every
/// frame of a render.
pub struct FrameCompositor {
    canvas: Canvas,
    source: vello_cpu::Image,
    source_width: u32,
    source_height: u32,
    ctx: vello_cpu::RenderContext,
    target: vello_cpu::Pixmap,
}

impl FrameCompositor {
    /// Prepare a compositor for `source` at `canvas` size.
    pub fn new(source: &SourceImage, canvas: Canvas) -> KenBurnsResult<Self> {
        let cw = to_u16(canvas.width, "canvas width")?;
        let ch = to_u16(canvas.height, "canvas height")?;
        let pixmap = pixmap_from_premul_bytes(&source.rgba8_premul, source.width, source.height)?;

        Ok(Self {
            canvas,
            source: vello_cpu::Image {
                image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
                sampler: vello_cpu::peniko::ImageSampler::default(),
            },
            source_width: source.width,
            source_height: source.height,
            ctx: vello_cpu::RenderContext::new(cw, ch),
            target: vello_cpu::Pixmap::new(cw, ch),
        })
    }

    /// Reject sources the rasterizer cannot address.
    pub(crate) fn check_source(source: &SourceImage) -> KenBurnsResult<()> {
        to_u16(source.width, "source width")?;
        to_u16(source.height, "source height")?;
        Ok(())
    }

    /// Output size.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Render the source through `viewport` into a new frame.
    ///
    /// The canvas is filled opaque black first, so a viewport that does not cover the canvas
    /// leaves black bars rather than failing.
    pub fn compose(&mut self, viewport: &Viewport) -> KenBurnsResult<FrameRGBA> {
        let [r, g, b, a] = BACKGROUND_RGBA;
        let ctx = &mut self.ctx;
        ctx.reset();
        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(r, g, b, a));
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.canvas.width),
            f64::from(self.canvas.height),
        ));

        ctx.set_transform(affine_to_cpu(viewport.to_affine()));
        ctx.set_paint(self.source.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(self.source_width),
            f64::from(self.source_height),
        ));

        ctx.flush();
        ctx.render_to_pixmap(&mut self.target);

        Ok(FrameRGBA {
            width: self.canvas.width,
            height: self.canvas.height,
            data: self.target.data_as_u8_slice().to_vec(),
        })
    }
}

fn to_u16(v: u32, what: &str) -> KenBurnsResult<u16> {
    v.try_into()
        .map_err(|_| KenBurnsError::invalid_request(format!("{what} {v} exceeds u16")))
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> KenBurnsResult<vello_cpu::Pixmap> {
    let w = to_u16(width, "source width")?;
    let h = to_u16(height, "source height")?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(KenBurnsError::image_decode("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
