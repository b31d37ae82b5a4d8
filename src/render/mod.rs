//! Frame composition and the render-to-sink pipeline.

pub(crate) mod compositor;
pub(crate) mod frame;
pub(crate) mod pipeline;
