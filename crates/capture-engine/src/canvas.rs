//! Drawing surface the grabber and applications render onto.
//!
//! A canvas holds one texture per [`Layer`]. `upload` replaces a layer's
//! pixels and `draw_layer` paints the last uploaded pixels, so an
//! application can upload in its update step and paint in its draw step.

/// Texture slots on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// The live camera image.
    Preview,
    /// An application-processed copy of the camera image.
    Processed,
}

impl Layer {
    pub fn label(&self) -> &'static str {
        match self {
            Layer::Preview => "preview",
            Layer::Processed => "processed",
        }
    }
}

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: u8) -> Self {
        Self::new(level, level, level)
    }
}

pub trait Canvas {
    /// Fill the whole surface.
    fn background(&mut self, color: Rgb);

    /// Replace the pixels of `layer` with a packed RGB image.
    fn upload(&mut self, layer: Layer, width: u32, height: u32, rgb: &[u8]);

    /// Paint the last upload of `layer` into the given rectangle.
    /// Does nothing if the layer was never uploaded.
    fn draw_layer(&mut self, layer: Layer, x: f32, y: f32, width: f32, height: f32);

    /// Paint text with its top-left corner at `(x, y)`. `\n` starts a new line.
    fn draw_text(&mut self, text: &str, x: f32, y: f32, color: Rgb);

    /// Height of the drawable area.
    fn height(&self) -> f32;
}
