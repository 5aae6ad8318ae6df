//! [`Canvas`] on top of an egui painter.

use std::collections::HashMap;

use eframe::egui::{self, Color32, TextureHandle, TextureOptions};
use vidgrab_capture_engine::{Canvas, Layer, Rgb};

/// GPU textures that outlive a single egui frame.
#[derive(Default)]
pub struct TextureStore {
    textures: HashMap<Layer, TextureHandle>,
}

pub struct EguiCanvas<'a> {
    ctx: &'a egui::Context,
    painter: egui::Painter,
    store: &'a mut TextureStore,
}

impl<'a> EguiCanvas<'a> {
    pub fn new(ctx: &'a egui::Context, painter: egui::Painter, store: &'a mut TextureStore) -> Self {
        Self {
            ctx,
            painter,
            store,
        }
    }

    fn origin(&self) -> egui::Pos2 {
        self.painter.clip_rect().min
    }
}

fn color(rgb: Rgb) -> Color32 {
    Color32::from_rgb(rgb.r, rgb.g, rgb.b)
}

impl Canvas for EguiCanvas<'_> {
    fn background(&mut self, rgb: Rgb) {
        self.painter
            .rect_filled(self.painter.clip_rect(), 0.0, color(rgb));
    }

    fn upload(&mut self, layer: Layer, width: u32, height: u32, rgb: &[u8]) {
        let expected = width as usize * height as usize * 3;
        if rgb.len() != expected {
            tracing::warn!(
                layer = layer.label(),
                expected,
                actual = rgb.len(),
                "Ignoring texture upload with wrong size"
            );
            return;
        }

        let image = egui::ColorImage::from_rgb([width as usize, height as usize], rgb);
        match self.store.textures.get_mut(&layer) {
            Some(handle) => handle.set(image, TextureOptions::LINEAR),
            None => {
                let handle = self
                    .ctx
                    .load_texture(layer.label(), image, TextureOptions::LINEAR);
                self.store.textures.insert(layer, handle);
            }
        }
    }

    fn draw_layer(&mut self, layer: Layer, x: f32, y: f32, width: f32, height: f32) {
        let Some(handle) = self.store.textures.get(&layer) else {
            return;
        };
        let rect = egui::Rect::from_min_size(
            self.origin() + egui::vec2(x, y),
            egui::vec2(width, height),
        );
        let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
        self.painter.image(handle.id(), rect, uv, Color32::WHITE);
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, rgb: Rgb) {
        self.painter.text(
            self.origin() + egui::vec2(x, y),
            egui::Align2::LEFT_TOP,
            text,
            egui::FontId::monospace(13.0),
            color(rgb),
        );
    }

    fn height(&self) -> f32 {
        self.painter.clip_rect().height()
    }
}
