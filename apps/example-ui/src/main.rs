//! VidGrab example window.
//!
//! Opens the configured camera and microphone, shows the live image next
//! to its negative, and records to `output.mov` in the data directory while
//! the space bar toggle is on.

mod app;
mod canvas;

use eframe::egui;
use vidgrab_capture_engine::GstGrabber;
use vidgrab_common::config::AppConfig;

use crate::app::{ExampleSettings, GrabberExample, InputEvent, Key};
use crate::canvas::{EguiCanvas, TextureStore};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load();
    vidgrab_common::logging::init_logging(&config.logging);

    let settings = ExampleSettings::from_config(&config);
    let window_size = [
        settings.width as f32 * 2.0,
        settings.height as f32 + 80.0,
    ];

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("VidGrab Example")
            .with_inner_size(window_size),
        ..Default::default()
    };

    eframe::run_native(
        "VidGrab Example",
        options,
        Box::new(move |_cc| {
            let example = GrabberExample::setup(GstGrabber::new(), settings);
            Box::new(ExampleWindow {
                example,
                textures: TextureStore::default(),
                window_size: None,
            })
        }),
    )
    .map_err(|e| anyhow::anyhow!("example window failed: {e}"))
}

struct ExampleWindow {
    example: GrabberExample<GstGrabber>,
    textures: TextureStore,
    window_size: Option<egui::Vec2>,
}

impl eframe::App for ExampleWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        for event in ctx.input(|i| i.events.clone()) {
            if let Some(event) = translate_event(&event) {
                self.example.handle_event(event);
            }
        }

        let size = ctx.screen_rect().size();
        if self.window_size.is_some_and(|previous| previous != size) {
            self.example.handle_event(InputEvent::WindowResized {
                width: size.x,
                height: size.y,
            });
        }
        self.window_size = Some(size);

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let mut canvas = EguiCanvas::new(ctx, ui.painter().clone(), &mut self.textures);
                self.example.update(&mut canvas);
                self.example.draw(&mut canvas);
            });

        // Poll the camera every frame, like a game loop.
        ctx.request_repaint();
    }
}

fn translate_event(event: &egui::Event) -> Option<InputEvent> {
    match event {
        egui::Event::Key {
            key,
            pressed,
            repeat,
            ..
        } => {
            let key = match key {
                egui::Key::Space => Key::Space,
                _ => Key::Other,
            };
            match (pressed, repeat) {
                (true, false) => Some(InputEvent::KeyPressed(key)),
                (true, true) => None,
                (false, _) => Some(InputEvent::KeyReleased(key)),
            }
        }
        egui::Event::PointerMoved(pos) => Some(InputEvent::MouseMoved { x: pos.x, y: pos.y }),
        egui::Event::PointerButton { pos, pressed, .. } => Some(if *pressed {
            InputEvent::MousePressed { x: pos.x, y: pos.y }
        } else {
            InputEvent::MouseReleased { x: pos.x, y: pos.y }
        }),
        _ => None,
    }
}
