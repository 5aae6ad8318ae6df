//! The grabber example: setup, per-tick update and draw, and input handling.
//!
//! Nothing here touches a window system. The eframe shell in `main.rs`
//! feeds ticks and input events in and supplies the [`Canvas`].

use std::path::PathBuf;

use vidgrab_capture_engine::{Canvas, Layer, Rgb, VideoGrabber};
use vidgrab_common::config::AppConfig;
use vidgrab_common::error::{VidgrabError, VidgrabResult};
use vidgrab_processing_core::{FrameInverter, FrameSize};

pub const BACKGROUND: Rgb = Rgb::gray(100);
pub const STATUS_COLOR: Rgb = Rgb::GREEN;
pub const STATUS_HINT: &str = "Press the space bar to toggle recording!";

/// Keys the example distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Other,
}

/// Input delivered by the window shell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(Key),
    KeyReleased(Key),
    MouseMoved { x: f32, y: f32 },
    MousePressed { x: f32, y: f32 },
    MouseReleased { x: f32, y: f32 },
    WindowResized { width: f32, height: f32 },
}

/// What the example asks of the grabber at setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleSettings {
    pub width: u32,
    pub height: u32,
    pub video_device: String,
    pub audio_device: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub record_audio: bool,
    pub output_path: PathBuf,
}

impl ExampleSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let grabber = &config.grabber;
        Self {
            width: grabber.width,
            height: grabber.height,
            video_device: grabber.video_device.clone(),
            audio_device: grabber.audio_device.clone(),
            video_codec: grabber.video_codec.clone(),
            audio_codec: grabber.audio_codec.clone(),
            record_audio: grabber.record_audio,
            output_path: config.output_path(),
        }
    }

    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }
}

/// Log an engine failure and carry on.
fn absorb<T>(what: &str, result: VidgrabResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "{what} failed");
            None
        }
    }
}

fn log_listing<T: std::fmt::Display>(what: &str, result: VidgrabResult<Vec<T>>) {
    if let Some(entries) = absorb(what, result) {
        tracing::info!(count = entries.len(), "{what}");
        for (index, entry) in entries.iter().enumerate() {
            tracing::info!("  [{index}] {entry}");
        }
    }
}

pub struct GrabberExample<G: VideoGrabber> {
    grabber: G,
    settings: ExampleSettings,
    inverter: FrameInverter,
    /// Last `grab_frame` failure, so a persistent one is warned about once.
    last_grab_error: Option<String>,
    closed: bool,
}

impl<G: VideoGrabber> GrabberExample<G> {
    /// Configure the grabber and allocate the inverted frame.
    pub fn setup(mut grabber: G, settings: ExampleSettings) -> Self {
        log_listing("Video devices", grabber.list_video_devices());
        log_listing("Audio devices", grabber.list_audio_devices());

        absorb(
            "Selecting video device",
            grabber.set_video_device_id(&settings.video_device),
        );
        absorb(
            "Selecting audio device",
            grabber.set_audio_device_id(&settings.audio_device),
        );

        log_listing("Video codecs", grabber.list_video_codecs());
        log_listing("Audio codecs", grabber.list_audio_codecs());

        absorb(
            "Selecting video codec",
            grabber.set_video_codec(&settings.video_codec),
        );
        absorb(
            "Selecting audio codec",
            grabber.set_audio_codec(&settings.audio_codec),
        );

        absorb(
            "Initializing grabber",
            grabber.init_grabber(settings.width, settings.height, settings.record_audio),
        );
        absorb("Initializing recorder", grabber.init_recording());

        let inverter = FrameInverter::new(settings.frame_size());
        Self {
            grabber,
            settings,
            inverter,
            last_grab_error: None,
            closed: false,
        }
    }

    /// Poll the grabber and, on a new frame, refresh both textures.
    pub fn update(&mut self, canvas: &mut dyn Canvas) {
        if let Err(e) = self.grabber.grab_frame() {
            self.report_grab_error(&e);
            return;
        }
        self.last_grab_error = None;
        if !self.grabber.is_frame_new() {
            return;
        }

        let size = self.inverter.size();
        match self.inverter.process(self.grabber.pixels()) {
            Ok(frame) => {
                self.grabber.upload_preview(canvas);
                canvas.upload(Layer::Processed, size.width, size.height, frame.as_bytes());
            }
            Err(e) => tracing::warn!(error = %e, "Skipping frame"),
        }
    }

    fn report_grab_error(&mut self, error: &VidgrabError) {
        let message = error.to_string();
        if self.last_grab_error.as_deref() == Some(message.as_str()) {
            tracing::debug!(error = %message, "Grabbing frame still failing");
            return;
        }
        tracing::warn!(error = %message, "Grabbing frame failed");
        self.last_grab_error = Some(message);
    }

    /// Live preview at the origin, inverted copy to its right, status below.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) {
        canvas.background(BACKGROUND);

        let size = self.inverter.size();
        let (width, height) = (size.width as f32, size.height as f32);
        self.grabber.draw(canvas, 0.0, 0.0);
        canvas.draw_layer(Layer::Processed, width, 0.0, width, height);

        let status_y = canvas.height() - 40.0;
        canvas.draw_text(&self.status_message(), 20.0, status_y, STATUS_COLOR);
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::KeyPressed(key) => self.key_pressed(key),
            InputEvent::KeyReleased(_) => {}
            InputEvent::MouseMoved { x, y }
            | InputEvent::MousePressed { x, y }
            | InputEvent::MouseReleased { x, y } => {
                tracing::trace!(x, y, "Pointer input ignored");
            }
            InputEvent::WindowResized { width, height } => {
                tracing::debug!(width, height, "Window resized");
            }
        }
    }

    pub fn key_pressed(&mut self, key: Key) {
        match key {
            Key::Space => self.toggle_recording(),
            Key::Other => {}
        }
    }

    fn toggle_recording(&mut self) {
        if !self.grabber.is_recording() {
            absorb(
                "Starting recording",
                self.grabber.start_recording(&self.settings.output_path),
            );
        } else if let Some(path) = absorb("Stopping recording", self.grabber.stop_recording()) {
            tracing::info!(path = %path.display(), "Recording saved");
        }
    }

    pub fn status_message(&self) -> String {
        let state = if self.grabber.is_recording() {
            "RECORDING"
        } else {
            "NOT RECORDING"
        };
        format!("{STATUS_HINT}\n{state}")
    }

    #[cfg(test)]
    fn is_recording(&self) -> bool {
        self.grabber.is_recording()
    }

    #[cfg(test)]
    fn inverted(&self) -> &vidgrab_processing_core::FrameBuffer {
        self.inverter.output()
    }

    #[cfg(test)]
    fn grabber(&self) -> &G {
        &self.grabber
    }

    /// Stop any recording and release the devices.
    pub fn exit(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        absorb("Closing grabber", self.grabber.close());
    }
}

impl<G: VideoGrabber> Drop for GrabberExample<G> {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use vidgrab_capture_engine::stub::StubGrabber;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Background(Rgb),
        Draw { layer: Layer, x: f32, y: f32, w: f32, h: f32 },
        Text { text: String, x: f32, y: f32, color: Rgb },
    }

    #[derive(Default)]
    struct RecordingCanvas {
        textures: HashMap<Layer, Vec<u8>>,
        uploads: Vec<Layer>,
        ops: Vec<Op>,
    }

    impl Canvas for RecordingCanvas {
        fn background(&mut self, color: Rgb) {
            self.ops.push(Op::Background(color));
        }

        fn upload(&mut self, layer: Layer, _width: u32, _height: u32, rgb: &[u8]) {
            self.uploads.push(layer);
            self.textures.insert(layer, rgb.to_vec());
        }

        fn draw_layer(&mut self, layer: Layer, x: f32, y: f32, width: f32, height: f32) {
            self.ops.push(Op::Draw {
                layer,
                x,
                y,
                w: width,
                h: height,
            });
        }

        fn draw_text(&mut self, text: &str, x: f32, y: f32, color: Rgb) {
            self.ops.push(Op::Text {
                text: text.to_string(),
                x,
                y,
                color,
            });
        }

        fn height(&self) -> f32 {
            320.0
        }
    }

    fn settings() -> ExampleSettings {
        let config = AppConfig {
            data_dir: PathBuf::from("/data"),
            ..Default::default()
        };
        ExampleSettings::from_config(&config)
    }

    fn example() -> GrabberExample<StubGrabber> {
        GrabberExample::setup(StubGrabber::new(), settings())
    }

    #[test]
    fn setup_configures_grabber_in_order() {
        let app = example();
        assert_eq!(
            app.grabber().calls(),
            &[
                "list_video_devices",
                "list_audio_devices",
                "set_video_device_id(auto)",
                "set_audio_device_id(auto)",
                "list_video_codecs",
                "list_audio_codecs",
                "set_video_codec(x264enc)",
                "set_audio_codec(avenc_aac)",
                "init_grabber(320, 240, true)",
                "init_recording",
            ]
        );
        assert_eq!(app.inverted().len(), 230_400);
    }

    #[test]
    fn update_inverts_new_frame_and_uploads() {
        let mut grabber = StubGrabber::new();
        let mut frame = vec![128u8; 230_400];
        frame[0] = 0;
        frame[1] = 255;
        grabber.queue_frame(frame);

        let mut app = GrabberExample::setup(grabber, settings());
        let mut canvas = RecordingCanvas::default();
        app.update(&mut canvas);

        let inverted = app.inverted().as_bytes();
        assert_eq!(inverted.len(), 230_400);
        assert_eq!(inverted[0], 255);
        assert_eq!(inverted[1], 0);
        assert_eq!(inverted[2], 127);
        assert_eq!(canvas.textures[&Layer::Processed], inverted);
        assert_eq!(canvas.uploads, [Layer::Preview, Layer::Processed]);
        assert_eq!(canvas.textures[&Layer::Preview][..2], [0, 255]);
    }

    #[test]
    fn tick_without_new_frame_is_a_no_op() {
        let mut app = example();
        let mut canvas = RecordingCanvas::default();
        app.update(&mut canvas);

        assert!(canvas.uploads.is_empty());
        assert!(app.inverted().as_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn mismatched_frame_is_skipped() {
        let mut grabber = StubGrabber::new();
        grabber.queue_frame(vec![10; 230_400]);
        grabber.queue_frame(vec![0; 100]);

        let mut app = GrabberExample::setup(grabber, settings());
        let mut canvas = RecordingCanvas::default();
        app.update(&mut canvas);
        app.update(&mut canvas);

        assert_eq!(canvas.uploads, [Layer::Preview, Layer::Processed]);
        assert_eq!(app.inverted().len(), 230_400);
        assert!(app.inverted().as_bytes().iter().all(|&b| b == 245));
    }

    #[test]
    fn draw_does_not_reupload_textures() {
        let mut grabber = StubGrabber::new();
        grabber.queue_frame(vec![1; 230_400]);
        let mut app = GrabberExample::setup(grabber, settings());
        let mut canvas = RecordingCanvas::default();

        app.update(&mut canvas);
        for _ in 0..3 {
            app.update(&mut canvas);
            app.draw(&mut canvas);
        }
        assert_eq!(canvas.uploads.len(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn count(&self, needle: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .matches(needle)
                .count()
        }
    }

    #[test]
    fn persistent_grab_failure_is_warned_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let mut grabber = StubGrabber::new();
        for _ in 0..5 {
            grabber.queue_grab_error("Grabber is not initialized");
        }
        grabber.queue_frame(vec![0; 230_400]);
        grabber.queue_grab_error("Grabber is not initialized");

        tracing::subscriber::with_default(subscriber, || {
            let mut app = GrabberExample::setup(grabber, settings());
            let mut canvas = RecordingCanvas::default();
            for _ in 0..5 {
                app.update(&mut canvas);
            }
            assert_eq!(logs.count("Grabbing frame failed"), 1);
            assert!(canvas.uploads.is_empty());

            // A good frame clears the latch, so the next failure is reported.
            app.update(&mut canvas);
            app.update(&mut canvas);
            assert_eq!(logs.count("Grabbing frame failed"), 2);
        });
    }

    #[test]
    fn space_toggles_recording() {
        let mut app = example();
        assert!(!app.is_recording());

        app.key_pressed(Key::Space);
        assert!(app.is_recording());
        assert!(app
            .grabber()
            .calls()
            .contains(&"start_recording(/data/output.mov)".to_string()));

        app.key_pressed(Key::Space);
        assert!(!app.is_recording());
        assert_eq!(
            app.grabber().finished_recordings(),
            &[PathBuf::from("/data/output.mov")]
        );
    }

    #[test]
    fn other_input_never_changes_recording_state() {
        let mut app = example();
        for event in [
            InputEvent::KeyPressed(Key::Other),
            InputEvent::KeyReleased(Key::Space),
            InputEvent::MouseMoved { x: 5.0, y: 5.0 },
            InputEvent::MousePressed { x: 5.0, y: 5.0 },
            InputEvent::MouseReleased { x: 5.0, y: 5.0 },
            InputEvent::WindowResized {
                width: 800.0,
                height: 600.0,
            },
        ] {
            app.handle_event(event);
            assert!(!app.is_recording());
        }

        app.handle_event(InputEvent::KeyPressed(Key::Space));
        assert!(app.is_recording());
        app.handle_event(InputEvent::MousePressed { x: 1.0, y: 1.0 });
        assert!(app.is_recording());
    }

    #[test]
    fn failed_start_leaves_flag_false() {
        let mut app = GrabberExample::setup(StubGrabber::new().with_failing_recording(), settings());
        app.key_pressed(Key::Space);
        assert!(!app.is_recording());
        assert!(app.status_message().ends_with("\nNOT RECORDING"));
    }

    #[test]
    fn draw_places_preview_inverted_and_status() {
        let mut app = example();
        let mut canvas = RecordingCanvas::default();
        app.draw(&mut canvas);

        assert_eq!(canvas.ops[0], Op::Background(BACKGROUND));
        assert_eq!(
            canvas.ops[1],
            Op::Draw {
                layer: Layer::Preview,
                x: 0.0,
                y: 0.0,
                w: 320.0,
                h: 240.0
            }
        );
        assert_eq!(
            canvas.ops[2],
            Op::Draw {
                layer: Layer::Processed,
                x: 320.0,
                y: 0.0,
                w: 320.0,
                h: 240.0
            }
        );
        assert_eq!(
            canvas.ops[3],
            Op::Text {
                text: format!("{STATUS_HINT}\nNOT RECORDING"),
                x: 20.0,
                y: 280.0,
                color: STATUS_COLOR
            }
        );

        app.key_pressed(Key::Space);
        assert!(app.status_message().ends_with("\nRECORDING"));
        assert!(!app.status_message().ends_with("NOT RECORDING"));
    }

    #[test]
    fn exit_stops_recording_once() {
        let mut app = example();
        app.key_pressed(Key::Space);
        app.exit();
        app.exit();

        assert!(!app.is_recording());
        let closes = app.grabber().calls().iter().filter(|c| *c == "close").count();
        assert_eq!(closes, 1);
        assert_eq!(app.grabber().finished_recordings().len(), 1);
    }
}
