//! VidGrab Capture Engine
//!
//! Grabs frames from a camera, keeps the newest one available for polling,
//! and records synchronized video and microphone audio to a file.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                      GstGrabber                       │
//! │  ┌──────────────────────┐    ┌──────────────────────┐ │
//! │  │   Preview pipeline   │    │  Recording pipeline  │ │
//! │  │ camera → RGB appsink │──▶│ appsrc ─┐            │ │
//! │  └──────────────────────┘    │ mic ────┴▶ mux → file│ │
//! │                              └──────────────────────┘ │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Applications talk to the engine through [`VideoGrabber`], so they can be
//! driven by [`stub::StubGrabber`] in tests.

pub mod canvas;
pub mod devices;
pub mod grabber;
pub mod pipeline;
pub mod session;
pub mod stub;

use std::path::{Path, PathBuf};

use serde::Serialize;
use vidgrab_common::error::VidgrabResult;

pub use canvas::{Canvas, Layer, Rgb};
pub use grabber::GstGrabber;
pub use pipeline::{gstreamer_version, init_gstreamer};
pub use session::{RecordingSession, RecordingState};

/// Which kind of device a [`DeviceInfo`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Video,
    Audio,
}

/// An enumerated capture device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Display name, as accepted by `set_video_device_id` / `set_audio_device_id`.
    pub name: String,
    pub kind: DeviceKind,
    /// Device class reported by the platform (e.g. `Video/Source`).
    pub class: String,
    /// Device node, when the platform exposes one.
    pub path: Option<String>,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} ({})", self.name, path),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An available encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodecInfo {
    /// Identifier accepted by `set_video_codec` / `set_audio_codec`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

impl std::fmt::Display for CodecInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.description)
    }
}

/// Capabilities an application needs from a capture-and-recording engine.
///
/// The call order an application follows is: optional listings, device and
/// codec selection, [`init_grabber`](VideoGrabber::init_grabber),
/// [`init_recording`](VideoGrabber::init_recording), then per tick
/// [`grab_frame`](VideoGrabber::grab_frame) and
/// [`is_frame_new`](VideoGrabber::is_frame_new).
pub trait VideoGrabber {
    /// Enumerate cameras.
    fn list_video_devices(&self) -> VidgrabResult<Vec<DeviceInfo>>;

    /// Enumerate microphones.
    fn list_audio_devices(&self) -> VidgrabResult<Vec<DeviceInfo>>;

    /// Enumerate video encoders.
    fn list_video_codecs(&self) -> VidgrabResult<Vec<CodecInfo>>;

    /// Enumerate audio encoders.
    fn list_audio_codecs(&self) -> VidgrabResult<Vec<CodecInfo>>;

    /// Select the camera by name. Takes effect at `init_grabber`.
    fn set_video_device_id(&mut self, name: &str) -> VidgrabResult<()>;

    /// Select the microphone by name. Takes effect at `init_recording`.
    fn set_audio_device_id(&mut self, name: &str) -> VidgrabResult<()>;

    /// Select the video encoder by name. Takes effect at `init_recording`.
    fn set_video_codec(&mut self, name: &str) -> VidgrabResult<()>;

    /// Select the audio encoder by name. Takes effect at `init_recording`.
    fn set_audio_codec(&mut self, name: &str) -> VidgrabResult<()>;

    /// Open the camera at `width × height`. `enable_audio` also opens the
    /// microphone for recordings.
    fn init_grabber(&mut self, width: u32, height: u32, enable_audio: bool) -> VidgrabResult<()>;

    /// Prepare the recorder with the selected codecs.
    fn init_recording(&mut self) -> VidgrabResult<()>;

    /// Poll for a new frame. Updates [`is_frame_new`](VideoGrabber::is_frame_new).
    fn grab_frame(&mut self) -> VidgrabResult<()>;

    /// Whether the last `grab_frame` delivered a frame.
    fn is_frame_new(&self) -> bool;

    /// The newest frame: packed RGB, rows top to bottom, `width * height * 3` bytes.
    fn pixels(&self) -> &[u8];

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Copy the current frame into the canvas' [`Layer::Preview`] texture.
    /// Call once per new frame, not once per draw.
    fn upload_preview(&self, canvas: &mut dyn Canvas) {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return;
        }
        canvas.upload(Layer::Preview, width, height, self.pixels());
    }

    /// Draw the last uploaded preview with its top-left corner at `(x, y)`.
    fn draw(&self, canvas: &mut dyn Canvas, x: f32, y: f32) {
        let (width, height) = (self.width(), self.height());
        if width == 0 || height == 0 {
            return;
        }
        canvas.draw_layer(Layer::Preview, x, y, width as f32, height as f32);
    }

    fn is_recording(&self) -> bool;

    /// Start writing to `path`.
    fn start_recording(&mut self, path: &Path) -> VidgrabResult<()>;

    /// Finish the current recording and return the file it was written to.
    fn stop_recording(&mut self) -> VidgrabResult<PathBuf>;

    /// Release the devices. Stops an active recording first. Idempotent.
    fn close(&mut self) -> VidgrabResult<()>;
}
