//! GStreamer implementation of [`VideoGrabber`].

use std::path::{Path, PathBuf};

use vidgrab_common::error::{VidgrabError, VidgrabResult};
use vidgrab_processing_core::frame::{pack_rows, FrameSize};

use crate::devices::{self, AUTO_DEVICE};
use crate::pipeline::{GstRecordingPipeline, PreviewPipeline, RecordingSpec};
use crate::session::RecordingSession;
use crate::{CodecInfo, DeviceInfo, DeviceKind, VideoGrabber};

pub const DEFAULT_VIDEO_CODEC: &str = "x264enc";
pub const DEFAULT_AUDIO_CODEC: &str = "avenc_aac";

/// Camera grabber and recorder backed by GStreamer.
///
/// Device and codec names are stored as given and resolved when the
/// grabber or recorder is initialized. See [`devices::resolve_source`] for
/// how device names are matched.
pub struct GstGrabber {
    video_device: String,
    audio_device: String,
    video_codec: String,
    audio_codec: String,
    size: FrameSize,
    enable_audio: bool,
    preview: Option<PreviewPipeline>,
    recording_ready: bool,
    session: RecordingSession,
    pixels: Vec<u8>,
    frame_new: bool,
}

impl GstGrabber {
    pub fn new() -> Self {
        Self {
            video_device: AUTO_DEVICE.to_string(),
            audio_device: AUTO_DEVICE.to_string(),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            size: FrameSize::new(0, 0),
            enable_audio: false,
            preview: None,
            recording_ready: false,
            session: RecordingSession::new(),
            pixels: Vec::new(),
            frame_new: false,
        }
    }

    /// Seconds since the current recording started, or 0.
    pub fn recording_elapsed_secs(&self) -> f64 {
        self.session.elapsed_secs()
    }

    /// Frames written to the current (or last) recording.
    pub fn recorded_frames(&self) -> u64 {
        self.session
            .stats()
            .map(|s| s.frames_captured)
            .unwrap_or(0)
    }

    fn recording_spec(&self, output: &Path) -> RecordingSpec {
        RecordingSpec {
            output: output.to_path_buf(),
            size: self.size,
            video_codec: self.video_codec.clone(),
            audio_codec: self.enable_audio.then(|| self.audio_codec.clone()),
        }
    }
}

impl Default for GstGrabber {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoGrabber for GstGrabber {
    fn list_video_devices(&self) -> VidgrabResult<Vec<DeviceInfo>> {
        devices::list_devices(DeviceKind::Video)
    }

    fn list_audio_devices(&self) -> VidgrabResult<Vec<DeviceInfo>> {
        devices::list_devices(DeviceKind::Audio)
    }

    fn list_video_codecs(&self) -> VidgrabResult<Vec<CodecInfo>> {
        devices::list_codecs(DeviceKind::Video)
    }

    fn list_audio_codecs(&self) -> VidgrabResult<Vec<CodecInfo>> {
        devices::list_codecs(DeviceKind::Audio)
    }

    fn set_video_device_id(&mut self, name: &str) -> VidgrabResult<()> {
        self.video_device = name.to_string();
        Ok(())
    }

    fn set_audio_device_id(&mut self, name: &str) -> VidgrabResult<()> {
        self.audio_device = name.to_string();
        Ok(())
    }

    fn set_video_codec(&mut self, name: &str) -> VidgrabResult<()> {
        self.video_codec = name.to_string();
        Ok(())
    }

    fn set_audio_codec(&mut self, name: &str) -> VidgrabResult<()> {
        self.audio_codec = name.to_string();
        Ok(())
    }

    fn init_grabber(&mut self, width: u32, height: u32, enable_audio: bool) -> VidgrabResult<()> {
        if width == 0 || height == 0 {
            return Err(VidgrabError::config(format!(
                "Invalid grabber size {width}x{height}"
            )));
        }

        if let Some(mut previous) = self.preview.take() {
            previous.stop()?;
        }

        let size = FrameSize::new(width, height);
        let source = devices::resolve_source(DeviceKind::Video, &self.video_device)?;
        tracing::info!(device = %source.describe(), %size, enable_audio, "Opening grabber");

        let element = source.create_element(DeviceKind::Video)?;
        let mut preview = PreviewPipeline::build(&element, size)?;
        preview.start()?;

        self.size = size;
        self.enable_audio = enable_audio;
        self.pixels = vec![0; size.byte_len()];
        self.frame_new = false;
        self.preview = Some(preview);
        Ok(())
    }

    fn init_recording(&mut self) -> VidgrabResult<()> {
        if self.preview.is_none() {
            return Err(VidgrabError::invalid_state(
                "init_grabber must succeed before init_recording",
            ));
        }

        self.recording_ready = false;
        if !devices::element_available(&self.video_codec) {
            return Err(VidgrabError::codec(format!(
                "Video codec '{}' is not available",
                self.video_codec
            )));
        }
        if self.enable_audio && !devices::element_available(&self.audio_codec) {
            return Err(VidgrabError::codec(format!(
                "Audio codec '{}' is not available",
                self.audio_codec
            )));
        }

        tracing::info!(
            video_codec = %self.video_codec,
            audio_codec = %self.audio_codec,
            audio = self.enable_audio,
            "Recorder ready"
        );
        self.recording_ready = true;
        Ok(())
    }

    fn grab_frame(&mut self) -> VidgrabResult<()> {
        self.frame_new = false;
        let preview = self
            .preview
            .as_ref()
            .ok_or_else(|| VidgrabError::invalid_state("Grabber is not initialized"))?;

        let Some(sample) = preview.try_pull_latest()? else {
            return Ok(());
        };
        let buffer = sample
            .buffer()
            .ok_or_else(|| VidgrabError::capture("Preview sample carried no buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| VidgrabError::capture(format!("Failed to map preview buffer: {e}")))?;

        pack_rows(map.as_slice(), self.size, &mut self.pixels)?;
        self.frame_new = true;

        if self.session.is_recording() {
            if let Err(e) = self.session.push_frame(&self.pixels) {
                tracing::warn!(error = %e, "Dropped frame from recording");
            }
        }
        Ok(())
    }

    fn is_frame_new(&self) -> bool {
        self.frame_new
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn width(&self) -> u32 {
        self.size.width
    }

    fn height(&self) -> u32 {
        self.size.height
    }

    fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    fn start_recording(&mut self, path: &Path) -> VidgrabResult<()> {
        if !self.recording_ready {
            return Err(VidgrabError::invalid_state(
                "init_recording must succeed before start_recording",
            ));
        }
        if self.session.is_recording() {
            return Err(VidgrabError::invalid_state("Already recording"));
        }

        let audio_source = if self.enable_audio {
            let source = devices::resolve_source(DeviceKind::Audio, &self.audio_device)?;
            tracing::info!(device = %source.describe(), "Opening microphone");
            Some(source.create_element(DeviceKind::Audio)?)
        } else {
            None
        };

        let pipeline = GstRecordingPipeline::build(self.recording_spec(path), audio_source)?;
        self.session.start(Box::new(pipeline))
    }

    fn stop_recording(&mut self) -> VidgrabResult<PathBuf> {
        self.session.stop()
    }

    fn close(&mut self) -> VidgrabResult<()> {
        if self.session.is_recording() {
            self.session.stop()?;
        }
        if let Some(mut preview) = self.preview.take() {
            preview.stop()?;
            tracing::info!("Grabber closed");
        }
        self.recording_ready = false;
        self.frame_new = false;
        Ok(())
    }
}

impl Drop for GstGrabber {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(error = %e, "Failed to close grabber cleanly");
        }
    }
}
