//! In-memory [`VideoGrabber`] for tests.
//!
//! Frames (or grab errors) are queued by the test and delivered one per
//! `grab_frame`. Every call except the per-tick ones is appended to a call
//! log so tests can assert on the order an application drives the engine in.
//! Listings take `&self`, so the log sits in a `RefCell`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use vidgrab_common::error::{VidgrabError, VidgrabResult};

use crate::{CodecInfo, DeviceInfo, DeviceKind, VideoGrabber};

#[derive(Debug, Default)]
pub struct StubGrabber {
    calls: RefCell<Vec<String>>,
    queued: VecDeque<Result<Vec<u8>, String>>,
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    frame_new: bool,
    recording: Option<PathBuf>,
    finished: Vec<PathBuf>,
    recorded_frames: u64,
    fail_recording: bool,
}

impl StubGrabber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `start_recording` fail, the way a missing encoder would.
    pub fn with_failing_recording(mut self) -> Self {
        self.fail_recording = true;
        self
    }

    /// Queue a frame for a later `grab_frame`.
    pub fn queue_frame(&mut self, pixels: Vec<u8>) {
        self.queued.push_back(Ok(pixels));
    }

    /// Make a later `grab_frame` fail with a capture error.
    pub fn queue_grab_error(&mut self, message: impl Into<String>) {
        self.queued.push_back(Err(message.into()));
    }

    /// Trait calls so far, e.g. `"init_grabber(320, 240, true)"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Files of completed recordings, oldest first.
    pub fn finished_recordings(&self) -> &[PathBuf] {
        &self.finished
    }

    /// Frames grabbed while recording.
    pub fn recorded_frames(&self) -> u64 {
        self.recorded_frames
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }
}

fn stub_device(name: &str, kind: DeviceKind) -> DeviceInfo {
    DeviceInfo {
        name: name.to_string(),
        kind,
        class: match kind {
            DeviceKind::Video => "Video/Source".to_string(),
            DeviceKind::Audio => "Audio/Source".to_string(),
        },
        path: None,
    }
}

fn stub_codec(name: &str) -> CodecInfo {
    CodecInfo {
        name: name.to_string(),
        description: format!("Stub {name} encoder"),
    }
}

impl VideoGrabber for StubGrabber {
    fn list_video_devices(&self) -> VidgrabResult<Vec<DeviceInfo>> {
        self.log("list_video_devices");
        Ok(vec![stub_device("Stub Camera", DeviceKind::Video)])
    }

    fn list_audio_devices(&self) -> VidgrabResult<Vec<DeviceInfo>> {
        self.log("list_audio_devices");
        Ok(vec![stub_device("Stub Microphone", DeviceKind::Audio)])
    }

    fn list_video_codecs(&self) -> VidgrabResult<Vec<CodecInfo>> {
        self.log("list_video_codecs");
        Ok(vec![stub_codec("x264enc"), stub_codec("jpegenc")])
    }

    fn list_audio_codecs(&self) -> VidgrabResult<Vec<CodecInfo>> {
        self.log("list_audio_codecs");
        Ok(vec![stub_codec("avenc_aac")])
    }

    fn set_video_device_id(&mut self, name: &str) -> VidgrabResult<()> {
        self.log(format!("set_video_device_id({name})"));
        Ok(())
    }

    fn set_audio_device_id(&mut self, name: &str) -> VidgrabResult<()> {
        self.log(format!("set_audio_device_id({name})"));
        Ok(())
    }

    fn set_video_codec(&mut self, name: &str) -> VidgrabResult<()> {
        self.log(format!("set_video_codec({name})"));
        Ok(())
    }

    fn set_audio_codec(&mut self, name: &str) -> VidgrabResult<()> {
        self.log(format!("set_audio_codec({name})"));
        Ok(())
    }

    fn init_grabber(&mut self, width: u32, height: u32, enable_audio: bool) -> VidgrabResult<()> {
        self.log(format!("init_grabber({width}, {height}, {enable_audio})"));
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 3];
        Ok(())
    }

    fn init_recording(&mut self) -> VidgrabResult<()> {
        self.log("init_recording");
        Ok(())
    }

    fn grab_frame(&mut self) -> VidgrabResult<()> {
        self.frame_new = false;
        match self.queued.pop_front() {
            Some(Ok(frame)) => {
                self.pixels = frame;
                self.frame_new = true;
                if self.recording.is_some() {
                    self.recorded_frames += 1;
                }
                Ok(())
            }
            Some(Err(message)) => Err(VidgrabError::capture(message)),
            None => Ok(()),
        }
    }

    fn is_frame_new(&self) -> bool {
        self.frame_new
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn start_recording(&mut self, path: &Path) -> VidgrabResult<()> {
        self.log(format!("start_recording({})", path.display()));
        if self.fail_recording {
            return Err(VidgrabError::codec("stub encoder unavailable"));
        }
        if self.recording.is_some() {
            return Err(VidgrabError::invalid_state("Already recording"));
        }
        self.recording = Some(path.to_path_buf());
        Ok(())
    }

    fn stop_recording(&mut self) -> VidgrabResult<PathBuf> {
        self.log("stop_recording");
        let path = self
            .recording
            .take()
            .ok_or_else(|| VidgrabError::invalid_state("Not recording"))?;
        self.finished.push(path.clone());
        Ok(path)
    }

    fn close(&mut self) -> VidgrabResult<()> {
        self.log("close");
        if self.recording.is_some() {
            self.stop_recording()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_delivered_in_order_then_run_dry() {
        let mut stub = StubGrabber::new();
        stub.init_grabber(1, 1, false).unwrap();
        stub.queue_frame(vec![1, 2, 3]);
        stub.queue_frame(vec![4, 5, 6]);

        stub.grab_frame().unwrap();
        assert!(stub.is_frame_new());
        assert_eq!(stub.pixels(), &[1, 2, 3]);

        stub.grab_frame().unwrap();
        assert_eq!(stub.pixels(), &[4, 5, 6]);

        stub.grab_frame().unwrap();
        assert!(!stub.is_frame_new());
        assert_eq!(stub.pixels(), &[4, 5, 6]);
    }

    #[test]
    fn queued_error_fails_one_grab() {
        let mut stub = StubGrabber::new();
        stub.queue_grab_error("camera unplugged");
        stub.queue_frame(vec![7, 7, 7]);

        let err = stub.grab_frame().unwrap_err();
        assert!(matches!(err, VidgrabError::Capture { .. }));
        assert!(!stub.is_frame_new());

        stub.grab_frame().unwrap();
        assert!(stub.is_frame_new());
    }

    #[test]
    fn listings_are_logged() {
        let stub = StubGrabber::new();
        stub.list_audio_devices().unwrap();
        stub.list_video_codecs().unwrap();
        assert_eq!(stub.calls(), &["list_audio_devices", "list_video_codecs"]);
    }

    #[test]
    fn recording_round_trip_is_logged() {
        let mut stub = StubGrabber::new();
        stub.start_recording(Path::new("data/output.mov")).unwrap();
        assert!(stub.is_recording());
        assert_eq!(stub.stop_recording().unwrap(), PathBuf::from("data/output.mov"));
        assert!(!stub.is_recording());
        assert_eq!(
            stub.calls(),
            &["start_recording(data/output.mov)", "stop_recording"]
        );
    }

    #[test]
    fn failing_recording_never_sets_flag() {
        let mut stub = StubGrabber::new().with_failing_recording();
        assert!(stub.start_recording(Path::new("out.mov")).is_err());
        assert!(!stub.is_recording());
    }

    #[test]
    fn close_finishes_active_recording() {
        let mut stub = StubGrabber::new();
        stub.start_recording(Path::new("out.mov")).unwrap();
        stub.close().unwrap();
        assert_eq!(stub.finished_recordings(), &[PathBuf::from("out.mov")]);
    }
}
