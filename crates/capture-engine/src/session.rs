//! Recording session management.

use std::path::PathBuf;

use vidgrab_common::clock::RecordingClock;
use vidgrab_common::error::{VidgrabError, VidgrabResult};

use crate::pipeline::{CapturePipeline, PipelineStats};

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingState {
    /// No file is being written.
    #[default]
    NotRecording,
    /// Frames are being written.
    Recording,
}

/// Drives one recording pipeline at a time through start → frames → stop.
#[derive(Default)]
pub struct RecordingSession {
    state: RecordingState,
    clock: Option<RecordingClock>,
    pipeline: Option<Box<dyn CapturePipeline>>,
    last_stats: Option<PipelineStats>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session state.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Start recording through `pipeline`.
    ///
    /// Creates the output directory if needed. On failure the session stays
    /// in [`RecordingState::NotRecording`].
    pub fn start(&mut self, mut pipeline: Box<dyn CapturePipeline>) -> VidgrabResult<()> {
        if self.state == RecordingState::Recording {
            return Err(VidgrabError::invalid_state("Already recording"));
        }

        let output = pipeline.output_path().to_path_buf();
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(output = %output.display(), "Starting recording");
        pipeline.start()?;

        let clock = RecordingClock::start();
        tracing::info!(epoch_wall = %clock.epoch_wall(), "Recording clock started");

        self.clock = Some(clock);
        self.pipeline = Some(pipeline);
        self.last_stats = None;
        self.state = RecordingState::Recording;
        Ok(())
    }

    /// Hand one frame to the active pipeline.
    pub fn push_frame(&mut self, rgb: &[u8]) -> VidgrabResult<()> {
        match self.pipeline.as_mut() {
            Some(pipeline) if self.state == RecordingState::Recording => pipeline.push_frame(rgb),
            _ => Err(VidgrabError::invalid_state("Not recording")),
        }
    }

    /// Stop recording and return the finished file.
    ///
    /// The session returns to [`RecordingState::NotRecording`] even when
    /// finalizing fails.
    pub fn stop(&mut self) -> VidgrabResult<PathBuf> {
        if self.state != RecordingState::Recording {
            return Err(VidgrabError::invalid_state("Not recording"));
        }
        self.state = RecordingState::NotRecording;

        let mut pipeline = self
            .pipeline
            .take()
            .ok_or_else(|| VidgrabError::invalid_state("Recording has no pipeline"))?;
        let elapsed = self.clock.take().map(|c| c.elapsed_secs()).unwrap_or(0.0);

        tracing::info!("Stopping recording");
        let result = pipeline.stop();

        let stats = pipeline.stats();
        tracing::info!(
            duration_secs = elapsed,
            frames = stats.frames_captured,
            dropped = stats.frames_dropped,
            bytes = stats.bytes_written,
            "Recording stopped"
        );
        self.last_stats = Some(stats);

        result?;
        Ok(pipeline.output_path().to_path_buf())
    }

    /// Recording duration so far.
    pub fn elapsed_secs(&self) -> f64 {
        self.clock.as_ref().map(|c| c.elapsed_secs()).unwrap_or(0.0)
    }

    /// Statistics of the active pipeline, or of the last finished one.
    pub fn stats(&self) -> Option<PipelineStats> {
        self.pipeline
            .as_ref()
            .map(|p| p.stats())
            .or_else(|| self.last_stats.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Calls {
        started: bool,
        stopped: bool,
        frames: u64,
    }

    struct FakePipeline {
        output: PathBuf,
        calls: Arc<Mutex<Calls>>,
        fail_start: bool,
        fail_stop: bool,
    }

    impl FakePipeline {
        fn boxed(output: PathBuf, calls: &Arc<Mutex<Calls>>) -> Box<Self> {
            Box::new(Self {
                output,
                calls: calls.clone(),
                fail_start: false,
                fail_stop: false,
            })
        }
    }

    impl CapturePipeline for FakePipeline {
        fn start(&mut self) -> VidgrabResult<()> {
            if self.fail_start {
                return Err(VidgrabError::capture("device busy"));
            }
            self.calls.lock().unwrap().started = true;
            Ok(())
        }

        fn push_frame(&mut self, _rgb: &[u8]) -> VidgrabResult<()> {
            self.calls.lock().unwrap().frames += 1;
            Ok(())
        }

        fn stop(&mut self) -> VidgrabResult<()> {
            self.calls.lock().unwrap().stopped = true;
            if self.fail_stop {
                return Err(VidgrabError::recording("muxer failed"));
            }
            Ok(())
        }

        fn is_running(&self) -> bool {
            let calls = self.calls.lock().unwrap();
            calls.started && !calls.stopped
        }

        fn output_path(&self) -> &Path {
            &self.output
        }

        fn stats(&self) -> PipelineStats {
            PipelineStats {
                frames_captured: self.calls.lock().unwrap().frames,
                ..Default::default()
            }
        }
    }

    fn scratch_output(tag: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("vidgrab-session-{tag}-{}", std::process::id()))
            .join("output.mov")
    }

    #[test]
    fn start_push_stop_cycle() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let output = scratch_output("cycle");
        let mut session = RecordingSession::new();
        assert_eq!(session.state(), RecordingState::NotRecording);

        session
            .start(FakePipeline::boxed(output.clone(), &calls))
            .unwrap();
        assert!(session.is_recording());
        assert!(output.parent().unwrap().is_dir());

        session.push_frame(&[0; 12]).unwrap();
        session.push_frame(&[0; 12]).unwrap();

        let path = session.stop().unwrap();
        assert_eq!(path, output);
        assert!(!session.is_recording());
        assert!(calls.lock().unwrap().stopped);
        assert_eq!(session.stats().unwrap().frames_captured, 2);

        let _ = std::fs::remove_dir_all(output.parent().unwrap());
    }

    #[test]
    fn double_start_is_rejected() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let output = scratch_output("double");
        let mut session = RecordingSession::new();
        session
            .start(FakePipeline::boxed(output.clone(), &calls))
            .unwrap();

        let err = session
            .start(FakePipeline::boxed(output.clone(), &calls))
            .unwrap_err();
        assert!(matches!(err, VidgrabError::InvalidState { .. }));
        assert!(session.is_recording());

        let _ = std::fs::remove_dir_all(output.parent().unwrap());
    }

    #[test]
    fn stop_without_start_is_rejected() {
        let mut session = RecordingSession::new();
        assert!(matches!(
            session.stop().unwrap_err(),
            VidgrabError::InvalidState { .. }
        ));
        assert!(session.push_frame(&[0; 3]).is_err());
    }

    #[test]
    fn failed_start_leaves_session_idle() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let output = scratch_output("failstart");
        let mut pipeline = FakePipeline::boxed(output.clone(), &calls);
        pipeline.fail_start = true;

        let mut session = RecordingSession::new();
        assert!(session.start(pipeline).is_err());
        assert_eq!(session.state(), RecordingState::NotRecording);

        let _ = std::fs::remove_dir_all(output.parent().unwrap());
    }

    #[test]
    fn failed_stop_still_ends_recording() {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let output = scratch_output("failstop");
        let mut pipeline = FakePipeline::boxed(output.clone(), &calls);
        pipeline.fail_stop = true;

        let mut session = RecordingSession::new();
        session.start(pipeline).unwrap();
        assert!(session.stop().is_err());
        assert_eq!(session.state(), RecordingState::NotRecording);

        let _ = std::fs::remove_dir_all(output.parent().unwrap());
    }
}
