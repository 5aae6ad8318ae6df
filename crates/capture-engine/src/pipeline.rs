//! GStreamer pipeline construction for preview and recording.
//!
//! The preview pipeline converts the camera to packed RGB at the requested
//! size and parks frames in an `appsink`. The recording pipeline takes those
//! frames back through an `appsrc`, encodes them next to the microphone
//! branch, and muxes both into one file. Both branches are timestamped
//! against the recording pipeline's clock, which keeps audio and video in
//! sync.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;

use vidgrab_common::error::{VidgrabError, VidgrabResult};
use vidgrab_processing_core::frame::{pad_rows, FrameSize};

/// How long `stop` waits for EOS to drain through a pipeline.
const EOS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// A pipeline that writes media to disk.
pub trait CapturePipeline: Send {
    /// Start the pipeline.
    fn start(&mut self) -> VidgrabResult<()>;

    /// Feed one packed RGB video frame.
    fn push_frame(&mut self, rgb: &[u8]) -> VidgrabResult<()>;

    /// Stop the pipeline and finalize output.
    fn stop(&mut self) -> VidgrabResult<()>;

    /// Check if the pipeline is currently running.
    fn is_running(&self) -> bool;

    /// File the pipeline writes to.
    fn output_path(&self) -> &Path;

    /// Get pipeline statistics.
    fn stats(&self) -> PipelineStats;
}

/// Runtime statistics from a capture pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Frames accepted by the pipeline.
    pub frames_captured: u64,

    /// Frames the pipeline refused.
    pub frames_dropped: u64,

    /// Bytes written to disk (known once the pipeline stopped).
    pub bytes_written: u64,
}

impl PipelineStats {
    /// Drop rate as a percentage.
    pub fn drop_rate(&self) -> f64 {
        let total = self.frames_captured + self.frames_dropped;
        if total == 0 {
            return 0.0;
        }
        self.frames_dropped as f64 / total as f64 * 100.0
    }
}

/// What a recording pipeline should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingSpec {
    pub output: PathBuf,
    pub size: FrameSize,
    pub video_codec: String,
    /// Audio encoder, or `None` for a video-only file.
    pub audio_codec: Option<String>,
}

/// Owns a `gst::Pipeline` and its Playing/Null lifecycle.
struct ManagedPipeline {
    name: String,
    pipeline: gst::Pipeline,
    running: bool,
}

impl ManagedPipeline {
    fn from_launch(name: impl Into<String>, launch: &str) -> VidgrabResult<Self> {
        init_gstreamer()?;
        let name = name.into();

        let element = gst::parse::launch(launch).map_err(|e| {
            VidgrabError::capture(format!("Failed to build {name} pipeline: {e}"))
        })?;

        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            VidgrabError::capture(format!("{name} launch string did not produce a pipeline"))
        })?;

        Ok(Self {
            name,
            pipeline,
            running: false,
        })
    }

    fn element(&self, name: &str) -> VidgrabResult<gst::Element> {
        self.pipeline.by_name(name).ok_or_else(|| {
            VidgrabError::capture(format!("{} pipeline has no element '{name}'", self.name))
        })
    }

    /// Add `source` and link it in front of the element called `target`.
    fn attach_source(&self, source: &gst::Element, target: &str) -> VidgrabResult<()> {
        let target = self.element(target)?;
        self.pipeline.add(source).map_err(|e| {
            VidgrabError::capture(format!("Failed to add source to {}: {e}", self.name))
        })?;
        source.link(&target).map_err(|e| {
            VidgrabError::capture(format!("Failed to link source in {}: {e}", self.name))
        })
    }

    fn start(&mut self) -> VidgrabResult<()> {
        self.pipeline.set_state(gst::State::Playing).map_err(|e| {
            VidgrabError::capture(format!("Failed to start {} pipeline: {e:?}", self.name))
        })?;

        // Live sources report NoPreroll, so this returns as soon as the
        // devices are open.
        match self.pipeline.state(gst::ClockTime::from_seconds(5)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(
                    pipeline = %self.name,
                    ?state,
                    "Pipeline did not reach Playing state within timeout"
                );
            }
            (Err(e), _, _) => {
                let _ = self.pipeline.set_state(gst::State::Null);
                return Err(VidgrabError::capture(format!(
                    "{} pipeline failed to reach Playing state: {e:?}",
                    self.name
                )));
            }
        }

        self.running = true;
        Ok(())
    }

    /// Send EOS so encoders and muxers can finalize, wait for it, then shut down.
    fn stop_with_eos(&mut self) -> VidgrabResult<()> {
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            tracing::warn!(pipeline = %self.name, "Failed to send EOS event; output may be truncated");
        } else if let Some(bus) = self.pipeline.bus() {
            for msg in bus.iter_timed(gst::ClockTime::from_nseconds(
                EOS_DRAIN_TIMEOUT.as_nanos() as u64,
            )) {
                match msg.view() {
                    gst::MessageView::Eos(_) => {
                        tracing::debug!(pipeline = %self.name, "EOS received; pipeline drained");
                        break;
                    }
                    gst::MessageView::Error(e) => {
                        tracing::warn!(
                            pipeline = %self.name,
                            error = %e.error(),
                            "Pipeline error during EOS drain"
                        );
                        break;
                    }
                    _ => {}
                }
            }
        }

        self.stop_now()
    }

    fn stop_now(&mut self) -> VidgrabResult<()> {
        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            VidgrabError::capture(format!("Failed to stop {} pipeline: {e:?}", self.name))
        })?;
        self.running = false;
        Ok(())
    }

    /// Pop the first pending error message, if any.
    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(e) => Some(match e.debug() {
                Some(debug) => format!("{} ({debug})", e.error()),
                None => e.error().to_string(),
            }),
            _ => None,
        }
    }
}

impl Drop for ManagedPipeline {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

/// Camera → packed RGB frames, pulled without blocking.
pub struct PreviewPipeline {
    inner: ManagedPipeline,
    appsink: gst_app::AppSink,
    size: FrameSize,
}

impl PreviewPipeline {
    pub fn build(source: &gst::Element, size: FrameSize) -> VidgrabResult<Self> {
        let inner = ManagedPipeline::from_launch("preview", &preview_launch(size))?;
        inner.attach_source(source, "vconv")?;

        let appsink = inner
            .element("preview")?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| VidgrabError::capture("preview sink is not an appsink"))?;

        Ok(Self {
            inner,
            appsink,
            size,
        })
    }

    pub fn start(&mut self) -> VidgrabResult<()> {
        self.inner.start()
    }

    pub fn stop(&mut self) -> VidgrabResult<()> {
        self.inner.stop_now()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    /// Drain the sink and return the newest queued sample, if any.
    pub fn try_pull_latest(&self) -> VidgrabResult<Option<gst::Sample>> {
        if let Some(error) = self.inner.pending_error() {
            return Err(VidgrabError::capture(format!("Preview pipeline error: {error}")));
        }

        let mut latest = None;
        while let Some(sample) = self.appsink.try_pull_sample(gst::ClockTime::ZERO) {
            latest = Some(sample);
        }
        Ok(latest)
    }
}

/// `appsrc` + optional microphone → encoders → muxer → file.
pub struct GstRecordingPipeline {
    inner: ManagedPipeline,
    appsrc: gst_app::AppSrc,
    spec: RecordingSpec,
    stats: PipelineStats,
}

impl GstRecordingPipeline {
    /// Build the pipeline. `audio_source` is required when `spec` names an
    /// audio codec and ignored otherwise.
    pub fn build(spec: RecordingSpec, audio_source: Option<gst::Element>) -> VidgrabResult<Self> {
        require_element(&spec.video_codec)?;
        if let Some(codec) = &spec.audio_codec {
            require_element(codec)?;
        }
        require_element(muxer_for_path(&spec.output))?;

        let inner = ManagedPipeline::from_launch("recording", &recording_launch(&spec))?;

        if spec.audio_codec.is_some() {
            let source = audio_source.ok_or_else(|| {
                VidgrabError::recording("Audio codec selected but no audio source was opened")
            })?;
            inner.attach_source(&source, "aconv")?;
        }

        let appsrc = inner
            .element("frames")?
            .dynamic_cast::<gst_app::AppSrc>()
            .map_err(|_| VidgrabError::recording("frames source is not an appsrc"))?;

        Ok(Self {
            inner,
            appsrc,
            spec,
            stats: PipelineStats::default(),
        })
    }
}

impl CapturePipeline for GstRecordingPipeline {
    fn start(&mut self) -> VidgrabResult<()> {
        self.inner.start()
    }

    fn push_frame(&mut self, rgb: &[u8]) -> VidgrabResult<()> {
        if !self.inner.running {
            return Err(VidgrabError::invalid_state("Recording pipeline is not running"));
        }

        let data = pad_rows(rgb, self.spec.size)?;
        match self.appsrc.push_buffer(gst::Buffer::from_mut_slice(data)) {
            Ok(_) => {
                self.stats.frames_captured += 1;
                Ok(())
            }
            Err(flow) => {
                self.stats.frames_dropped += 1;
                Err(VidgrabError::recording(format!(
                    "Recording pipeline refused frame: {flow:?}"
                )))
            }
        }
    }

    fn stop(&mut self) -> VidgrabResult<()> {
        self.inner.stop_with_eos()?;
        self.stats.bytes_written = std::fs::metadata(&self.spec.output)
            .map(|m| m.len())
            .unwrap_or(0);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.inner.running
    }

    fn output_path(&self) -> &Path {
        &self.spec.output
    }

    fn stats(&self) -> PipelineStats {
        self.stats.clone()
    }
}

/// Launch description for the preview branch. The camera is linked in
/// front of `vconv` after parsing.
pub fn preview_launch(size: FrameSize) -> String {
    format!(
        "videoconvert name=vconv ! videoscale ! capsfilter caps=\"video/x-raw,format=RGB,width={},height={}\" ! appsink name=preview max-buffers=2 drop=true sync=false",
        size.width, size.height
    )
}

/// Launch description for a recording. The microphone, if any, is linked
/// in front of `aconv` after parsing.
pub fn recording_launch(spec: &RecordingSpec) -> String {
    let path = escape_path(&spec.output);
    let muxer = muxer_for_path(&spec.output);
    // framerate=0/1: frames arrive whenever the application polls, and
    // do-timestamp stamps each one with the pipeline clock on push.
    let mut launch = format!(
        "appsrc name=frames is-live=true do-timestamp=true format=time caps=\"video/x-raw,format=RGB,width={},height={},framerate=0/1\" ! queue ! videoconvert ! {} ! queue ! {muxer} name=mux ! filesink location=\"{path}\"",
        spec.size.width, spec.size.height, spec.video_codec
    );
    if let Some(audio_codec) = &spec.audio_codec {
        launch.push_str(&format!(
            " audioconvert name=aconv ! audioresample ! {audio_codec} ! queue ! mux."
        ));
    }
    launch
}

/// Pick a muxer from the output file extension.
pub fn muxer_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp4") | Some("m4v") => "mp4mux",
        Some("mkv") => "matroskamux",
        _ => "qtmux",
    }
}

/// Initialize GStreamer once per process.
pub fn init_gstreamer() -> VidgrabResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(VidgrabError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

/// Version string of the linked GStreamer library.
pub fn gstreamer_version() -> String {
    gst::version_string().to_string()
}

fn require_element(name: &str) -> VidgrabResult<()> {
    init_gstreamer()?;
    if gst::ElementFactory::find(name).is_none() {
        return Err(VidgrabError::codec(format!(
            "GStreamer element '{name}' is not installed"
        )));
    }
    Ok(())
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}
