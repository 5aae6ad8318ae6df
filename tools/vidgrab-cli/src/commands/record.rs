//! Record the camera without a preview window.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;
use vidgrab_capture_engine::{GstGrabber, VideoGrabber};

/// Resolved `record` arguments, config defaults already applied.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub video_device: String,
    pub audio_device: String,
    pub record_audio: bool,
    pub video_codec: String,
    pub audio_codec: String,
    pub fps: u32,
    pub duration: Option<f64>,
}

impl RecordOptions {
    /// Check the options and return how long to record, if bounded.
    fn validate(&self) -> anyhow::Result<Option<Duration>> {
        if self.width == 0 || self.height == 0 {
            anyhow::bail!("Invalid size {}x{}", self.width, self.height);
        }
        if self.fps == 0 {
            anyhow::bail!("--fps must be at least 1");
        }
        self.duration
            .map(|secs| {
                if secs.is_nan() || secs <= 0.0 {
                    anyhow::bail!("--duration must be a positive number of seconds");
                }
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| anyhow::anyhow!("--duration {secs} is out of range: {e}"))
            })
            .transpose()
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps))
    }
}

pub async fn run(options: RecordOptions) -> anyhow::Result<()> {
    let stop_after = options.validate()?;

    println!("Recording to: {}", options.output.display());
    println!("  Size: {}x{}", options.width, options.height);
    println!("  Camera: {}", options.video_device);
    if options.record_audio {
        println!("  Microphone: {}", options.audio_device);
    } else {
        println!("  Microphone: off");
    }
    println!("  Codecs: {} / {}", options.video_codec, options.audio_codec);
    println!();

    let mut grabber = GstGrabber::new();
    grabber.set_video_device_id(&options.video_device)?;
    grabber.set_audio_device_id(&options.audio_device)?;
    grabber.set_video_codec(&options.video_codec)?;
    grabber.set_audio_codec(&options.audio_codec)?;
    grabber
        .init_grabber(options.width, options.height, options.record_audio)
        .context("Failed to open camera")?;
    grabber
        .init_recording()
        .context("Failed to prepare recorder")?;
    grabber
        .start_recording(&options.output)
        .context("Failed to start recording")?;

    match options.duration {
        Some(secs) => println!("Recording for {secs}s (Ctrl+C stops early)..."),
        None => println!("Press Ctrl+C to stop recording..."),
    }

    let mut ticker = tokio::time::interval(options.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = async {
        match stop_after {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = grabber.grab_frame() {
                    tracing::warn!(error = %e, "Frame grab failed");
                }
            }
            signal = &mut ctrl_c => {
                signal?;
                println!();
                break;
            }
            _ = &mut deadline => break,
        }
    }

    let elapsed = grabber.recording_elapsed_secs();
    let frames = grabber.recorded_frames();
    let path = grabber.stop_recording()?;
    grabber.close()?;

    println!(
        "Recording saved to: {} ({frames} frames, {elapsed:.1}s)",
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> RecordOptions {
        RecordOptions {
            output: PathBuf::from("output.mov"),
            width: 320,
            height: 240,
            video_device: "test".to_string(),
            audio_device: "test".to_string(),
            record_audio: true,
            video_codec: "x264enc".to_string(),
            audio_codec: "avenc_aac".to_string(),
            fps: 30,
            duration: None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        options().validate().unwrap();
    }

    #[test]
    fn zero_fps_is_rejected() {
        let opts = RecordOptions { fps: 0, ..options() };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        for bad in [0.0, -1.0, f64::NAN] {
            let opts = RecordOptions {
                duration: Some(bad),
                ..options()
            };
            assert!(opts.validate().is_err(), "duration {bad} accepted");
        }
    }

    #[test]
    fn huge_duration_is_rejected_not_panicking() {
        for bad in [1e20, f64::INFINITY, f64::MAX] {
            let opts = RecordOptions {
                duration: Some(bad),
                ..options()
            };
            assert!(opts.validate().is_err(), "duration {bad} accepted");
        }
    }

    #[test]
    fn duration_becomes_stop_deadline() {
        let opts = RecordOptions {
            duration: Some(2.5),
            ..options()
        };
        assert_eq!(opts.validate().unwrap(), Some(Duration::from_millis(2500)));
        assert_eq!(options().validate().unwrap(), None);
    }

    #[test]
    fn zero_size_is_rejected() {
        let opts = RecordOptions {
            width: 0,
            ..options()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn interval_matches_fps() {
        let opts = RecordOptions { fps: 25, ..options() };
        assert_eq!(opts.frame_interval(), Duration::from_millis(40));
    }
}
