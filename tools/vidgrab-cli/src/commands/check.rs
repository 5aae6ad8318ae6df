//! Check GStreamer and the elements recording needs.

use vidgrab_capture_engine::devices::element_available;
use vidgrab_capture_engine::pipeline::muxer_for_path;
use vidgrab_capture_engine::{GstGrabber, VideoGrabber};
use vidgrab_common::config::AppConfig;

const PIPELINE_ELEMENTS: &[&str] = &[
    "appsink",
    "appsrc",
    "videoconvert",
    "videoscale",
    "audioconvert",
    "audioresample",
];

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("VidGrab System Check");
    println!("{}", "=".repeat(50));

    if let Err(e) = vidgrab_capture_engine::init_gstreamer() {
        println!("[FAIL] GStreamer: {e}");
        return Ok(());
    }
    println!("[OK] {}", vidgrab_capture_engine::gstreamer_version());

    let grabber = &config.grabber;
    let output = config.output_path();
    let muxer = muxer_for_path(&output);

    let mut required: Vec<(&str, &str)> = PIPELINE_ELEMENTS
        .iter()
        .map(|name| (*name, "pipeline"))
        .collect();
    required.push((grabber.video_codec.as_str(), "video encoder"));
    if grabber.record_audio {
        required.push((grabber.audio_codec.as_str(), "audio encoder"));
    }
    required.push((muxer, "muxer"));

    println!();
    let mut missing = 0;
    for (name, role) in &required {
        if element_available(name) {
            println!("[OK]   {name} ({role})");
        } else {
            println!("[MISS] {name} ({role})");
            missing += 1;
        }
    }

    println!();
    let engine = GstGrabber::new();
    match engine.list_video_devices() {
        Ok(devices) => println!("[OK] Cameras detected: {}", devices.len()),
        Err(e) => println!("[WARN] Camera enumeration failed: {e}"),
    }
    match engine.list_audio_devices() {
        Ok(devices) => println!("[OK] Microphones detected: {}", devices.len()),
        Err(e) => println!("[WARN] Microphone enumeration failed: {e}"),
    }

    println!();
    if missing == 0 {
        println!("All required elements are available. Output: {}", output.display());
    } else {
        println!("{missing} required element(s) missing. Install the matching GStreamer plugins.");
    }

    Ok(())
}
