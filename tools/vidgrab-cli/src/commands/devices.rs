//! List capture devices.

use vidgrab_capture_engine::{DeviceInfo, GstGrabber, VideoGrabber};

pub fn run(video: bool, audio: bool, json: bool) -> anyhow::Result<()> {
    let grabber = GstGrabber::new();
    let cameras = if video {
        grabber.list_video_devices()?
    } else {
        Vec::new()
    };
    let microphones = if audio {
        grabber.list_audio_devices()?
    } else {
        Vec::new()
    };

    if json {
        let all: Vec<&DeviceInfo> = cameras.iter().chain(microphones.iter()).collect();
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    if video {
        print_section("Video devices", &cameras);
    }
    if audio {
        print_section("Audio devices", &microphones);
    }
    Ok(())
}

fn print_section(title: &str, devices: &[DeviceInfo]) {
    println!("{title}:");
    if devices.is_empty() {
        println!("  (none found)");
    }
    for (index, device) in devices.iter().enumerate() {
        println!("  [{index}] {device}");
    }
    println!();
}
