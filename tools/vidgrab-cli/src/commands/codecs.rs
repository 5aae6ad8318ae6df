//! List installed encoders.

use vidgrab_capture_engine::{CodecInfo, GstGrabber, VideoGrabber};

pub fn run(video: bool, audio: bool, json: bool) -> anyhow::Result<()> {
    let grabber = GstGrabber::new();
    let video_codecs = if video {
        grabber.list_video_codecs()?
    } else {
        Vec::new()
    };
    let audio_codecs = if audio {
        grabber.list_audio_codecs()?
    } else {
        Vec::new()
    };

    if json {
        let listing = serde_json::json!({
            "video": video_codecs,
            "audio": audio_codecs,
        });
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if video {
        print_section("Video encoders", &video_codecs);
    }
    if audio {
        print_section("Audio encoders", &audio_codecs);
    }
    Ok(())
}

fn print_section(title: &str, codecs: &[CodecInfo]) {
    println!("{title} ({}):", codecs.len());
    for codec in codecs {
        println!("  {codec}");
    }
    println!();
}
