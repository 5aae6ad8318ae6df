//! VidGrab CLI: device discovery and headless recording.
//!
//! Usage:
//!   vidgrab devices [--video] [--audio]   List capture devices
//!   vidgrab codecs [--video] [--audio]    List installed encoders
//!   vidgrab check                         Check GStreamer and required elements
//!   vidgrab record [OPTIONS]              Record the camera without a window

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "vidgrab",
    about = "Camera grabbing and recording",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List capture devices
    Devices {
        /// Only cameras
        #[arg(long)]
        video: bool,

        /// Only microphones
        #[arg(long)]
        audio: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List installed encoders
    Codecs {
        /// Only video encoders
        #[arg(long)]
        video: bool,

        /// Only audio encoders
        #[arg(long)]
        audio: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Check GStreamer and the elements recording needs
    Check,

    /// Record the camera (and microphone) without a preview window
    Record {
        /// Output file (defaults to output.mov in the data directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frame width
        #[arg(long)]
        width: Option<u32>,

        /// Frame height
        #[arg(long)]
        height: Option<u32>,

        /// Camera name, "auto" or "test"
        #[arg(short, long)]
        device: Option<String>,

        /// Microphone name, "auto" or "test"
        #[arg(long)]
        audio_device: Option<String>,

        /// Record video only
        #[arg(long)]
        no_audio: bool,

        /// Video encoder element
        #[arg(long)]
        video_codec: Option<String>,

        /// Audio encoder element
        #[arg(long)]
        audio_codec: Option<String>,

        /// Frame poll rate
        #[arg(long)]
        fps: Option<u32>,

        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<f64>,
    },
}

/// Which listings a `devices`/`codecs` invocation wants.
///
/// Neither flag means both.
fn selection(video: bool, audio: bool) -> (bool, bool) {
    if !video && !audio {
        (true, true)
    } else {
        (video, audio)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = vidgrab_common::config::AppConfig::load();

    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    vidgrab_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Devices { video, audio, json } => {
            let (video, audio) = selection(video, audio);
            commands::devices::run(video, audio, json)
        }
        Commands::Codecs { video, audio, json } => {
            let (video, audio) = selection(video, audio);
            commands::codecs::run(video, audio, json)
        }
        Commands::Check => commands::check::run(&config),
        Commands::Record {
            output,
            width,
            height,
            device,
            audio_device,
            no_audio,
            video_codec,
            audio_codec,
            fps,
            duration,
        } => {
            let defaults = &config.grabber;
            let options = commands::record::RecordOptions {
                output: output.unwrap_or_else(|| config.output_path()),
                width: width.unwrap_or(defaults.width),
                height: height.unwrap_or(defaults.height),
                video_device: device.unwrap_or_else(|| defaults.video_device.clone()),
                audio_device: audio_device.unwrap_or_else(|| defaults.audio_device.clone()),
                record_audio: defaults.record_audio && !no_audio,
                video_codec: video_codec.unwrap_or_else(|| defaults.video_codec.clone()),
                audio_codec: audio_codec.unwrap_or_else(|| defaults.audio_codec.clone()),
                fps: fps.unwrap_or(defaults.fps),
                duration,
            };
            commands::record::run(options).await
        }
    }
}
